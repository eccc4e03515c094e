use httpmock::prelude::*;
use opsdash::config::AiConfig;
use opsdash::domain::message::{ChatMessage, ChatRequest};
use opsdash::domain::ports::ChatProvider;
use opsdash::{DashError, OpenAiClient};
use serde_json::json;

fn client_for(server: &MockServer) -> OpenAiClient {
    let ai = AiConfig {
        endpoint: server.url("/v1/chat/completions"),
        api_key: Some("sk-test".to_string()),
        timeout_seconds: Some(5),
        ..AiConfig::default()
    };
    OpenAiClient::from_config(&ai).unwrap()
}

fn request() -> ChatRequest {
    ChatRequest {
        model: "gpt-4o-mini".to_string(),
        messages: vec![
            ChatMessage::system("You are an IT Operations assistant."),
            ChatMessage::user("Why is the VPN down?"),
        ],
        temperature: 0.4,
    }
}

#[tokio::test]
async fn test_complete_returns_first_choice() {
    let server = MockServer::start_async().await;
    let api_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .header("authorization", "Bearer sk-test")
                .json_body_partial(r#"{"model": "gpt-4o-mini", "stream": false}"#);
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!({
                    "choices": [{"message": {"role": "assistant", "content": "- Restart the VPN gateway"}}]
                }));
        })
        .await;

    let reply = client_for(&server).complete(&request()).await.unwrap();

    api_mock.assert_async().await;
    assert_eq!(reply, "- Restart the VPN gateway");
}

#[tokio::test]
async fn test_stream_concatenates_fragments() {
    let server = MockServer::start_async().await;
    let body = [
        r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#,
        r#"data: {"choices":[{"delta":{"content":"Check "}}]}"#,
        r#"data: {"choices":[{"delta":{"content":"the cert."}}]}"#,
        "data: [DONE]",
    ]
    .join("\n\n");

    let api_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .json_body_partial(r#"{"stream": true}"#);
            then.status(200)
                .header("Content-Type", "text/event-stream")
                .body(body);
        })
        .await;

    let mut fragments = Vec::new();
    let reply = client_for(&server)
        .stream(&request(), &mut |f: &str| fragments.push(f.to_string()))
        .await
        .unwrap();

    api_mock.assert_async().await;
    assert_eq!(reply, "Check the cert.");
    assert_eq!(fragments, vec!["Check ", "the cert."]);
}

#[tokio::test]
async fn test_provider_error_status() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(401).body("invalid api key");
        })
        .await;

    let err = client_for(&server).complete(&request()).await.unwrap_err();

    match err {
        DashError::ProviderError { status, ref body } => {
            assert_eq!(status, 401);
            assert_eq!(body, "invalid api key");
        }
        other => panic!("expected ProviderError, got {:?}", other),
    }
}

#[test]
fn test_missing_api_key() {
    let ai = AiConfig {
        api_key: Some("${OPSDASH_NEVER_SET}".to_string()),
        ..AiConfig::default()
    };

    if std::env::var("OPENAI_API_KEY").is_err() {
        assert!(matches!(
            OpenAiClient::from_config(&ai),
            Err(DashError::MissingCredential { .. })
        ));
    }
}
