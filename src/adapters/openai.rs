use crate::config::toml_config::AiConfig;
use crate::domain::message::ChatRequest;
use crate::domain::ports::ChatProvider;
use crate::utils::error::{DashError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// OpenAI 相容的 chat completions 客戶端
pub struct OpenAiClient {
    http: Client,
    endpoint: String,
    api_key: String,
}

#[derive(Serialize)]
struct Payload<'a> {
    #[serde(flatten)]
    request: &'a ChatRequest,
    stream: bool,
}

impl OpenAiClient {
    pub fn new(endpoint: &str, api_key: String, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            endpoint: endpoint.to_string(),
            api_key,
        })
    }

    /// 找不到 API key 時回傳 MissingCredential，只中止目前的動作
    pub fn from_config(ai: &AiConfig) -> Result<Self> {
        let api_key = ai.resolve_api_key()?;
        tracing::debug!(
            "Chat client for {} with key of {} chars",
            ai.endpoint,
            api_key.len()
        );
        Self::new(
            &ai.endpoint,
            api_key,
            ai.timeout_seconds.map(Duration::from_secs),
        )
    }

    async fn send(&self, request: &ChatRequest, stream: bool) -> Result<reqwest::Response> {
        tracing::info!(
            "🤖 Calling {} (model {}, {} messages, stream={})",
            self.endpoint,
            request.model,
            request.messages.len(),
            stream
        );

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&Payload { request, stream })
            .send()
            .await?;

        let status = response.status();
        tracing::debug!("Provider response status: {}", status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("❌ Provider returned HTTP {}: {}", status, body);
            return Err(DashError::ProviderError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl ChatProvider for OpenAiClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        let response = self.send(request, false).await?;
        let body: Value = response.json().await?;

        body["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| DashError::ProcessingError {
                message: "Response has no choices[0].message.content".to_string(),
            })
    }

    async fn stream(
        &self,
        request: &ChatRequest,
        on_fragment: &mut (dyn for<'f> FnMut(&'f str) + Send),
    ) -> Result<String> {
        let mut response = self.send(request, true).await?;
        let mut decoder = SseDecoder::default();
        let mut reply = String::new();
        let mut done = false;

        while !done {
            let events = match response.chunk().await? {
                Some(chunk) => decoder.feed(&chunk),
                None => {
                    done = true;
                    decoder.finish().into_iter().collect()
                }
            };

            for event in events {
                match event {
                    SseEvent::Done => {
                        done = true;
                        break;
                    }
                    SseEvent::Data(data) => {
                        if let Some(fragment) = delta_content(&data)? {
                            on_fragment(&fragment);
                            reply.push_str(&fragment);
                        }
                    }
                }
            }
        }

        tracing::info!("✅ Streamed reply of {} chars", reply.len());
        Ok(reply)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum SseEvent {
    Data(String),
    Done,
}

/// 以位元組緩衝，行可能被切在兩個網路封包之間（包括 UTF-8 字元中間）
#[derive(Debug, Default)]
struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(event) = parse_line(&line) {
                events.push(event);
            }
        }
        events
    }

    /// 串流結束時處理最後一行（沒有換行結尾）
    fn finish(&mut self) -> Option<SseEvent> {
        let rest = std::mem::take(&mut self.buffer);
        parse_line(&rest)
    }
}

fn parse_line(line: &[u8]) -> Option<SseEvent> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim_end_matches(|c| c == '\r' || c == '\n');
    let data = line.strip_prefix("data:")?.trim_start();

    match data {
        "" => None,
        "[DONE]" => Some(SseEvent::Done),
        _ => Some(SseEvent::Data(data.to_string())),
    }
}

fn delta_content(data: &str) -> Result<Option<String>> {
    let event: Value = serde_json::from_str(data)?;
    Ok(event["choices"][0]["delta"]["content"]
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoder_joins_lines_split_across_chunks() {
        let mut decoder = SseDecoder::default();

        assert!(decoder.feed(b"data: {\"choices\":[{\"delta\":{\"con").is_empty());
        let events = decoder.feed(b"tent\":\"Hi\"}}]}\n\n: keep-alive\ndata: [DO");
        assert_eq!(
            events,
            vec![SseEvent::Data(
                "{\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}".to_string()
            )]
        );
        assert_eq!(decoder.feed(b"NE]\r\n"), vec![SseEvent::Done]);
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn test_decoder_handles_split_utf8() {
        let line = "data: {\"choices\":[{\"delta\":{\"content\":\"é\"}}]}\n".as_bytes();
        let split = line.iter().position(|b| *b == 0xC3).unwrap() + 1;

        let mut decoder = SseDecoder::default();
        assert!(decoder.feed(&line[..split]).is_empty());
        let events = decoder.feed(&line[split..]);

        match &events[..] {
            [SseEvent::Data(data)] => {
                assert_eq!(delta_content(data).unwrap().as_deref(), Some("é"))
            }
            other => panic!("unexpected events: {:?}", other),
        }
    }

    #[test]
    fn test_finish_flushes_unterminated_line() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.feed(b"data: [DONE]").is_empty());
        assert_eq!(decoder.finish(), Some(SseEvent::Done));
    }

    #[test]
    fn test_delta_without_content_is_skipped() {
        let role_only = r#"{"choices":[{"delta":{"role":"assistant"}}]}"#;
        assert_eq!(delta_content(role_only).unwrap(), None);
        assert!(delta_content("not json").is_err());
    }

    #[test]
    fn test_payload_flattens_request() {
        let request = ChatRequest {
            model: "gpt-4o-mini".to_string(),
            messages: vec![crate::domain::message::ChatMessage::user("hi")],
            temperature: 0.5,
        };
        let json = serde_json::to_value(Payload {
            request: &request,
            stream: true,
        })
        .unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "model": "gpt-4o-mini",
                "messages": [{"role": "user", "content": "hi"}],
                "temperature": 0.5,
                "stream": true
            })
        );
    }
}
