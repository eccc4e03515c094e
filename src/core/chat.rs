use crate::domain::message::{ChatMessage, ChatRequest, Role};
use crate::domain::ports::ChatProvider;
use crate::utils::error::{DashError, Result};
use std::fmt;

pub const DEFAULT_CHAT_TEMPERATURE: f32 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Domain {
    #[default]
    Cybersecurity,
    DataScience,
    ItOperations,
}

impl Domain {
    pub const ALL: [Domain; 3] = [Domain::Cybersecurity, Domain::DataScience, Domain::ItOperations];

    pub fn label(self) -> &'static str {
        match self {
            Domain::Cybersecurity => "Cybersecurity",
            Domain::DataScience => "Data Science",
            Domain::ItOperations => "IT Operations",
        }
    }

    /// 接受顯示名稱或簡寫，不分大小寫
    pub fn parse(name: &str) -> Result<Self> {
        let key: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();

        match key.as_str() {
            "cybersecurity" | "cyber" | "security" => Ok(Domain::Cybersecurity),
            "datascience" | "data" | "ds" => Ok(Domain::DataScience),
            "itoperations" | "itops" | "it" | "ops" => Ok(Domain::ItOperations),
            _ => Err(DashError::ValidationError {
                message: format!(
                    "Unknown domain '{}'. Choose one of: {}",
                    name,
                    Domain::ALL.map(Domain::label).join(", ")
                ),
            }),
        }
    }

    pub fn system_prompt(self) -> &'static str {
        match self {
            Domain::Cybersecurity => "You are a cybersecurity expert assistant.
- Analyze incidents and threats
- Provide technical guidance
- Explain attack vectors and mitigations
- Use standard terminology (MITRE ATT&CK, CVE when relevant)
- Prioritize actionable recommendations
Tone: Professional, technical
Format: Clear, structured responses",
            Domain::DataScience => "You are a data science expert assistant.
- Help with analysis, visualization, and statistical insights
- Explain methods clearly and suggest next steps
Tone: Helpful, analytical
Format: Clear, structured responses",
            Domain::ItOperations => "You are an IT operations expert assistant.
- Troubleshoot issues, optimize systems, and manage tickets
- Provide step-by-step troubleshooting
Tone: Professional, practical
Format: Clear, actionable responses",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatSettings {
    pub domain: Domain,
    pub model: String,
    pub temperature: f32,
}

/// 對話紀錄為空時放入目前領域的 system 訊息
pub fn ensure_started(transcript: &mut Vec<ChatMessage>, domain: Domain) {
    if transcript.is_empty() {
        transcript.push(ChatMessage::system(domain.system_prompt()));
    }
}

pub fn reset(transcript: &mut Vec<ChatMessage>, domain: Domain) {
    transcript.clear();
    transcript.push(ChatMessage::system(domain.system_prompt()));
}

/// 顯示用的歷史紀錄（略過 system 訊息）
pub fn history(transcript: &[ChatMessage]) -> impl Iterator<Item = &ChatMessage> {
    transcript.iter().filter(|m| m.role != Role::System)
}

/// 送出一輪對話並串流回覆；串流正常結束後才把這一輪寫入紀錄
pub async fn send_turn(
    provider: &dyn ChatProvider,
    transcript: &mut Vec<ChatMessage>,
    settings: &ChatSettings,
    prompt: &str,
    on_fragment: &mut (dyn for<'f> FnMut(&'f str) + Send),
) -> Result<String> {
    ensure_started(transcript, settings.domain);

    let mut messages = transcript.clone();
    messages.push(ChatMessage::user(prompt));

    let request = ChatRequest {
        model: settings.model.clone(),
        messages,
        temperature: settings.temperature,
    };

    tracing::info!(
        "💬 Sending chat turn ({} messages, model {})",
        request.messages.len(),
        request.model
    );
    let reply = provider.stream(&request, on_fragment).await?;

    transcript.push(ChatMessage::user(prompt));
    transcript.push(ChatMessage::assistant(reply.clone()));
    Ok(reply)
}
