use crate::core::resolver::{ColumnMap, ColumnRole};
use crate::domain::message::{ChatMessage, ChatRequest};
use crate::domain::model::{display_text, RecordSet};
use crate::utils::error::{DashError, Result};

pub const TRIAGE_SYSTEM_PROMPT: &str = "You are an IT Operations assistant.\n\
You help triage tickets, identify patterns, and recommend practical actions.\n\
Be concise and actionable. Use bullet points.\n\
If data is missing, say what’s missing.\n";

pub const DEFAULT_TRIAGE_QUESTION: &str = "Summarise the main issues in these tickets and recommend the top 5 actions. \
Prioritise urgent/high priority items. Use bullet points.";

pub const DEFAULT_TRIAGE_TEMPERATURE: f32 = 0.4;

/// 送給模型的欄位順序
const CONTEXT_ROLES: [ColumnRole; 9] = [
    ColumnRole::TicketId,
    ColumnRole::Priority,
    ColumnRole::Status,
    ColumnRole::Category,
    ColumnRole::Subject,
    ColumnRole::Description,
    ColumnRole::CreatedAt,
    ColumnRole::ResolvedAt,
    ColumnRole::AssignedTo,
];

/// 兩段式（system + user）的分流請求內容
#[derive(Debug, Clone, PartialEq)]
pub struct TriageRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub context_csv: String,
    pub rows_sent: usize,
}

impl TriageRequest {
    pub fn into_chat_request(self, model: &str, temperature: f32) -> ChatRequest {
        ChatRequest {
            model: model.to_string(),
            messages: vec![
                ChatMessage::system(self.system_prompt),
                ChatMessage::user(self.user_prompt),
            ],
            temperature,
        }
    }
}

/// 取前 `max_rows` 筆、只保留已解析欄位，序列化成 CSV 後填入提示模板
pub fn build_request(
    filtered: &RecordSet,
    columns: &ColumnMap,
    max_rows: usize,
    question: &str,
) -> Result<TriageRequest> {
    let sample = filtered.head(max_rows);
    let roles: Vec<ColumnRole> = CONTEXT_ROLES
        .iter()
        .copied()
        .filter(|role| columns.is_resolved(*role))
        .collect();

    // 沒有任何可辨識欄位時整張表送出
    let context_csv = if roles.is_empty() {
        to_csv(&sample)?
    } else {
        role_csv(&sample, columns, &roles)?
    };
    tracing::debug!(
        "Triage context: {} rows, {} resolved columns",
        sample.len(),
        roles.len()
    );

    Ok(TriageRequest {
        system_prompt: TRIAGE_SYSTEM_PROMPT.to_string(),
        user_prompt: user_prompt(&context_csv, question),
        context_csv,
        rows_sent: sample.len(),
    })
}

fn user_prompt(context_csv: &str, question: &str) -> String {
    format!(
        "\nFiltered tickets (CSV):\n{}\n\nUser question:\n{}\n\nReturn:\n\
1) Summary of common issues\n\
2) Top priorities + why\n\
3) Recommended actions (step-by-step)\n\
4) Missing data that would help\n",
        context_csv, question
    )
}

pub fn to_csv(set: &RecordSet) -> Result<String> {
    let rows = set.iter().map(|record| {
        set.columns()
            .iter()
            .map(|c| record.get(c).and_then(display_text).unwrap_or_default())
            .collect::<Vec<_>>()
    });
    write_csv(set.columns(), rows)
}

/// 以邏輯欄位投影每一列；表頭仍是實際欄名
fn role_csv(set: &RecordSet, columns: &ColumnMap, roles: &[ColumnRole]) -> Result<String> {
    let header = columns.resolved_columns(roles);
    let rows = set.iter().map(|record| {
        let typed = columns.project(record);
        roles
            .iter()
            .map(|role| typed.text(*role).unwrap_or_default())
            .collect::<Vec<_>>()
    });
    write_csv(&header, rows)
}

fn write_csv<I>(header: &[String], rows: I) -> Result<String>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(header)?;
    for row in rows {
        writer.write_record(&row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| DashError::IoError(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| DashError::ProcessingError {
        message: format!("CSV output is not UTF-8: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Record;

    fn tickets(n: i64) -> RecordSet {
        RecordSet::from_records(
            (1..=n)
                .map(|i| {
                    Record::new()
                        .with("id", i)
                        .with("Subject", format!("VPN drops #{}", i))
                        .with("priority", if i % 2 == 0 { "High" } else { "Low" })
                        .with("internal_notes", "do not send")
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_build_request_sends_first_rows_with_resolved_columns() {
        let set = tickets(10);
        let columns = ColumnMap::detect(&set);
        let request = build_request(&set, &columns, 2, "What is failing?").unwrap();

        assert_eq!(request.rows_sent, 2);
        assert_eq!(
            request.context_csv,
            "id,priority,Subject\n1,Low,VPN drops #1\n2,High,VPN drops #2\n"
        );
        assert!(request
            .user_prompt
            .contains("Filtered tickets (CSV):\nid,priority,Subject\n1,Low,VPN drops #1\n2,High,VPN drops #2\n"));
        assert!(request
            .user_prompt
            .contains("VPN drops #2\n\n\nUser question:\nWhat is failing?\n"));
        assert!(request.user_prompt.contains("4) Missing data that would help"));
        assert!(!request.user_prompt.contains("internal_notes"));
        assert_eq!(request.system_prompt, TRIAGE_SYSTEM_PROMPT);
    }

    #[test]
    fn test_user_prompt_layout() {
        let prompt = user_prompt("id\n1\n", "Why?");
        assert_eq!(
            prompt,
            "\nFiltered tickets (CSV):\nid\n1\n\n\nUser question:\nWhy?\n\nReturn:\n\
1) Summary of common issues\n\
2) Top priorities + why\n\
3) Recommended actions (step-by-step)\n\
4) Missing data that would help\n"
        );
        assert!(TRIAGE_SYSTEM_PROMPT.ends_with("say what’s missing.\n"));
    }

    #[test]
    fn test_context_rows_follow_role_order_with_blank_nulls() {
        let set = RecordSet::from_records(vec![
            Record::new()
                .with("Owner", "ana")
                .with("STATE", "Open")
                .with("Ticket", 7),
            Record::new()
                .with("Owner", serde_json::Value::Null)
                .with("STATE", "Closed")
                .with("Ticket", 8),
        ])
        .unwrap();
        let columns = ColumnMap::detect(&set);
        let request = build_request(&set, &columns, 5, "q").unwrap();

        assert_eq!(request.context_csv, "Ticket,STATE,Owner\n7,Open,ana\n8,Closed,\n");
    }

    #[test]
    fn test_build_request_without_resolved_columns_sends_everything() {
        let set = RecordSet::from_records(vec![Record::new().with("foo", "a, b").with("bar", 1)])
            .unwrap();
        let columns = ColumnMap::detect(&set);
        let request = build_request(&set, &columns, 25, DEFAULT_TRIAGE_QUESTION).unwrap();

        assert_eq!(request.context_csv, "foo,bar\n\"a, b\",1\n");
    }

    #[test]
    fn test_build_request_on_empty_set() {
        let set = RecordSet::new(vec!["status".to_string()]);
        let columns = ColumnMap::detect(&set);
        let request = build_request(&set, &columns, 5, "anything").unwrap();

        assert_eq!(request.rows_sent, 0);
        assert_eq!(request.context_csv, "status\n");
    }

    #[test]
    fn test_into_chat_request_has_system_and_user() {
        let set = tickets(1);
        let columns = ColumnMap::detect(&set);
        let chat = build_request(&set, &columns, 5, "q")
            .unwrap()
            .into_chat_request("gpt-4o-mini", DEFAULT_TRIAGE_TEMPERATURE);

        assert_eq!(chat.messages.len(), 2);
        assert_eq!(chat.messages[0].role, crate::domain::message::Role::System);
        assert_eq!(chat.messages[1].role, crate::domain::message::Role::User);
        assert_eq!(chat.temperature, 0.4);
    }
}
