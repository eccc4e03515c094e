use crate::utils::error::{DashError, ErrorCategory, Result};

/// 頁面上獨立的一個區塊；單一區塊失敗不影響其他區塊
#[derive(Debug, Clone, PartialEq)]
pub enum Section<T> {
    Ready(T),
    /// 缺表或缺欄：顯示提示訊息
    Unavailable(String),
    /// 查詢失敗：顯示警告與底層錯誤
    Failed(String),
}

impl<T> Section<T> {
    pub fn from_result(name: &str, result: Result<T>) -> Self {
        match result {
            Ok(value) => Section::Ready(value),
            Err(e) => Self::from_error(name, &e),
        }
    }

    pub fn from_error(name: &str, error: &DashError) -> Self {
        match error.category() {
            ErrorCategory::Schema => {
                tracing::debug!("{} unavailable: {}", name, error);
                Section::Unavailable(error.user_friendly_message())
            }
            _ => {
                tracing::warn!("⚠️ Could not load {}: {}", name, error);
                Section::Failed(format!("Could not load {}: {}", name, error))
            }
        }
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Section::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Section::Ready(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_errors_become_placeholders() {
        let section: Section<usize> = Section::from_result(
            "severity chart",
            Err(DashError::MissingColumn {
                table: "cyber_incidents".to_string(),
                role: "Severity".to_string(),
            }),
        );
        assert_eq!(
            section,
            Section::Unavailable(
                "Severity data not available in cyber_incidents (no column detected).".to_string()
            )
        );
    }

    #[test]
    fn test_query_failures_become_warnings() {
        let section: Section<usize> = Section::from_result(
            "recent incidents",
            Err(DashError::QueryFailure(rusqlite::Error::InvalidQuery)),
        );
        match section {
            Section::Failed(msg) => assert!(msg.starts_with("Could not load recent incidents")),
            other => panic!("unexpected section: {:?}", other),
        }
    }
}
