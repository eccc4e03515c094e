use crate::domain::message::ChatMessage;
use crate::utils::error::{DashError, Result};
use std::collections::HashMap;

/// 單一使用者工作階段的狀態；登出時清空，不跨工作階段共用
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    logged_in: bool,
    username: String,
    pub transcript: Vec<ChatMessage>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// 頁面進入前的授權檢查
    pub fn require_login(&self) -> Result<&str> {
        if self.logged_in {
            Ok(&self.username)
        } else {
            Err(DashError::AuthError {
                message: "You must be logged in to view this page.".to_string(),
            })
        }
    }

    pub fn logout(&mut self) {
        self.logged_in = false;
        self.username.clear();
        self.transcript.clear();
    }

    fn start(&mut self, username: &str) {
        self.logged_in = true;
        self.username = username.to_string();
        self.transcript.clear();
    }
}

/// 記憶體內的帳號表（明文、不持久化）
#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    users: HashMap<String, String>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, username: &str, password: &str, confirm: &str) -> Result<()> {
        if username.is_empty() || password.is_empty() {
            return Err(DashError::ValidationError {
                message: "Please fill in all fields.".to_string(),
            });
        }
        if password != confirm {
            return Err(DashError::ValidationError {
                message: "Passwords do not match.".to_string(),
            });
        }
        if self.users.contains_key(username) {
            return Err(DashError::ValidationError {
                message: "Username already exists. Choose another one.".to_string(),
            });
        }

        self.users.insert(username.to_string(), password.to_string());
        tracing::info!("👤 Registered user '{}'", username);
        Ok(())
    }

    pub fn login(&self, session: &mut SessionContext, username: &str, password: &str) -> Result<()> {
        match self.users.get(username) {
            Some(stored) if stored == password => {
                session.start(username);
                tracing::info!("🔓 '{}' logged in", username);
                Ok(())
            }
            _ => {
                tracing::warn!("🔒 Failed login attempt for '{}'", username);
                Err(DashError::AuthError {
                    message: "Invalid username or password.".to_string(),
                })
            }
        }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_validations() {
        let mut users = UserDirectory::new();
        assert!(users.register("", "pw", "pw").is_err());
        assert!(users.register("ana", "pw", "other").is_err());
        assert!(users.register("ana", "pw", "pw").is_ok());

        let err = users.register("ana", "pw2", "pw2").unwrap_err();
        assert_eq!(
            err.user_friendly_message(),
            "Username already exists. Choose another one."
        );
        assert_eq!(users.len(), 1);
    }

    #[test]
    fn test_login_and_logout() {
        let mut users = UserDirectory::new();
        users.register("ana", "secret", "secret").unwrap();

        let mut session = SessionContext::new();
        assert!(session.require_login().is_err());

        assert!(users.login(&mut session, "ana", "wrong").is_err());
        assert!(!session.is_logged_in());

        users.login(&mut session, "ana", "secret").unwrap();
        assert_eq!(session.require_login().unwrap(), "ana");

        session.transcript.push(ChatMessage::user("hi"));
        session.logout();
        assert!(!session.is_logged_in());
        assert_eq!(session.username(), "");
        assert!(session.transcript.is_empty());
    }
}
