use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashError {
    #[error("Table not found: {table}")]
    MissingTable { table: String },

    #[error("No {role} column detected in {table}")]
    MissingColumn { table: String, role: String },

    #[error("Query failed: {0}")]
    QueryFailure(#[from] rusqlite::Error),

    #[error("Missing credential: {name}")]
    MissingCredential { name: String },

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Provider returned HTTP {status}: {body}")]
    ProviderError { status: u16, body: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("{message}")]
    AuthError { message: String },
}

/// 錯誤分類，用於日誌與頁面區塊的降級判斷
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Schema,
    Storage,
    Credential,
    Network,
    Data,
    Configuration,
    Authentication,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl DashError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            DashError::MissingTable { .. } | DashError::MissingColumn { .. } => {
                ErrorCategory::Schema
            }
            DashError::QueryFailure(_) | DashError::IoError(_) => ErrorCategory::Storage,
            DashError::MissingCredential { .. } => ErrorCategory::Credential,
            DashError::ApiError(_) | DashError::ProviderError { .. } => ErrorCategory::Network,
            DashError::CsvError(_)
            | DashError::SerializationError(_)
            | DashError::ProcessingError { .. }
            | DashError::ValidationError { .. } => ErrorCategory::Data,
            DashError::ConfigError { .. }
            | DashError::InvalidConfigValueError { .. }
            | DashError::MissingConfigError { .. } => ErrorCategory::Configuration,
            DashError::AuthError { .. } => ErrorCategory::Authentication,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // 缺表或缺欄只會讓區塊顯示佔位訊息
            ErrorCategory::Schema => ErrorSeverity::Low,
            ErrorCategory::Credential | ErrorCategory::Authentication => ErrorSeverity::Medium,
            ErrorCategory::Network | ErrorCategory::Data => ErrorSeverity::Medium,
            ErrorCategory::Storage => ErrorSeverity::High,
            ErrorCategory::Configuration => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            DashError::MissingTable { table } => {
                format!("Load data into the '{}' table and refresh the page", table)
            }
            DashError::MissingColumn { role, .. } => {
                format!("Add a {} column to the table to enable this view", role)
            }
            DashError::QueryFailure(_) => {
                "Check that the database file exists and is a valid SQLite database".to_string()
            }
            DashError::MissingCredential { name } => format!(
                "Set {} in the environment or under [ai] api_key in the config file",
                name
            ),
            DashError::ApiError(_) => {
                "Check network connectivity and the [ai] endpoint setting".to_string()
            }
            DashError::ProviderError { status, .. } if *status == 401 => {
                "The API key was rejected; verify it is valid".to_string()
            }
            DashError::ProviderError { .. } => {
                "Try again later or switch to another model".to_string()
            }
            DashError::ConfigError { .. }
            | DashError::InvalidConfigValueError { .. }
            | DashError::MissingConfigError { .. } => {
                "Fix the configuration file and restart".to_string()
            }
            DashError::AuthError { .. } => "Log in or register an account first".to_string(),
            _ => "Check the logs for details".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            DashError::MissingTable { table } => format!("No {} table found.", table),
            DashError::MissingColumn { table, role } => {
                format!("{} data not available in {} (no column detected).", role, table)
            }
            DashError::QueryFailure(e) => format!("Could not read from the database: {}", e),
            DashError::MissingCredential { name } => {
                format!("Missing {}. Add it to the config file or environment.", name)
            }
            DashError::ApiError(_) | DashError::ProviderError { .. } => {
                format!("The AI request failed: {}", self)
            }
            DashError::AuthError { message } | DashError::ValidationError { message } => {
                message.clone()
            }
            _ => self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DashError>;
