use crate::core::overview::OverviewOptions;
use crate::core::report::ReportOptions;
use crate::utils::error::{DashError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub tables: TableNames,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub ai: AiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "data/intelligence_platform.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableNames {
    pub users: String,
    pub incidents: String,
    pub datasets: String,
    pub tickets: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            users: "users".to_string(),
            incidents: "cyber_incidents".to_string(),
            datasets: "datasets_metadata".to_string(),
            tickets: "it_tickets".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub preview_rows: usize,
    pub recent_incidents: usize,
    pub dataset_preview: usize,
    pub ticket_preview: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        let overview = OverviewOptions::default();
        Self {
            preview_rows: ReportOptions::default().preview_rows,
            recent_incidents: overview.recent_incidents,
            dataset_preview: overview.dataset_preview,
            ticket_preview: overview.ticket_preview,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub models: Vec<String>,
    pub default_model: Option<String>,
    pub triage_temperature: f32,
    pub chat_temperature: f32,
    pub max_rows: usize,
    pub timeout_seconds: Option<u64>,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            api_key: None,
            models: vec!["gpt-4o-mini".to_string(), "gpt-4o".to_string()],
            default_model: None,
            triage_temperature: 0.4,
            chat_temperature: 0.7,
            max_rows: 25,
            timeout_seconds: None,
        }
    }
}

impl AiConfig {
    /// 未指定預設模型時使用清單第一個
    pub fn model(&self) -> Option<&str> {
        self.default_model
            .as_deref()
            .or_else(|| self.models.first().map(String::as_str))
    }

    pub fn is_known_model(&self, model: &str) -> bool {
        self.models.iter().any(|m| m == model)
    }

    /// 設定檔優先，其次是環境變數；未替換的 ${VAR} 視為未設定
    pub fn resolve_api_key(&self) -> Result<String> {
        self.resolve_api_key_with(|name| std::env::var(name).ok())
    }

    /// 以 `lookup` 取代環境變數查詢
    pub fn resolve_api_key_with<F>(&self, lookup: F) -> Result<String>
    where
        F: FnOnce(&str) -> Option<String>,
    {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty() && !k.starts_with("${"))
            .map(str::to_string)
            .or_else(|| lookup(API_KEY_VAR).filter(|k| !k.trim().is_empty()))
            .ok_or_else(|| DashError::MissingCredential {
                name: API_KEY_VAR.to_string(),
            })
    }
}

impl DashboardConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(DashError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 檔案不存在時使用預設值
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            tracing::info!(
                "📁 No config file at {}, using defaults",
                path.as_ref().display()
            );
            Ok(Self::default())
        }
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| DashError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${OPENAI_API_KEY})；未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| DashError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn report_options(&self) -> ReportOptions {
        ReportOptions {
            preview_rows: self.report.preview_rows,
        }
    }

    pub fn overview_options(&self) -> OverviewOptions {
        OverviewOptions {
            recent_incidents: self.report.recent_incidents,
            dataset_preview: self.report.dataset_preview,
            ticket_preview: self.report.ticket_preview,
        }
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_path("database.path", &self.database.path)?;

        validation::validate_identifier("tables.users", &self.tables.users)?;
        validation::validate_identifier("tables.incidents", &self.tables.incidents)?;
        validation::validate_identifier("tables.datasets", &self.tables.datasets)?;
        validation::validate_identifier("tables.tickets", &self.tables.tickets)?;

        validation::validate_positive_number("report.preview_rows", self.report.preview_rows, 1)?;
        validation::validate_positive_number(
            "report.recent_incidents",
            self.report.recent_incidents,
            1,
        )?;

        validation::validate_url("ai.endpoint", &self.ai.endpoint)?;
        for model in &self.ai.models {
            validation::validate_non_empty_string("ai.models", model)?;
        }
        let default_model = self.ai.model();
        let model = *validation::validate_required_field("ai.default_model", &default_model)?;
        if !self.ai.is_known_model(model) {
            return Err(DashError::InvalidConfigValueError {
                field: "ai.default_model".to_string(),
                value: model.to_string(),
                reason: format!("Not in ai.models ({})", self.ai.models.join(", ")),
            });
        }

        validation::validate_range("ai.triage_temperature", self.ai.triage_temperature, 0.0, 2.0)?;
        validation::validate_range("ai.chat_temperature", self.ai.chat_temperature, 0.0, 2.0)?;
        validation::validate_range("ai.max_rows", self.ai.max_rows, 1, 50)?;

        Ok(())
    }
}

impl Validate for DashboardConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
