pub mod toml_config;

pub use toml_config::{AiConfig, DashboardConfig, TableNames};

#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "opsdash")]
#[command(about = "Terminal operations dashboard for incidents, datasets and IT tickets")]
pub struct CliConfig {
    #[arg(long, default_value = "dashboard.toml", help = "TOML configuration file")]
    pub config: PathBuf,

    #[arg(long, help = "SQLite database path (overrides [database] path)")]
    pub database: Option<String>,

    #[arg(long, help = "Read shell commands from a file instead of stdin")]
    pub script: Option<PathBuf>,

    #[arg(long, help = "Default AI model (overrides [ai] default_model)")]
    pub model: Option<String>,

    #[arg(long, help = "Ticket rows sent to the AI assistant (overrides [ai] max_rows)")]
    pub max_rows: Option<usize>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// 讀取 TOML 配置並套用命令列覆寫值
    pub fn load_dashboard_config(&self) -> Result<DashboardConfig> {
        let mut config = DashboardConfig::load_or_default(&self.config)?;
        self.apply_overrides(&mut config);
        Ok(config)
    }

    pub fn apply_overrides(&self, config: &mut DashboardConfig) {
        if let Some(database) = &self.database {
            config.database.path = database.clone();
        }
        if let Some(model) = &self.model {
            config.ai.default_model = Some(model.clone());
        }
        if let Some(max_rows) = self.max_rows {
            config.ai.max_rows = max_rows;
        }
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;
    use crate::utils::validation::Validate;

    #[test]
    fn test_cli_overrides_toml_values() {
        let cli = CliConfig::parse_from([
            "opsdash",
            "--database",
            "/tmp/other.db",
            "--model",
            "gpt-4o",
            "--max-rows",
            "5",
        ]);

        let mut config = DashboardConfig::default();
        cli.apply_overrides(&mut config);

        assert_eq!(config.database.path, "/tmp/other.db");
        assert_eq!(config.ai.model(), Some("gpt-4o"));
        assert_eq!(config.ai.max_rows, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_max_rows_out_of_range_fails_validation() {
        let cli = CliConfig::parse_from(["opsdash", "--max-rows", "500"]);
        let mut config = DashboardConfig::default();
        cli.apply_overrides(&mut config);
        assert!(config.validate().is_err());
    }
}
