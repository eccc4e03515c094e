use anyhow::Context;
use clap::Parser;
use opsdash::utils::error::ErrorSeverity;
use opsdash::utils::{logger, validation::Validate};
use opsdash::{CliConfig, Shell};
use std::io::BufReader;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting opsdash");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    // 載入並驗證配置
    let config = match cli
        .load_dashboard_config()
        .and_then(|config| config.validate().map(|_| config))
    {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(
                "❌ Configuration failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                ErrorSeverity::Low | ErrorSeverity::High => 1,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::Critical => 3,
            };
            std::process::exit(exit_code);
        }
    };

    tracing::info!("📁 Database: {}", config.database.path);
    let mut out = std::io::stdout();

    match &cli.script {
        Some(path) => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("Cannot open script {}", path.display()))?;
            let mut shell = Shell::new(config);
            shell.run(BufReader::new(file), &mut out).await?;
        }
        None => {
            let mut shell = Shell::new(config).interactive(true);
            shell.run(std::io::stdin().lock(), &mut out).await?;
        }
    }

    Ok(())
}
