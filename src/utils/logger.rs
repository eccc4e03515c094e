use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// RUST_LOG 優先；未設定時其他 crate 只顯示 warn 以上
fn env_filter(verbose: bool) -> EnvFilter {
    let default = if verbose {
        "opsdash=debug,warn"
    } else {
        "opsdash=info,warn"
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// 終端機格式。日誌寫到 stderr，頁面輸出獨佔 stdout
pub fn init_cli_logger(verbose: bool) {
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    if tracing_subscriber::registry()
        .with(env_filter(verbose))
        .with(layer)
        .try_init()
        .is_err()
    {
        tracing::debug!("Logger already initialised");
    }
}

/// 腳本模式給收集器用的 JSON 行
pub fn init_json_logger(verbose: bool) {
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .json()
        .with_current_span(false);

    if tracing_subscriber::registry()
        .with(env_filter(verbose))
        .with(layer)
        .try_init()
        .is_err()
    {
        tracing::debug!("Logger already initialised");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_ignored() {
        init_cli_logger(false);
        init_json_logger(true);
        tracing::info!("still logging");
    }
}
