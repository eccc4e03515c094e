pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{OpenAiClient, SqliteSource};
pub use app::Shell;
pub use config::{DashboardConfig, TableNames};
pub use utils::error::{DashError, Result};
