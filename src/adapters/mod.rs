// Adapters layer: concrete implementations of the domain ports (SQLite storage, HTTP chat provider)

pub mod openai;
pub mod sqlite;

pub use openai::OpenAiClient;
pub use sqlite::SqliteSource;
