pub mod aggregate;
pub mod chat;
pub mod filter;
pub mod overview;
pub mod report;
pub mod resolver;
pub mod section;
pub mod triage;

pub use crate::domain::model::{Record, RecordSet};
pub use crate::domain::ports::{ChatProvider, TableSource};
pub use crate::utils::error::Result;
