pub mod engine;
pub mod sequence_diff;
pub mod sql;
pub mod table_diff;

pub use crate::domain::model::{DiffReport, DiffResult, ItemKind, ItemReport, Outcome};
pub use crate::domain::ports::{DatabaseSession, StatusSink, Storage};
pub use crate::utils::error::Result;

use crate::utils::retry::RetryPolicy;

pub const DEFAULT_CHUNK_SIZE: usize = 10000;
pub const DEFAULT_SCHEMA: &str = "public";

/// What to compare and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffOptions {
    pub schema: String,
    pub chunk_size: usize,
    pub count_only: bool,
    pub only_data: bool,
    pub only_sequences: bool,
    pub exclude_tables: Vec<String>,
    pub retry: RetryPolicy,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            schema: DEFAULT_SCHEMA.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            count_only: false,
            only_data: false,
            only_sequences: false,
            exclude_tables: Vec::new(),
            retry: RetryPolicy::default(),
        }
    }
}

impl DiffOptions {
    pub fn compares_tables(&self) -> bool {
        !self.only_sequences
    }

    pub fn compares_sequences(&self) -> bool {
        !self.only_data
    }
}
