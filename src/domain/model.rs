use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of comparing one table or sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Identical,
    Different,
    /// Comparison was not possible, or the difference is only a warning.
    Inconclusive,
}

impl Outcome {
    pub fn is_failure(self) -> bool {
        self == Outcome::Different
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffResult {
    pub outcome: Outcome,
    pub message: String,
}

impl DiffResult {
    pub fn identical(message: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Identical,
            message: message.into(),
        }
    }

    pub fn different(message: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Different,
            message: message.into(),
        }
    }

    pub fn inconclusive(message: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Inconclusive,
            message: message.into(),
        }
    }
}

/// A primary key column and its SQL type as printed by `format_type`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyColumn {
    pub name: String,
    pub data_type: String,
}

impl KeyColumn {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// Digest of one page of rows ordered by primary key.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChunkDigest {
    /// `None` when the page is empty.
    pub hash: Option<String>,
    pub row_count: i64,
    /// Primary key of the last row in the page, rendered as text.
    pub last_key: Vec<Option<String>>,
}

impl ChunkDigest {
    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }
}

/// Pagination state while walking a table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChunkCursor {
    pub position: u64,
    pub offset: Option<Vec<String>>,
}

impl ChunkCursor {
    /// Renders the offset as `{k1: v1, k2: v2}`, or `None` before the first page.
    pub fn describe(&self, keys: &[KeyColumn]) -> String {
        match &self.offset {
            None => "None".to_string(),
            Some(values) => {
                let pairs: Vec<String> = keys
                    .iter()
                    .zip(values)
                    .map(|(k, v)| format!("{}: {}", k.name, v))
                    .collect();
                format!("{{{}}}", pairs.join(", "))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Table,
    Sequence,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::Table => write!(f, "table"),
            ItemKind::Sequence => write!(f, "sequence"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemReport {
    pub kind: ItemKind,
    pub name: String,
    pub outcome: Outcome,
    pub message: String,
}

impl ItemReport {
    pub fn new(kind: ItemKind, name: impl Into<String>, result: DiffResult) -> Self {
        Self {
            kind,
            name: name.into(),
            outcome: result.outcome,
            message: result.message,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Connection strings with passwords masked.
    pub first: String,
    pub second: String,
    pub items: Vec<ItemReport>,
    pub failures: usize,
    /// Set when the sequence phase was skipped because tables differed.
    pub sequences_skipped: bool,
}

impl DiffReport {
    pub fn failures_of(&self, kind: ItemKind) -> usize {
        self.items
            .iter()
            .filter(|i| i.kind == kind && i.outcome.is_failure())
            .count()
    }

    pub fn exit_code(&self) -> i32 {
        if self.failures > 0 {
            1
        } else {
            0
        }
    }
}
