#![allow(dead_code)]

use async_trait::async_trait;
use pgdatadiff::core::{DatabaseSession, Outcome, StatusSink};
use pgdatadiff::domain::model::{ChunkDigest, KeyColumn};
use pgdatadiff::domain::ports::{StatusHandle, Tone};
use pgdatadiff::{DiffError, Result};
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
pub struct FakeTable {
    pub keys: Vec<KeyColumn>,
    /// (primary key, row payload)
    pub rows: Vec<(Vec<i64>, String)>,
}

impl FakeTable {
    pub fn with_id_rows(count: i64) -> Self {
        let rows = (1..=count).map(|i| (vec![i], format!("row-{}", i))).collect();
        Self {
            keys: vec![KeyColumn::new("id", "integer")],
            rows,
        }
    }

    pub fn without_key(count: i64) -> Self {
        Self {
            keys: Vec::new(),
            ..Self::with_id_rows(count)
        }
    }
}

/// In-memory stand-in for a PostgreSQL database.
#[derive(Default)]
pub struct FakeSession {
    pub tables: HashMap<String, FakeTable>,
    pub sequences: HashMap<String, i64>,
    pub chunk_calls: AtomicU32,
    /// Number of upcoming calls that fail with a transient error.
    pub transient_failures: AtomicU32,
    /// Tables and sequences whose reads fail with a permanent error.
    pub broken: HashSet<String>,
}

impl FakeSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(mut self, name: &str, table: FakeTable) -> Self {
        self.tables.insert(name.to_string(), table);
        self
    }

    pub fn sequence(mut self, name: &str, value: i64) -> Self {
        self.sequences.insert(name.to_string(), value);
        self
    }

    pub fn failing(self, times: u32) -> Self {
        self.transient_failures.store(times, Ordering::SeqCst);
        self
    }

    pub fn broken(mut self, name: &str) -> Self {
        self.broken.insert(name.to_string());
        self
    }

    pub fn chunk_calls(&self) -> u32 {
        self.chunk_calls.load(Ordering::SeqCst)
    }

    fn maybe_fail(&self) -> Result<()> {
        let remaining = self.transient_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.transient_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(DiffError::IoError(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            )));
        }
        Ok(())
    }

    fn check_access(&self, name: &str) -> Result<()> {
        if self.broken.contains(name) {
            return Err(DiffError::ConfigError {
                message: format!("permission denied for {}", name),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl DatabaseSession for FakeSession {
    async fn list_tables(&self, _schema: &str) -> Result<Vec<String>> {
        self.maybe_fail()?;
        Ok(self.tables.keys().cloned().collect())
    }

    async fn list_sequences(&self, _schema: &str) -> Result<Vec<String>> {
        self.maybe_fail()?;
        Ok(self.sequences.keys().cloned().collect())
    }

    async fn table_exists(&self, _schema: &str, table: &str) -> Result<bool> {
        self.maybe_fail()?;
        self.check_access(table)?;
        Ok(self.tables.contains_key(table))
    }

    async fn primary_key(&self, _schema: &str, table: &str) -> Result<Vec<KeyColumn>> {
        self.maybe_fail()?;
        Ok(self.tables.get(table).map(|t| t.keys.clone()).unwrap_or_default())
    }

    async fn count_rows(&self, _schema: &str, table: &str) -> Result<i64> {
        self.maybe_fail()?;
        Ok(self.tables.get(table).map(|t| t.rows.len() as i64).unwrap_or(0))
    }

    async fn hash_chunk(
        &self,
        _schema: &str,
        table: &str,
        _keys: &[KeyColumn],
        offset: Option<&[String]>,
        limit: usize,
    ) -> Result<ChunkDigest> {
        self.maybe_fail()?;
        self.chunk_calls.fetch_add(1, Ordering::SeqCst);

        let mut rows = self.tables.get(table).map(|t| t.rows.clone()).unwrap_or_default();
        rows.sort();

        let after: Option<Vec<i64>> =
            offset.map(|values| values.iter().map(|v| v.parse().unwrap()).collect());
        let page: Vec<_> = rows
            .into_iter()
            .filter(|(key, _)| after.as_ref().map_or(true, |a| key > a))
            .take(limit)
            .collect();

        if page.is_empty() {
            return Ok(ChunkDigest::default());
        }

        let mut hasher = DefaultHasher::new();
        page.hash(&mut hasher);
        let last = &page[page.len() - 1].0;

        Ok(ChunkDigest {
            hash: Some(format!("{:016x}", hasher.finish())),
            row_count: page.len() as i64,
            last_key: last.iter().map(|v| Some(v.to_string())).collect(),
        })
    }

    async fn sequence_last_value(&self, _schema: &str, sequence: &str) -> Result<Option<i64>> {
        self.maybe_fail()?;
        self.check_access(sequence)?;
        Ok(self.sequences.get(sequence).copied())
    }
}

/// Captures status output as text lines.
#[derive(Clone, Default)]
pub struct RecordingStatus {
    pub lines: Arc<Mutex<Vec<String>>>,
}

impl RecordingStatus {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl StatusSink for RecordingStatus {
    fn heading(&self, text: &str, _tone: Tone) {
        self.lines.lock().unwrap().push(text.to_string());
    }

    fn begin(&self, title: &str) -> Box<dyn StatusHandle> {
        self.lines.lock().unwrap().push(title.to_string());
        Box::new(RecordingHandle {
            lines: self.lines.clone(),
        })
    }
}

struct RecordingHandle {
    lines: Arc<Mutex<Vec<String>>>,
}

impl StatusHandle for RecordingHandle {
    fn complete(self: Box<Self>, outcome: Outcome, message: &str) {
        self.lines
            .lock()
            .unwrap()
            .push(format!("{:?}: {}", outcome, message));
    }
}
