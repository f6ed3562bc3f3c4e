use crate::domain::model::{ChunkDigest, KeyColumn, Outcome};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Read-only access to one of the two databases being compared.
#[async_trait]
pub trait DatabaseSession: Send + Sync {
    /// Base tables of `schema`, in catalog order.
    async fn list_tables(&self, schema: &str) -> Result<Vec<String>>;

    async fn list_sequences(&self, schema: &str) -> Result<Vec<String>>;

    async fn table_exists(&self, schema: &str, table: &str) -> Result<bool>;

    /// Primary key columns in key order; empty when the table has none.
    async fn primary_key(&self, schema: &str, table: &str) -> Result<Vec<KeyColumn>>;

    async fn count_rows(&self, schema: &str, table: &str) -> Result<i64>;

    /// Digest of at most `limit` rows with a key strictly greater than `offset`.
    async fn hash_chunk(
        &self,
        schema: &str,
        table: &str,
        keys: &[KeyColumn],
        offset: Option<&[String]>,
        limit: usize,
    ) -> Result<ChunkDigest>;

    /// `last_value` of the sequence, or `None` when it does not exist.
    async fn sequence_last_value(&self, schema: &str, sequence: &str) -> Result<Option<i64>>;
}

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Start,
    Complete,
}

/// Where per-item progress goes: a spinner on a terminal, plain lines otherwise.
pub trait StatusSink: Send + Sync {
    fn heading(&self, text: &str, tone: Tone);
    fn begin(&self, title: &str) -> Box<dyn StatusHandle>;
}

pub trait StatusHandle: Send {
    fn complete(self: Box<Self>, outcome: Outcome, message: &str);
}
