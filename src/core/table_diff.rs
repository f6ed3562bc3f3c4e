use crate::core::DiffOptions;
use crate::domain::model::{ChunkCursor, ChunkDigest, DiffResult, ItemKind, ItemReport, Outcome};
use crate::domain::ports::{DatabaseSession, StatusSink, Tone};
use crate::utils::error::Result;
use crate::utils::retry::retry;

pub const MSG_TABLE_MISSING: &str = "table is missing";
pub const MSG_TABLES_EMPTY: &str = "tables are empty";
pub const MSG_COUNTS_SAME: &str = "Counts are the same";
pub const MSG_NO_PRIMARY_KEY: &str = "no primary key(s) on this table. Comparison is not possible.";
pub const MSG_DATA_IDENTICAL: &str = "data is identical.";

/// Compares table contents between two sessions.
pub struct TableDiffer<'a, F: DatabaseSession, S: DatabaseSession> {
    first: &'a F,
    second: &'a S,
    options: &'a DiffOptions,
}

impl<'a, F: DatabaseSession, S: DatabaseSession> TableDiffer<'a, F, S> {
    pub fn new(first: &'a F, second: &'a S, options: &'a DiffOptions) -> Self {
        Self {
            first,
            second,
            options,
        }
    }

    pub async fn diff_table(&self, table: &str) -> Result<DiffResult> {
        if self.options.count_only {
            self.diff_counts(table).await
        } else {
            self.diff_data(table).await
        }
    }

    async fn diff_counts(&self, table: &str) -> Result<DiffResult> {
        let schema = self.options.schema.as_str();
        let policy = &self.options.retry;

        let first_exists = retry(policy, "table lookup", || self.first.table_exists(schema, table)).await?;
        let second_exists = retry(policy, "table lookup", || self.second.table_exists(schema, table)).await?;
        if !first_exists || !second_exists {
            return Ok(DiffResult::different(MSG_TABLE_MISSING));
        }

        let first_count = retry(policy, "row count", || self.first.count_rows(schema, table)).await?;
        let second_count = retry(policy, "row count", || self.second.count_rows(schema, table)).await?;

        if first_count != second_count {
            return Ok(DiffResult::different(format!(
                "counts are different {} != {}",
                first_count, second_count
            )));
        }
        if first_count == 0 {
            return Ok(DiffResult::inconclusive(MSG_TABLES_EMPTY));
        }
        Ok(DiffResult::identical(MSG_COUNTS_SAME))
    }

    async fn diff_data(&self, table: &str) -> Result<DiffResult> {
        let schema = self.options.schema.as_str();
        let policy = &self.options.retry;
        let chunk_size = self.options.chunk_size;

        let second_exists = retry(policy, "table lookup", || self.second.table_exists(schema, table)).await?;
        if !second_exists {
            return Ok(DiffResult::different(MSG_TABLE_MISSING));
        }

        let keys = retry(policy, "primary key lookup", || self.first.primary_key(schema, table)).await?;
        if keys.is_empty() {
            return Ok(DiffResult::inconclusive(MSG_NO_PRIMARY_KEY));
        }

        let mut cursor = ChunkCursor::default();
        loop {
            let offset = cursor.offset.as_deref();
            let first_chunk = retry(policy, "chunk hash", || {
                self.first.hash_chunk(schema, table, &keys, offset, chunk_size)
            })
            .await?;
            let second_chunk = retry(policy, "chunk hash", || {
                self.second.hash_chunk(schema, table, &keys, offset, chunk_size)
            })
            .await?;

            if let Some(mismatch) = compare_chunks(&first_chunk, &second_chunk) {
                return Ok(DiffResult::different(format!(
                    "{} at row {}; offsets: {}",
                    mismatch,
                    cursor.position,
                    cursor.describe(&keys)
                )));
            }

            tracing::debug!(
                table,
                position = cursor.position,
                rows = first_chunk.row_count,
                "chunk matches"
            );

            if first_chunk.is_empty() || (first_chunk.row_count as u64) < chunk_size as u64 {
                return Ok(DiffResult::identical(MSG_DATA_IDENTICAL));
            }

            let next: Option<Vec<String>> = first_chunk.last_key.into_iter().collect();
            match next {
                Some(values) => {
                    cursor.position += chunk_size as u64;
                    cursor.offset = Some(values);
                }
                None => {
                    return Ok(DiffResult::inconclusive(format!(
                        "NULL primary key value at row {}",
                        cursor.position
                    )));
                }
            }
        }
    }

    /// Diffs every table of the first database's schema, in name order.
    pub async fn diff_all_tables(&self, status: &dyn StatusSink) -> Result<Vec<ItemReport>> {
        status.heading("Starting table analysis.", Tone::Start);

        let schema = self.options.schema.as_str();
        let mut tables = retry(&self.options.retry, "table listing", || self.first.list_tables(schema)).await?;
        tables.retain(|t| !self.options.exclude_tables.iter().any(|e| e == t));
        tables.sort();

        let total = tables.len();
        let mut reports = Vec::with_capacity(total);
        for (index, table) in tables.iter().enumerate() {
            let handle = status.begin(&format!("Analysing table {}. [{}/{}]", table, index + 1, total));
            let result = match self.diff_table(table).await {
                Ok(result) => result,
                Err(e) if !e.is_transient() => {
                    tracing::error!("table {} could not be compared: {}", table, e);
                    DiffResult::different(format!("comparison failed: {}", e))
                }
                Err(e) => {
                    handle.complete(Outcome::Different, &format!("{} - {}", table, e));
                    return Err(e);
                }
            };
            handle.complete(result.outcome, &format!("{} - {}", table, result.message));
            reports.push(ItemReport::new(ItemKind::Table, table.clone(), result));
        }

        status.heading("Table analysis complete.", Tone::Complete);
        Ok(reports)
    }
}

/// First mismatch between two pages, checked in the order: row count, hash, last key.
fn compare_chunks(first: &ChunkDigest, second: &ChunkDigest) -> Option<&'static str> {
    if first.row_count != second.row_count {
        return Some("row count mismatch");
    }
    if first.hash != second.hash {
        return Some("data hash are different");
    }
    if first.last_key != second.last_key {
        return Some("data pks are different");
    }
    None
}
