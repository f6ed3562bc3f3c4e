use crate::core::sql;
use crate::domain::model::{ChunkDigest, KeyColumn};
use crate::domain::ports::DatabaseSession;
use crate::utils::error::{DiffError, Result};
use crate::utils::retry::{retry, RetryPolicy};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls};

/// Holds the live client and swaps in a new one once the old one is closed.
struct ClientSlot<C> {
    current: RwLock<Arc<C>>,
}

impl<C> ClientSlot<C> {
    fn new(client: C) -> Self {
        Self {
            current: RwLock::new(Arc::new(client)),
        }
    }

    async fn get<F, Fut>(&self, is_closed: impl Fn(&C) -> bool, reconnect: F) -> Result<Arc<C>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<C>>,
    {
        {
            let current = self.current.read().await;
            if !is_closed(&**current) {
                return Ok(Arc::clone(&current));
            }
        }

        let mut current = self.current.write().await;
        // another caller may have reconnected while we waited
        if is_closed(&**current) {
            *current = Arc::new(reconnect().await?);
        }
        Ok(Arc::clone(&current))
    }
}

/// `DatabaseSession` backed by a tokio-postgres connection that is reopened
/// when the server drops it, so retried queries run on a fresh connection.
pub struct PgSession {
    conn: String,
    client: ClientSlot<Client>,
    label: String,
}

impl PgSession {
    /// Connects and spawns the connection driver onto the runtime.
    pub async fn connect(conn: &str, label: &str) -> Result<Self> {
        let client = Self::open(conn, label).await?;
        tracing::debug!("Connected to {} database", label);
        Ok(Self {
            conn: conn.to_string(),
            client: ClientSlot::new(client),
            label: label.to_string(),
        })
    }

    pub async fn connect_with_retry(conn: &str, label: &str, policy: &RetryPolicy) -> Result<Self> {
        retry(policy, "connect", || Self::connect(conn, label)).await
    }

    async fn open(conn: &str, label: &str) -> Result<Client> {
        let (client, connection) = tokio_postgres::connect(conn, NoTls).await?;

        let driver_label = label.to_string();
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("{} database connection error: {}", driver_label, e);
            }
        });
        Ok(client)
    }

    async fn client(&self) -> Result<Arc<Client>> {
        let (conn, label) = (self.conn.as_str(), self.label.as_str());
        self.client
            .get(Client::is_closed, move || {
                tracing::warn!("{} database connection closed, reconnecting", label);
                Self::open(conn, label)
            })
            .await
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    async fn names(&self, query: &str, schema: &str) -> Result<Vec<String>> {
        let rows = self.client().await?.query(query, &[&schema]).await?;
        rows.iter()
            .map(|row| row.try_get::<_, String>(0).map_err(DiffError::from))
            .collect()
    }
}

#[async_trait]
impl DatabaseSession for PgSession {
    async fn list_tables(&self, schema: &str) -> Result<Vec<String>> {
        self.names(sql::LIST_TABLES_SQL, schema).await
    }

    async fn list_sequences(&self, schema: &str) -> Result<Vec<String>> {
        self.names(sql::LIST_SEQUENCES_SQL, schema).await
    }

    async fn table_exists(&self, schema: &str, table: &str) -> Result<bool> {
        let row = self
            .client()
            .await?
            .query_one(sql::TABLE_EXISTS_SQL, &[&schema, &table])
            .await?;
        Ok(row.try_get(0)?)
    }

    async fn primary_key(&self, schema: &str, table: &str) -> Result<Vec<KeyColumn>> {
        let rows = self
            .client()
            .await?
            .query(sql::PRIMARY_KEY_SQL, &[&schema, &table])
            .await?;

        let mut keys = Vec::with_capacity(rows.len());
        for row in rows {
            keys.push(KeyColumn {
                name: row.try_get(0)?,
                data_type: row.try_get(1)?,
            });
        }
        Ok(keys)
    }

    async fn count_rows(&self, schema: &str, table: &str) -> Result<i64> {
        let row = self
            .client()
            .await?
            .query_one(sql::count_query(schema, table).as_str(), &[])
            .await?;
        Ok(row.try_get(0)?)
    }

    async fn hash_chunk(
        &self,
        schema: &str,
        table: &str,
        keys: &[KeyColumn],
        offset: Option<&[String]>,
        limit: usize,
    ) -> Result<ChunkDigest> {
        let query = sql::chunk_hash_query(schema, table, keys, offset.is_some());
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let mut params: Vec<&(dyn ToSql + Sync)> = Vec::with_capacity(keys.len() + 1);
        if let Some(values) = offset {
            for value in values {
                params.push(value);
            }
        }
        params.push(&limit);

        let row = self.client().await?.query_one(query.as_str(), &params).await?;

        let mut last_key = Vec::with_capacity(keys.len());
        for index in 0..keys.len() {
            last_key.push(row.try_get::<_, Option<String>>(index + 2)?);
        }

        Ok(ChunkDigest {
            hash: row.try_get(0)?,
            row_count: row.try_get(1)?,
            last_key,
        })
    }

    async fn sequence_last_value(&self, schema: &str, sequence: &str) -> Result<Option<i64>> {
        let query = sql::sequence_value_query(schema, sequence);
        let client = self.client().await?;
        match client.query_one(query.as_str(), &[]).await {
            Ok(row) => Ok(Some(row.try_get(0)?)),
            Err(e) => {
                let err = DiffError::from(e);
                if err.is_undefined_object() {
                    tracing::debug!("sequence {} not found in {} database", sequence, self.label);
                    Ok(None)
                } else {
                    Err(err)
                }
            }
        }
    }
}
