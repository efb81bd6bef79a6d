//! # Log Row Source
//!
//! Ordered range queries against the ZoneMinder log table.
//!
//! Every query orders by id ascending. The poll controller depends on that to
//! advance the checkpoint to the last row of a batch without ever skipping an
//! earlier row.

use async_trait::async_trait;
use sqlx::mysql::MySqlPool;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use super::errors::{SourceError, SourceResult};
use crate::config::loader::is_sql_identifier;
use crate::models::LogRecord;

/// Read-side seam over the log table
#[async_trait]
pub trait RowSource: Send + Sync {
    /// Rows with `id > after_id`, id ascending, at most `limit`
    async fn fetch_after(&self, after_id: u64, limit: u32) -> SourceResult<Vec<LogRecord>>;

    /// Rows with `time_key >= threshold` and `id > after_id`, id ascending,
    /// at most `limit`. `threshold` is Unix seconds.
    async fn fetch_since(
        &self,
        threshold: i64,
        after_id: u64,
        limit: u32,
    ) -> SourceResult<Vec<LogRecord>>;

    /// Highest id in the table, `None` when empty
    async fn max_id(&self) -> SourceResult<Option<u64>>;

    /// Lowest id in the table, `None` when empty
    async fn min_id(&self) -> SourceResult<Option<u64>>;
}

/// MySQL implementation over a shared pool
#[derive(Debug, Clone)]
pub struct MySqlLogSource {
    pool: MySqlPool,
    table: String,
    query_timeout: Duration,
}

impl MySqlLogSource {
    pub fn new(
        pool: MySqlPool,
        table: impl Into<String>,
        query_timeout: Duration,
    ) -> SourceResult<Self> {
        let table = table.into();
        if !is_sql_identifier(&table) {
            return Err(SourceError::InvalidTable { table });
        }
        Ok(Self {
            pool,
            table,
            query_timeout,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    async fn fetch_rows(
        &self,
        operation: &str,
        sql: &str,
        binds: FetchBinds,
    ) -> SourceResult<Vec<LogRecord>> {
        debug!(operation, sql, "Executing log query");

        let query = sqlx::query_as::<_, LogRecord>(sql);
        let query = match binds {
            FetchBinds::After { after_id, limit } => query.bind(after_id).bind(limit),
            FetchBinds::Since {
                threshold,
                after_id,
                limit,
            } => query.bind(threshold).bind(after_id).bind(limit),
        };

        let rows = with_deadline(operation, self.query_timeout, query.fetch_all(&self.pool)).await?;

        debug!(operation, rows = rows.len(), "Log query returned");
        Ok(rows)
    }

    async fn fetch_bound(&self, operation: &str, aggregate: &str) -> SourceResult<Option<u64>> {
        let sql = bound_sql(&self.table, aggregate);
        debug!(operation, sql = %sql, "Executing bound query");

        let query = sqlx::query_scalar::<_, Option<u64>>(&sql).fetch_one(&self.pool);
        with_deadline(operation, self.query_timeout, query).await
    }
}

/// Await `query` for at most `limit`.
///
/// `acquire_timeout` only covers pool checkout; a server that stops answering
/// mid-query would otherwise stall the loop forever.
pub(crate) async fn with_deadline<T, F>(operation: &str, limit: Duration, query: F) -> SourceResult<T>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(limit, query).await {
        Ok(result) => result.map_err(|e| SourceError::from_sqlx(operation, e)),
        Err(_) => {
            warn!(operation, timeout_ms = limit.as_millis() as u64, "Log query timed out");
            Err(SourceError::timeout(operation, limit))
        }
    }
}

enum FetchBinds {
    After {
        after_id: u64,
        limit: u32,
    },
    Since {
        threshold: i64,
        after_id: u64,
        limit: u32,
    },
}

#[async_trait]
impl RowSource for MySqlLogSource {
    async fn fetch_after(&self, after_id: u64, limit: u32) -> SourceResult<Vec<LogRecord>> {
        let sql = fetch_after_sql(&self.table);
        self.fetch_rows("fetch_after", &sql, FetchBinds::After { after_id, limit })
            .await
    }

    async fn fetch_since(
        &self,
        threshold: i64,
        after_id: u64,
        limit: u32,
    ) -> SourceResult<Vec<LogRecord>> {
        let sql = fetch_since_sql(&self.table);
        self.fetch_rows(
            "fetch_since",
            &sql,
            FetchBinds::Since {
                threshold,
                after_id,
                limit,
            },
        )
        .await
    }

    async fn max_id(&self) -> SourceResult<Option<u64>> {
        self.fetch_bound("max_id", "MAX").await
    }

    async fn min_id(&self) -> SourceResult<Option<u64>> {
        self.fetch_bound("min_id", "MIN").await
    }
}

/// Select list shared by both range queries.
///
/// Integer columns are widened to BIGINT so decoding is independent of the
/// exact column widths in a given ZoneMinder schema version, and `TimeKey`
/// (DECIMAL) is coerced to DOUBLE by adding a float literal.
fn select_columns(table: &str) -> String {
    format!(
        "SELECT CAST(Id AS UNSIGNED) AS id, \
         (TimeKey + 0E0) AS time_key, \
         COALESCE(Component, '') AS component, \
         COALESCE(CAST(ServerId AS SIGNED), 0) AS server_id, \
         COALESCE(CAST(Pid AS SIGNED), 0) AS pid, \
         CAST(Level AS SIGNED) AS level, \
         COALESCE(File, '') AS file, \
         COALESCE(CAST(Line AS SIGNED), 0) AS line, \
         COALESCE(Message, '') AS message \
         FROM {table}"
    )
}

fn fetch_after_sql(table: &str) -> String {
    format!(
        "{} WHERE Id > ? ORDER BY Id ASC LIMIT ?",
        select_columns(table)
    )
}

fn fetch_since_sql(table: &str) -> String {
    format!(
        "{} WHERE TimeKey >= ? AND Id > ? ORDER BY Id ASC LIMIT ?",
        select_columns(table)
    )
}

fn bound_sql(table: &str, aggregate: &str) -> String {
    format!("SELECT CAST({aggregate}(Id) AS UNSIGNED) FROM {table}")
}
