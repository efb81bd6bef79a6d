use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use sqlx::Row;
use std::time::Duration;
use tracing::{debug, info};

use super::errors::{SourceError, SourceResult};
use super::log_source::with_deadline;
use crate::config::DatabaseConfig;

/// Pool checkout timeout; query execution has its own deadline in the log source
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// The loop is sequential, so a couple of connections is plenty
const MAX_CONNECTIONS: u32 = 2;

pub struct DatabaseConnection {
    pool: MySqlPool,
    query_timeout: Duration,
}

impl DatabaseConnection {
    /// Connect eagerly so bad credentials fail at startup
    pub async fn connect(config: &DatabaseConfig) -> SourceResult<Self> {
        info!(
            "Connecting to MySQL on {}:{} as user {} and database name {}",
            config.host, config.port, config.user, config.database
        );

        let pool = MySqlPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .test_before_acquire(true)
            .connect_with(config.connect_options())
            .await
            .map_err(|e| SourceError::from_sqlx("connect", e))?;

        debug!("Connected to MySQL");
        Ok(Self {
            pool,
            query_timeout: config.query_timeout,
        })
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    pub async fn health_check(&self) -> SourceResult<bool> {
        let query = sqlx::query("SELECT 1 AS health").fetch_one(&self.pool);
        let row = with_deadline("health_check", self.query_timeout, query).await?;

        let health: i64 = row
            .try_get("health")
            .map_err(|e| SourceError::from_sqlx("health_check", e))?;
        Ok(health == 1)
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}
