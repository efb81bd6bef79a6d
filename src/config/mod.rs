//! # Shipper Configuration
//!
//! Typed configuration for the three collaborators of the pipeline: the MySQL
//! log table, the Loki push endpoint, and the poll loop itself.
//!
//! Values are layered by [`loader::ConfigLoader`] from built-in defaults, an
//! optional TOML file and the process environment. The environment variable
//! names match the historical deployment (`ZM_DB_HOST`, `LOKI_URL`,
//! `POLL_SECONDS`, ...), so existing container definitions keep working.
//!
//! ```rust,no_run
//! use zm_log_shipper::config::ConfigLoader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::new().load()?;
//! println!("shipping to {}", config.loki.push_url);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use sqlx::mysql::MySqlConnectOptions;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigLoader;

/// Path Loki serves its push API on
pub const LOKI_PUSH_PATH: &str = "/loki/api/v1/push";

/// Root configuration handed to the binary after validation
#[derive(Debug, Clone)]
pub struct ShipperConfig {
    /// Source database settings
    pub database: DatabaseConfig,

    /// Sink endpoint settings
    pub loki: LokiConfig,

    /// Poll loop settings
    pub pipeline: PipelineConfig,
}

/// Connection settings for the ZoneMinder database
#[derive(Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    /// Log table name; validated as a bare identifier
    pub table: String,
    /// Deadline for one query, including waiting on the server's reply
    pub query_timeout: Duration,
}

impl DatabaseConfig {
    /// Build sqlx connect options from the validated settings
    pub fn connect_options(&self) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
            .charset("utf8mb4")
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .field("table", &self.table)
            .field("query_timeout", &self.query_timeout)
            .finish()
    }
}

/// Loki push endpoint settings
#[derive(Debug, Clone)]
pub struct LokiConfig {
    /// Fully qualified push URL
    pub push_url: String,
    /// Per-request timeout; expiry is a sink error
    pub timeout: Duration,
    /// Value of the `job` label attached to every stream
    pub job: String,
    /// Value of the `host` label attached to every stream
    pub host: String,
}

/// Poll loop settings
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub poll_interval: Duration,
    pub backfill_window: Duration,
    pub checkpoint_path: PathBuf,
    pub batch_size: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(loader::DEFAULT_POLL_SECONDS),
            backfill_window: Duration::from_secs(loader::DEFAULT_BACKFILL_MINUTES * 60),
            checkpoint_path: PathBuf::from(loader::DEFAULT_POINTER_PATH),
            batch_size: loader::DEFAULT_BATCH_SIZE,
        }
    }
}
