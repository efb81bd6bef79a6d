//! Configuration Loader
//!
//! Layers defaults, an optional TOML file and environment variables with the
//! `config` crate, then validates the flat key set into [`ShipperConfig`].

use super::error::{ConfigResult, ConfigurationError};
use super::{DatabaseConfig, LokiConfig, PipelineConfig, ShipperConfig, LOKI_PUSH_PATH};
use config::{Config, Environment, File, FileFormat};
use reqwest::Url;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_DB_PORT: u16 = 3306;
pub const DEFAULT_DB_TABLE: &str = "Logs";
pub const DEFAULT_DB_QUERY_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_LOKI_TIMEOUT_SECONDS: u64 = 10;
pub const DEFAULT_POLL_SECONDS: u64 = 10;
pub const DEFAULT_BACKFILL_MINUTES: u64 = 60;
pub const DEFAULT_POINTER_PATH: &str = "/pointer.txt";
pub const DEFAULT_BATCH_SIZE: u32 = 1000;
pub const DEFAULT_JOB_NAME: &str = "zoneminder";

/// Flat key set as it appears in the environment and in the TOML file
#[derive(Debug, Deserialize)]
struct RawConfig {
    zm_db_host: Option<String>,
    zm_db_port: u16,
    zm_db_user: Option<String>,
    zm_db_pass: Option<String>,
    zm_db_name: Option<String>,
    zm_db_table: String,
    zm_db_query_timeout_seconds: u64,
    loki_url: Option<String>,
    loki_timeout_seconds: u64,
    poll_seconds: u64,
    backfill_minutes: u64,
    pointer_path: PathBuf,
    batch_size: u32,
    job_name: String,
    host_label: Option<String>,
}

/// Builder-style loader so tests can inject files and environment maps
#[derive(Debug, Default)]
pub struct ConfigLoader {
    file: Option<PathBuf>,
    env: Option<HashMap<String, String>>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Layer a TOML file between the defaults and the environment
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Replace the process environment with an explicit map
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = Some(env);
        self
    }

    /// Load and validate the configuration
    pub fn load(self) -> ConfigResult<ShipperConfig> {
        let mut builder = Config::builder()
            .set_default("zm_db_port", i64::from(DEFAULT_DB_PORT))?
            .set_default("zm_db_table", DEFAULT_DB_TABLE)?
            .set_default(
                "zm_db_query_timeout_seconds",
                DEFAULT_DB_QUERY_TIMEOUT_SECONDS as i64,
            )?
            .set_default("loki_timeout_seconds", DEFAULT_LOKI_TIMEOUT_SECONDS as i64)?
            .set_default("poll_seconds", DEFAULT_POLL_SECONDS as i64)?
            .set_default("backfill_minutes", DEFAULT_BACKFILL_MINUTES as i64)?
            .set_default("pointer_path", DEFAULT_POINTER_PATH)?
            .set_default("batch_size", i64::from(DEFAULT_BATCH_SIZE))?
            .set_default("job_name", DEFAULT_JOB_NAME)?;

        if let Some(path) = &self.file {
            debug!("Loading configuration file: {}", path.display());
            if !path.is_file() {
                return Err(ConfigurationError::file_read_error(
                    path.display().to_string(),
                    "file does not exist",
                ));
            }
            builder = builder.add_source(File::from(path.as_path()).format(FileFormat::Toml));
        }

        let fallback_host = match &self.env {
            Some(env) => env.get("HOSTNAME").cloned(),
            None => std::env::var("HOSTNAME").ok(),
        };
        builder = builder.add_source(Environment::default().source(self.env));

        let raw: RawConfig = builder.build()?.try_deserialize()?;
        validate(raw, fallback_host)
    }
}

fn required(value: Option<String>, field: &str) -> ConfigResult<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigurationError::missing_required_field(field)),
    }
}

fn validate(raw: RawConfig, fallback_host: Option<String>) -> ConfigResult<ShipperConfig> {
    let host = required(raw.zm_db_host, "zm_db_host")?;
    let user = required(raw.zm_db_user, "zm_db_user")?;
    let password = required(raw.zm_db_pass, "zm_db_pass")?;
    let database = required(raw.zm_db_name, "zm_db_name")?;
    let loki_url = required(raw.loki_url, "loki_url")?;

    if !is_sql_identifier(&raw.zm_db_table) {
        return Err(ConfigurationError::invalid_value(
            "zm_db_table",
            &raw.zm_db_table,
            "table name may only contain ASCII letters, digits and underscores",
        ));
    }
    if raw.batch_size == 0 {
        return Err(ConfigurationError::invalid_value(
            "batch_size",
            raw.batch_size,
            "must be at least 1",
        ));
    }
    if raw.poll_seconds == 0 {
        return Err(ConfigurationError::invalid_value(
            "poll_seconds",
            raw.poll_seconds,
            "must be at least 1",
        ));
    }
    if raw.zm_db_query_timeout_seconds == 0 {
        return Err(ConfigurationError::invalid_value(
            "zm_db_query_timeout_seconds",
            raw.zm_db_query_timeout_seconds,
            "must be at least 1",
        ));
    }
    if raw.loki_timeout_seconds == 0 {
        return Err(ConfigurationError::invalid_value(
            "loki_timeout_seconds",
            raw.loki_timeout_seconds,
            "must be at least 1",
        ));
    }

    let host_label = raw
        .host_label
        .filter(|h| !h.trim().is_empty())
        .or(fallback_host.filter(|h| !h.trim().is_empty()))
        .unwrap_or_else(|| "localhost".to_string());

    Ok(ShipperConfig {
        database: DatabaseConfig {
            host,
            port: raw.zm_db_port,
            user,
            password,
            database,
            table: raw.zm_db_table,
            query_timeout: Duration::from_secs(raw.zm_db_query_timeout_seconds),
        },
        loki: LokiConfig {
            push_url: push_url(&loki_url)?,
            timeout: Duration::from_secs(raw.loki_timeout_seconds),
            job: raw.job_name,
            host: host_label,
        },
        pipeline: PipelineConfig {
            poll_interval: Duration::from_secs(raw.poll_seconds),
            backfill_window: Duration::from_secs(raw.backfill_minutes.saturating_mul(60)),
            checkpoint_path: raw.pointer_path,
            batch_size: raw.batch_size,
        },
    })
}

/// Resolve the configured Loki URL to the push endpoint.
///
/// A bare base URL gets the standard push path appended; a URL that already
/// names a path is used as given.
pub fn push_url(loki_url: &str) -> ConfigResult<String> {
    let mut url = Url::parse(loki_url)
        .map_err(|e| ConfigurationError::invalid_value("loki_url", loki_url, e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigurationError::invalid_value(
            "loki_url",
            loki_url,
            "scheme must be http or https",
        ));
    }

    if url.path() == "/" || url.path().is_empty() {
        url.set_path(LOKI_PUSH_PATH);
    }
    Ok(url.to_string())
}

pub(crate) fn is_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
