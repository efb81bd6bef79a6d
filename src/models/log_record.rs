use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// LogRecord is one row of the ZoneMinder log table.
///
/// Rows are written by ZoneMinder daemons and never updated, so the shipper
/// only ever reads them. `id` is assigned by the database and strictly
/// increasing; every ordering decision in the pipeline relies on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct LogRecord {
    pub id: u64,
    /// Fractional Unix seconds; only whole seconds are shipped
    pub time_key: f64,
    pub component: String,
    pub server_id: i64,
    pub pid: i64,
    /// ZoneMinder severity, see [`crate::grouping::LogLevel`]
    pub level: i64,
    pub file: String,
    pub line: i64,
    pub message: String,
}

impl LogRecord {
    /// Unix timestamp in nanoseconds, truncated to the whole second
    pub fn timestamp_nanos(&self) -> i64 {
        (self.time_key.trunc() as i64).saturating_mul(1_000_000_000)
    }
}
