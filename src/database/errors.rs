//! # Source Error Types
//!
//! Failures talking to the log table. None of them are allowed to move the
//! checkpoint; the poll loop retries the same range on its next cycle.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Database connection error: {message}")]
    Connection { message: String },

    #[error("Database query error: {operation}: {message}")]
    Query { operation: String, message: String },

    #[error("Database timeout: {message}")]
    Timeout { message: String },

    #[error("Invalid table name: {table}")]
    InvalidTable { table: String },
}

impl SourceError {
    /// Create a database connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create a database query error
    pub fn query(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Query {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// A query that did not finish within `limit`
    pub fn timeout(operation: &str, limit: std::time::Duration) -> Self {
        Self::Timeout {
            message: format!("{operation}: no result after {limit:?}"),
        }
    }

    /// Map a sqlx error raised by `operation`
    pub fn from_sqlx(operation: &str, err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => Self::query(operation, db_err.to_string()),
            sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::Decode(_)
            | sqlx::Error::RowNotFound => Self::query(operation, err.to_string()),
            sqlx::Error::PoolTimedOut => Self::Timeout {
                message: format!("{operation}: timed out acquiring a connection"),
            },
            _ => Self::connection(format!("{operation}: {err}")),
        }
    }
}

pub type SourceResult<T> = Result<T, SourceError>;
