//! # Database Operations
//!
//! Read-only access to the ZoneMinder log table.
//!
//! - [`connection`] - MySQL pool setup and health checks
//! - [`log_source`] - Ordered range queries behind the [`RowSource`] trait
//! - [`errors`] - Source error taxonomy

pub mod connection;
pub mod errors;
pub mod log_source;

pub use connection::DatabaseConnection;
pub use errors::{SourceError, SourceResult};
pub use log_source::{MySqlLogSource, RowSource};
