//! # Log Sink
//!
//! Delivery of grouped batches to Grafana Loki.
//!
//! - [`loki_client`] - HTTP client behind the [`LogSink`] trait
//! - [`payload`] - Push API envelope
//! - [`errors`] - Sink error taxonomy

pub mod errors;
pub mod loki_client;
pub mod payload;

pub use errors::{SinkError, SinkResult};
pub use loki_client::{LogSink, LokiClient};
pub use payload::PushRequest;
