#![allow(clippy::doc_markdown)] // Allow technical terms like ZoneMinder, MySQL in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # ZoneMinder Log Shipper
//!
//! Ships rows from ZoneMinder's `Logs` table into Grafana Loki.
//!
//! ## Overview
//!
//! The shipper polls the log table for rows newer than a durable checkpoint,
//! groups each batch into Loki streams keyed by the row metadata, pushes the
//! batch, and only then advances the checkpoint. On a cold start with no
//! checkpoint it backfills a configurable window of recent history first.
//!
//! Delivery is at-least-once: a batch whose push fails, or whose checkpoint
//! write is lost to a crash, is sent again. Rows are never skipped.
//!
//! ## Module Organization
//!
//! - [`pipeline`] - Poll controller state machine and bootstrap
//! - [`checkpoint`] - Durable position file
//! - [`database`] - Ordered range queries against the log table
//! - [`grouping`] - Batch to stream grouping and severity mapping
//! - [`sink`] - Loki push client
//! - [`config`] - Layered configuration
//! - [`logging`] - Diagnostic logging setup
//! - [`error`] - Top-level error taxonomy

pub mod checkpoint;
pub mod config;
pub mod database;
pub mod error;
pub mod grouping;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod sink;

pub use checkpoint::{CheckpointError, CheckpointStore, FileCheckpointStore};
pub use config::{ConfigLoader, ShipperConfig};
pub use database::{RowSource, SourceError};
pub use error::{Result, ShipperError};
pub use grouping::{CommonLabels, LabelKey, LogLevel, StreamGroup, StreamGrouper};
pub use models::LogRecord;
pub use pipeline::{CycleOutcome, PipelineState, PollController};
pub use sink::{LogSink, LokiClient, SinkError};
