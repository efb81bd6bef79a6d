//! # Shipper Error Types
//!
//! Top-level error taxonomy. Each component owns its own error enum; this type
//! unifies them for the poll controller and the binary, and classifies which
//! failures stop the process.

use thiserror::Error;

use crate::checkpoint::CheckpointError;
use crate::config::ConfigurationError;
use crate::database::SourceError;
use crate::sink::SinkError;

#[derive(Error, Debug)]
pub enum ShipperError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),
}

impl ShipperError {
    /// Whether the poll loop must stop on this error.
    ///
    /// Source and sink failures leave the checkpoint where it was and are
    /// retried on the next cycle; everything else ends the process.
    pub fn is_fatal(&self) -> bool {
        match self {
            ShipperError::Configuration(_) | ShipperError::Checkpoint(_) => true,
            ShipperError::Source(_) | ShipperError::Sink(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ShipperError>;
