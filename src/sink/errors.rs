//! # Sink Error Types
//!
//! Failures delivering a payload to Loki. They are never fatal: the batch
//! stays un-checkpointed and is offered again on the next cycle.

use thiserror::Error;

/// Response bodies are kept for diagnostics, up to this many characters
const MAX_BODY_CHARS: usize = 512;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Unexpected response status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("Request timed out: {message}")]
    Timeout { message: String },

    #[error("Transport failure: {message}")]
    Transport { message: String },

    #[error("Payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Client setup failed: {message}")]
    Setup { message: String },
}

impl SinkError {
    /// Create an unexpected status error, truncating long bodies
    pub fn unexpected_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        let body = match body.char_indices().nth(MAX_BODY_CHARS) {
            Some((cut, _)) => format!("{}...", &body[..cut]),
            None => body,
        };
        Self::UnexpectedStatus { status, body }
    }

    pub fn setup(message: impl Into<String>) -> Self {
        Self::Setup {
            message: message.into(),
        }
    }

    /// Status code of a rejected request, if the sink answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            SinkError::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for SinkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SinkError::Timeout {
                message: err.to_string(),
            }
        } else {
            SinkError::Transport {
                message: err.to_string(),
            }
        }
    }
}

pub type SinkResult<T> = Result<T, SinkError>;
