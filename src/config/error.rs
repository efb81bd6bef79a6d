//! Configuration Error Types
//!
//! Errors raised while loading and validating shipper configuration. Every
//! variant is fatal at startup.

use thiserror::Error;

/// Configuration-related errors with enough context to fix the deployment
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Missing required configuration field
    #[error("Missing required configuration field '{field}': set the {env_var} environment variable")]
    MissingRequiredField { field: String, env_var: String },

    /// Invalid configuration value
    #[error("Invalid value '{value}' for field '{field}': {context}")]
    InvalidValue {
        field: String,
        value: String,
        context: String,
    },

    /// File I/O or parse errors while reading the optional config file
    #[error("Failed to read configuration file '{file_path}': {error}")]
    FileReadError { file_path: String, error: String },

    /// Layering or deserialization failure inside the `config` crate
    #[error("Failed to build configuration: {error}")]
    BuildError { error: String },
}

impl ConfigurationError {
    /// Create a missing required field error
    pub fn missing_required_field(field: impl Into<String>) -> Self {
        let field = field.into();
        Self::MissingRequiredField {
            env_var: field.to_uppercase(),
            field,
        }
    }

    /// Create an invalid value error
    pub fn invalid_value(
        field: impl Into<String>,
        value: impl std::fmt::Display,
        context: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.to_string(),
            context: context.into(),
        }
    }

    /// Create a file read error
    pub fn file_read_error(file_path: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self::FileReadError {
            file_path: file_path.into(),
            error: error.to_string(),
        }
    }
}

impl From<config::ConfigError> for ConfigurationError {
    fn from(err: config::ConfigError) -> Self {
        match err {
            config::ConfigError::NotFound(field) => Self::missing_required_field(field),
            config::ConfigError::FileParse { uri, cause } => {
                Self::file_read_error(uri.unwrap_or_else(|| "<unknown>".to_string()), cause)
            }
            other => Self::BuildError {
                error: other.to_string(),
            },
        }
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigurationError>;
