//! Configuration error types.
//!
//! Configuration problems are startup-fatal: the listener must refuse to
//! begin polling rather than run with a partial or invalid configuration.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("missing required configuration value: {field}")]
    MissingValue { field: String },

    #[error("invalid configuration value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("failed to load configuration: {message}")]
    LoadFailed { message: String },
}

impl ConfigurationError {
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingValue {
            field: field.into(),
        }
    }

    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn load_failed(message: impl Into<String>) -> Self {
        Self::LoadFailed {
            message: message.into(),
        }
    }
}

pub type ConfigResult<T> = std::result::Result<T, ConfigurationError>;
