//! # Backing Services
//!
//! HTTP clients for the services the handlers orchestrate: feed parsing,
//! transcription, summarization, storage, and email delivery. Each client
//! wraps the shared [`http::HttpClient`] and exposes a typed surface.
//!
//! Service failures are classified here so handlers can map them straight
//! to retry semantics: transport faults, timeouts, and 5xx responses are
//! transient; 4xx rejections and malformed responses are permanent.

pub mod email;
pub mod feed;
pub mod http;
pub mod store;
pub mod summarization;
pub mod transcription;

use thiserror::Error;

use crate::dispatch::HandlerError;

pub use email::{EmailClient, EmailSender};
pub use feed::{FeedClient, FeedSource, ParsedFeed};
pub use http::HttpClient;
pub use store::{HttpPodcastStore, PodcastStore};
pub use summarization::{SummarizationClient, Summarizer};
pub use transcription::{Transcriber, TranscriptionClient};

/// Errors from the backing services, classified for retry.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Transport error calling {service}: {message}")]
    Transport { service: String, message: String },

    #[error("Timeout calling {service}")]
    Timeout { service: String },

    #[error("{service} returned server error {status}: {message}")]
    Server {
        service: String,
        status: u16,
        message: String,
    },

    #[error("{service} rejected the request with {status}: {message}")]
    Rejected {
        service: String,
        status: u16,
        message: String,
    },

    #[error("{service} returned an unparseable response: {message}")]
    InvalidResponse { service: String, message: String },

    #[error("{service} has no record of {entity}")]
    NotFound { service: String, entity: String },

    #[error("Service configuration error: {message}")]
    Configuration { message: String },
}

impl ServiceError {
    pub fn transport(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn timeout(service: impl Into<String>) -> Self {
        Self::Timeout {
            service: service.into(),
        }
    }

    pub fn not_found(service: impl Into<String>, entity: impl Into<String>) -> Self {
        Self::NotFound {
            service: service.into(),
            entity: entity.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Whether retrying the same call later could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Timeout { .. } | Self::Server { .. }
        )
    }
}

impl From<ServiceError> for HandlerError {
    fn from(error: ServiceError) -> Self {
        let operation = match &error {
            ServiceError::Transport { service, .. }
            | ServiceError::Timeout { service }
            | ServiceError::Server { service, .. }
            | ServiceError::Rejected { service, .. }
            | ServiceError::InvalidResponse { service, .. }
            | ServiceError::NotFound { service, .. } => service.clone(),
            ServiceError::Configuration { .. } => "configuration".to_string(),
        };
        if error.is_transient() {
            HandlerError::transient(operation, error.to_string())
        } else {
            HandlerError::permanent(operation, error.to_string())
        }
    }
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ServiceError::timeout("whisper").is_transient());
        assert!(ServiceError::transport("feed", "connection refused").is_transient());
        assert!(ServiceError::Server {
            service: "storage".to_string(),
            status: 503,
            message: "unavailable".to_string(),
        }
        .is_transient());

        assert!(!ServiceError::Rejected {
            service: "storage".to_string(),
            status: 422,
            message: "bad feed url".to_string(),
        }
        .is_transient());
        assert!(!ServiceError::not_found("storage", "episode ep-1").is_transient());
    }

    #[test]
    fn test_handler_error_mapping() {
        let transient: HandlerError = ServiceError::timeout("summarizer").into();
        assert!(transient.is_transient());

        let permanent: HandlerError = ServiceError::not_found("storage", "ep-1").into();
        assert!(!permanent.is_transient());
    }
}
