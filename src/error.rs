//! Top-level error type aggregating the per-concern taxonomies.

use thiserror::Error;

use crate::config::ConfigurationError;
use crate::messaging::MessagingError;
use crate::services::ServiceError;

#[derive(Debug, Error)]
pub enum PodcastCoreError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("messaging error: {0}")]
    Messaging(#[from] MessagingError),

    #[error("service error: {0}")]
    Service(#[from] ServiceError),
}

pub type Result<T> = std::result::Result<T, PodcastCoreError>;
