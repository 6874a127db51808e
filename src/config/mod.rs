//! # Configuration System
//!
//! Explicit, validated configuration for the queue listener and its
//! downstream service clients. All values come from `PODCAST__`-prefixed
//! environment variables (with `__` as the section separator, e.g.
//! `PODCAST__QUEUE__QUEUE_NAME`); every field has a conservative default
//! except the broker connection string and queue name, which are
//! startup-fatal when absent.

pub mod error;

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use error::{ConfigResult, ConfigurationError};

use crate::constants::{defaults, queues};

/// Root configuration for the dispatch core.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Broker connection and polling configuration
    #[serde(default)]
    pub queue: QueueConfig,

    /// Reconnect backoff configuration
    #[serde(default)]
    pub backoff: BackoffConfig,

    /// Downstream service endpoints
    #[serde(default)]
    pub services: ServicesConfig,
}

/// Broker connection and polling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueueConfig {
    /// PostgreSQL connection string for the pgmq broker
    #[serde(default)]
    pub connection_string: String,
    /// Queue the listener polls for envelopes
    #[serde(default = "default_queue_name")]
    pub queue_name: String,
    /// Messages read per poll
    #[serde(default = "default_batch_size")]
    pub batch_size: i32,
    /// Broker visibility timeout (seconds)
    #[serde(default = "default_visibility_timeout")]
    pub visibility_timeout_seconds: u64,
    /// Idle wait between empty polls (milliseconds)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Delivery attempts before a transiently failing message is dead-lettered
    #[serde(default = "default_max_delivery_count")]
    pub max_delivery_count: u32,
    /// Per-message processing timeout (seconds)
    #[serde(default = "default_message_timeout")]
    pub message_timeout_seconds: u64,
}

fn default_queue_name() -> String {
    queues::DEFAULT_REQUEST_QUEUE.to_string()
}

fn default_batch_size() -> i32 {
    defaults::BATCH_SIZE
}

fn default_visibility_timeout() -> u64 {
    defaults::VISIBILITY_TIMEOUT_SECONDS
}

fn default_poll_interval() -> u64 {
    defaults::POLL_INTERVAL_MS
}

fn default_max_delivery_count() -> u32 {
    defaults::MAX_DELIVERY_COUNT
}

fn default_message_timeout() -> u64 {
    defaults::MESSAGE_TIMEOUT_SECONDS
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            connection_string: String::new(),
            queue_name: default_queue_name(),
            batch_size: default_batch_size(),
            visibility_timeout_seconds: default_visibility_timeout(),
            poll_interval_ms: default_poll_interval(),
            max_delivery_count: default_max_delivery_count(),
            message_timeout_seconds: default_message_timeout(),
        }
    }
}

impl QueueConfig {
    /// Get poll interval as Duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Get visibility timeout as Duration
    pub fn visibility_timeout(&self) -> Duration {
        Duration::from_secs(self.visibility_timeout_seconds)
    }

    /// Get per-message processing timeout as Duration
    pub fn message_timeout(&self) -> Duration {
        Duration::from_secs(self.message_timeout_seconds)
    }
}

/// Reconnect backoff configuration for broker connectivity failures.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackoffConfig {
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    /// Maximum jitter applied to each delay, as a fraction of the delay
    #[serde(default = "default_jitter")]
    pub jitter_max_percentage: f64,
}

fn default_initial_delay() -> u64 {
    1000
}

fn default_max_delay() -> u64 {
    60_000
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_jitter() -> f64 {
    0.1
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
            multiplier: default_multiplier(),
            jitter_max_percentage: default_jitter(),
        }
    }
}

impl BackoffConfig {
    /// Get initial delay as Duration
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    /// Get maximum delay as Duration
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

/// Endpoints for the opaque downstream services the handlers call.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ServicesConfig {
    /// Feed parsing service (RSS/crawler)
    #[serde(default)]
    pub feed: HttpServiceConfig,
    /// Whisper transcription endpoint
    #[serde(default)]
    pub whisper: HttpServiceConfig,
    /// Summarization/LLM endpoint
    #[serde(default)]
    pub summarizer: HttpServiceConfig,
    /// Storage REST API (podcasts, episodes, transcripts, summaries)
    #[serde(default)]
    pub storage: HttpServiceConfig,
    /// Outbound email service
    #[serde(default)]
    pub email: HttpServiceConfig,
}

/// Connection settings for one downstream HTTP service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpServiceConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_service_timeout")]
    pub timeout_ms: u64,
}

fn default_service_timeout() -> u64 {
    30_000
}

impl Default for HttpServiceConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            timeout_ms: default_service_timeout(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `PODCAST__`-prefixed environment variables
    /// and validate it.
    pub fn from_env() -> ConfigResult<Self> {
        let source = config::Environment::with_prefix("PODCAST")
            .separator("__")
            .try_parsing(true);

        let loaded = config::Config::builder()
            .add_source(source)
            .build()
            .map_err(|e| ConfigurationError::load_failed(e.to_string()))?;

        let app: AppConfig = loaded
            .try_deserialize()
            .map_err(|e| ConfigurationError::load_failed(e.to_string()))?;

        app.validate()?;
        Ok(app)
    }

    /// Validate startup-fatal requirements.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.queue.connection_string.trim().is_empty() {
            return Err(ConfigurationError::missing("queue.connection_string"));
        }
        if self.queue.queue_name.trim().is_empty() {
            return Err(ConfigurationError::missing("queue.queue_name"));
        }
        if self.queue.batch_size < 1 {
            return Err(ConfigurationError::invalid(
                "queue.batch_size",
                "must be at least 1",
            ));
        }
        if self.queue.max_delivery_count < 1 {
            return Err(ConfigurationError::invalid(
                "queue.max_delivery_count",
                "must be at least 1",
            ));
        }
        if self.backoff.multiplier < 1.0 {
            return Err(ConfigurationError::invalid(
                "backoff.multiplier",
                "must be at least 1.0",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_defaults() {
        let queue = QueueConfig::default();
        assert_eq!(queue.queue_name, "podcast_requests");
        assert_eq!(queue.batch_size, 10);
        assert_eq!(queue.max_delivery_count, 5);
        assert_eq!(queue.message_timeout(), Duration::from_secs(300));
        assert_eq!(queue.poll_interval(), Duration::from_millis(1000));
    }

    #[test]
    fn test_validate_requires_connection_string() {
        let app = AppConfig::default();
        let err = app.validate().unwrap_err();
        assert!(matches!(err, ConfigurationError::MissingValue { ref field } if field == "queue.connection_string"));
    }

    #[test]
    fn test_validate_requires_queue_name() {
        let mut app = AppConfig::default();
        app.queue.connection_string = "postgres://localhost/podcasts".to_string();
        app.queue.queue_name = "  ".to_string();
        let err = app.validate().unwrap_err();
        assert!(matches!(err, ConfigurationError::MissingValue { ref field } if field == "queue.queue_name"));
    }

    #[test]
    fn test_validate_rejects_zero_batch() {
        let mut app = AppConfig::default();
        app.queue.connection_string = "postgres://localhost/podcasts".to_string();
        app.queue.batch_size = 0;
        assert!(app.validate().is_err());
    }

    #[test]
    fn test_backoff_defaults() {
        let backoff = BackoffConfig::default();
        assert_eq!(backoff.initial_delay(), Duration::from_millis(1000));
        assert_eq!(backoff.max_delay(), Duration::from_secs(60));
        assert!(backoff.multiplier >= 1.0);
    }
}
