//! # Queue Envelope
//!
//! Wire contract for messages on the request queue. The producer wraps each
//! validated request in an envelope:
//!
//! ```json
//! {
//!   "payload": { "feed_url": "https://example.com/feed.rss" },
//!   "metadata": {
//!     "correlationId": "…",
//!     "timestamp": "…",
//!     "sourceEndpoint": "/process-podcast"
//!   },
//!   "routing": { "targetEndpoint": "process-podcast" }
//! }
//! ```
//!
//! A flat form with `targetEndpoint` at the top level alongside the payload
//! fields is also accepted. Unknown fields are ignored in both forms.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// Failure to extract a routable envelope from a message body. Always a
/// non-retryable fault: a malformed message will never become well-formed
/// on redelivery.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("message body is not a JSON object")]
    NotAnObject,

    #[error("no target endpoint specified in message")]
    MissingRoutingKey,

    #[error("no payload found in message")]
    MissingPayload,
}

/// Producer-supplied tracking metadata. All fields optional on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvelopeMetadata {
    #[serde(rename = "correlationId", default)]
    pub correlation_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(rename = "sourceEndpoint", default)]
    pub source_endpoint: Option<String>,
}

/// A decoded queue message: routing key, handler payload, and metadata.
#[derive(Debug, Clone)]
pub struct QueueEnvelope {
    pub target_endpoint: String,
    pub payload: Value,
    pub metadata: EnvelopeMetadata,
}

impl QueueEnvelope {
    /// Create a new envelope for enqueueing, with a fresh correlation id.
    pub fn new(target_endpoint: impl Into<String>, payload: Value) -> Self {
        Self {
            target_endpoint: target_endpoint.into(),
            payload,
            metadata: EnvelopeMetadata {
                correlation_id: Some(Uuid::new_v4().to_string()),
                timestamp: Some(Utc::now()),
                source_endpoint: None,
            },
        }
    }

    /// Decode a message body in either the nested or the flat wire form.
    pub fn parse(body: &Value) -> Result<Self, EnvelopeError> {
        let object = body.as_object().ok_or(EnvelopeError::NotAnObject)?;

        let metadata = object
            .get("metadata")
            .and_then(|m| serde_json::from_value(m.clone()).ok())
            .unwrap_or_default();

        // Nested form: routing.targetEndpoint plus an explicit payload.
        if let Some(routing) = object.get("routing") {
            let target_endpoint = routing
                .get("targetEndpoint")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .ok_or(EnvelopeError::MissingRoutingKey)?
                .to_string();
            let payload = object
                .get("payload")
                .cloned()
                .ok_or(EnvelopeError::MissingPayload)?;
            return Ok(Self {
                target_endpoint,
                payload,
                metadata,
            });
        }

        // Flat form: targetEndpoint at the top level, remaining fields are
        // the payload.
        let target_endpoint = object
            .get("targetEndpoint")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or(EnvelopeError::MissingRoutingKey)?
            .to_string();

        let payload: serde_json::Map<String, Value> = object
            .iter()
            .filter(|(key, _)| !matches!(key.as_str(), "targetEndpoint" | "metadata"))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Ok(Self {
            target_endpoint,
            payload: Value::Object(payload),
            metadata,
        })
    }

    /// Encode into the nested wire form the producer emits.
    pub fn to_wire(&self) -> Value {
        serde_json::json!({
            "payload": self.payload,
            "metadata": {
                "correlationId": self.metadata.correlation_id,
                "timestamp": self.metadata.timestamp,
                "sourceEndpoint": self.metadata.source_endpoint,
            },
            "routing": {
                "targetEndpoint": self.target_endpoint,
            }
        })
    }
}
