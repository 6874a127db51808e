//! # Handler Contract
//!
//! A handler is the unit of work bound to one routing key. It receives a
//! validated payload, performs externally-delegated work, and reports the
//! outcome as a result value rather than by raising: the dispatcher's
//! acknowledge/abandon/dead-letter decision is a pure function of this
//! result.
//!
//! Handlers must be idempotent, or at least tolerate at-least-once
//! delivery: the broker may redeliver a message whose previous attempt
//! completed but whose acknowledgement was lost. Handlers therefore check
//! for already-materialized side effects (an existing transcript, an
//! existing summary) before repeating them.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Failure reported by a handler, split by retryability.
#[derive(Debug, Clone, Error)]
pub enum HandlerError {
    /// Recoverable: the message should be abandoned for redelivery
    /// (subject to the delivery-count limit).
    #[error("transient failure in {operation}: {message}")]
    Transient { operation: String, message: String },

    /// Non-recoverable: retrying can never succeed; dead-letter immediately.
    #[error("permanent failure in {operation}: {message}")]
    Permanent { operation: String, message: String },
}

impl HandlerError {
    pub fn transient(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transient {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn permanent(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Permanent {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

/// Success payload or typed failure from one handler invocation.
pub type HandlerResult = std::result::Result<Value, HandlerError>;

/// Unit of work bound to one routing key.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Process one message payload. The payload is the handler-specific
    /// object from the envelope; validation failures are permanent.
    async fn handle(&self, payload: &Value) -> HandlerResult;
}

/// Parse a typed request out of a payload, mapping validation failures to
/// a permanent handler error.
pub fn parse_payload<T: serde::de::DeserializeOwned>(
    operation: &str,
    payload: &Value,
) -> std::result::Result<T, HandlerError> {
    serde_json::from_value(payload.clone())
        .map_err(|e| HandlerError::permanent(operation, format!("invalid payload: {e}")))
}
