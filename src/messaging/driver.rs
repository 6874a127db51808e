//! # Queue Driver Seam
//!
//! Abstraction over the durable broker. One driver instance owns the
//! connection/session for its listener's lifetime; message-level mutual
//! exclusion between listener instances is provided entirely by the
//! broker's lock/visibility-timeout mechanism, never by in-process locking.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use super::errors::MessagingResult;

/// One delivery attempt of a queue message. Read-only to the listener and
/// dispatcher; consumed (completed) or abandoned exactly once per attempt.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Broker-issued token used to complete/abandon this specific attempt
    pub token: i64,
    /// How many times the broker has delivered this message (1-based)
    pub delivery_count: i32,
    /// When the message was first enqueued
    pub enqueued_at: DateTime<Utc>,
    /// Raw JSON body as received from the broker
    pub body: Value,
}

/// Durable queue operations the listener needs from any broker.
#[async_trait]
pub trait QueueDriver: Send + Sync {
    /// Create the queue if it does not exist yet.
    async fn ensure_queue(&self, queue_name: &str) -> MessagingResult<()>;

    /// Read up to `limit` messages, locking each for `visibility_timeout`.
    /// Returns an empty batch when the queue has no visible messages.
    async fn read_batch(
        &self,
        queue_name: &str,
        visibility_timeout: Duration,
        limit: i32,
    ) -> MessagingResult<Vec<Delivery>>;

    /// Acknowledge a delivery: remove the message permanently.
    async fn complete(&self, queue_name: &str, token: i64) -> MessagingResult<()>;

    /// Return a message to the queue for redelivery.
    async fn abandon(&self, queue_name: &str, token: i64) -> MessagingResult<()>;

    /// Move a message to the terminal failure store.
    async fn dead_letter(&self, queue_name: &str, token: i64) -> MessagingResult<()>;

    /// Enqueue a message body. Producer-side helper; returns the message id.
    async fn send(&self, queue_name: &str, body: &Value) -> MessagingResult<i64>;
}
