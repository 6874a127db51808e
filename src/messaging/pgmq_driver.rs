//! # pgmq Queue Driver
//!
//! [`QueueDriver`] implementation backed by pgmq on PostgreSQL.
//! Completion maps to `delete`, abandon maps to resetting the visibility
//! timeout (the message becomes immediately eligible for redelivery), and
//! dead-lettering maps to `archive` (pgmq's terminal archive table).

use std::time::Duration;

use async_trait::async_trait;
use pgmq::errors::PgmqError;
use pgmq::PGMQueue;
use serde_json::Value;
use tracing::{debug, info};

use super::driver::{Delivery, QueueDriver};
use super::errors::{MessagingError, MessagingResult};

/// Map a pgmq failure onto the messaging taxonomy. Connection-level
/// database faults must surface as connectivity so the listener takes its
/// backoff path instead of treating them as fatal; everything else keeps
/// the queue/operation context.
fn map_pgmq_error(queue_name: &str, operation: &str, error: PgmqError) -> MessagingError {
    match error {
        PgmqError::DatabaseError(db) => {
            let mapped = MessagingError::from(db);
            if mapped.is_connectivity() {
                mapped
            } else {
                MessagingError::queue_operation(queue_name, operation, mapped.to_string())
            }
        }
        other => MessagingError::queue_operation(queue_name, operation, other.to_string()),
    }
}

#[derive(Debug, Clone)]
pub struct PgmqQueueDriver {
    pgmq: PGMQueue,
}

impl PgmqQueueDriver {
    /// Connect to the broker using a PostgreSQL connection string.
    pub async fn connect(connection_string: &str) -> MessagingResult<Self> {
        info!("Connecting to pgmq broker");

        let pgmq = PGMQueue::new(connection_string.to_string())
            .await
            .map_err(|e| MessagingError::connection(e.to_string()))?;

        info!("Connected to pgmq broker");
        Ok(Self { pgmq })
    }

    /// Create a driver over an existing connection pool.
    pub async fn with_pool(pool: sqlx::PgPool) -> Self {
        let pgmq = PGMQueue::new_with_pool(pool).await;
        Self { pgmq }
    }

    /// Underlying connection pool, for health checks and advanced operations.
    pub fn pool(&self) -> &sqlx::PgPool {
        &self.pgmq.connection
    }
}

#[async_trait]
impl QueueDriver for PgmqQueueDriver {
    async fn ensure_queue(&self, queue_name: &str) -> MessagingResult<()> {
        debug!(queue = %queue_name, "Ensuring queue exists");

        self.pgmq
            .create(queue_name)
            .await
            .map_err(|e| map_pgmq_error(queue_name, "create", e))?;

        info!(queue = %queue_name, "Queue ready");
        Ok(())
    }

    async fn read_batch(
        &self,
        queue_name: &str,
        visibility_timeout: Duration,
        limit: i32,
    ) -> MessagingResult<Vec<Delivery>> {
        let vt = visibility_timeout.as_secs().min(i32::MAX as u64) as i32;

        // A failed read means the broker session is unhealthy; surface it
        // as a connectivity fault so the listener enters its backoff path.
        let messages: Vec<pgmq::types::Message<Value>> = self
            .pgmq
            .read_batch(queue_name, Some(vt), limit)
            .await
            .map_err(|e| MessagingError::connection(e.to_string()))?
            .unwrap_or_default();

        debug!(
            queue = %queue_name,
            count = messages.len(),
            "Read messages from queue"
        );

        Ok(messages
            .into_iter()
            .map(|msg| Delivery {
                token: msg.msg_id,
                delivery_count: msg.read_ct,
                enqueued_at: msg.enqueued_at,
                body: msg.message,
            })
            .collect())
    }

    async fn complete(&self, queue_name: &str, token: i64) -> MessagingResult<()> {
        debug!(queue = %queue_name, msg_id = token, "Completing message");

        self.pgmq
            .delete(queue_name, token)
            .await
            .map_err(|e| map_pgmq_error(queue_name, "delete", e))?;
        Ok(())
    }

    async fn abandon(&self, queue_name: &str, token: i64) -> MessagingResult<()> {
        debug!(queue = %queue_name, msg_id = token, "Abandoning message for redelivery");

        let updated: Option<pgmq::types::Message<Value>> = self
            .pgmq
            .set_vt(queue_name, token, chrono::Utc::now())
            .await
            .map_err(|e| map_pgmq_error(queue_name, "set_vt", e))?;

        // The message may already be deleted or archived by another path.
        if updated.is_none() {
            return Err(MessagingError::queue_operation(
                queue_name,
                "set_vt",
                format!("no message {token} to abandon"),
            ));
        }
        Ok(())
    }

    async fn dead_letter(&self, queue_name: &str, token: i64) -> MessagingResult<()> {
        debug!(queue = %queue_name, msg_id = token, "Dead-lettering message");

        self.pgmq
            .archive(queue_name, token)
            .await
            .map_err(|e| map_pgmq_error(queue_name, "archive", e))?;
        Ok(())
    }

    async fn send(&self, queue_name: &str, body: &Value) -> MessagingResult<i64> {
        let msg_id = self
            .pgmq
            .send(queue_name, body)
            .await
            .map_err(|e| map_pgmq_error(queue_name, "send", e))?;

        debug!(queue = %queue_name, msg_id = msg_id, "Message sent to queue");
        Ok(msg_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_faults_classified_for_backoff() {
        let err = map_pgmq_error("q", "create", PgmqError::DatabaseError(sqlx::Error::PoolTimedOut));
        assert!(err.is_connectivity());

        let err = map_pgmq_error("q", "create", PgmqError::DatabaseError(sqlx::Error::PoolClosed));
        assert!(err.is_connectivity());

        // Non-connection database faults keep the operation context and do
        // not trigger reconnect.
        let err = map_pgmq_error("q", "create", PgmqError::DatabaseError(sqlx::Error::RowNotFound));
        assert!(!err.is_connectivity());
        assert!(matches!(
            err,
            MessagingError::QueueOperation { ref operation, .. } if operation == "create"
        ));
    }

    // Broker-backed tests require a PostgreSQL database with the pgmq
    // extension; they skip when TEST_DATABASE_URL is not provided.
    fn test_database_url() -> Option<String> {
        std::env::var("TEST_DATABASE_URL").ok()
    }

    #[tokio::test]
    async fn test_driver_connection() {
        let Some(url) = test_database_url() else {
            println!("Skipping pgmq test - no TEST_DATABASE_URL provided");
            return;
        };

        let driver = PgmqQueueDriver::connect(&url).await;
        assert!(driver.is_ok(), "Failed to connect pgmq driver: {driver:?}");
    }

    #[tokio::test]
    async fn test_send_read_complete_cycle() {
        let Some(url) = test_database_url() else {
            println!("Skipping pgmq test - no TEST_DATABASE_URL provided");
            return;
        };

        let driver = PgmqQueueDriver::connect(&url).await.expect("connect");
        let queue = "podcast_core_driver_test";
        driver.ensure_queue(queue).await.expect("create queue");

        let body = serde_json::json!({"targetEndpoint": "process-podcast", "feedUrl": "x"});
        let msg_id = driver.send(queue, &body).await.expect("send");
        assert!(msg_id > 0);

        let batch = driver
            .read_batch(queue, Duration::from_secs(30), 5)
            .await
            .expect("read");
        assert!(batch.iter().any(|d| d.token == msg_id));

        // Abandon makes the locked message immediately readable again with
        // an incremented delivery count.
        driver.abandon(queue, msg_id).await.expect("abandon");
        let redelivered = driver
            .read_batch(queue, Duration::from_secs(30), 5)
            .await
            .expect("read after abandon");
        assert!(redelivered
            .iter()
            .any(|d| d.token == msg_id && d.delivery_count >= 2));

        driver.complete(queue, msg_id).await.expect("complete");
    }

    #[tokio::test]
    async fn test_abandon_unknown_token_is_an_error() {
        let Some(url) = test_database_url() else {
            println!("Skipping pgmq test - no TEST_DATABASE_URL provided");
            return;
        };

        let driver = PgmqQueueDriver::connect(&url).await.expect("connect");
        let queue = "podcast_core_driver_abandon_test";
        driver.ensure_queue(queue).await.expect("create queue");

        let result = driver.abandon(queue, i64::MAX).await;
        assert!(matches!(
            result,
            Err(MessagingError::QueueOperation { ref operation, .. }) if operation == "set_vt"
        ));
    }
}
