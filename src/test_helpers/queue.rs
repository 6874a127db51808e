//! In-memory [`QueueDriver`] with pgmq-like semantics.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::Value;

use crate::messaging::{Delivery, MessagingError, MessagingResult, QueueDriver};

#[derive(Debug, Clone)]
struct StoredMessage {
    token: i64,
    body: Value,
    read_ct: i32,
    visible_at: Instant,
    enqueued_at: DateTime<Utc>,
}

#[derive(Default)]
struct DriverState {
    queues: HashMap<String, Vec<StoredMessage>>,
    next_token: i64,
    completed: Vec<i64>,
    archived: Vec<(i64, Value)>,
    fail_reads_remaining: u32,
    ensure_calls: u32,
}

/// Broker fake mirroring pgmq behavior: visibility timeouts, a 1-based
/// read count incremented on every read, archive as the terminal failure
/// store, and injectable read failures for connectivity tests.
#[derive(Default)]
pub struct InMemoryQueueDriver {
    state: Mutex<DriverState>,
}

impl InMemoryQueueDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a body synchronously, returning its token.
    pub fn push(&self, queue_name: &str, body: Value) -> i64 {
        let mut state = self.state.lock();
        state.next_token += 1;
        let token = state.next_token;
        state
            .queues
            .entry(queue_name.to_string())
            .or_default()
            .push(StoredMessage {
                token,
                body,
                read_ct: 0,
                visible_at: Instant::now(),
                enqueued_at: Utc::now(),
            });
        token
    }

    /// Make the next `n` reads fail with a connection error.
    pub fn fail_next_reads(&self, n: u32) {
        self.state.lock().fail_reads_remaining = n;
    }

    /// Make a locked message immediately visible again, simulating an
    /// expired visibility timeout without waiting for it.
    pub fn expire_visibility(&self, queue_name: &str, token: i64) {
        let mut state = self.state.lock();
        if let Some(messages) = state.queues.get_mut(queue_name) {
            if let Some(message) = messages.iter_mut().find(|m| m.token == token) {
                message.visible_at = Instant::now();
            }
        }
    }

    pub fn completed_tokens(&self) -> Vec<i64> {
        self.state.lock().completed.clone()
    }

    pub fn archived_tokens(&self) -> Vec<i64> {
        self.state.lock().archived.iter().map(|(t, _)| *t).collect()
    }

    /// Messages still in the queue (visible or locked).
    pub fn pending_count(&self, queue_name: &str) -> usize {
        self.state
            .lock()
            .queues
            .get(queue_name)
            .map(|q| q.len())
            .unwrap_or(0)
    }

    pub fn ensure_calls(&self) -> u32 {
        self.state.lock().ensure_calls
    }

    fn remove(&self, queue_name: &str, token: i64) -> MessagingResult<StoredMessage> {
        let mut state = self.state.lock();
        let messages = state
            .queues
            .get_mut(queue_name)
            .ok_or_else(|| MessagingError::queue_operation(queue_name, "remove", "no such queue"))?;
        let index = messages
            .iter()
            .position(|m| m.token == token)
            .ok_or_else(|| {
                MessagingError::queue_operation(queue_name, "remove", format!("no message {token}"))
            })?;
        Ok(messages.remove(index))
    }
}

#[async_trait]
impl QueueDriver for InMemoryQueueDriver {
    async fn ensure_queue(&self, queue_name: &str) -> MessagingResult<()> {
        let mut state = self.state.lock();
        state.ensure_calls += 1;
        if state.fail_reads_remaining > 0 {
            state.fail_reads_remaining -= 1;
            return Err(MessagingError::connection("injected connection failure"));
        }
        state.queues.entry(queue_name.to_string()).or_default();
        Ok(())
    }

    async fn read_batch(
        &self,
        queue_name: &str,
        visibility_timeout: Duration,
        limit: i32,
    ) -> MessagingResult<Vec<Delivery>> {
        let mut state = self.state.lock();
        if state.fail_reads_remaining > 0 {
            state.fail_reads_remaining -= 1;
            return Err(MessagingError::connection("injected connection failure"));
        }

        let now = Instant::now();
        let mut batch = Vec::new();
        if let Some(messages) = state.queues.get_mut(queue_name) {
            for message in messages.iter_mut() {
                if batch.len() >= limit as usize {
                    break;
                }
                if message.visible_at > now {
                    continue;
                }
                message.read_ct += 1;
                message.visible_at = now + visibility_timeout;
                batch.push(Delivery {
                    token: message.token,
                    delivery_count: message.read_ct,
                    enqueued_at: message.enqueued_at,
                    body: message.body.clone(),
                });
            }
        }
        Ok(batch)
    }

    async fn complete(&self, queue_name: &str, token: i64) -> MessagingResult<()> {
        self.remove(queue_name, token)?;
        self.state.lock().completed.push(token);
        Ok(())
    }

    async fn abandon(&self, queue_name: &str, token: i64) -> MessagingResult<()> {
        let mut state = self.state.lock();
        let messages = state
            .queues
            .get_mut(queue_name)
            .ok_or_else(|| MessagingError::queue_operation(queue_name, "abandon", "no such queue"))?;
        let message = messages
            .iter_mut()
            .find(|m| m.token == token)
            .ok_or_else(|| {
                MessagingError::queue_operation(queue_name, "abandon", format!("no message {token}"))
            })?;
        message.visible_at = Instant::now();
        Ok(())
    }

    async fn dead_letter(&self, queue_name: &str, token: i64) -> MessagingResult<()> {
        let message = self.remove(queue_name, token)?;
        self.state.lock().archived.push((token, message.body));
        Ok(())
    }

    async fn send(&self, queue_name: &str, body: &Value) -> MessagingResult<i64> {
        Ok(self.push(queue_name, body.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_read_increments_delivery_count() {
        let driver = InMemoryQueueDriver::new();
        let token = driver.push("q", json!({"a": 1}));

        let first = driver
            .read_batch("q", Duration::from_secs(30), 10)
            .await
            .unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].delivery_count, 1);

        driver.expire_visibility("q", token);
        let second = driver
            .read_batch("q", Duration::from_secs(30), 10)
            .await
            .unwrap();
        assert_eq!(second[0].delivery_count, 2);
    }

    #[tokio::test]
    async fn test_locked_message_is_invisible() {
        let driver = InMemoryQueueDriver::new();
        driver.push("q", json!({}));

        let first = driver
            .read_batch("q", Duration::from_secs(30), 10)
            .await
            .unwrap();
        assert_eq!(first.len(), 1);

        let second = driver
            .read_batch("q", Duration::from_secs(30), 10)
            .await
            .unwrap();
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn test_abandon_restores_visibility() {
        let driver = InMemoryQueueDriver::new();
        let token = driver.push("q", json!({}));

        driver.read_batch("q", Duration::from_secs(30), 10).await.unwrap();
        driver.abandon("q", token).await.unwrap();

        let again = driver
            .read_batch("q", Duration::from_secs(30), 10)
            .await
            .unwrap();
        assert_eq!(again.len(), 1);
        assert_eq!(again[0].delivery_count, 2);
    }

    #[tokio::test]
    async fn test_injected_failures_are_consumed() {
        let driver = InMemoryQueueDriver::new();
        driver.push("q", json!({}));
        driver.fail_next_reads(2);

        assert!(driver.read_batch("q", Duration::from_secs(1), 1).await.is_err());
        assert!(driver.read_batch("q", Duration::from_secs(1), 1).await.is_err());
        assert_eq!(
            driver
                .read_batch("q", Duration::from_secs(1), 1)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_dead_letter_moves_to_archive() {
        let driver = InMemoryQueueDriver::new();
        let token = driver.push("q", json!({}));

        driver.read_batch("q", Duration::from_secs(30), 10).await.unwrap();
        driver.dead_letter("q", token).await.unwrap();

        assert_eq!(driver.archived_tokens(), vec![token]);
        assert_eq!(driver.pending_count("q"), 0);
    }
}
