//! # Queue Listener
//!
//! Long-lived receive loop against the request queue. Polls the broker,
//! feeds each delivery to the [`Dispatcher`], and applies the resulting
//! disposition. Each batch is processed sequentially, so ordering is
//! best-effort within a batch; the broker gives no cross-consumer ordering
//! guarantee, so nothing here is linearizable.
//!
//! Connectivity failures trigger bounded exponential backoff with unlimited
//! retries and consume no delivery attempt. `stop()` is cooperative: the
//! loop exits after the in-flight message finishes, never mid-message.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

use crate::config::{BackoffConfig, ConfigurationError, QueueConfig};
use crate::dispatch::{DeliveryLedger, Dispatch, Dispatcher, Disposition};
use crate::error::Result;
use crate::messaging::{Delivery, QueueDriver};

/// Listener configuration, passed explicitly to the constructor. The
/// listener instance is held by the caller's lifecycle manager; there is
/// no ambient global processor.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    pub queue_name: String,
    pub batch_size: i32,
    pub visibility_timeout: Duration,
    pub poll_interval: Duration,
    pub max_delivery_count: u32,
    pub message_timeout: Duration,
    pub backoff: BackoffConfig,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        let queue = QueueConfig::default();
        Self {
            queue_name: queue.queue_name.clone(),
            batch_size: queue.batch_size,
            visibility_timeout: queue.visibility_timeout(),
            poll_interval: queue.poll_interval(),
            max_delivery_count: queue.max_delivery_count,
            message_timeout: queue.message_timeout(),
            backoff: BackoffConfig::default(),
        }
    }
}

impl ListenerConfig {
    /// Build the listener view of the broker configuration.
    pub fn from_queue_config(queue: &QueueConfig, backoff: BackoffConfig) -> Self {
        Self {
            queue_name: queue.queue_name.clone(),
            batch_size: queue.batch_size,
            visibility_timeout: queue.visibility_timeout(),
            poll_interval: queue.poll_interval(),
            max_delivery_count: queue.max_delivery_count,
            message_timeout: queue.message_timeout(),
            backoff,
        }
    }

    fn validate(&self) -> std::result::Result<(), ConfigurationError> {
        if self.queue_name.trim().is_empty() {
            return Err(ConfigurationError::missing("queue_name"));
        }
        if self.batch_size < 1 {
            return Err(ConfigurationError::invalid(
                "batch_size",
                "must be at least 1",
            ));
        }
        if self.max_delivery_count < 1 {
            return Err(ConfigurationError::invalid(
                "max_delivery_count",
                "must be at least 1",
            ));
        }
        if self.message_timeout.is_zero() {
            return Err(ConfigurationError::invalid(
                "message_timeout",
                "must be non-zero",
            ));
        }
        Ok(())
    }
}

/// Bounded exponential backoff with jitter for reconnect attempts.
struct ReconnectBackoff {
    config: BackoffConfig,
    current: Duration,
}

impl ReconnectBackoff {
    fn new(config: BackoffConfig) -> Self {
        let current = config.initial_delay();
        Self { config, current }
    }

    fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        let grown = self.current.as_millis() as f64 * self.config.multiplier;
        self.current = Duration::from_millis(grown as u64).min(self.config.max_delay());

        let jitter = rand::thread_rng().gen_range(0.0..=self.config.jitter_max_percentage);
        delay + Duration::from_millis((delay.as_millis() as f64 * jitter) as u64)
    }

    fn reset(&mut self) {
        self.current = self.config.initial_delay();
    }
}

/// Handle for signalling cooperative shutdown from outside the loop.
#[derive(Clone)]
pub struct ListenerHandle {
    shutdown: watch::Sender<bool>,
}

impl ListenerHandle {
    /// Request shutdown. The listener exits after the current message
    /// completes; an in-flight message is never abandoned mid-processing.
    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
    }
}

/// Long-lived queue consumer feeding the dispatcher.
pub struct QueueListener {
    driver: Arc<dyn QueueDriver>,
    dispatcher: Dispatcher,
    config: ListenerConfig,
    ledger: DeliveryLedger,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl QueueListener {
    pub fn new(
        driver: Arc<dyn QueueDriver>,
        dispatcher: Dispatcher,
        config: ListenerConfig,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            driver,
            dispatcher,
            config,
            ledger: DeliveryLedger::new(),
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Shutdown handle for this listener.
    pub fn handle(&self) -> ListenerHandle {
        ListenerHandle {
            shutdown: self.shutdown_tx.clone(),
        }
    }

    /// Validate configuration, ensure the queue exists, and run the receive
    /// loop until `stop()` is signalled. Fails with a `ConfigurationError`
    /// before any broker call when required configuration is absent.
    #[instrument(skip(self), fields(queue = %self.config.queue_name))]
    pub async fn start(mut self) -> Result<()> {
        self.config.validate()?;

        let mut backoff = ReconnectBackoff::new(self.config.backoff.clone());

        // Queue creation is retried like any other connectivity fault so a
        // listener started before the broker is reachable still comes up.
        loop {
            if self.stop_requested() {
                return Ok(());
            }
            match self.driver.ensure_queue(&self.config.queue_name).await {
                Ok(()) => break,
                Err(e) if e.is_connectivity() => {
                    let delay = backoff.next_delay();
                    warn!(error = %e, delay_ms = delay.as_millis() as u64, "Broker unreachable; retrying");
                    self.idle(delay).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
        backoff.reset();

        info!(
            batch_size = self.config.batch_size,
            max_delivery_count = self.config.max_delivery_count,
            "Listening for messages"
        );

        loop {
            if self.stop_requested() {
                break;
            }

            match self.poll_once().await {
                Ok(0) => {
                    backoff.reset();
                    self.idle(self.config.poll_interval).await;
                }
                Ok(_) => {
                    // Messages flowed; poll again immediately for throughput.
                    backoff.reset();
                }
                Err(e) if e.is_connectivity() => {
                    let delay = backoff.next_delay();
                    warn!(error = %e, delay_ms = delay.as_millis() as u64, "Lost broker connectivity; backing off");
                    self.idle(delay).await;
                }
                Err(e) => {
                    // A non-connectivity poll error must not kill the loop.
                    error!(error = %e, "Error polling queue");
                    self.idle(self.config.poll_interval).await;
                }
            }
        }

        info!("Listener stopped");
        Ok(())
    }

    fn stop_requested(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    /// Read one batch and process it sequentially. Returns the number of
    /// messages received.
    async fn poll_once(&self) -> crate::messaging::MessagingResult<usize> {
        let deliveries = self
            .driver
            .read_batch(
                &self.config.queue_name,
                self.config.visibility_timeout,
                self.config.batch_size,
            )
            .await?;

        let count = deliveries.len();
        for delivery in deliveries {
            self.process_delivery(delivery).await;
            if self.stop_requested() {
                break;
            }
        }
        Ok(count)
    }

    async fn process_delivery(&self, delivery: Delivery) {
        self.ledger.check_out(delivery.token);

        let dispatch =
            match tokio::time::timeout(self.config.message_timeout, self.dispatcher.dispatch(&delivery)).await {
                Ok(dispatch) => dispatch,
                Err(_) => {
                    // A timed-out handler counts as a transient failure.
                    let disposition = self.dispatcher.transient_disposition(delivery.delivery_count);
                    warn!(
                        msg_id = delivery.token,
                        timeout_ms = self.config.message_timeout.as_millis() as u64,
                        disposition = ?disposition,
                        "Message processing timed out"
                    );
                    Dispatch {
                        disposition,
                        route: None,
                        reason: Some("processing timeout".to_string()),
                    }
                }
            };

        self.finalize(&delivery, dispatch).await;
    }

    /// Apply the disposition through the driver, retiring the delivery
    /// token exactly once.
    async fn finalize(&self, delivery: &Delivery, dispatch: Dispatch) {
        if let Err(violation) = self.ledger.retire(delivery.token) {
            error!(
                msg_id = delivery.token,
                violation = %violation,
                "Delivery token invariant violated; skipping broker finalization"
            );
            return;
        }

        let queue = &self.config.queue_name;
        let result = match dispatch.disposition {
            Disposition::Complete => self.driver.complete(queue, delivery.token).await,
            Disposition::Abandon => self.driver.abandon(queue, delivery.token).await,
            Disposition::DeadLetter => self.driver.dead_letter(queue, delivery.token).await,
        };

        match result {
            Ok(()) => debug!(
                msg_id = delivery.token,
                disposition = ?dispatch.disposition,
                route = dispatch.route.as_deref(),
                reason = dispatch.reason.as_deref(),
                "Delivery finalized"
            ),
            // The broker will redeliver after the visibility timeout; the
            // handler's idempotence contract covers the duplicate effect.
            Err(e) => warn!(
                msg_id = delivery.token,
                disposition = ?dispatch.disposition,
                error = %e,
                "Failed to finalize delivery"
            ),
        }
    }

    /// Sleep, waking early when shutdown is signalled.
    async fn idle(&mut self, duration: Duration) {
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = self.shutdown_rx.changed() => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::RouteTable;
    use crate::test_helpers::{InMemoryQueueDriver, RecordingHandler};
    use serde_json::json;

    #[tokio::test]
    async fn test_double_retired_token_skips_broker_and_loop_continues() {
        let driver = Arc::new(InMemoryQueueDriver::new());
        let handler = RecordingHandler::new();
        let routes = RouteTable::builder().register("noop", handler.clone()).build();
        let config = ListenerConfig {
            queue_name: "q".to_string(),
            ..ListenerConfig::default()
        };
        let listener = QueueListener::new(driver.clone(), Dispatcher::new(routes, 5), config);

        // Token already finalized once; finalizing it again is an
        // invariant violation that must not reach the broker.
        let token = driver.push("q", json!({"targetEndpoint": "noop"}));
        listener.ledger.check_out(token);
        listener.ledger.retire(token).unwrap();

        let stale = Delivery {
            token,
            delivery_count: 1,
            enqueued_at: chrono::Utc::now(),
            body: json!({"targetEndpoint": "noop"}),
        };
        let dispatch = Dispatch {
            disposition: Disposition::Complete,
            route: None,
            reason: None,
        };
        listener.finalize(&stale, dispatch).await;
        assert!(driver.completed_tokens().is_empty());

        // Later deliveries still process normally.
        let next = driver.push("q", json!({"targetEndpoint": "noop"}));
        let batch = driver
            .read_batch("q", Duration::from_secs(30), 10)
            .await
            .unwrap();
        for delivery in batch.into_iter().filter(|d| d.token == next) {
            listener.process_delivery(delivery).await;
        }
        assert_eq!(driver.completed_tokens(), vec![next]);
        assert_eq!(handler.calls(), 1);
    }

    #[test]
    fn test_config_defaults() {
        let config = ListenerConfig::default();
        assert_eq!(config.queue_name, "podcast_requests");
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.max_delivery_count, 5);
        assert_eq!(config.message_timeout, Duration::from_secs(300));
    }

    #[test]
    fn test_validate_rejects_empty_queue_name() {
        let config = ListenerConfig {
            queue_name: String::new(),
            ..ListenerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_backoff_growth_is_bounded() {
        let config = BackoffConfig {
            initial_delay_ms: 100,
            max_delay_ms: 400,
            multiplier: 2.0,
            jitter_max_percentage: 0.0,
        };
        let mut backoff = ReconnectBackoff::new(config);

        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
        assert_eq!(backoff.next_delay(), Duration::from_millis(200));
        assert_eq!(backoff.next_delay(), Duration::from_millis(400));
        // Capped at max_delay from here on.
        assert_eq!(backoff.next_delay(), Duration::from_millis(400));
    }

    #[test]
    fn test_backoff_reset() {
        let config = BackoffConfig {
            initial_delay_ms: 100,
            max_delay_ms: 1000,
            multiplier: 2.0,
            jitter_max_percentage: 0.0,
        };
        let mut backoff = ReconnectBackoff::new(config);
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
    }

    #[test]
    fn test_backoff_jitter_stays_within_bound() {
        let config = BackoffConfig {
            initial_delay_ms: 1000,
            max_delay_ms: 1000,
            multiplier: 1.0,
            jitter_max_percentage: 0.5,
        };
        let mut backoff = ReconnectBackoff::new(config);
        for _ in 0..20 {
            let delay = backoff.next_delay();
            assert!(delay >= Duration::from_millis(1000));
            assert!(delay <= Duration::from_millis(1500));
        }
    }
}
