//! # Dispatcher
//!
//! Routes a decoded delivery to the handler registered for its routing key
//! and normalizes the outcome into the broker decision:
//!
//! | Handler outcome        | Decision                                        |
//! |------------------------|-------------------------------------------------|
//! | success                | complete (acknowledge)                          |
//! | transient error        | abandon, or dead-letter once attempts exhausted |
//! | permanent error        | dead-letter immediately                         |
//! | malformed envelope     | dead-letter immediately                         |
//! | unknown routing key    | dead-letter immediately                         |
//!
//! The dispatcher performs no blocking I/O of its own beyond invoking the
//! handler, and never runs two handlers for the same message concurrently
//! (the listener processes each batch sequentially).

use tracing::{error, info, instrument, warn};

use crate::messaging::{Delivery, QueueEnvelope};

use super::handler::HandlerError;
use super::route_table::RouteTable;

/// The broker action chosen for one delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Acknowledge: remove the message.
    Complete,
    /// Return the message to the queue for redelivery.
    Abandon,
    /// Move the message to the terminal failure store.
    DeadLetter,
}

/// Outcome of dispatching one delivery, with context for logging.
#[derive(Debug)]
pub struct Dispatch {
    pub disposition: Disposition,
    /// Routing key, when one could be extracted.
    pub route: Option<String>,
    /// Human-readable reason for a non-complete disposition.
    pub reason: Option<String>,
}

impl Dispatch {
    fn complete(route: String) -> Self {
        Self {
            disposition: Disposition::Complete,
            route: Some(route),
            reason: None,
        }
    }

    fn dead_letter(route: Option<String>, reason: String) -> Self {
        Self {
            disposition: Disposition::DeadLetter,
            route,
            reason: Some(reason),
        }
    }

    fn failed(disposition: Disposition, route: String, reason: String) -> Self {
        Self {
            disposition,
            route: Some(route),
            reason: Some(reason),
        }
    }
}

/// Routes deliveries and maps handler results onto broker decisions.
pub struct Dispatcher {
    routes: RouteTable,
    max_delivery_count: u32,
}

impl Dispatcher {
    pub fn new(routes: RouteTable, max_delivery_count: u32) -> Self {
        Self {
            routes,
            max_delivery_count,
        }
    }

    /// Decide the broker action for a transient failure at the given
    /// delivery count: abandon while attempts remain, dead-letter once the
    /// configured maximum is reached. Also used by the listener for
    /// per-message timeouts, which count as transient failures.
    pub fn transient_disposition(&self, delivery_count: i32) -> Disposition {
        if delivery_count >= 0 && delivery_count as u32 >= self.max_delivery_count {
            Disposition::DeadLetter
        } else {
            Disposition::Abandon
        }
    }

    /// Dispatch one delivery to its handler and normalize the outcome.
    #[instrument(skip(self, delivery), fields(msg_id = delivery.token))]
    pub async fn dispatch(&self, delivery: &Delivery) -> Dispatch {
        let envelope = match QueueEnvelope::parse(&delivery.body) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(
                    msg_id = delivery.token,
                    error = %e,
                    body = %summarize(&delivery.body),
                    "Malformed message; dead-lettering"
                );
                return Dispatch::dead_letter(None, e.to_string());
            }
        };

        let route = envelope.target_endpoint.clone();

        let Some(handler) = self.routes.get(&route) else {
            // Retrying can never succeed when the route is unknown.
            error!(
                msg_id = delivery.token,
                route = %route,
                payload = %summarize(&envelope.payload),
                "No handler registered for routing key; dead-lettering"
            );
            return Dispatch::dead_letter(Some(route), "no handler registered".to_string());
        };

        info!(
            msg_id = delivery.token,
            route = %route,
            delivery_count = delivery.delivery_count,
            correlation_id = envelope.metadata.correlation_id.as_deref(),
            "Dispatching message"
        );

        match handler.handle(&envelope.payload).await {
            Ok(_) => {
                info!(msg_id = delivery.token, route = %route, "Handler succeeded");
                Dispatch::complete(route)
            }
            Err(e @ HandlerError::Transient { .. }) => {
                let disposition = self.transient_disposition(delivery.delivery_count);
                warn!(
                    msg_id = delivery.token,
                    route = %route,
                    delivery_count = delivery.delivery_count,
                    disposition = ?disposition,
                    error = %e,
                    "Handler reported transient failure"
                );
                Dispatch::failed(disposition, route, e.to_string())
            }
            Err(e @ HandlerError::Permanent { .. }) => {
                error!(
                    msg_id = delivery.token,
                    route = %route,
                    error = %e,
                    "Handler reported permanent failure; dead-lettering"
                );
                Dispatch::dead_letter(Some(route), e.to_string())
            }
        }
    }
}

// Payload summary for failure logs; bounded so a large payload cannot
// flood the log stream.
fn summarize(value: &serde_json::Value) -> String {
    const MAX_LEN: usize = 200;
    let mut text = value.to_string();
    if text.len() > MAX_LEN {
        let mut end = MAX_LEN;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
        text.push('…');
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::handler::{HandlerResult, MessageHandler};
    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FixedHandler {
        calls: AtomicUsize,
        outcome: fn() -> HandlerResult,
    }

    impl FixedHandler {
        fn new(outcome: fn() -> HandlerResult) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                outcome,
            })
        }
    }

    #[async_trait]
    impl MessageHandler for FixedHandler {
        async fn handle(&self, _payload: &Value) -> HandlerResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.outcome)()
        }
    }

    fn delivery(body: Value, delivery_count: i32) -> Delivery {
        Delivery {
            token: 1,
            delivery_count,
            enqueued_at: Utc::now(),
            body,
        }
    }

    fn dispatcher_with(route: &str, handler: Arc<FixedHandler>) -> Dispatcher {
        let table = RouteTable::builder().register(route, handler).build();
        Dispatcher::new(table, 5)
    }

    #[tokio::test]
    async fn test_success_completes() {
        let handler = FixedHandler::new(|| Ok(json!({"ok": true})));
        let dispatcher = dispatcher_with("process-podcast", handler.clone());

        let dispatch = dispatcher
            .dispatch(&delivery(
                json!({"targetEndpoint": "process-podcast", "feedUrl": "https://example.com/feed.rss", "userId": "u1"}),
                1,
            ))
            .await;

        assert_eq!(dispatch.disposition, Disposition::Complete);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_route_dead_letters_without_handler_call() {
        let handler = FixedHandler::new(|| Ok(json!({})));
        let dispatcher = dispatcher_with("process-podcast", handler.clone());

        let dispatch = dispatcher
            .dispatch(&delivery(json!({"targetEndpoint": "unknown-route"}), 1))
            .await;

        assert_eq!(dispatch.disposition, Disposition::DeadLetter);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_transient_abandons_below_limit() {
        let handler = FixedHandler::new(|| Err(HandlerError::transient("download", "timeout")));
        let dispatcher = dispatcher_with("process-podcast", handler);

        let dispatch = dispatcher
            .dispatch(&delivery(json!({"targetEndpoint": "process-podcast"}), 2))
            .await;

        assert_eq!(dispatch.disposition, Disposition::Abandon);
    }

    #[tokio::test]
    async fn test_transient_dead_letters_at_limit() {
        let handler = FixedHandler::new(|| Err(HandlerError::transient("download", "timeout")));
        let dispatcher = dispatcher_with("process-podcast", handler);

        let dispatch = dispatcher
            .dispatch(&delivery(json!({"targetEndpoint": "process-podcast"}), 5))
            .await;

        assert_eq!(dispatch.disposition, Disposition::DeadLetter);
    }

    #[tokio::test]
    async fn test_permanent_dead_letters_on_first_attempt() {
        let handler = FixedHandler::new(|| Err(HandlerError::permanent("validate", "bad id")));
        let dispatcher = dispatcher_with("summarize-episode", handler);

        let dispatch = dispatcher
            .dispatch(&delivery(json!({"targetEndpoint": "summarize-episode"}), 1))
            .await;

        assert_eq!(dispatch.disposition, Disposition::DeadLetter);
    }

    #[tokio::test]
    async fn test_malformed_body_dead_letters() {
        let handler = FixedHandler::new(|| Ok(json!({})));
        let dispatcher = dispatcher_with("process-podcast", handler.clone());

        let dispatch = dispatcher
            .dispatch(&delivery(json!({"payload": {"feed_url": "x"}}), 1))
            .await;

        assert_eq!(dispatch.disposition, Disposition::DeadLetter);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_summarize_truncates() {
        let long = json!({"text": "x".repeat(500)});
        let summary = summarize(&long);
        assert!(summary.chars().count() <= 201);
        assert!(summary.ends_with('…'));
    }
}
