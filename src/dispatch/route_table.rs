//! # Route Table
//!
//! Immutable mapping from routing key to handler, built once at process
//! start from the closed set of supported routes. Unknown routes are a
//! configuration-time warning via [`RouteTable::verify_routes`] in addition
//! to the runtime dead-letter.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use super::handler::MessageHandler;

/// Builder collecting route registrations before the table is frozen.
#[derive(Default)]
pub struct RouteTableBuilder {
    routes: HashMap<String, Arc<dyn MessageHandler>>,
}

impl RouteTableBuilder {
    /// Register a handler for a routing key. A repeated key replaces the
    /// previous registration with a warning.
    pub fn register(
        mut self,
        route: impl Into<String>,
        handler: Arc<dyn MessageHandler>,
    ) -> Self {
        let route = route.into();
        if self.routes.insert(route.clone(), handler).is_some() {
            warn!(route = %route, "Handler registration replaced an existing handler");
        } else {
            info!(route = %route, "Registered handler");
        }
        self
    }

    pub fn build(self) -> RouteTable {
        RouteTable {
            routes: self.routes,
        }
    }
}

/// Read-only routing table; freely shareable after construction.
pub struct RouteTable {
    routes: HashMap<String, Arc<dyn MessageHandler>>,
}

impl RouteTable {
    pub fn builder() -> RouteTableBuilder {
        RouteTableBuilder::default()
    }

    pub fn get(&self, route: &str) -> Option<&Arc<dyn MessageHandler>> {
        self.routes.get(route)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Check the table against the routes the producer is known to emit.
    /// Returns the missing routes and logs a startup warning for each;
    /// messages on a missing route will be dead-lettered at runtime.
    pub fn verify_routes(&self, expected: &[&str]) -> Vec<String> {
        let missing: Vec<String> = expected
            .iter()
            .filter(|route| !self.routes.contains_key(**route))
            .map(|route| (*route).to_string())
            .collect();

        for route in &missing {
            warn!(
                route = %route,
                "Producer route has no registered handler; its messages will be dead-lettered"
            );
        }

        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::handler::HandlerResult;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct NoopHandler;

    #[async_trait]
    impl MessageHandler for NoopHandler {
        async fn handle(&self, _payload: &Value) -> HandlerResult {
            Ok(json!({"ok": true}))
        }
    }

    #[test]
    fn test_lookup() {
        let table = RouteTable::builder()
            .register("process-podcast", Arc::new(NoopHandler))
            .build();

        assert_eq!(table.len(), 1);
        assert!(table.get("process-podcast").is_some());
        assert!(table.get("unknown-route").is_none());
    }

    #[test]
    fn test_verify_routes_reports_missing() {
        let table = RouteTable::builder()
            .register("process-podcast", Arc::new(NoopHandler))
            .build();

        let missing = table.verify_routes(&["process-podcast", "summarize-episode"]);
        assert_eq!(missing, vec!["summarize-episode".to_string()]);
    }

    #[test]
    fn test_verify_routes_complete() {
        let table = RouteTable::builder()
            .register("process-podcast", Arc::new(NoopHandler))
            .register("summarize-episode", Arc::new(NoopHandler))
            .build();

        assert!(table
            .verify_routes(&["process-podcast", "summarize-episode"])
            .is_empty());
    }
}
