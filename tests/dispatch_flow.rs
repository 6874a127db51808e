//! Dispatcher outcome mapping, exercised through the public API.

use std::sync::Arc;

use serde_json::json;

use podcast_core::dispatch::{Dispatcher, Disposition, HandlerError, RouteTable};
use podcast_core::messaging::Delivery;
use podcast_core::test_helpers::{RecordingHandler, ScriptedHandler};

fn delivery(token: i64, delivery_count: i32, body: serde_json::Value) -> Delivery {
    Delivery {
        token,
        delivery_count,
        enqueued_at: chrono::Utc::now(),
        body,
    }
}

#[tokio::test]
async fn successful_handler_maps_to_complete() {
    let handler = RecordingHandler::new();
    let routes = RouteTable::builder()
        .register("process-podcast", handler.clone())
        .build();
    let dispatcher = Dispatcher::new(routes, 5);

    let body = json!({"targetEndpoint": "process-podcast", "feedUrl": "https://example.com/feed.xml"});
    let dispatch = dispatcher.dispatch(&delivery(1, 1, body)).await;

    assert_eq!(dispatch.disposition, Disposition::Complete);
    assert_eq!(handler.calls(), 1);
    // Routing fields are stripped before the handler sees the payload.
    assert_eq!(
        handler.payloads()[0],
        json!({"feedUrl": "https://example.com/feed.xml"})
    );
}

#[tokio::test]
async fn nested_envelope_dispatches_like_flat() {
    let handler = RecordingHandler::new();
    let routes = RouteTable::builder()
        .register("summarize-episode", handler.clone())
        .build();
    let dispatcher = Dispatcher::new(routes, 5);

    let body = json!({
        "payload": {"episodeId": "ep-1"},
        "metadata": {"correlationId": "c-1", "sourceEndpoint": "api"},
        "routing": {"targetEndpoint": "summarize-episode"}
    });
    let dispatch = dispatcher.dispatch(&delivery(1, 1, body)).await;

    assert_eq!(dispatch.disposition, Disposition::Complete);
    assert_eq!(handler.payloads()[0], json!({"episodeId": "ep-1"}));
}

#[tokio::test]
async fn unknown_route_dead_letters_without_invoking_any_handler() {
    let handler = RecordingHandler::new();
    let routes = RouteTable::builder()
        .register("process-podcast", handler.clone())
        .build();
    let dispatcher = Dispatcher::new(routes, 5);

    let body = json!({"targetEndpoint": "no-such-route", "x": 1});
    let dispatch = dispatcher.dispatch(&delivery(1, 1, body)).await;

    assert_eq!(dispatch.disposition, Disposition::DeadLetter);
    assert_eq!(handler.calls(), 0);
}

#[tokio::test]
async fn malformed_body_dead_letters() {
    let routes = RouteTable::builder()
        .register("process-podcast", RecordingHandler::new())
        .build();
    let dispatcher = Dispatcher::new(routes, 5);

    // No routing key anywhere.
    let dispatch = dispatcher.dispatch(&delivery(1, 1, json!({"just": "data"}))).await;
    assert_eq!(dispatch.disposition, Disposition::DeadLetter);

    // Not even an object.
    let dispatch = dispatcher.dispatch(&delivery(2, 1, json!("text"))).await;
    assert_eq!(dispatch.disposition, Disposition::DeadLetter);
}

#[tokio::test]
async fn transient_failure_abandons_below_the_delivery_limit() {
    let handler = ScriptedHandler::always_transient();
    let routes = RouteTable::builder().register("flaky", handler).build();
    let dispatcher = Dispatcher::new(routes, 5);

    for count in 1..5 {
        let body = json!({"targetEndpoint": "flaky"});
        let dispatch = dispatcher.dispatch(&delivery(1, count, body)).await;
        assert_eq!(dispatch.disposition, Disposition::Abandon, "attempt {count}");
    }
}

#[tokio::test]
async fn transient_failure_dead_letters_at_the_delivery_limit() {
    let handler = ScriptedHandler::always_transient();
    let routes = RouteTable::builder().register("flaky", handler).build();
    let dispatcher = Dispatcher::new(routes, 5);

    let body = json!({"targetEndpoint": "flaky"});
    let dispatch = dispatcher.dispatch(&delivery(1, 5, body)).await;
    assert_eq!(dispatch.disposition, Disposition::DeadLetter);
}

#[tokio::test]
async fn permanent_failure_dead_letters_on_first_attempt() {
    let handler = ScriptedHandler::always_permanent();
    let routes = RouteTable::builder().register("broken", handler.clone()).build();
    let dispatcher = Dispatcher::new(routes, 5);

    let body = json!({"targetEndpoint": "broken"});
    let dispatch = dispatcher.dispatch(&delivery(1, 1, body)).await;

    assert_eq!(dispatch.disposition, Disposition::DeadLetter);
    assert_eq!(handler.calls(), 1);
}

#[tokio::test]
async fn recovery_after_transient_failures_completes() {
    let handler = ScriptedHandler::new(vec![
        Err(HandlerError::transient("stub", "first attempt fails")),
        Ok(()),
    ]);
    let routes = RouteTable::builder().register("flaky", handler.clone()).build();
    let dispatcher = Dispatcher::new(routes, 5);

    let body = json!({"targetEndpoint": "flaky"});
    let first = dispatcher.dispatch(&delivery(1, 1, body.clone())).await;
    assert_eq!(first.disposition, Disposition::Abandon);

    let second = dispatcher.dispatch(&delivery(1, 2, body)).await;
    assert_eq!(second.disposition, Disposition::Complete);
    assert_eq!(handler.calls(), 2);
}

#[tokio::test]
async fn route_table_reports_missing_routes() {
    let routes = RouteTable::builder()
        .register("process-podcast", RecordingHandler::new())
        .build();

    let missing = routes.verify_routes(&["process-podcast", "upsert-podcast"]);
    assert_eq!(missing, vec!["upsert-podcast".to_string()]);
}

#[test]
fn route_table_register_accepts_arc_handlers() {
    let handler: Arc<RecordingHandler> = RecordingHandler::new();
    let routes = RouteTable::builder().register("r", handler).build();
    assert_eq!(routes.len(), 1);
}
