//! Handler fakes for dispatch and listener tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::dispatch::{HandlerError, HandlerResult, MessageHandler};

/// Records every payload it receives and succeeds.
#[derive(Default)]
pub struct RecordingHandler {
    calls: AtomicUsize,
    payloads: Mutex<Vec<Value>>,
}

impl RecordingHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn payloads(&self) -> Vec<Value> {
        self.payloads.lock().clone()
    }
}

#[async_trait]
impl MessageHandler for RecordingHandler {
    async fn handle(&self, payload: &Value) -> HandlerResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.payloads.lock().push(payload.clone());
        Ok(json!({"ok": true}))
    }
}

/// Returns a scripted sequence of outcomes, one per call, repeating the
/// last entry once the script is exhausted.
pub struct ScriptedHandler {
    calls: AtomicUsize,
    script: Vec<Result<(), HandlerError>>,
}

impl ScriptedHandler {
    pub fn new(script: Vec<Result<(), HandlerError>>) -> Arc<Self> {
        assert!(!script.is_empty(), "script must have at least one outcome");
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            script,
        })
    }

    /// Fails transiently forever.
    pub fn always_transient() -> Arc<Self> {
        Self::new(vec![Err(HandlerError::transient("stub", "flaky"))])
    }

    /// Fails permanently forever.
    pub fn always_permanent() -> Arc<Self> {
        Self::new(vec![Err(HandlerError::permanent("stub", "broken"))])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageHandler for ScriptedHandler {
    async fn handle(&self, _payload: &Value) -> HandlerResult {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        let outcome = self
            .script
            .get(index)
            .unwrap_or_else(|| self.script.last().unwrap());
        match outcome {
            Ok(()) => Ok(json!({"ok": true})),
            Err(e) => Err(e.clone()),
        }
    }
}
