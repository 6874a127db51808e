//! # Test Helpers
//!
//! In-memory fakes for the broker, the handlers, and the backing services.
//! Used by the unit and integration test suites so the full listener loop
//! can run without PostgreSQL or live HTTP endpoints.

pub mod handlers;
pub mod queue;
pub mod services;

pub use handlers::{RecordingHandler, ScriptedHandler};
pub use queue::InMemoryQueueDriver;
pub use services::{StubEmail, StubFeed, StubStore, StubSummarizer, StubTranscriber};
