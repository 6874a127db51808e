//! # Podcast Dispatch Core
//!
//! Queue-driven message dispatch core for the podcast summarizer service.
//! A [`listener::QueueListener`] polls a durable pgmq queue on PostgreSQL,
//! a [`dispatch::Dispatcher`] routes each envelope by its `targetEndpoint`
//! routing key to one registered [`dispatch::MessageHandler`], and the
//! handler outcome maps to exactly one broker disposition: complete,
//! abandon for redelivery, or dead-letter.
//!
//! ## Delivery model
//!
//! The broker guarantees at-least-once delivery; handlers are written to
//! converge under replay. Transient failures are retried up to a bounded
//! delivery count, permanent failures and unroutable messages dead-letter
//! immediately, and broker connectivity loss triggers exponential backoff
//! without consuming delivery attempts.

pub mod config;
pub mod constants;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod listener;
pub mod logging;
pub mod messaging;
pub mod models;
pub mod services;
pub mod test_helpers;

pub use config::AppConfig;
pub use dispatch::{Dispatcher, RouteTable};
pub use error::{PodcastCoreError, Result};
pub use listener::{ListenerConfig, ListenerHandle, QueueListener};
pub use messaging::{PgmqQueueDriver, QueueDriver, QueueEnvelope};
