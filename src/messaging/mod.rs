//! # Messaging Module
//!
//! Broker client and wire contract for the request queue: the envelope
//! format shared with the REST producer, the [`QueueDriver`] seam, and the
//! pgmq-backed implementation.

pub mod driver;
pub mod errors;
pub mod message;
pub mod pgmq_driver;

pub use driver::{Delivery, QueueDriver};
pub use errors::{MessagingError, MessagingResult};
pub use message::{EnvelopeError, EnvelopeMetadata, QueueEnvelope};
pub use pgmq_driver::PgmqQueueDriver;
