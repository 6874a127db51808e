//! # Dispatch Module
//!
//! Routing and outcome normalization: the handler contract, the immutable
//! route table, the dispatcher's acknowledge/abandon/dead-letter decision,
//! and delivery-token bookkeeping.

pub mod dispatcher;
pub mod handler;
pub mod ledger;
pub mod route_table;

pub use dispatcher::{Dispatch, Dispatcher, Disposition};
pub use handler::{parse_payload, HandlerError, HandlerResult, MessageHandler};
pub use ledger::{DeliveryLedger, InvariantViolation};
pub use route_table::{RouteTable, RouteTableBuilder};
