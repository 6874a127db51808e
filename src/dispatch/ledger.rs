//! # Delivery Ledger
//!
//! Per-attempt bookkeeping for delivery tokens. A token is checked out when
//! its delivery is received and retired exactly once when the attempt is
//! finalized (completed, abandoned, or dead-lettered). Retiring a token
//! twice, or retiring a token that was never checked out, is an invariant
//! violation that must be surfaced rather than silently ignored.
//!
//! A token may legitimately reappear on a later delivery attempt (the
//! broker reuses message ids across redeliveries); checking it out again
//! clears its finalized state.

use std::collections::{HashSet, VecDeque};

use parking_lot::Mutex;
use thiserror::Error;

/// Broken delivery-token invariant. Fatal to the current message's
/// processing path, never to the listener loop.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("delivery token {token} was already finalized")]
    DoubleCompletion { token: i64 },

    #[error("unknown delivery token {token}")]
    UnknownToken { token: i64 },
}

// Retired tokens are only kept to tell double-completion apart from a
// token that was never seen; a bounded window of recent attempts suffices.
const RETIRED_WINDOW: usize = 4096;

#[derive(Default)]
struct LedgerState {
    in_flight: HashSet<i64>,
    retired: HashSet<i64>,
    retired_order: VecDeque<i64>,
}

/// Tracks the lifecycle of delivery tokens across attempts.
#[derive(Default)]
pub struct DeliveryLedger {
    state: Mutex<LedgerState>,
}

impl DeliveryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record receipt of a delivery attempt. A redelivered token is valid
    /// again from this point.
    pub fn check_out(&self, token: i64) {
        let mut state = self.state.lock();
        state.retired.remove(&token);
        state.in_flight.insert(token);
    }

    /// Record finalization of a delivery attempt.
    pub fn retire(&self, token: i64) -> Result<(), InvariantViolation> {
        let mut state = self.state.lock();

        if !state.in_flight.remove(&token) {
            if state.retired.contains(&token) {
                return Err(InvariantViolation::DoubleCompletion { token });
            }
            return Err(InvariantViolation::UnknownToken { token });
        }

        state.retired.insert(token);
        state.retired_order.push_back(token);
        while state.retired_order.len() > RETIRED_WINDOW {
            if let Some(old) = state.retired_order.pop_front() {
                state.retired.remove(&old);
            }
        }
        Ok(())
    }

    /// Number of attempts currently checked out.
    pub fn in_flight(&self) -> usize {
        self.state.lock().in_flight.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_lifecycle() {
        let ledger = DeliveryLedger::new();
        ledger.check_out(1);
        assert_eq!(ledger.in_flight(), 1);
        assert_eq!(ledger.retire(1), Ok(()));
        assert_eq!(ledger.in_flight(), 0);
    }

    #[test]
    fn test_double_completion_is_violation() {
        let ledger = DeliveryLedger::new();
        ledger.check_out(7);
        assert_eq!(ledger.retire(7), Ok(()));
        assert_eq!(
            ledger.retire(7),
            Err(InvariantViolation::DoubleCompletion { token: 7 })
        );
    }

    #[test]
    fn test_unknown_token_is_violation() {
        let ledger = DeliveryLedger::new();
        assert_eq!(
            ledger.retire(99),
            Err(InvariantViolation::UnknownToken { token: 99 })
        );
    }

    #[test]
    fn test_redelivered_token_is_valid_again() {
        let ledger = DeliveryLedger::new();
        ledger.check_out(3);
        assert_eq!(ledger.retire(3), Ok(()));

        // The broker redelivers the same message id after an abandon.
        ledger.check_out(3);
        assert_eq!(ledger.retire(3), Ok(()));
    }
}
