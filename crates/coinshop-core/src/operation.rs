//! # Operation Lifecycle
//!
//! Every engine invocation walks one path through this state machine.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Ledger Operation Lifecycle                          │
//! │                                                                         │
//! │  Started ─► Validating ─► Locking ─► Computing ─► Writing ─► Committed  │
//! │     │            │           │           │           │                  │
//! │     └────────────┴───────────┴─────┬─────┴───────────┘                  │
//! │                                    ▼                                    │
//! │                           Aborted(reason)                               │
//! │                                                                         │
//! │  • Forward skips are allowed (Transfer goes Locking ─► Writing)        │
//! │  • Committed is only reachable from Writing                            │
//! │  • Committed and Aborted are terminal                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, CoreResult};

/// Which mutating operation is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Transfer,
    Purchase,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Transfer => f.write_str("transfer"),
            OperationKind::Purchase => f.write_str("purchase"),
        }
    }
}

/// Why an operation ended without committing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortReason {
    InvalidAmount,
    InvalidItem,
    AccountNotFound,
    InsufficientFunds,
    DeadlineExceeded,
    StorageFailure,
}

/// Position of one operation in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationState {
    Started,
    Validating,
    Locking,
    Computing,
    Writing,
    Committed,
    Aborted(AbortReason),
}

impl OperationState {
    /// Returns true for Committed and Aborted.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, OperationState::Committed | OperationState::Aborted(_))
    }

    fn rank(&self) -> u8 {
        match self {
            OperationState::Started => 0,
            OperationState::Validating => 1,
            OperationState::Locking => 2,
            OperationState::Computing => 3,
            OperationState::Writing => 4,
            OperationState::Committed | OperationState::Aborted(_) => 5,
        }
    }

    /// Checks whether moving from `self` to `next` is allowed.
    pub fn can_transition_to(&self, next: OperationState) -> bool {
        if self.is_terminal() {
            return false;
        }

        match next {
            OperationState::Aborted(_) => true,
            OperationState::Committed => *self == OperationState::Writing,
            _ => next.rank() > self.rank(),
        }
    }
}

/// Tracks the lifecycle of a single engine invocation.
#[derive(Debug, Clone, Copy)]
pub struct Operation {
    kind: OperationKind,
    state: OperationState,
}

impl Operation {
    /// Starts tracking a new operation in the `Started` state.
    pub fn new(kind: OperationKind) -> Self {
        Operation {
            kind,
            state: OperationState::Started,
        }
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn state(&self) -> OperationState {
        self.state
    }

    /// Moves to `next`, rejecting transitions the lifecycle forbids.
    pub fn advance(&mut self, next: OperationState) -> CoreResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(CoreError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }

        self.state = next;
        Ok(())
    }

    /// Moves to `Aborted(reason)`.
    ///
    /// Aborting an already-terminal operation is a no-op so that cleanup paths
    /// can call this unconditionally. Returns true if the state changed.
    pub fn abort(&mut self, reason: AbortReason) -> bool {
        if self.state.is_terminal() {
            return false;
        }

        self.state = OperationState::Aborted(reason);
        true
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_purchase_happy_path() {
        let mut op = Operation::new(OperationKind::Purchase);
        for next in [
            OperationState::Validating,
            OperationState::Locking,
            OperationState::Computing,
            OperationState::Writing,
            OperationState::Committed,
        ] {
            op.advance(next).unwrap();
        }
        assert_eq!(op.state(), OperationState::Committed);
        assert!(op.state().is_terminal());
    }

    #[test]
    fn test_transfer_skips_computing() {
        let mut op = Operation::new(OperationKind::Transfer);
        op.advance(OperationState::Validating).unwrap();
        op.advance(OperationState::Locking).unwrap();
        op.advance(OperationState::Writing).unwrap();
        op.advance(OperationState::Committed).unwrap();
    }

    #[test]
    fn test_no_backwards_moves() {
        let mut op = Operation::new(OperationKind::Purchase);
        op.advance(OperationState::Writing).unwrap();

        let err = op.advance(OperationState::Locking).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }));
        assert_eq!(op.state(), OperationState::Writing);
    }

    #[test]
    fn test_commit_only_from_writing() {
        let mut op = Operation::new(OperationKind::Purchase);
        op.advance(OperationState::Computing).unwrap();
        assert!(op.advance(OperationState::Committed).is_err());
    }

    #[test]
    fn test_abort_from_any_live_state() {
        let mut op = Operation::new(OperationKind::Transfer);
        op.advance(OperationState::Locking).unwrap();
        assert!(op.abort(AbortReason::AccountNotFound));
        assert_eq!(
            op.state(),
            OperationState::Aborted(AbortReason::AccountNotFound)
        );
    }

    #[test]
    fn test_terminal_states_are_absorbing() {
        let mut op = Operation::new(OperationKind::Purchase);
        op.abort(AbortReason::InsufficientFunds);

        assert!(!op.abort(AbortReason::StorageFailure));
        assert!(op.advance(OperationState::Writing).is_err());
        assert_eq!(
            op.state(),
            OperationState::Aborted(AbortReason::InsufficientFunds)
        );

        let mut committed = Operation::new(OperationKind::Transfer);
        committed.advance(OperationState::Writing).unwrap();
        committed.advance(OperationState::Committed).unwrap();
        assert!(!committed.abort(AbortReason::StorageFailure));
        assert_eq!(committed.kind(), OperationKind::Transfer);
    }
}
