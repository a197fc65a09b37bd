//! # Error Types
//!
//! Domain-specific error types for coinshop-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  coinshop-core errors (this file)                                      │
//! │  ├── CoreError        - Domain rule violations                         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  coinshop-db errors (separate crate)                                   │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── LedgerError      - What the engine returns to callers             │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → LedgerError → HTTP layer          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::operation::OperationState;

// =============================================================================
// Core Error
// =============================================================================

/// Core domain errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A debit would drive a balance below zero.
    ///
    /// ## When This Occurs
    /// - Purchasing an item priced above the current balance
    /// - Sending more coins than the sender holds
    ///
    /// This is an expected business outcome, not a defect.
    #[error("Insufficient funds: balance {balance}, required {required}")]
    InsufficientFunds { balance: i64, required: i64 },

    /// Adding coins overflowed the balance representation.
    #[error("Balance overflow: {balance} + {amount}")]
    BalanceOverflow { balance: i64, amount: i64 },

    /// An operation tried to move between states in a way the lifecycle forbids.
    ///
    /// ## When This Occurs
    /// - Leaving a terminal state (Committed or Aborted)
    /// - Moving backwards (Writing → Locking)
    /// - Committing from anywhere other than Writing
    #[error("Invalid operation transition: {from:?} → {to:?}")]
    InvalidTransition {
        from: OperationState,
        to: OperationState,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any store access so a bad request never opens a unit of work.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be positive.
    #[error("{field} must be positive, got {value}")]
    MustBePositive { field: String, value: i64 },

    /// Invalid format.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
