//! # Error Types
//!
//! Errors for store access and for the ledger engine's outcomes.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError ← Adds context and categorization                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  LedgerError::StorageFailure ← alongside the business outcomes         │
//! │       │                        (InvalidAmount, InsufficientFunds, ...) │
//! │       ▼                                                                 │
//! │  ErrorKind ← Stable category the HTTP layer branches on                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use coinshop_core::{AbortReason, CoreError, ValidationError};
use thiserror::Error;

// =============================================================================
// Database Errors
// =============================================================================

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - Inventory row for an account or item that doesn't exist
    /// - Transfer record naming an unknown account
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// CHECK constraint violation.
    ///
    /// ## When This Occurs
    /// - A write that would leave a balance below zero
    /// - A non-positive transfer amount or price
    #[error("Check constraint violation: {message}")]
    CheckViolation { message: String },

    /// Another connection held the write lock past the busy timeout.
    #[error("Database busy: {0}")]
    Busy(String),

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction begin, commit or rollback failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type / lock
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite constraint messages:
                // "UNIQUE constraint failed: <table>.<column>"
                // "FOREIGN KEY constraint failed"
                // "CHECK constraint failed: <expr>"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("CHECK constraint failed") {
                    DbError::CheckViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("database is locked") || msg.contains("database is busy") {
                    DbError::Busy(msg.to_string())
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Ledger Errors
// =============================================================================

/// Stable outcome categories callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller input defect (bad amount, unknown item). Never retried.
    Validation,
    /// Account absent. Surfaced as-is.
    NotFound,
    /// Expected business outcome, not a defect.
    InsufficientFunds,
    /// Store problem or expired deadline. The core never retries writes.
    StorageFailure,
}

/// Everything a ledger operation can end with besides success.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(#[source] ValidationError),

    #[error("Invalid item: {0}")]
    InvalidItem(String),

    #[error("Invalid username: {0}")]
    InvalidUsername(#[source] ValidationError),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Insufficient funds for {username}: balance {balance}, required {required}")]
    InsufficientFunds {
        username: String,
        balance: i64,
        required: i64,
    },

    /// The caller's deadline passed before the unit of work committed.
    #[error("Operation deadline exceeded")]
    DeadlineExceeded,

    #[error("Storage failure: {0}")]
    StorageFailure(#[from] DbError),

    /// Engine defect: an impossible lifecycle transition or arithmetic overflow.
    #[error("Ledger invariant violated: {0}")]
    Invariant(#[from] CoreError),
}

impl LedgerError {
    /// Returns the category of this outcome.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::InvalidAmount(_)
            | LedgerError::InvalidItem(_)
            | LedgerError::InvalidUsername(_) => ErrorKind::Validation,
            LedgerError::AccountNotFound(_) => ErrorKind::NotFound,
            LedgerError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            LedgerError::DeadlineExceeded
            | LedgerError::StorageFailure(_)
            | LedgerError::Invariant(_) => ErrorKind::StorageFailure,
        }
    }

    /// Returns the reason recorded on the aborted operation.
    pub fn abort_reason(&self) -> AbortReason {
        match self {
            LedgerError::InvalidAmount(_) => AbortReason::InvalidAmount,
            LedgerError::InvalidItem(_) => AbortReason::InvalidItem,
            LedgerError::InvalidUsername(_) | LedgerError::AccountNotFound(_) => {
                AbortReason::AccountNotFound
            }
            LedgerError::InsufficientFunds { .. } => AbortReason::InsufficientFunds,
            LedgerError::DeadlineExceeded => AbortReason::DeadlineExceeded,
            LedgerError::StorageFailure(_) | LedgerError::Invariant(_) => {
                AbortReason::StorageFailure
            }
        }
    }
}

/// Result type for ledger engine operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

// =============================================================================
// Unit Tests
// =============================================================================
