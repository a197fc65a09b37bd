//! # Validation Module
//!
//! Checks run at the engine's entry points, before a unit of work is opened.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP layer (outside workspace)                               │
//! │  ├── Request shape, auth token                                         │
//! │  └── Rejects self-transfers                                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: LedgerEngine entry points                                    │
//! │  └── THIS MODULE: amount > 0, usable item and account names            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (balance >= 0), CHECK (amount > 0), CHECK (price > 0)       │
//! │  ├── Foreign keys (inventory → accounts, catalog_items)                │
//! │  └── Triggers forbidding UPDATE/DELETE on transfers                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::coins::Coins;
use crate::error::ValidationError;
use crate::{MAX_ITEM_NAME_LEN, MAX_USERNAME_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validates a transfer amount and converts it to Coins.
///
/// ## Example
/// ```rust
/// use coinshop_core::validation::validate_amount;
///
/// assert_eq!(validate_amount(30).unwrap().value(), 30);
/// assert!(validate_amount(0).is_err());
/// assert!(validate_amount(-1).is_err());
/// ```
pub fn validate_amount(amount: i32) -> ValidationResult<Coins> {
    if amount <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
            value: i64::from(amount),
        });
    }

    Ok(Coins::from(amount))
}

/// Validates a username for account opening.
///
/// ## Rules
/// - Must not be empty
/// - At most [`MAX_USERNAME_LEN`] characters
/// - No whitespace or control characters
pub fn validate_username(username: &str) -> ValidationResult<()> {
    validate_name("username", username, MAX_USERNAME_LEN)
}

/// Validates a catalog item name before looking it up.
pub fn validate_item_name(item_name: &str) -> ValidationResult<()> {
    validate_name("item", item_name, MAX_ITEM_NAME_LEN)
}

fn validate_name(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must not contain whitespace".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
