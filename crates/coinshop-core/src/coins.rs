//! # Coins Module
//!
//! Provides the `Coins` type for balances, prices and transfer amounts.
//!
//! ## Why a Newtype?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BALANCE ARITHMETIC RULES                                               │
//! │                                                                         │
//! │  Coins are whole numbers. There are no fractional coins.               │
//! │                                                                         │
//! │  Debits never wrap and never go negative:                              │
//! │    10 - 15  → Err(InsufficientFunds)   (not -5, not u64::MAX - 4)      │
//! │                                                                         │
//! │  Credits never overflow silently:                                      │
//! │    i64::MAX + 1 → Err(BalanceOverflow)                                 │
//! │                                                                         │
//! │  The database enforces the same floor with CHECK (balance >= 0).       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

/// A whole number of coins.
///
/// Stored as `i64` to match SQLite's INTEGER column; a committed balance is
/// never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Coins(i64);

impl Coins {
    /// Wraps a raw coin count.
    #[inline]
    pub const fn new(value: i64) -> Self {
        Coins(value)
    }

    /// Returns the raw coin count.
    #[inline]
    pub const fn value(&self) -> i64 {
        self.0
    }

    /// Returns zero coins.
    #[inline]
    pub const fn zero() -> Self {
        Coins(0)
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Subtracts `amount`, refusing results below zero.
    ///
    /// ## Example
    /// ```rust
    /// use coinshop_core::coins::Coins;
    ///
    /// assert_eq!(Coins::new(100).debit(Coins::new(100)).unwrap(), Coins::zero());
    /// assert!(Coins::new(99).debit(Coins::new(100)).is_err());
    /// ```
    pub fn debit(self, amount: Coins) -> CoreResult<Coins> {
        match self.0.checked_sub(amount.0) {
            Some(remaining) if remaining >= 0 => Ok(Coins(remaining)),
            _ => Err(CoreError::InsufficientFunds {
                balance: self.0,
                required: amount.0,
            }),
        }
    }

    /// Adds `amount`, refusing to overflow.
    pub fn credit(self, amount: Coins) -> CoreResult<Coins> {
        self.0
            .checked_add(amount.0)
            .map(Coins)
            .ok_or(CoreError::BalanceOverflow {
                balance: self.0,
                amount: amount.0,
            })
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} coins", self.0)
    }
}

impl Default for Coins {
    fn default() -> Self {
        Coins::zero()
    }
}

impl From<i64> for Coins {
    fn from(value: i64) -> Self {
        Coins(value)
    }
}

impl From<i32> for Coins {
    fn from(value: i32) -> Self {
        Coins(i64::from(value))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
