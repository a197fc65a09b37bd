//! # coinshop-core: Pure Domain Logic for the Coin Shop Ledger
//!
//! This crate holds the rules of the coin ledger as pure functions and plain
//! types. It has zero I/O dependencies; the store and the transaction engine
//! live in `coinshop-db`.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Coin Shop Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            HTTP / Auth / Sessions (outside workspace)           │   │
//! │  │    /api/auth ──► /api/sendCoin ──► /api/buy/{item} ──► /api/info│   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ authenticated username                 │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              coinshop-db (LedgerEngine + repositories)          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ coinshop-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   coins   │  │ operation │  │ validation│  │   │
//! │  │   │  Account  │  │   Coins   │  │  states   │  │   rules   │  │   │
//! │  │   │  Transfer │  │  debit    │  │  aborts   │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain records (Account, CatalogItem, InventoryEntry, TransferRecord)
//! - [`coins`] - Coin amount type with checked arithmetic
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation for engine entry points
//! - [`operation`] - Per-invocation state machine of a ledger operation
//!
//! ## Example Usage
//!
//! ```rust
//! use coinshop_core::coins::Coins;
//!
//! let balance = Coins::new(100);
//! let after = balance.debit(Coins::new(30)).unwrap();
//! assert_eq!(after.value(), 70);
//!
//! // Overdrafts are refused, never wrapped
//! assert!(Coins::new(10).debit(Coins::new(15)).is_err());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod coins;
pub mod error;
pub mod operation;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use coins::Coins;
pub use error::{CoreError, CoreResult, ValidationError};
pub use operation::{AbortReason, Operation, OperationKind, OperationState};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Balance given to an account when it is opened on first authentication.
pub const STARTING_BALANCE: i64 = 1000;

/// Maximum length of a username.
pub const MAX_USERNAME_LEN: usize = 64;

/// Maximum length of a catalog item name.
pub const MAX_ITEM_NAME_LEN: usize = 64;
