//! # Repository Module
//!
//! Database repository implementations for the ledger store.
//!
//! ## Two Kinds of Method
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 Pool reads vs. unit-of-work calls                       │
//! │                                                                         │
//! │  repo.get("alice")                       ← runs on any pooled conn     │
//! │       │                                    sees last committed state   │
//! │       │                                    never feeds a mutation       │
//! │                                                                         │
//! │  repo.get_for_exclusive_read(&mut uow, "alice")                        │
//! │  repo.set_balance(&mut uow, "alice", 90)  ← runs on uow's connection   │
//! │  inventory.increment_ownership(&mut uow, ..)  commits or rolls back    │
//! │                                               with everything else     │
//! │                                               in that unit of work     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`AccountRepository`](account::AccountRepository) - Balances, locking read, combined transfer
//! - [`CatalogRepository`](catalog::CatalogRepository) - Item prices
//! - [`InventoryRepository`](inventory::InventoryRepository) - Ownership counters
//! - [`TransferRepository`](transfer::TransferRepository) - Append-only transfer log

pub mod account;
pub mod catalog;
pub mod inventory;
pub mod transfer;
