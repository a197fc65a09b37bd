//! # coinshop-db: Ledger Store and Transaction Engine
//!
//! This crate owns every read and write against the coin shop's ledger.
//! It uses SQLite for storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Coin Shop Data Flow                              │
//! │                                                                         │
//! │  HTTP handler (authenticated actor)                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   coinshop-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐                                             │   │
//! │  │   │ LedgerEngine  │  transfer / purchase / open / summary       │   │
//! │  │   │ (engine.rs)   │                                             │   │
//! │  │   └───────┬───────┘                                             │   │
//! │  │           │ one UnitOfWork per mutation                         │   │
//! │  │           ▼                                                     │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ AccountRepo   │    │  (embedded)  │  │   │
//! │  │   │               │◄───│ CatalogRepo   │    │ 001_ledger   │  │   │
//! │  │   │ SqlitePool    │    │ InventoryRepo │    │ 002_merch    │  │   │
//! │  │   │ UnitOfWork    │    │ TransferRepo  │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`engine`] - Transfer and purchase orchestration
//! - [`unit_of_work`] - RAII transaction guard
//! - [`pool`] - Connection pool creation and configuration
//! - [`config`] - Environment-driven settings
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Store and ledger error types
//! - [`repository`] - Repository implementations (account, catalog, ...)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use coinshop_db::{LedgerConfig, LedgerEngine};
//!
//! let engine = LedgerEngine::connect(LedgerConfig::from_env()?).await?;
//!
//! engine.open_account("alice").await?;
//! engine.open_account("bob").await?;
//!
//! let deadline = engine.default_deadline();
//! engine.transfer("alice", "bob", 30, deadline).await?;
//! engine.purchase("alice", "cup", deadline).await?;
//!
//! let summary = engine.account_summary("alice").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod engine;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod unit_of_work;

#[cfg(test)]
pub(crate) mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, LedgerConfig};
pub use engine::LedgerEngine;
pub use error::{DbError, DbResult, ErrorKind, LedgerError, LedgerResult};
pub use pool::{Database, DbConfig};
pub use unit_of_work::UnitOfWork;

// Repository re-exports for convenience
pub use repository::account::{AccountRepository, BalanceMove};
pub use repository::catalog::CatalogRepository;
pub use repository::inventory::InventoryRepository;
pub use repository::transfer::TransferRepository;
