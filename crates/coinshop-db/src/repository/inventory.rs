//! # Inventory Repository
//!
//! Per-account ownership counters.
//!
//! ## Increment Semantics
//! ```text
//! (alice, cup) absent   ── increment ──►  (alice, cup, quantity 1)
//! (alice, cup, 3)       ── increment ──►  (alice, cup, quantity 4)
//! ```
//! A single upsert statement, so two purchases of the same item never race
//! on "does the row exist yet".

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use crate::unit_of_work::UnitOfWork;
use coinshop_core::InventoryEntry;

/// Repository for inventory operations.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    /// Creates a new InventoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Adds one unit of `item_name` to `username`'s inventory inside `uow`.
    ///
    /// ## Returns
    /// * `Err(DbError::ForeignKeyViolation)` - Unknown account or item
    pub async fn increment_ownership(
        &self,
        uow: &mut UnitOfWork,
        username: &str,
        item_name: &str,
    ) -> DbResult<InventoryEntry> {
        debug!(username = %username, item = %item_name, "Incrementing ownership");

        let now = Utc::now();

        let entry = sqlx::query_as::<_, InventoryEntry>(
            r#"
            INSERT INTO inventory (username, item_name, quantity, updated_at)
            VALUES (?1, ?2, 1, ?3)
            ON CONFLICT (username, item_name)
            DO UPDATE SET quantity = inventory.quantity + 1, updated_at = excluded.updated_at
            RETURNING username, item_name, quantity, updated_at
            "#,
        )
        .bind(username)
        .bind(item_name)
        .bind(now)
        .fetch_one(uow.conn()?)
        .await?;

        Ok(entry)
    }

    /// Reads one counter. `None` means the account never bought the item.
    pub async fn get(&self, username: &str, item_name: &str) -> DbResult<Option<InventoryEntry>> {
        let entry = sqlx::query_as::<_, InventoryEntry>(
            r#"
            SELECT username, item_name, quantity, updated_at
            FROM inventory
            WHERE username = ?1 AND item_name = ?2
            "#,
        )
        .bind(username)
        .bind(item_name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Lists everything an account owns, by item name.
    pub async fn list_for_account(&self, username: &str) -> DbResult<Vec<InventoryEntry>> {
        let entries = sqlx::query_as::<_, InventoryEntry>(
            r#"
            SELECT username, item_name, quantity, updated_at
            FROM inventory
            WHERE username = ?1
            ORDER BY item_name ASC
            "#,
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}
