//! # Transfer Repository
//!
//! The append-only transfer log. Rows are inserted inside the same unit of
//! work as the balance move they describe and are never updated or deleted
//! (the schema's triggers refuse both).

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use crate::unit_of_work::UnitOfWork;
use coinshop_core::{Coins, TransferRecord};

/// Repository for the transfer log.
#[derive(Debug, Clone)]
pub struct TransferRepository {
    pool: SqlitePool,
}

impl TransferRepository {
    /// Creates a new TransferRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TransferRepository { pool }
    }

    /// Appends a transfer record inside `uow`.
    ///
    /// Id and timestamp are assigned here.
    pub async fn append(
        &self,
        uow: &mut UnitOfWork,
        from: &str,
        to: &str,
        amount: Coins,
    ) -> DbResult<TransferRecord> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        debug!(id = %id, from = %from, to = %to, amount = amount.value(), "Appending transfer");

        let record = sqlx::query_as::<_, TransferRecord>(
            r#"
            INSERT INTO transfers (id, from_username, to_username, amount, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING id, from_username, to_username, amount, created_at
            "#,
        )
        .bind(&id)
        .bind(from)
        .bind(to)
        .bind(amount.value())
        .bind(now)
        .fetch_one(uow.conn()?)
        .await?;

        Ok(record)
    }

    /// Lists every transfer an account sent or received, oldest first.
    pub async fn list_for_account(&self, username: &str) -> DbResult<Vec<TransferRecord>> {
        let records = sqlx::query_as::<_, TransferRecord>(
            r#"
            SELECT id, from_username, to_username, amount, created_at
            FROM transfers
            WHERE from_username = ?1 OR to_username = ?1
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Counts every record in the log.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transfers")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
