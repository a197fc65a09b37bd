//! # Unit of Work
//!
//! One SQLite transaction bound to one ledger operation.
//!
//! ## Exit Paths
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  How a UnitOfWork can end                               │
//! │                                                                         │
//! │  db.begin(kind) ──► UnitOfWork { tx, operation: Started }              │
//! │       │                                                                 │
//! │       ├── commit()        → COMMIT      → Committed                    │
//! │       │                                                                 │
//! │       ├── abort(reason)   → ROLLBACK    → Aborted(reason)              │
//! │       │                                                                 │
//! │       └── dropped         → ROLLBACK    → Aborted(StorageFailure)      │
//! │            (`?` early return, panic unwinding, deadline cancelling     │
//! │             the future, commit state check failing)                    │
//! │                                                                         │
//! │  No path leaves a partially applied write visible to anyone else.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! SQLite begins transactions DEFERRED: no lock is taken until the first
//! statement. Every engine operation makes a write its first statement, so
//! the writer lock is acquired (waiting on `busy_timeout`) before anything is
//! read, and is held until the unit of work ends.

use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::time::Instant;
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use coinshop_core::{AbortReason, CoreResult, Operation, OperationKind, OperationState};

/// RAII guard over one transaction and the lifecycle of its operation.
pub struct UnitOfWork {
    tx: Option<Transaction<'static, Sqlite>>,
    operation: Operation,
    opened_at: Instant,
}

impl UnitOfWork {
    pub(crate) async fn begin(pool: &SqlitePool, kind: OperationKind) -> DbResult<Self> {
        let tx = pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        debug!(operation = %kind, "Unit of work opened");

        Ok(UnitOfWork {
            tx: Some(tx),
            operation: Operation::new(kind),
            opened_at: Instant::now(),
        })
    }

    /// The connection every repository call in this unit of work runs on.
    pub fn conn(&mut self) -> DbResult<&mut SqliteConnection> {
        self.tx
            .as_deref_mut()
            .ok_or_else(|| DbError::TransactionFailed("unit of work already finished".to_string()))
    }

    pub fn kind(&self) -> OperationKind {
        self.operation.kind()
    }

    pub fn state(&self) -> OperationState {
        self.operation.state()
    }

    /// Moves the operation to its next lifecycle state.
    pub fn advance(&mut self, next: OperationState) -> CoreResult<()> {
        self.operation.advance(next)
    }

    /// Commits every write made in this unit of work.
    ///
    /// Only an operation in the `Writing` state may commit; otherwise the
    /// transaction is rolled back and an error returned.
    pub async fn commit(mut self) -> DbResult<()> {
        if let Err(e) = self.operation.advance(OperationState::Committed) {
            return Err(DbError::TransactionFailed(e.to_string()));
        }

        let tx = self
            .tx
            .take()
            .ok_or_else(|| DbError::TransactionFailed("unit of work already finished".to_string()))?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        debug!(
            operation = %self.operation.kind(),
            elapsed_ms = self.opened_at.elapsed().as_millis() as u64,
            "Unit of work committed"
        );
        Ok(())
    }

    /// Rolls back every write made in this unit of work.
    pub async fn abort(mut self, reason: AbortReason) -> DbResult<()> {
        self.operation.abort(reason);

        if let Some(tx) = self.tx.take() {
            tx.rollback()
                .await
                .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        }

        debug!(
            operation = %self.operation.kind(),
            reason = ?reason,
            elapsed_ms = self.opened_at.elapsed().as_millis() as u64,
            "Unit of work rolled back"
        );
        Ok(())
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        // Dropping the sqlx transaction queues the ROLLBACK on its connection.
        if self.tx.take().is_some() {
            let last_state = self.operation.state();
            self.operation.abort(AbortReason::StorageFailure);
            warn!(
                operation = %self.operation.kind(),
                last_state = ?last_state,
                elapsed_ms = self.opened_at.elapsed().as_millis() as u64,
                "Unit of work dropped before commit, rolling back"
            );
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::memory_db;

    async fn insert_probe(uow: &mut UnitOfWork) {
        sqlx::query(
            "INSERT INTO accounts (username, balance, created_at, updated_at) \
             VALUES ('probe', 5, '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
        )
        .execute(uow.conn().unwrap())
        .await
        .unwrap();
    }

    async fn probe_exists(db: &crate::Database) -> bool {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts WHERE username = 'probe'")
            .fetch_one(db.pool())
            .await
            .unwrap();
        count == 1
    }

    #[tokio::test]
    async fn test_commit_makes_writes_visible() {
        let db = memory_db().await;
        let mut uow = db.begin(OperationKind::Purchase).await.unwrap();
        insert_probe(&mut uow).await;
        uow.advance(OperationState::Writing).unwrap();
        uow.commit().await.unwrap();

        assert!(probe_exists(&db).await);
    }

    #[tokio::test]
    async fn test_explicit_abort_rolls_back() {
        let db = memory_db().await;
        let mut uow = db.begin(OperationKind::Purchase).await.unwrap();
        insert_probe(&mut uow).await;
        uow.abort(AbortReason::InsufficientFunds).await.unwrap();

        assert!(!probe_exists(&db).await);
    }

    #[tokio::test]
    async fn test_drop_rolls_back() {
        let db = memory_db().await;
        {
            let mut uow = db.begin(OperationKind::Transfer).await.unwrap();
            insert_probe(&mut uow).await;
            uow.advance(OperationState::Writing).unwrap();
        }

        assert!(!probe_exists(&db).await);
    }

    #[tokio::test]
    async fn test_commit_outside_writing_rolls_back() {
        let db = memory_db().await;
        let mut uow = db.begin(OperationKind::Purchase).await.unwrap();
        insert_probe(&mut uow).await;
        uow.advance(OperationState::Locking).unwrap();

        let err = uow.commit().await.unwrap_err();
        assert!(matches!(err, DbError::TransactionFailed(_)));
        assert!(!probe_exists(&db).await);
    }
}
