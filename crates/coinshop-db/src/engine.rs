//! # Ledger Transaction Engine
//!
//! Moves coins between balances (transfer) and from a balance into an
//! inventory entry (purchase), each inside exactly one unit of work.
//!
//! ## Transfer
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  transfer(alice, bob, 30, deadline)                                     │
//! │       │                                                                 │
//! │       ├─ amount <= 0 ──────────────────────────► InvalidAmount          │
//! │       ▼                                          (store never touched)  │
//! │  BEGIN                                     Started → Validating         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  UPDATE accounts ... WHERE both exist      → Locking → Writing          │
//! │                   AND alice.balance >= 30                               │
//! │                   AND bob.balance + 30 fits                             │
//! │       │                                                                 │
//! │       ├─ AccountMissing ───── ROLLBACK ────────► AccountNotFound        │
//! │       ├─ InsufficientFunds ── ROLLBACK ────────► InsufficientFunds      │
//! │       ├─ CreditOverflow ───── ROLLBACK ────────► Invariant (overflow)   │
//! │       ▼                                                                 │
//! │  INSERT INTO transfers                                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT                                    → Committed                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Purchase
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  purchase(alice, "cup", deadline)                                       │
//! │       │                                                                 │
//! │       ├─ catalog lookup (pool read) ── unknown ► InvalidItem            │
//! │       ▼                                                                 │
//! │  BEGIN                                     Started → Validating         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  locking read of alice (writer hold)       → Locking                    │
//! │       ├─ absent ───────────── ROLLBACK ────────► AccountNotFound        │
//! │       ▼                                                                 │
//! │  balance - price                           → Computing                  │
//! │       ├─ negative ─────────── ROLLBACK ────────► InsufficientFunds      │
//! │       ▼                                                                 │
//! │  set_balance + increment_ownership         → Writing                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT                                    → Committed                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Deadlines
//! Every mutating call takes a `tokio::time::Instant`. When it passes, the
//! in-flight future is dropped, which drops its `UnitOfWork`, which rolls
//! back. The caller sees `DeadlineExceeded`; nothing partial is visible.
//!
//! Neither operation is idempotent and neither retries.

use std::future::Future;

use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::config::LedgerConfig;
use crate::error::{DbError, ErrorKind, LedgerError, LedgerResult};
use crate::pool::Database;
use crate::repository::account::BalanceMove;
use crate::unit_of_work::UnitOfWork;
use coinshop_core::validation::{validate_amount, validate_item_name, validate_username};
use coinshop_core::{
    Account, AccountSummary, Coins, CoreError, InventoryEntry, OperationKind, OperationState,
    TransferRecord,
};

/// Entry point for every balance mutation.
///
/// Cloning is cheap: clones share the same pool.
#[derive(Debug, Clone)]
pub struct LedgerEngine {
    db: Database,
    config: LedgerConfig,
}

impl LedgerEngine {
    pub fn new(db: Database, config: LedgerConfig) -> Self {
        LedgerEngine { db, config }
    }

    /// Opens the store described by `config` and wraps it in an engine.
    pub async fn connect(config: LedgerConfig) -> LedgerResult<Self> {
        let db = Database::new(config.db_config()).await?;
        Ok(LedgerEngine::new(db, config))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Deadline for callers that have none of their own.
    pub fn default_deadline(&self) -> Instant {
        Instant::now() + self.config.operation_timeout
    }

    // =========================================================================
    // Transfer
    // =========================================================================

    /// Moves `amount` coins from `actor` to `recipient`.
    ///
    /// A transfer to oneself is allowed: balances stay put, the funds guard
    /// still applies and a record is still written.
    pub async fn transfer(
        &self,
        actor: &str,
        recipient: &str,
        amount: i32,
        deadline: Instant,
    ) -> LedgerResult<TransferRecord> {
        let amount = validate_amount(amount).map_err(LedgerError::InvalidAmount)?;

        let result = within(deadline, self.run_transfer(actor, recipient, amount)).await;

        match &result {
            Ok(record) => info!(
                id = %record.id,
                from = %actor,
                to = %recipient,
                amount = record.amount,
                "Transfer committed"
            ),
            Err(e) => log_refusal(OperationKind::Transfer, actor, e),
        }

        result
    }

    async fn run_transfer(
        &self,
        actor: &str,
        recipient: &str,
        amount: Coins,
    ) -> LedgerResult<TransferRecord> {
        let mut uow = self.db.begin(OperationKind::Transfer).await?;
        uow.advance(OperationState::Validating)?;

        // The combined statement is the first write: it takes the writer hold
        // and writes in one step, so Locking and Writing share it.
        uow.advance(OperationState::Locking)?;
        uow.advance(OperationState::Writing)?;
        let moved = self
            .db
            .accounts()
            .apply_combined_transfer(&mut uow, actor, recipient, amount)
            .await?;

        match moved {
            BalanceMove::Applied { debited, credited } => {
                debug!(
                    from_balance = debited.balance,
                    to_balance = credited.balance,
                    "Balances moved"
                );
            }
            BalanceMove::AccountMissing { username } => {
                return refuse(uow, LedgerError::AccountNotFound(username)).await;
            }
            BalanceMove::InsufficientFunds { available } => {
                return refuse(
                    uow,
                    LedgerError::InsufficientFunds {
                        username: actor.to_string(),
                        balance: available,
                        required: amount.value(),
                    },
                )
                .await;
            }
            BalanceMove::CreditOverflow { balance, .. } => {
                return refuse(
                    uow,
                    LedgerError::Invariant(CoreError::BalanceOverflow {
                        balance,
                        amount: amount.value(),
                    }),
                )
                .await;
            }
        }

        let record = self
            .db
            .transfers()
            .append(&mut uow, actor, recipient, amount)
            .await?;

        uow.commit().await?;
        Ok(record)
    }

    // =========================================================================
    // Purchase
    // =========================================================================

    /// Buys one unit of `item_name` for `actor` at its catalog price.
    pub async fn purchase(
        &self,
        actor: &str,
        item_name: &str,
        deadline: Instant,
    ) -> LedgerResult<InventoryEntry> {
        validate_item_name(item_name).map_err(|_| LedgerError::InvalidItem(item_name.to_string()))?;

        let result = within(deadline, self.run_purchase(actor, item_name)).await;

        match &result {
            Ok(entry) => info!(
                username = %actor,
                item = %entry.item_name,
                quantity = entry.quantity,
                "Purchase committed"
            ),
            Err(e) => log_refusal(OperationKind::Purchase, actor, e),
        }

        result
    }

    async fn run_purchase(&self, actor: &str, item_name: &str) -> LedgerResult<InventoryEntry> {
        // Prices are reference data; reading them outside the unit of work is fine.
        let item = self
            .db
            .catalog()
            .get(item_name)
            .await?
            .filter(|item| item.price().is_positive())
            .ok_or_else(|| LedgerError::InvalidItem(item_name.to_string()))?;

        let accounts = self.db.accounts();

        let mut uow = self.db.begin(OperationKind::Purchase).await?;
        uow.advance(OperationState::Validating)?;

        uow.advance(OperationState::Locking)?;
        let account = match accounts.get_for_exclusive_read(&mut uow, actor).await {
            Ok(account) => account,
            Err(DbError::NotFound { .. }) => {
                return refuse(uow, LedgerError::AccountNotFound(actor.to_string())).await;
            }
            Err(e) => return Err(e.into()),
        };

        uow.advance(OperationState::Computing)?;
        let new_balance = match account.balance().debit(item.price()) {
            Ok(balance) => balance,
            Err(CoreError::InsufficientFunds { balance, required }) => {
                return refuse(
                    uow,
                    LedgerError::InsufficientFunds {
                        username: actor.to_string(),
                        balance,
                        required,
                    },
                )
                .await;
            }
            Err(e) => return Err(e.into()),
        };

        uow.advance(OperationState::Writing)?;
        accounts.set_balance(&mut uow, actor, new_balance).await?;
        let entry = self
            .db
            .inventory()
            .increment_ownership(&mut uow, actor, &item.name)
            .await?;

        uow.commit().await?;
        Ok(entry)
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    /// Returns the account, creating it with the configured starting balance
    /// on first use.
    pub async fn open_account(&self, username: &str) -> LedgerResult<Account> {
        validate_username(username).map_err(LedgerError::InvalidUsername)?;

        let (account, created) = self
            .db
            .accounts()
            .get_or_create(username, self.config.starting_balance())
            .await?;

        if created {
            info!(username = %username, balance = account.balance, "Account opened");
        }

        Ok(account)
    }

    /// Balance, inventory and coin history of one account.
    ///
    /// Reads committed state only; takes no unit of work.
    pub async fn account_summary(&self, username: &str) -> LedgerResult<AccountSummary> {
        let account = match self.db.accounts().get(username).await {
            Ok(account) => account,
            Err(DbError::NotFound { .. }) => {
                return Err(LedgerError::AccountNotFound(username.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let inventory = self.db.inventory().list_for_account(username).await?;
        let transfers = self.db.transfers().list_for_account(username).await?;

        Ok(AccountSummary::build(&account, &inventory, &transfers))
    }
}

/// Runs `op` until `deadline`, turning expiry into `DeadlineExceeded`.
async fn within<T, F>(deadline: Instant, op: F) -> LedgerResult<T>
where
    F: Future<Output = LedgerResult<T>>,
{
    if Instant::now() >= deadline {
        return Err(LedgerError::DeadlineExceeded);
    }

    timeout_at(deadline, op)
        .await
        .unwrap_or(Err(LedgerError::DeadlineExceeded))
}

/// Rolls back `uow` and returns the business outcome that caused it.
async fn refuse<T>(uow: UnitOfWork, err: LedgerError) -> LedgerResult<T> {
    if let Err(rollback) = uow.abort(err.abort_reason()).await {
        // The transaction dies with its connection either way.
        warn!(error = %rollback, "Rollback failed");
    }
    Err(err)
}

fn log_refusal(kind: OperationKind, actor: &str, err: &LedgerError) {
    match err.kind() {
        ErrorKind::StorageFailure => {
            warn!(operation = %kind, actor = %actor, error = %err, "Operation failed")
        }
        _ => info!(operation = %kind, actor = %actor, outcome = %err, "Operation refused"),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        fail_inserts_into, fail_updates_of, file_db, memory_db, open_account, set_price,
    };
    use std::sync::Arc;
    use std::time::Duration;

    fn engine(db: &Database) -> LedgerEngine {
        LedgerEngine::new(db.clone(), LedgerConfig::default())
    }

    fn later() -> Instant {
        Instant::now() + Duration::from_secs(10)
    }

    async fn balance(db: &Database, username: &str) -> i64 {
        db.accounts().get(username).await.unwrap().balance
    }

    // -------------------------------------------------------------------------
    // Transfer
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_transfer_moves_coins_and_logs() {
        let db = memory_db().await;
        open_account(&db, "alice", 100).await;
        open_account(&db, "bob", 0).await;

        let record = engine(&db).transfer("alice", "bob", 30, later()).await.unwrap();

        assert_eq!(record.from_username, "alice");
        assert_eq!(record.to_username, "bob");
        assert_eq!(record.amount, 30);
        assert_eq!(balance(&db, "alice").await, 70);
        assert_eq!(balance(&db, "bob").await, 30);
        assert_eq!(db.transfers().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_transfer_rejects_non_positive_amount() {
        let db = memory_db().await;
        open_account(&db, "alice", 100).await;
        open_account(&db, "bob", 0).await;
        let engine = engine(&db);

        for amount in [0, -5] {
            let err = engine.transfer("alice", "bob", amount, later()).await.unwrap_err();
            assert!(matches!(err, LedgerError::InvalidAmount(_)));
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
        assert_eq!(balance(&db, "alice").await, 100);
        assert_eq!(db.transfers().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_transfer_to_unknown_recipient() {
        let db = memory_db().await;
        open_account(&db, "alice", 100).await;

        let err = engine(&db)
            .transfer("alice", "ghost", 10, later())
            .await
            .unwrap_err();

        assert!(matches!(err, LedgerError::AccountNotFound(ref name) if name == "ghost"));
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(balance(&db, "alice").await, 100);
        assert_eq!(db.transfers().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_transfer_from_unknown_actor() {
        let db = memory_db().await;
        open_account(&db, "bob", 0).await;

        let err = engine(&db)
            .transfer("ghost", "bob", 10, later())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::AccountNotFound(ref name) if name == "ghost"));
        assert_eq!(balance(&db, "bob").await, 0);
    }

    #[tokio::test]
    async fn test_transfer_insufficient_funds() {
        let db = memory_db().await;
        open_account(&db, "alice", 20).await;
        open_account(&db, "bob", 0).await;

        let err = engine(&db)
            .transfer("alice", "bob", 21, later())
            .await
            .unwrap_err();

        match err {
            LedgerError::InsufficientFunds {
                ref username,
                balance,
                required,
            } => {
                assert_eq!(username, "alice");
                assert_eq!(balance, 20);
                assert_eq!(required, 21);
            }
            ref other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
        assert_eq!(balance(&db, "alice").await, 20);
        assert_eq!(balance(&db, "bob").await, 0);
    }

    #[tokio::test]
    async fn test_transfer_refuses_recipient_overflow() {
        let db = memory_db().await;
        open_account(&db, "alice", 100).await;
        open_account(&db, "whale", i64::MAX - 5).await;

        let err = engine(&db)
            .transfer("alice", "whale", 10, later())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LedgerError::Invariant(CoreError::BalanceOverflow { balance: held, amount: 10 })
                if held == i64::MAX - 5
        ));
        assert_eq!(err.kind(), ErrorKind::StorageFailure);
        assert_eq!(balance(&db, "alice").await, 100);
        assert_eq!(balance(&db, "whale").await, i64::MAX - 5);
        assert_eq!(db.transfers().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_transfer_is_not_idempotent() {
        let db = memory_db().await;
        open_account(&db, "alice", 100).await;
        open_account(&db, "bob", 0).await;
        let engine = engine(&db);

        let first = engine.transfer("alice", "bob", 10, later()).await.unwrap();
        let second = engine.transfer("alice", "bob", 10, later()).await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(balance(&db, "alice").await, 80);
        assert_eq!(balance(&db, "bob").await, 20);
        assert_eq!(db.transfers().count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_self_transfer_is_logged_noop() {
        let db = memory_db().await;
        open_account(&db, "alice", 40).await;
        let engine = engine(&db);

        engine.transfer("alice", "alice", 40, later()).await.unwrap();
        assert_eq!(balance(&db, "alice").await, 40);
        assert_eq!(db.transfers().count().await.unwrap(), 1);

        let err = engine
            .transfer("alice", "alice", 41, later())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
        assert_eq!(db.transfers().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_transfer_log_failure_rolls_back_balances() {
        let db = memory_db().await;
        open_account(&db, "alice", 100).await;
        open_account(&db, "bob", 0).await;
        fail_inserts_into(&db, "transfers").await;

        let err = engine(&db)
            .transfer("alice", "bob", 30, later())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::StorageFailure);
        assert_eq!(balance(&db, "alice").await, 100);
        assert_eq!(balance(&db, "bob").await, 0);
    }

    #[tokio::test]
    async fn test_transfer_conserves_total() {
        let db = memory_db().await;
        open_account(&db, "alice", 100).await;
        open_account(&db, "bob", 50).await;
        open_account(&db, "carol", 0).await;
        let engine = engine(&db);

        engine.transfer("alice", "bob", 60, later()).await.unwrap();
        engine.transfer("bob", "carol", 110, later()).await.unwrap();
        let _ = engine.transfer("carol", "alice", 500, later()).await;
        engine.transfer("carol", "alice", 5, later()).await.unwrap();

        assert_eq!(db.accounts().total_balance().await.unwrap(), 150);
        assert_eq!(balance(&db, "alice").await, 45);
        assert_eq!(balance(&db, "bob").await, 0);
        assert_eq!(balance(&db, "carol").await, 105);
    }

    // -------------------------------------------------------------------------
    // Purchase
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_purchase_debits_and_counts() {
        let db = memory_db().await;
        open_account(&db, "alice", 100).await;
        let engine = engine(&db);

        let first = engine.purchase("alice", "cup", later()).await.unwrap();
        assert_eq!(first.quantity, 1);
        let second = engine.purchase("alice", "cup", later()).await.unwrap();
        assert_eq!(second.quantity, 2);

        assert_eq!(balance(&db, "alice").await, 60);
    }

    #[tokio::test]
    async fn test_purchase_exact_balance() {
        let db = memory_db().await;
        open_account(&db, "alice", 10).await;

        engine(&db).purchase("alice", "pen", later()).await.unwrap();
        assert_eq!(balance(&db, "alice").await, 0);
    }

    #[tokio::test]
    async fn test_purchase_insufficient_funds_writes_nothing() {
        let db = memory_db().await;
        open_account(&db, "alice", 10).await;
        set_price(&db, "cup", 15).await;

        let err = engine(&db).purchase("alice", "cup", later()).await.unwrap_err();

        assert!(matches!(
            err,
            LedgerError::InsufficientFunds {
                balance: 10,
                required: 15,
                ..
            }
        ));
        assert_eq!(balance(&db, "alice").await, 10);
        assert!(db.inventory().get("alice", "cup").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_purchase_unknown_item() {
        let db = memory_db().await;
        open_account(&db, "alice", 100).await;
        let engine = engine(&db);

        for name in ["laptop", "", "two words"] {
            let err = engine.purchase("alice", name, later()).await.unwrap_err();
            assert!(matches!(err, LedgerError::InvalidItem(_)), "{name:?}");
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
        assert_eq!(balance(&db, "alice").await, 100);
    }

    #[tokio::test]
    async fn test_purchase_unknown_account() {
        let db = memory_db().await;

        let err = engine(&db).purchase("ghost", "cup", later()).await.unwrap_err();
        assert!(matches!(err, LedgerError::AccountNotFound(ref name) if name == "ghost"));
    }

    #[tokio::test]
    async fn test_purchase_inventory_failure_rolls_back_balance() {
        let db = memory_db().await;
        open_account(&db, "alice", 100).await;
        fail_inserts_into(&db, "inventory").await;

        let err = engine(&db).purchase("alice", "cup", later()).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::StorageFailure);
        assert_eq!(balance(&db, "alice").await, 100);
        assert!(db.inventory().get("alice", "cup").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_purchase_store_failure_on_lock() {
        let db = memory_db().await;
        open_account(&db, "alice", 100).await;
        fail_updates_of(&db, "accounts").await;

        let err = engine(&db).purchase("alice", "cup", later()).await.unwrap_err();

        assert!(matches!(err, LedgerError::StorageFailure(_)));
        assert!(db.inventory().get("alice", "cup").await.unwrap().is_none());
    }

    // -------------------------------------------------------------------------
    // Deadlines
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_expired_deadline_touches_nothing() {
        let db = memory_db().await;
        open_account(&db, "alice", 100).await;
        open_account(&db, "bob", 0).await;
        let engine = engine(&db);
        let past = Instant::now() - Duration::from_millis(1);

        let err = engine.transfer("alice", "bob", 10, past).await.unwrap_err();
        assert!(matches!(err, LedgerError::DeadlineExceeded));
        assert_eq!(err.kind(), ErrorKind::StorageFailure);

        let err = engine.purchase("alice", "cup", past).await.unwrap_err();
        assert!(matches!(err, LedgerError::DeadlineExceeded));

        assert_eq!(balance(&db, "alice").await, 100);
        assert_eq!(db.transfers().count().await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_deadline_while_waiting_for_lock() {
        let (db, _dir) = file_db(4).await;
        open_account(&db, "alice", 100).await;
        let engine = engine(&db);

        // Another unit of work holds the writer lock on alice.
        let mut holder = db.begin(OperationKind::Purchase).await.unwrap();
        db.accounts()
            .get_for_exclusive_read(&mut holder, "alice")
            .await
            .unwrap();

        let deadline = Instant::now() + Duration::from_millis(200);
        let err = engine.purchase("alice", "cup", deadline).await.unwrap_err();
        assert!(matches!(err, LedgerError::DeadlineExceeded));

        holder
            .abort(coinshop_core::AbortReason::StorageFailure)
            .await
            .unwrap();

        assert_eq!(balance(&db, "alice").await, 100);
        assert!(db.inventory().get("alice", "cup").await.unwrap().is_none());
    }

    // -------------------------------------------------------------------------
    // Concurrency
    // -------------------------------------------------------------------------

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_purchases_single_winner() {
        let (db, _dir) = file_db(4).await;
        open_account(&db, "alice", 10).await;
        set_price(&db, "cup", 10).await;
        let engine = engine(&db);

        let barrier = Arc::new(tokio::sync::Barrier::new(2));
        let mut handles = Vec::new();
        for _ in 0..2 {
            let engine = engine.clone();
            let barrier = barrier.clone();
            handles.push(tokio::spawn(async move {
                barrier.wait().await;
                engine.purchase("alice", "cup", later()).await
            }));
        }

        let results: Vec<_> = futures::future::join_all(handles)
            .await
            .into_iter()
            .map(|joined| joined.unwrap())
            .collect();

        let won = results.iter().filter(|r| r.is_ok()).count();
        let refused = results
            .iter()
            .filter(|r| matches!(r, Err(LedgerError::InsufficientFunds { .. })))
            .count();
        assert_eq!((won, refused), (1, 1));

        assert_eq!(balance(&db, "alice").await, 0);
        let cup = db.inventory().get("alice", "cup").await.unwrap().unwrap();
        assert_eq!(cup.quantity, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_purchases_both_counted() {
        let (db, _dir) = file_db(4).await;
        open_account(&db, "alice", 20).await;
        set_price(&db, "cup", 10).await;
        let engine = engine(&db);

        let barrier = Arc::new(tokio::sync::Barrier::new(2));
        let mut handles = Vec::new();
        for _ in 0..2 {
            let engine = engine.clone();
            let barrier = barrier.clone();
            handles.push(tokio::spawn(async move {
                barrier.wait().await;
                engine.purchase("alice", "cup", later()).await
            }));
        }

        for joined in futures::future::join_all(handles).await {
            let entry = joined.unwrap().unwrap();
            assert!(entry.quantity == 1 || entry.quantity == 2);
        }

        assert_eq!(balance(&db, "alice").await, 0);
        let cup = db.inventory().get("alice", "cup").await.unwrap().unwrap();
        assert_eq!(cup.quantity, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_transfers_never_overdraw() {
        let (db, _dir) = file_db(5).await;
        open_account(&db, "alice", 50).await;
        for name in ["bob", "carol", "dave", "erin"] {
            open_account(&db, name, 0).await;
        }
        let engine = engine(&db);

        let recipients = ["bob", "carol", "dave", "erin", "bob", "carol", "dave", "erin"];
        let barrier = Arc::new(tokio::sync::Barrier::new(recipients.len()));
        let mut handles = Vec::new();
        for to in recipients {
            let engine = engine.clone();
            let barrier = barrier.clone();
            handles.push(tokio::spawn(async move {
                barrier.wait().await;
                engine.transfer("alice", to, 10, later()).await
            }));
        }

        let results: Vec<_> = futures::future::join_all(handles)
            .await
            .into_iter()
            .map(|joined| joined.unwrap())
            .collect();

        let won = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(won, 5);
        assert!(results
            .iter()
            .filter(|r| r.is_err())
            .all(|r| matches!(r, Err(LedgerError::InsufficientFunds { .. }))));

        assert_eq!(balance(&db, "alice").await, 0);
        assert_eq!(db.accounts().total_balance().await.unwrap(), 50);
        assert_eq!(db.transfers().count().await.unwrap(), 5);
    }

    // -------------------------------------------------------------------------
    // Accounts
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_open_account_grants_starting_balance_once() {
        let db = memory_db().await;
        let engine = engine(&db);

        let opened = engine.open_account("alice").await.unwrap();
        assert_eq!(opened.balance, 1000);

        engine.purchase("alice", "cup", later()).await.unwrap();
        let reopened = engine.open_account("alice").await.unwrap();
        assert_eq!(reopened.balance, 980);
    }

    #[tokio::test]
    async fn test_open_account_validates_username() {
        let db = memory_db().await;
        let err = engine(&db).open_account("   ").await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidUsername(_)));
        assert_eq!(db.accounts().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_account_summary() {
        let db = memory_db().await;
        let engine = engine(&db);
        engine.open_account("alice").await.unwrap();
        engine.open_account("bob").await.unwrap();

        engine.transfer("alice", "bob", 100, later()).await.unwrap();
        engine.transfer("bob", "alice", 30, later()).await.unwrap();
        engine.purchase("alice", "cup", later()).await.unwrap();
        engine.purchase("alice", "cup", later()).await.unwrap();
        engine.purchase("alice", "pen", later()).await.unwrap();

        let summary = engine.account_summary("alice").await.unwrap();
        assert_eq!(summary.coins, 1000 - 100 + 30 - 20 - 20 - 10);
        assert_eq!(summary.inventory.len(), 2);
        assert_eq!(summary.inventory[0].item_type, "cup");
        assert_eq!(summary.inventory[0].quantity, 2);
        assert_eq!(summary.coin_history.sent.len(), 1);
        assert_eq!(summary.coin_history.sent[0].to_user, "bob");
        assert_eq!(summary.coin_history.received.len(), 1);
        assert_eq!(summary.coin_history.received[0].amount, 30);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["coinHistory"]["received"][0]["fromUser"], "bob");
        assert_eq!(json["inventory"][1]["type"], "pen");
    }

    #[tokio::test]
    async fn test_account_summary_unknown_account() {
        let db = memory_db().await;
        let err = engine(&db).account_summary("ghost").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_connect_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = LedgerConfig {
            database_path: dir.path().join("ledger.db"),
            ..LedgerConfig::default()
        };

        let engine = LedgerEngine::connect(config).await.unwrap();
        assert!(engine.database().health_check().await);
        assert_eq!(engine.config().starting_balance, 1000);
    }
}
