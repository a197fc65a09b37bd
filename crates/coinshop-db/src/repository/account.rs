//! # Account Repository
//!
//! Balance reads and writes.
//!
//! ## Locking Read on SQLite
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │             get_for_exclusive_read (SELECT ... FOR UPDATE)              │
//! │                                                                         │
//! │  SQLite has no row locks. Its only exclusive hold is the database-wide │
//! │  writer lock, taken by the first write in a transaction.               │
//! │                                                                         │
//! │  So the locking read IS a write that changes nothing:                  │
//! │                                                                         │
//! │     UPDATE accounts SET balance = balance                              │
//! │     WHERE username = ?1                                                │
//! │     RETURNING username, balance, ...                                   │
//! │                                                                         │
//! │  Purchase A: BEGIN ─ lock-read(100) ─ set(90) ─ COMMIT                 │
//! │  Purchase B: BEGIN ─ lock-read ⏳ waits ........ (90) ─ set(80) ─ ...   │
//! │                                                                         │
//! │  B cannot read a balance A is about to overwrite.                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Combined Transfer
//! `apply_combined_transfer` debits and credits in ONE conditional statement.
//! Every guard is checked by the same statement that writes, so there is no
//! read-then-write window.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::unit_of_work::UnitOfWork;
use coinshop_core::{Account, Coins};

/// Result of [`AccountRepository::apply_combined_transfer`].
#[derive(Debug, Clone, PartialEq)]
pub enum BalanceMove {
    /// Both balances moved. For a self-transfer both fields hold the same row.
    Applied { debited: Account, credited: Account },

    /// Nothing was written: the sender's balance is below the amount.
    InsufficientFunds { available: i64 },

    /// Nothing was written: this account does not exist.
    AccountMissing { username: String },

    /// Nothing was written: crediting the recipient would overflow `i64`.
    CreditOverflow { username: String, balance: i64 },
}

/// Repository for account (balance) operations.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    pool: SqlitePool,
}

impl AccountRepository {
    /// Creates a new AccountRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AccountRepository { pool }
    }

    /// Inserts a new account.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - Username already taken
    pub async fn create(&self, username: &str, balance: Coins) -> DbResult<Account> {
        debug!(username = %username, balance = balance.value(), "Creating account");

        let now = Utc::now();

        let account = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (username, balance, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?3)
            RETURNING username, balance, created_at, updated_at
            "#,
        )
        .bind(username)
        .bind(balance.value())
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, username),
            other => other,
        })?;

        Ok(account)
    }

    /// Returns the account, creating it with `starting_balance` if absent.
    ///
    /// The boolean is true when this call created the row.
    pub async fn get_or_create(
        &self,
        username: &str,
        starting_balance: Coins,
    ) -> DbResult<(Account, bool)> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO accounts (username, balance, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?3)
            ON CONFLICT (username) DO NOTHING
            "#,
        )
        .bind(username)
        .bind(starting_balance.value())
        .bind(now)
        .execute(&self.pool)
        .await?;

        let created = result.rows_affected() == 1;
        let account = self.get(username).await?;

        Ok((account, created))
    }

    /// Reads an account outside any unit of work.
    ///
    /// Never use this value to decide a balance write.
    pub async fn get(&self, username: &str) -> DbResult<Account> {
        sqlx::query_as::<_, Account>(
            r#"
            SELECT username, balance, created_at, updated_at
            FROM accounts
            WHERE username = ?1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Account", username))
    }

    /// Reads an account and takes the exclusive writer hold until `uow` ends.
    ///
    /// Must be the first statement of the unit of work so the hold is taken
    /// before any snapshot is read.
    pub async fn get_for_exclusive_read(
        &self,
        uow: &mut UnitOfWork,
        username: &str,
    ) -> DbResult<Account> {
        debug!(username = %username, "Locking account");

        sqlx::query_as::<_, Account>(
            r#"
            UPDATE accounts
            SET balance = balance
            WHERE username = ?1
            RETURNING username, balance, created_at, updated_at
            "#,
        )
        .bind(username)
        .fetch_optional(uow.conn()?)
        .await?
        .ok_or_else(|| DbError::not_found("Account", username))
    }

    /// Overwrites a balance inside `uow`.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - No such account
    /// * `Err(DbError::CheckViolation)` - `new_balance` is negative
    pub async fn set_balance(
        &self,
        uow: &mut UnitOfWork,
        username: &str,
        new_balance: Coins,
    ) -> DbResult<Account> {
        debug!(username = %username, balance = new_balance.value(), "Setting balance");

        let now = Utc::now();

        sqlx::query_as::<_, Account>(
            r#"
            UPDATE accounts
            SET balance = ?2, updated_at = ?3
            WHERE username = ?1
            RETURNING username, balance, created_at, updated_at
            "#,
        )
        .bind(username)
        .bind(new_balance.value())
        .bind(now)
        .fetch_optional(uow.conn()?)
        .await?
        .ok_or_else(|| DbError::not_found("Account", username))
    }

    /// Debits `from` and credits `to` by `amount` in one conditional statement.
    ///
    /// ## Guard (evaluated by the same statement that writes)
    /// - both accounts exist
    /// - `from` holds at least `amount`
    /// - `to` can take `amount` without overflowing
    ///
    /// If the guard fails nothing is written and the outcome says why.
    /// A self-transfer passes the same guard and leaves the balance unchanged.
    pub async fn apply_combined_transfer(
        &self,
        uow: &mut UnitOfWork,
        from: &str,
        to: &str,
        amount: Coins,
    ) -> DbResult<BalanceMove> {
        debug!(from = %from, to = %to, amount = amount.value(), "Applying combined transfer");

        let now = Utc::now();

        let moved = sqlx::query_as::<_, Account>(
            r#"
            UPDATE accounts
            SET balance = balance + CASE
                    WHEN ?1 = ?2 THEN 0
                    WHEN username = ?1 THEN -?3
                    ELSE ?3
                END,
                updated_at = ?4
            WHERE username IN (?1, ?2)
              AND (SELECT COUNT(*) FROM accounts WHERE username IN (?1, ?2))
                  = CASE WHEN ?1 = ?2 THEN 1 ELSE 2 END
              AND (SELECT balance FROM accounts WHERE username = ?1) >= ?3
              AND (?1 = ?2
                   OR (SELECT balance FROM accounts WHERE username = ?2)
                      <= 9223372036854775807 - ?3)
            RETURNING username, balance, created_at, updated_at
            "#,
        )
        .bind(from)
        .bind(to)
        .bind(amount.value())
        .bind(now)
        .fetch_all(uow.conn()?)
        .await?;

        if !moved.is_empty() {
            let debited = moved.iter().find(|a| a.username == from).cloned();
            let credited = moved.iter().find(|a| a.username == to).cloned();

            return match (debited, credited) {
                (Some(debited), Some(credited)) => Ok(BalanceMove::Applied { debited, credited }),
                _ => Err(DbError::Internal(format!(
                    "combined transfer touched {} unexpected rows",
                    moved.len()
                ))),
            };
        }

        // Nothing matched. The statement above already holds the writer lock,
        // so these reads explain the refusal without racing anyone.
        let from_balance = self.balance_in(uow, from).await?;
        let Some(available) = from_balance else {
            return Ok(BalanceMove::AccountMissing {
                username: from.to_string(),
            });
        };

        let Some(recipient_balance) = self.balance_in(uow, to).await? else {
            return Ok(BalanceMove::AccountMissing {
                username: to.to_string(),
            });
        };

        if available < amount.value() {
            return Ok(BalanceMove::InsufficientFunds { available });
        }

        if Coins::new(recipient_balance).credit(amount).is_err() {
            return Ok(BalanceMove::CreditOverflow {
                username: to.to_string(),
                balance: recipient_balance,
            });
        }

        Err(DbError::Internal(format!(
            "combined transfer {from} -> {to} refused with every guard satisfied"
        )))
    }

    async fn balance_in(&self, uow: &mut UnitOfWork, username: &str) -> DbResult<Option<i64>> {
        let balance = sqlx::query_scalar::<_, i64>("SELECT balance FROM accounts WHERE username = ?1")
            .bind(username)
            .fetch_optional(uow.conn()?)
            .await?;

        Ok(balance)
    }

    /// Sum of every balance (for diagnostics and conservation checks).
    pub async fn total_balance(&self) -> DbResult<i64> {
        let total: i64 = sqlx::query_scalar("SELECT COALESCE(SUM(balance), 0) FROM accounts")
            .fetch_one(&self.pool)
            .await?;

        Ok(total)
    }

    /// Counts accounts.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
