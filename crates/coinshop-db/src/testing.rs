//! Shared fixtures for the crate's unit tests.

use tempfile::TempDir;

use crate::pool::{Database, DbConfig};
use coinshop_core::{CatalogItem, Coins};

/// Single-connection in-memory store with migrations applied.
pub async fn memory_db() -> Database {
    Database::new(DbConfig::in_memory())
        .await
        .expect("in-memory database")
}

/// File-backed store with several pooled connections, for lock contention.
///
/// Keep the `TempDir` alive for as long as the database is used.
pub async fn file_db(max_connections: u32) -> (Database, TempDir) {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = DbConfig::new(dir.path().join("ledger.db")).max_connections(max_connections);
    let db = Database::new(config).await.expect("file database");
    (db, dir)
}

/// Creates an account holding exactly `balance` coins.
pub async fn open_account(db: &Database, username: &str, balance: i64) {
    db.accounts()
        .create(username, Coins::new(balance))
        .await
        .expect("create account");
}

/// Inserts or reprices a catalog item.
pub async fn set_price(db: &Database, name: &str, price: i64) {
    db.catalog()
        .put(&CatalogItem {
            name: name.to_string(),
            price,
        })
        .await
        .expect("set price");
}

/// Makes every later insert into `table` fail inside whatever unit of work
/// attempts it.
pub async fn fail_inserts_into(db: &Database, table: &str) {
    let sql = format!(
        "CREATE TRIGGER fail_{table}_insert BEFORE INSERT ON {table} \
         BEGIN SELECT RAISE(ABORT, 'injected {table} failure'); END"
    );
    sqlx::query(&sql)
        .execute(db.pool())
        .await
        .expect("install failure trigger");
}

/// Makes every later update of `table` fail.
pub async fn fail_updates_of(db: &Database, table: &str) {
    let sql = format!(
        "CREATE TRIGGER fail_{table}_update BEFORE UPDATE ON {table} \
         BEGIN SELECT RAISE(ABORT, 'injected {table} failure'); END"
    );
    sqlx::query(&sql)
        .execute(db.pool())
        .await
        .expect("install failure trigger");
}
