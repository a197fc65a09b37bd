//! # Catalog Repository
//!
//! Read access to the merch price list. Prices are reference data seeded by
//! migration; the engine only ever reads them.

use sqlx::SqlitePool;

use crate::error::DbResult;
use coinshop_core::CatalogItem;

/// Repository for catalog lookups.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    /// Looks up an item by name. `None` means the item is not sold.
    pub async fn get(&self, name: &str) -> DbResult<Option<CatalogItem>> {
        let item = sqlx::query_as::<_, CatalogItem>(
            "SELECT name, price FROM catalog_items WHERE name = ?1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Lists every item, cheapest first.
    pub async fn list(&self) -> DbResult<Vec<CatalogItem>> {
        let items = sqlx::query_as::<_, CatalogItem>(
            "SELECT name, price FROM catalog_items ORDER BY price ASC, name ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Inserts an item or replaces its price.
    pub async fn put(&self, item: &CatalogItem) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO catalog_items (name, price)
            VALUES (?1, ?2)
            ON CONFLICT (name) DO UPDATE SET price = excluded.price
            "#,
        )
        .bind(&item.name)
        .bind(item.price)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
