//! # Domain Types
//!
//! Records persisted by the ledger store and the read models built from them.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Account      │   │  CatalogItem    │   │ TransferRecord  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  username (PK)  │   │  name (PK)      │   │  id (UUID)      │       │
//! │  │  balance >= 0   │   │  price > 0      │   │  from / to      │       │
//! │  └────────┬────────┘   └────────┬────────┘   │  amount > 0     │       │
//! │           │ 1                   │ 1          └─────────────────┘       │
//! │           │                     │              append-only             │
//! │           ▼ *                   ▼ *                                     │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │ InventoryEntry (username, item_name)    │                           │
//! │  │ quantity >= 1                           │                           │
//! │  └─────────────────────────────────────────┘                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::coins::Coins;

// =============================================================================
// Account
// =============================================================================

/// One row per user. Mutated only by the ledger engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Account {
    /// Unique identity, immutable once created.
    pub username: String,

    /// Coin balance. Never negative in a committed state.
    pub balance: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Returns the balance as a Coins value.
    #[inline]
    pub fn balance(&self) -> Coins {
        Coins::new(self.balance)
    }
}

// =============================================================================
// Catalog Item
// =============================================================================

/// Static reference data: something that can be bought.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CatalogItem {
    pub name: String,
    pub price: i64,
}

impl CatalogItem {
    /// Returns the price as a Coins value.
    #[inline]
    pub fn price(&self) -> Coins {
        Coins::new(self.price)
    }
}

// =============================================================================
// Inventory Entry
// =============================================================================

/// How many of one item an account owns. Exists only once quantity >= 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InventoryEntry {
    pub username: String,
    pub item_name: String,
    pub quantity: i64,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Transfer Record
// =============================================================================

/// Immutable fact: `amount` coins moved from one account to another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct TransferRecord {
    /// Server-assigned identifier (UUID v4).
    pub id: String,
    pub from_username: String,
    pub to_username: String,
    pub amount: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Account Summary (read model)
// =============================================================================

/// Everything the `/api/info` endpoint shows about one account.
///
/// ## Wire Shape
/// ```json
/// {
///   "coins": 970,
///   "inventory": [{ "type": "cup", "quantity": 1 }],
///   "coinHistory": {
///     "received": [{ "fromUser": "bob", "amount": 10 }],
///     "sent": [{ "toUser": "carol", "amount": 40 }]
///   }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AccountSummary {
    pub coins: i64,
    pub inventory: Vec<OwnedItem>,
    pub coin_history: CoinHistory,
}

/// One inventory line in an account summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OwnedItem {
    #[serde(rename = "type")]
    pub item_type: String,
    pub quantity: i64,
}

/// Transfers grouped by direction relative to the summarised account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CoinHistory {
    pub received: Vec<ReceivedCoins>,
    pub sent: Vec<SentCoins>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ReceivedCoins {
    pub from_user: String,
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SentCoins {
    pub to_user: String,
    pub amount: i64,
}

impl AccountSummary {
    /// Builds a summary from the account row, its inventory and every transfer
    /// it took part in.
    ///
    /// A transfer to oneself is listed once, under `received`.
    pub fn build(
        account: &Account,
        inventory: &[InventoryEntry],
        transfers: &[TransferRecord],
    ) -> Self {
        let mut history = CoinHistory::default();

        for transfer in transfers {
            if transfer.to_username == account.username {
                history.received.push(ReceivedCoins {
                    from_user: transfer.from_username.clone(),
                    amount: transfer.amount,
                });
            } else if transfer.from_username == account.username {
                history.sent.push(SentCoins {
                    to_user: transfer.to_username.clone(),
                    amount: transfer.amount,
                });
            }
        }

        AccountSummary {
            coins: account.balance,
            inventory: inventory
                .iter()
                .map(|entry| OwnedItem {
                    item_type: entry.item_name.clone(),
                    quantity: entry.quantity,
                })
                .collect(),
            coin_history: history,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
