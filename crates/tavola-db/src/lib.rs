//! # tavola-db: Database Layer for Tavola POS
//!
//! SQLite access for the order engine, built on sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tavola POS Data Flow                             │
//! │                                                                         │
//! │  tavola-orders (OrderPipeline, StockLedger, ...)                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     tavola-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ ProductRepo   │    │ 001_initial  │  │   │
//! │  │   │ SqlitePool    │◄───│ OrderRepo     │    │   _schema    │  │   │
//! │  │   │ begin/acquire │    │ TableRepo ... │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
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
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tavola_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./tavola.db")).await?;
//! let kitchen = db.orders().kitchen_queue(Some("branch-1")).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::inventory::InventoryRepository;
pub use repository::order::{OrderQuery, OrderRepository};
pub use repository::product::ProductRepository;
pub use repository::table::TableRepository;
pub use repository::transaction::TransactionRepository;

// Connection types the engine threads through repository calls.
pub use sqlx::{Sqlite, SqliteConnection};

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::Utc;
    use tavola_core::{Money, Product, Table, TableStatus};

    use crate::{Database, DbConfig};

    pub async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    pub fn product(id: &str, branch_id: &str, name: &str, price: i64, stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id: id.to_string(),
            branch_id: branch_id.to_string(),
            name: name.to_string(),
            price: Money::from_units(price),
            stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn table(id: &str, branch_id: &str, number: &str) -> Table {
        Table {
            id: id.to_string(),
            branch_id: branch_id.to_string(),
            number: number.to_string(),
            name: None,
            capacity: 4,
            status: TableStatus::Available,
            current_order_id: None,
            reservation: None,
            updated_at: Utc::now(),
        }
    }
}
