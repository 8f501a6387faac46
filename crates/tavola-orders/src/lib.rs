//! # tavola-orders: Order Lifecycle Engine
//!
//! Creates orders against live stock, moves them through the kitchen,
//! records payment and voids them with stock restored.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         tavola-orders                                   │
//! │                                                                         │
//! │   ┌──────────────────┐   ┌──────────────────────┐   ┌──────────────┐   │
//! │   │  OrderPipeline   │   │ OrderTransitionSvc   │   │ OrderQueries │   │
//! │   │  create_order    │   │ update_status / pay  │   │ list/kitchen │   │
//! │   │                  │   │ void                 │   │ track        │   │
//! │   └───┬─────────┬────┘   └────┬────────────┬────┘   └──────┬───────┘   │
//! │       │         │             │            │               │           │
//! │       ▼         ▼             ▼            ▼               │           │
//! │   ┌──────────────┐   ┌──────────────────┐   ┌───────────┐  │           │
//! │   │ StockLedger  │   │ TableCoordinator │   │ Event     │  │           │
//! │   │ reserve /    │   │ occupy / release │   │ Notifier  │  │           │
//! │   │ release /log │   │ reset            │   │           │  │           │
//! │   └──────┬───────┘   └────────┬─────────┘   └───────────┘  │           │
//! │          └────────────────────┼────────────────────────────┘           │
//! │                               ▼                                         │
//! │                     tavola-db (repositories)                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Correctness under concurrent requests comes from the datastore:
//! conditional `UPDATE`s for stock and tables, an atomic counter for order
//! numbers and UNIQUE constraints for idempotency keys. There are no
//! in-process locks.
//!
//! ## Module Organization
//!
//! - [`config`] - Rates, creation mode, business day offset
//! - [`error`] - `OrderError`
//! - [`ledger`] - Stock reservation, release and the movement log
//! - [`tables`] - Table occupancy
//! - [`pipeline`] - Order creation
//! - [`transitions`] - Status changes, payment, void
//! - [`queries`] - Read side
//! - [`notifier`] - Domain event sink
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tavola_orders::{EngineConfig, OrderEngine};
//! use tavola_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./tavola.db")).await?;
//! let engine = OrderEngine::new(db, EngineConfig::new());
//! let mut events = engine.subscribe();
//!
//! let created = engine.pipeline().create_order(&caller, &input, None).await?;
//! engine.transitions().update_status(&caller, &created.order.id, OrderStatus::Confirmed).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod ledger;
pub mod notifier;
pub mod pipeline;
pub mod queries;
pub mod tables;
pub mod transitions;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{CreationMode, EngineConfig};
pub use error::{OrderError, OrderResult};
pub use ledger::{LogContext, ReservedBatch, StockLedger, StockLine, StockMovement};
pub use notifier::{BroadcastNotifier, EventNotifier, NoopNotifier, DEFAULT_EVENT_CAPACITY};
pub use pipeline::{CreatedOrder, OrderPipeline};
pub use queries::OrderQueries;
pub use tables::TableCoordinator;
pub use transitions::{OrderTransitionService, PaymentReceipt};

use std::sync::Arc;

use tavola_core::OrderEvent;
use tavola_db::Database;
use tokio::sync::broadcast;

// =============================================================================
// Engine
// =============================================================================

/// Every service wired to one database, config and broadcast channel.
///
/// Cheap to clone.
#[derive(Clone)]
pub struct OrderEngine {
    db: Database,
    config: Arc<EngineConfig>,
    events: BroadcastNotifier,
    pipeline: OrderPipeline,
    transitions: OrderTransitionService,
    queries: OrderQueries,
    ledger: StockLedger,
    tables: TableCoordinator,
}

impl OrderEngine {
    pub fn new(db: Database, config: EngineConfig) -> Self {
        Self::with_capacity(db, config, DEFAULT_EVENT_CAPACITY)
    }

    pub fn with_capacity(db: Database, config: EngineConfig, event_capacity: usize) -> Self {
        let config = Arc::new(config);
        let events = BroadcastNotifier::new(event_capacity);
        let notifier: Arc<dyn EventNotifier> = Arc::new(events.clone());

        OrderEngine {
            pipeline: OrderPipeline::new(db.clone(), config.clone(), notifier.clone()),
            transitions: OrderTransitionService::new(db.clone(), notifier),
            queries: OrderQueries::new(db.clone(), config.clone()),
            ledger: StockLedger::new(db.clone()),
            tables: TableCoordinator::new(db.clone()),
            events,
            config,
            db,
        }
    }

    pub fn pipeline(&self) -> &OrderPipeline {
        &self.pipeline
    }

    pub fn transitions(&self) -> &OrderTransitionService {
        &self.transitions
    }

    pub fn queries(&self) -> &OrderQueries {
        &self.queries
    }

    pub fn ledger(&self) -> &StockLedger {
        &self.ledger
    }

    pub fn tables(&self) -> &TableCoordinator {
        &self.tables
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Receives every `new_order` and `order_status_update`.
    pub fn subscribe(&self) -> broadcast::Receiver<OrderEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::Utc;
    use tavola_core::{Money, Product, Table, TableStatus};
    use tavola_db::{Database, DbConfig};

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
