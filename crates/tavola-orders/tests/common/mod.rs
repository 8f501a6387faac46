//! Shared fixtures for the engine integration tests.

#![allow(dead_code)]

use std::path::PathBuf;

use chrono::Utc;
use tavola_core::input::{CreateOrderInput, OrderLineInput};
use tavola_core::{
    CallerContext, GuestInfo, Money, OrderSource, Product, Role, Table, TableStatus,
};
use tavola_db::{Database, DbConfig};
use tavola_orders::{CreationMode, EngineConfig, OrderEngine};
use uuid::Uuid;

pub const BRANCH: &str = "branch-kemang";

pub struct Harness {
    pub db: Database,
    pub engine: OrderEngine,
    file: Option<PathBuf>,
}

impl Harness {
    /// In-memory database, default config.
    pub async fn new() -> Self {
        Self::with_mode(CreationMode::Transactional).await
    }

    pub async fn with_mode(mode: CreationMode) -> Self {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let engine = OrderEngine::new(db.clone(), EngineConfig::new().creation_mode(mode));
        Harness {
            db,
            engine,
            file: None,
        }
    }

    /// File-backed WAL database with a real pool, for concurrency tests.
    pub async fn on_disk(mode: CreationMode, max_connections: u32) -> Self {
        let path = std::env::temp_dir().join(format!("tavola-test-{}.db", Uuid::new_v4()));
        let db = Database::new(DbConfig::new(&path).max_connections(max_connections))
            .await
            .unwrap();
        let engine = OrderEngine::new(db.clone(), EngineConfig::new().creation_mode(mode));
        Harness {
            db,
            engine,
            file: Some(path),
        }
    }

    pub async fn add_product(&self, id: &str, name: &str, price: i64, stock: i64) {
        let now = Utc::now();
        self.db
            .products()
            .insert(&Product {
                id: id.to_string(),
                branch_id: BRANCH.to_string(),
                name: name.to_string(),
                price: Money::from_units(price),
                stock,
                is_active: true,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
    }

    pub async fn add_table(&self, id: &str, number: &str) {
        self.db
            .tables()
            .insert(&Table {
                id: id.to_string(),
                branch_id: BRANCH.to_string(),
                number: number.to_string(),
                name: Some("Window".to_string()),
                capacity: 4,
                status: TableStatus::Available,
                current_order_id: None,
                reservation: None,
                updated_at: Utc::now(),
            })
            .await
            .unwrap();
    }

    pub async fn stock(&self, product_id: &str) -> i64 {
        self.db.products().stock_of(product_id).await.unwrap().unwrap()
    }

    pub async fn close(self) {
        self.db.close().await;
        if let Some(path) = self.file {
            for suffix in ["", "-wal", "-shm"] {
                let mut p = path.clone().into_os_string();
                p.push(suffix);
                let _ = std::fs::remove_file(p);
            }
        }
    }
}

pub fn cashier() -> CallerContext {
    CallerContext::staff("u-cashier", Role::Cashier, BRANCH)
}

pub fn manager() -> CallerContext {
    CallerContext::staff("u-manager", Role::Manager, BRANCH)
}

pub fn kitchen() -> CallerContext {
    CallerContext::staff("u-kitchen", Role::Kitchen, BRANCH)
}

pub fn line(product_id: &str, qty: i64) -> OrderLineInput {
    OrderLineInput {
        product_id: product_id.to_string(),
        qty,
        note: None,
        attributes: Vec::new(),
    }
}

pub fn pos_order(lines: Vec<OrderLineInput>) -> CreateOrderInput {
    CreateOrderInput {
        order_source: OrderSource::Pos,
        branch_id: None,
        table_id: None,
        guest_info: None,
        items: lines,
        notes: None,
        apply_service_charge: None,
    }
}

pub fn web_order(lines: Vec<OrderLineInput>) -> CreateOrderInput {
    CreateOrderInput {
        order_source: OrderSource::Web,
        guest_info: Some(GuestInfo {
            name: "Sari".to_string(),
            whatsapp: "+628123456789".to_string(),
            pax: 2,
        }),
        ..pos_order(lines)
    }
}
