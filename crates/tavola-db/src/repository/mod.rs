//! # Repository Module
//!
//! Database repository implementations for Tavola POS.
//!
//! ## Two Kinds of Methods
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  &self methods            reads through the pool                        │
//! │    db.orders().get_by_id(id)                                            │
//! │    db.tables().list(Some(branch))                                       │
//! │                                                                         │
//! │  associated fns           single statements on a caller-owned           │
//! │  (conn: &mut Sqlite…)     connection, composed by tavola-orders into    │
//! │                           one transaction or one compensating saga      │
//! │    ProductRepository::try_decrement_stock(&mut tx, id, qty)             │
//! │    OrderRepository::insert(&mut tx, &order, key)                        │
//! │    TableRepository::occupy(&mut tx, table_id, order_id, now)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Products, options, stock statements
//! - [`InventoryRepository`](inventory::InventoryRepository) - Append-only stock log
//! - [`OrderRepository`](order::OrderRepository) - Orders, items, order numbers
//! - [`TableRepository`](table::TableRepository) - Table occupancy
//! - [`TransactionRepository`](transaction::TransactionRepository) - Payments

pub mod inventory;
pub mod order;
pub mod product;
pub mod table;
pub mod transaction;
