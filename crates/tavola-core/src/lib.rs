//! # tavola-core: Pure Business Logic for Tavola POS
//!
//! Order math, the order status machine, caller scoping and validation.
//! Nothing in this crate performs I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tavola POS Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    pos-api (axum)                               │   │
//! │  │    POST /orders, PATCH /orders/:id/status, POST /orders/:id/pay │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tavola-orders (engine)                       │   │
//! │  │    StockLedger, OrderPipeline, OrderTransitionService, Tables   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tavola-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   order   │  │ validation│  │   │
//! │  │   │  Order    │  │   Money   │  │ financials│  │   rules   │  │   │
//! │  │   │  Table    │  │   Rate    │  │ status fsm│  │   input   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tavola-db (Database Layer)                   │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Order, Table, Transaction, ...)
//! - [`money`] - Whole-unit `Money` and basis-point `Rate`
//! - [`order`] - Financials, order numbers, status transitions
//! - [`caller`] - `CallerContext` and branch scoping
//! - [`events`] - `new_order` / `order_status_update` payloads
//! - [`input`] - Request payloads
//! - [`validation`] - Shape checks run before mutation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use tavola_core::money::{Money, Rate};
//! use tavola_core::order::{compute_financials, PricingRates};
//!
//! let rates = PricingRates { tax: Rate::from_bps(1000), service_charge: Rate::from_bps(500) };
//! let f = compute_financials([(Money::from_units(30_000), 2)], rates, true);
//!
//! assert_eq!(f.tax.units(), 6_000);
//! assert_eq!(f.service_charge.units(), 3_000);
//! assert_eq!(f.total.units(), 69_000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod caller;
pub mod error;
pub mod events;
pub mod input;
pub mod money;
pub mod order;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use caller::{CallerContext, Role};
pub use error::{CoreError, CoreResult, ValidationError};
pub use events::{NewOrderEvent, OrderEvent, OrderStatusEvent};
pub use money::{Money, Rate};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity of a single order line.
///
/// ## Business Reason
/// Catches typos such as 1000 instead of 10 before stock is touched.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Largest absolute quantity a single manual stock adjustment may move.
pub const MAX_STOCK_ADJUSTMENT: i64 = 1_000_000;

/// Maximum distinct lines in one order.
pub const MAX_ORDER_LINES: usize = 100;

/// Maximum characters in an order or line note.
pub const MAX_NOTE_LENGTH: usize = 500;

/// Default tax rate: 10%.
pub const DEFAULT_TAX_RATE_BPS: u32 = 1000;

/// Default service charge: 5%.
pub const DEFAULT_SERVICE_CHARGE_BPS: u32 = 500;
