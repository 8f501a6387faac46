//! # Domain Types
//!
//! Core domain types used throughout Tavola POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Order      │   │   Transaction   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  branch_id      │   │  order_number   │   │  order_id (FK)  │       │
//! │  │  price          │   │  status         │   │  method         │       │
//! │  │  stock (≥ 0)    │   │  financials     │   │  amount, change │       │
//! │  └─────────────────┘   └────────┬────────┘   └─────────────────┘       │
//! │                                 │ 1..n                                  │
//! │  ┌─────────────────┐   ┌────────▼────────┐   ┌─────────────────┐       │
//! │  │InventoryLogEntry│   │   OrderItem     │   │     Table       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  qty_before     │   │  name snapshot  │   │  status         │       │
//! │  │  qty_change     │   │  price_at_moment│   │  current_order  │       │
//! │  │  qty_after      │   │  attributes     │   │  (1:1 active)   │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: (order_number, table number) - human-readable

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A menu product. The core only reads products; its stock column is the
/// one field the engine writes.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Branch that sells this product.
    pub branch_id: String,

    /// Display name, snapshotted onto order items.
    pub name: String,

    /// Base price in whole currency units.
    pub price: Money,

    /// Units on hand. Never negative at rest.
    pub stock: i64,

    /// Inactive products cannot be ordered.
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A priced option of a product attribute, e.g. `Size: Large (+5000)`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ProductOption {
    pub id: String,
    pub product_id: String,
    /// Attribute name ("Size", "Sugar").
    pub attribute_name: String,
    /// Option within the attribute ("Large").
    pub option_name: String,
    /// Added to the base price when selected. May be zero.
    pub price_modifier: Money,
}

// =============================================================================
// Inventory Log
// =============================================================================

/// Why a stock level changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockReason {
    /// Reserved by an order.
    Order,
    /// Goods received.
    Restock,
    /// Spoiled or broken.
    Wastage,
    /// Manual correction after a count.
    Adjustment,
    /// Restored by a void.
    Return,
}

impl StockReason {
    /// Reasons a staff member may record by hand. ORDER and RETURN are
    /// written only by the order engine.
    pub const MANUAL: [StockReason; 3] = [
        StockReason::Restock,
        StockReason::Wastage,
        StockReason::Adjustment,
    ];

    pub fn is_manual(&self) -> bool {
        Self::MANUAL.contains(self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StockReason::Order => "ORDER",
            StockReason::Restock => "RESTOCK",
            StockReason::Wastage => "WASTAGE",
            StockReason::Adjustment => "ADJUSTMENT",
            StockReason::Return => "RETURN",
        }
    }
}

/// Append-only record of one stock movement.
///
/// `qty_after == qty_before + qty_change` always holds.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InventoryLogEntry {
    pub id: String,
    pub branch_id: String,
    pub product_id: String,
    /// Product name at the time of the movement.
    pub product_name: String,
    /// Signed change; negative for ORDER and WASTAGE.
    pub qty_change: i64,
    pub qty_before: i64,
    pub qty_after: i64,
    pub reason: StockReason,
    /// Order id for ORDER / RETURN entries.
    pub reference_id: Option<String>,
    pub actor_id: String,
    pub note: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Order Enums
// =============================================================================

/// Channel an order came in through. Also the order number prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSource {
    /// Staff-entered at the counter or table.
    Pos,
    /// Guest self-order from the web menu.
    Web,
}

impl OrderSource {
    /// Prefix used in order numbers.
    pub fn prefix(&self) -> &'static str {
        match self {
            OrderSource::Pos => "POS",
            OrderSource::Web => "WEB",
        }
    }
}

impl fmt::Display for OrderSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Kitchen / lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Cooking,
    Ready,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Cooking,
        OrderStatus::Ready,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Cooking => "COOKING",
            OrderStatus::Ready => "READY",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    /// COMPLETED and CANCELLED end the lifecycle and free the table.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// Statuses shown on the kitchen display.
    pub fn is_kitchen_visible(&self) -> bool {
        matches!(self, OrderStatus::Confirmed | OrderStatus::Cooking)
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
    Refunded,
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Unpaid
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PaymentStatus::Unpaid => "UNPAID",
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Refunded => "REFUNDED",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentMethod {
    Cash,
    Card,
    /// QR code payment.
    Qris,
    /// Bank transfer.
    Transfer,
}

// =============================================================================
// Order
// =============================================================================

/// Guest details, required for WEB orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GuestInfo {
    pub name: String,
    /// WhatsApp number used to reach the guest.
    pub whatsapp: String,
    /// Party size.
    pub pax: i64,
}

/// A resolved attribute choice frozen onto an order item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AttributeSelection {
    pub name: String,
    pub selected_option: String,
    pub price_modifier: Money,
}

/// A line item in an order.
/// Uses snapshot pattern to freeze product data at time of order.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    /// Product name at time of order (frozen).
    pub name: String,
    pub qty: i64,
    /// Base price plus attribute modifiers at time of order (frozen).
    pub price_at_moment: Money,
    pub note: Option<String>,
    pub attributes: Vec<AttributeSelection>,
}

impl OrderItem {
    /// `price_at_moment × qty`.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.price_at_moment.multiply_quantity(self.qty)
    }
}

/// Order money, computed once at creation and never recomputed.
///
/// `total = subtotal - discount + tax + service_charge`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Financials {
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub service_charge: Money,
    pub total: Money,
}

/// An order with its frozen items.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Order {
    pub id: String,
    pub branch_id: String,
    /// `{PREFIX}-{YYYYMMDD}-{NNNN}`, unique per branch.
    pub order_number: String,
    pub order_source: OrderSource,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    /// Set when the order is paid.
    pub payment_method: Option<PaymentMethod>,
    pub table_id: Option<String>,
    pub guest_info: Option<GuestInfo>,
    pub notes: Option<String>,
    pub items: Vec<OrderItem>,
    pub financials: Financials,
    /// Staff member that created the order; None for guest orders.
    pub created_by: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    /// Set only when the order reaches COMPLETED.
    #[ts(as = "Option<String>")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Orders still holding their table.
    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Sum of line quantities.
    pub fn items_count(&self) -> i64 {
        self.items.iter().map(|i| i.qty).sum()
    }
}

/// Public tracking view of an order. Carries no guest or staff details.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderTracking {
    pub order_number: String,
    pub order_source: OrderSource,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub items_count: i64,
    pub total: Money,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl From<&Order> for OrderTracking {
    fn from(order: &Order) -> Self {
        OrderTracking {
            order_number: order.order_number.clone(),
            order_source: order.order_source,
            status: order.status,
            payment_status: order.payment_status,
            items_count: order.items_count(),
            total: order.financials.total,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// Immutable record of a payment.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Transaction {
    pub id: String,
    pub order_id: String,
    pub branch_id: String,
    pub payment_method: PaymentMethod,
    /// Amount tendered.
    pub amount: Money,
    /// `amount - total`, never negative.
    pub change: Money,
    pub actor_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Table
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum TableStatus {
    Available,
    Occupied,
    Reserved,
}

impl Default for TableStatus {
    fn default() -> Self {
        TableStatus::Available
    }
}

/// A dining table.
///
/// `current_order_id` is set exactly when `status == Occupied` and the
/// linked order is active.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Table {
    pub id: String,
    pub branch_id: String,
    /// Unique within the branch ("A1", "12").
    pub number: String,
    pub name: Option<String>,
    pub capacity: i64,
    pub status: TableStatus,
    pub current_order_id: Option<String>,
    /// Opaque reservation details owned by the reservations module.
    pub reservation: Option<String>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Table {
    /// Whether a new order may be seated here.
    pub fn can_seat(&self) -> bool {
        matches!(self.status, TableStatus::Available | TableStatus::Reserved)
    }
}

// =============================================================================
// Pagination
// =============================================================================

/// One page of a listing.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::Cancelled).unwrap(),
            "\"CANCELLED\""
        );
        assert_eq!(serde_json::to_string(&OrderSource::Web).unwrap(), "\"WEB\"");
        assert_eq!(serde_json::to_string(&PaymentMethod::Qris).unwrap(), "\"QRIS\"");
        assert_eq!(
            serde_json::to_string(&TableStatus::Occupied).unwrap(),
            "\"occupied\""
        );
        let parsed: OrderStatus = serde_json::from_str("\"COOKING\"").unwrap();
        assert_eq!(parsed, OrderStatus::Cooking);
    }

    #[test]
    fn test_terminal_statuses() {
        let terminal: Vec<_> = OrderStatus::ALL
            .iter()
            .filter(|s| s.is_terminal())
            .collect();
        assert_eq!(terminal, vec![&OrderStatus::Completed, &OrderStatus::Cancelled]);
    }

    #[test]
    fn test_manual_stock_reasons() {
        assert!(StockReason::Restock.is_manual());
        assert!(StockReason::Wastage.is_manual());
        assert!(!StockReason::Order.is_manual());
        assert!(!StockReason::Return.is_manual());
    }

    #[test]
    fn test_attribute_selection_shape() {
        let sel = AttributeSelection {
            name: "Size".to_string(),
            selected_option: "Large".to_string(),
            price_modifier: Money::from_units(5_000),
        };
        let json = serde_json::to_value(&sel).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"name": "Size", "selected_option": "Large", "price_modifier": 5000})
        );
    }

    #[test]
    fn test_table_can_seat() {
        let mut table = Table {
            id: "t-1".into(),
            branch_id: "b-1".into(),
            number: "A1".into(),
            name: None,
            capacity: 4,
            status: TableStatus::Reserved,
            current_order_id: None,
            reservation: Some("{\"name\":\"Budi\"}".into()),
            updated_at: Utc::now(),
        };
        assert!(table.can_seat());
        table.status = TableStatus::Occupied;
        assert!(!table.can_seat());
    }
}
