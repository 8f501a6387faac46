//! Domain events emitted by the order engine.
//!
//! The engine only produces these; delivery (websockets, push) belongs to
//! whoever subscribes to the notifier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{Order, OrderSource, OrderStatus, Table};

/// Payload of `new_order`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewOrderEvent {
    pub order_id: String,
    pub order_number: String,
    pub order_source: OrderSource,
    pub branch_id: String,
    pub table_number: Option<String>,
    pub table_name: Option<String>,
    pub guest_name: Option<String>,
    /// Units across all lines, not the line count.
    pub items_count: i64,
    pub total: Money,
    pub status: OrderStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl NewOrderEvent {
    pub fn from_order(order: &Order, table: Option<&Table>) -> Self {
        NewOrderEvent {
            order_id: order.id.clone(),
            order_number: order.order_number.clone(),
            order_source: order.order_source,
            branch_id: order.branch_id.clone(),
            table_number: table.map(|t| t.number.clone()),
            table_name: table.and_then(|t| t.name.clone()),
            guest_name: order.guest_info.as_ref().map(|g| g.name.clone()),
            items_count: order.items_count(),
            total: order.financials.total,
            status: order.status,
            created_at: order.created_at,
        }
    }
}

/// Payload of `order_status_update`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderStatusEvent {
    pub order_id: String,
    pub order_number: String,
    pub branch_id: String,
    pub status: OrderStatus,
    pub previous_status: OrderStatus,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Everything the engine announces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
#[ts(export)]
pub enum OrderEvent {
    NewOrder(NewOrderEvent),
    OrderStatusUpdate(OrderStatusEvent),
}

impl OrderEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            OrderEvent::NewOrder(_) => "new_order",
            OrderEvent::OrderStatusUpdate(_) => "order_status_update",
        }
    }

    pub fn branch_id(&self) -> &str {
        match self {
            OrderEvent::NewOrder(e) => &e.branch_id,
            OrderEvent::OrderStatusUpdate(e) => &e.branch_id,
        }
    }

    pub fn order_id(&self) -> &str {
        match self {
            OrderEvent::NewOrder(e) => &e.order_id,
            OrderEvent::OrderStatusUpdate(e) => &e.order_id,
        }
    }
}
