//! Request payloads accepted by the order engine.
//!
//! These are plain data; [`crate::validation`] checks them before any
//! mutation happens.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{GuestInfo, OrderSource, OrderStatus, PaymentMethod, PaymentStatus, StockReason};

/// Attribute choice sent by the client. The modifier is resolved server-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AttributeChoice {
    pub name: String,
    pub selected_option: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderLineInput {
    pub product_id: String,
    pub qty: i64,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub attributes: Vec<AttributeChoice>,
}

/// Body of `POST /orders`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateOrderInput {
    pub order_source: OrderSource,
    /// Honoured only for owners; scoped callers write to their own branch.
    #[serde(default)]
    pub branch_id: Option<String>,
    #[serde(default)]
    pub table_id: Option<String>,
    #[serde(default)]
    pub guest_info: Option<GuestInfo>,
    pub items: Vec<OrderLineInput>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub apply_service_charge: Option<bool>,
}

impl CreateOrderInput {
    pub fn applies_service_charge(&self) -> bool {
        self.apply_service_charge.unwrap_or(false)
    }
}

/// Body of `PATCH /orders/:id/status`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UpdateStatusInput {
    pub status: OrderStatus,
}

/// Body of `POST /orders/:id/pay`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PayOrderInput {
    pub payment_method: PaymentMethod,
    /// Amount tendered.
    pub amount: Money,
}

/// Body of `POST /inventory/adjust`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockAdjustmentInput {
    pub product_id: String,
    /// Signed; negative values are refused if stock would go below zero.
    pub qty_change: i64,
    pub reason: StockReason,
    #[serde(default)]
    pub note: Option<String>,
}

/// Query string of `GET /orders`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub order_source: Option<OrderSource>,
    pub table_id: Option<String>,
    /// Inclusive business date.
    pub date_from: Option<NaiveDate>,
    /// Inclusive business date.
    pub date_to: Option<NaiveDate>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl OrderFilter {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }
}

/// Normalised page / limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    pub const DEFAULT_LIMIT: i64 = 20;
    pub const MAX_LIMIT: i64 = 100;
    pub const MAX_PAGE: i64 = 1_000_000;

    /// Clamps to `1 <= page <= MAX_PAGE` and `1 <= limit <= MAX_LIMIT`.
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        PageRequest {
            page: page.unwrap_or(1).clamp(1, Self::MAX_PAGE),
            limit: limit
                .unwrap_or(Self::DEFAULT_LIMIT)
                .clamp(1, Self::MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page.max(1) - 1).saturating_mul(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest::new(None, None)
    }
}
