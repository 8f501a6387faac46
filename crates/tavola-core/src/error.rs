//! # Error Types
//!
//! Domain-specific error types for tavola-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tavola-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  tavola-db            DbError     - Database failures                  │
//! │  tavola-orders        OrderError  - CoreError | DbError                │
//! │  pos-api              ApiError    - HTTP status + JSON body            │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → OrderError → ApiError → Client    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Branch-scope mismatches are reported with the same variant and message as
//! a genuinely missing entity so other tenants' data cannot be discovered.

use thiserror::Error;

use crate::money::Money;
use crate::types::OrderStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations. All of these are recoverable by the caller.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product missing or outside the caller's branch.
    #[error("Product not found or access denied: {0}")]
    ProductNotFound(String),

    /// Product exists but is switched off.
    #[error("Product is not available: {name}")]
    ProductInactive { id: String, name: String },

    /// Conditional stock decrement refused.
    ///
    /// ## User Workflow
    /// ```text
    /// Order (Latte × 2)
    ///      │
    ///      ▼
    /// UPDATE products SET stock = stock - 2 WHERE stock >= 2   → 0 rows
    ///      │
    ///      ▼
    /// InsufficientStock { product_name: "Latte", requested: 2, available: 1 }
    /// ```
    ///
    /// `available` is a snapshot read for the message only.
    #[error("Insufficient stock for {product_name}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: String,
        product_name: String,
        requested: i64,
        available: i64,
    },

    /// Order missing or outside the caller's branch.
    #[error("Order not found or access denied: {0}")]
    OrderNotFound(String),

    /// Table missing or outside the caller's branch.
    #[error("Table not found or access denied: {0}")]
    TableNotFound(String),

    /// Table is occupied by another active order.
    #[error("Table {table_number} is not available")]
    TableUnavailable { table_id: String, table_number: String },

    /// Non-forced reset refused while bills are still open.
    #[error("Table has unpaid orders: {}", order_numbers.join(", "))]
    TableHasUnpaidOrders {
        table_id: String,
        order_numbers: Vec<String>,
    },

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Order {0} is already paid")]
    AlreadyPaid(String),

    #[error("Order {0} is already cancelled")]
    AlreadyCancelled(String),

    /// Payment attempted on an order that can no longer take one.
    #[error("Order {order_number} cannot be paid while {status}")]
    NotPayable {
        order_number: String,
        status: OrderStatus,
    },

    #[error("Insufficient payment: total {total}, tendered {tendered}")]
    InsufficientPayment { total: Money, tendered: Money },

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Wraps ValidationError.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// True for the "not found or access denied" family.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CoreError::ProductNotFound(_) | CoreError::OrderNotFound(_) | CoreError::TableNotFound(_)
        )
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors, raised before any mutation.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, invalid date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Attribute selection that the product does not offer.
    #[error("Unknown option '{option}' for attribute '{attribute}' on {product}")]
    UnknownAttributeOption {
        product: String,
        attribute: String,
        option: String,
    },
}

impl ValidationError {
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
