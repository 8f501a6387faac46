//! # Engine Error Types
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Order Error Categories                            │
//! │                                                                         │
//! │  ┌──────────────────────┐  ┌──────────────────┐  ┌───────────────────┐ │
//! │  │  Domain (CoreError)  │  │  Store (DbError) │  │  Conflict         │ │
//! │  │                      │  │                  │  │                   │ │
//! │  │  Validation          │  │  PoolExhausted   │  │  DuplicateOrder   │ │
//! │  │  InsufficientStock   │  │  ConnectionFailed│  │  Number           │ │
//! │  │  InvalidTransition   │  │  QueryFailed     │  │                   │ │
//! │  │  AlreadyPaid ...     │  │  ...             │  │                   │ │
//! │  └──────────────────────┘  └──────────────────┘  └───────────────────┘ │
//! │       recoverable             fatal / retryable       retryable        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every domain error is raised before the unit of work commits, so a
//! caller that sees one can assume nothing was mutated.

use tavola_core::{CoreError, ValidationError};
use tavola_db::DbError;
use thiserror::Error;

/// Result type alias for engine operations.
pub type OrderResult<T> = Result<T, OrderError>;

#[derive(Debug, Error)]
pub enum OrderError {
    /// Business rule violation.
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// The datastore failed.
    #[error(transparent)]
    Store(#[from] DbError),

    /// Two creations raced to the same order number. The losing attempt was
    /// fully compensated and may be retried.
    #[error("Order number {0} was taken concurrently, please retry")]
    DuplicateOrderNumber(String),
}

impl OrderError {
    /// Infrastructure failures worth retrying. Domain errors never are.
    pub fn is_retryable(&self) -> bool {
        match self {
            OrderError::Domain(_) => false,
            OrderError::Store(e) => e.is_transient(),
            OrderError::DuplicateOrderNumber(_) => true,
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            OrderError::Domain(e) => e.is_not_found(),
            OrderError::Store(DbError::NotFound { .. }) => true,
            _ => false,
        }
    }

    /// Domain error view, if this is one.
    pub fn as_domain(&self) -> Option<&CoreError> {
        match self {
            OrderError::Domain(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ValidationError> for OrderError {
    fn from(err: ValidationError) -> Self {
        OrderError::Domain(CoreError::Validation(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(OrderError::DuplicateOrderNumber("POS-20250101-0001".into()).is_retryable());
        assert!(OrderError::Store(DbError::PoolExhausted).is_retryable());
        assert!(!OrderError::Store(DbError::duplicate("orders.id", "x")).is_retryable());
        assert!(!OrderError::Domain(CoreError::AlreadyPaid("POS-1".into())).is_retryable());
    }

    #[test]
    fn test_validation_lifts_into_domain() {
        let err: OrderError = ValidationError::required("items").into();
        assert!(matches!(
            err.as_domain(),
            Some(CoreError::Validation(ValidationError::Required { .. }))
        ));
        assert!(OrderError::Domain(CoreError::OrderNotFound("o-1".into())).is_not_found());
    }
}
