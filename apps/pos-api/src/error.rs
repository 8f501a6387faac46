//! Error types for the POS API.
//!
//! Every handler returns `Result<_, ApiError>`; the response body is always
//! `{ "error": message, "code": CODE }`.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tavola_core::CoreError;
use tavola_db::DbError;
use tavola_orders::OrderError;

/// POS API errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// HTTP status and machine-readable code.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Order(err) => order_status(err),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

fn order_status(err: &OrderError) -> (StatusCode, &'static str) {
    match err {
        OrderError::Domain(e) => domain_status(e),
        OrderError::DuplicateOrderNumber(_) => (StatusCode::CONFLICT, "ORDER_NUMBER_CONFLICT"),
        OrderError::Store(DbError::NotFound { .. }) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        OrderError::Store(DbError::UniqueViolation { .. }) => (StatusCode::CONFLICT, "DUPLICATE"),
        OrderError::Store(e) if e.is_transient() => {
            (StatusCode::SERVICE_UNAVAILABLE, "STORE_UNAVAILABLE")
        }
        OrderError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
    }
}

fn domain_status(err: &CoreError) -> (StatusCode, &'static str) {
    match err {
        CoreError::ProductNotFound(_) | CoreError::OrderNotFound(_) | CoreError::TableNotFound(_) => {
            (StatusCode::NOT_FOUND, "NOT_FOUND")
        }
        CoreError::PermissionDenied(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
        CoreError::TableUnavailable { .. } => (StatusCode::CONFLICT, "TABLE_UNAVAILABLE"),
        CoreError::TableHasUnpaidOrders { .. } => (StatusCode::CONFLICT, "TABLE_HAS_UNPAID_ORDERS"),
        CoreError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        CoreError::ProductInactive { .. } => (StatusCode::BAD_REQUEST, "PRODUCT_INACTIVE"),
        CoreError::InsufficientStock { .. } => (StatusCode::BAD_REQUEST, "INSUFFICIENT_STOCK"),
        CoreError::InvalidTransition { .. } => (StatusCode::BAD_REQUEST, "INVALID_TRANSITION"),
        CoreError::AlreadyPaid(_) => (StatusCode::BAD_REQUEST, "ALREADY_PAID"),
        CoreError::AlreadyCancelled(_) => (StatusCode::BAD_REQUEST, "ALREADY_CANCELLED"),
        CoreError::NotPayable { .. } => (StatusCode::BAD_REQUEST, "NOT_PAYABLE"),
        CoreError::InsufficientPayment { .. } => (StatusCode::BAD_REQUEST, "INSUFFICIENT_PAYMENT"),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        if status.is_server_error() {
            tracing::error!(error = %self, code, "request failed");
        } else {
            tracing::debug!(error = %self, code, "request rejected");
        }

        // Store internals are not echoed to clients
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = serde_json::json!({ "error": message, "code": code });
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// Result type alias for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use tavola_core::{Money, OrderStatus, ValidationError};

    #[test]
    fn test_business_rules_are_bad_requests() {
        let err = ApiError::from(OrderError::Domain(CoreError::InsufficientStock {
            product_id: "p-1".into(),
            product_name: "Latte".into(),
            requested: 2,
            available: 1,
        }));
        assert_eq!(err.status_and_code(), (StatusCode::BAD_REQUEST, "INSUFFICIENT_STOCK"));

        let err = ApiError::from(OrderError::Domain(CoreError::InvalidTransition {
            from: OrderStatus::Pending,
            to: OrderStatus::Ready,
        }));
        assert_eq!(err.status_and_code().0, StatusCode::BAD_REQUEST);

        let err = ApiError::from(OrderError::Domain(CoreError::InsufficientPayment {
            total: Money::from_units(66_000),
            tendered: Money::from_units(50_000),
        }));
        assert_eq!(err.status_and_code().0, StatusCode::BAD_REQUEST);

        let err = ApiError::from(OrderError::from(ValidationError::required("items")));
        assert_eq!(err.status_and_code(), (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"));
    }

    #[test]
    fn test_scope_and_permission_statuses() {
        let err = ApiError::from(OrderError::Domain(CoreError::OrderNotFound("o-1".into())));
        assert_eq!(err.status_and_code().0, StatusCode::NOT_FOUND);

        let err = ApiError::from(OrderError::Domain(CoreError::PermissionDenied("void".into())));
        assert_eq!(err.status_and_code().0, StatusCode::FORBIDDEN);

        let err = ApiError::from(OrderError::Domain(CoreError::TableHasUnpaidOrders {
            table_id: "t-1".into(),
            order_numbers: vec!["POS-20260101-0001".into()],
        }));
        assert_eq!(err.status_and_code().0, StatusCode::CONFLICT);
    }

    #[test]
    fn test_store_failures() {
        let err = ApiError::from(OrderError::Store(DbError::PoolExhausted));
        assert_eq!(err.status_and_code().0, StatusCode::SERVICE_UNAVAILABLE);

        let err = ApiError::from(OrderError::DuplicateOrderNumber("POS-20260101-0001".into()));
        assert_eq!(err.status_and_code().0, StatusCode::CONFLICT);

        let err = ApiError::from(OrderError::Store(DbError::Internal("boom".into())));
        assert_eq!(err.status_and_code().0, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
