//! Order endpoints.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use tavola_core::input::{CreateOrderInput, OrderFilter, PayOrderInput, UpdateStatusInput};
use tavola_core::{Order, OrderTracking, Page, Transaction};
use tavola_orders::PaymentReceipt;

use crate::auth::Caller;
use crate::error::ApiResult;
use crate::AppState;

pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

#[derive(Debug, Deserialize)]
pub struct TrackQuery {
    pub branch_id: Option<String>,
}

/// POST /orders
///
/// 201 for a new order, 200 when the `Idempotency-Key` matched an earlier one.
#[tracing::instrument(skip_all, fields(user = %caller.user_id))]
pub async fn create(
    State(state): State<AppState>,
    Caller(caller): Caller,
    headers: HeaderMap,
    body: Result<Json<CreateOrderInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Order>)> {
    let Json(input) = body?;
    let key = headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    let created = state.engine.pipeline().create_order(&caller, &input, key).await?;
    let status = if created.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(created.order)))
}

/// GET /orders
pub async fn list(
    State(state): State<AppState>,
    Caller(caller): Caller,
    filter: Result<Query<OrderFilter>, QueryRejection>,
) -> ApiResult<Json<Page<Order>>> {
    let Query(filter) = filter?;
    Ok(Json(state.engine.queries().list(&caller, &filter).await?))
}

/// GET /orders/kitchen
pub async fn kitchen(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> ApiResult<Json<Vec<Order>>> {
    Ok(Json(state.engine.queries().kitchen(&caller).await?))
}

/// GET /orders/track/{order_number} (public)
pub async fn track(
    State(state): State<AppState>,
    Path(order_number): Path<String>,
    query: Result<Query<TrackQuery>, QueryRejection>,
) -> ApiResult<Json<OrderTracking>> {
    let Query(query) = query?;
    let tracking = state
        .engine
        .queries()
        .track(&order_number, query.branch_id.as_deref())
        .await?;
    Ok(Json(tracking))
}

/// GET /orders/{id}
pub async fn get(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<String>,
) -> ApiResult<Json<Order>> {
    Ok(Json(state.engine.queries().get(&caller, &id).await?))
}

/// PATCH /orders/{id}/status
#[tracing::instrument(skip_all, fields(order_id = %id))]
pub async fn update_status(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<String>,
    body: Result<Json<UpdateStatusInput>, JsonRejection>,
) -> ApiResult<Json<Order>> {
    let Json(input) = body?;
    let order = state
        .engine
        .transitions()
        .update_status(&caller, &id, input.status)
        .await?;
    Ok(Json(order))
}

/// POST /orders/{id}/pay
#[tracing::instrument(skip_all, fields(order_id = %id))]
pub async fn pay(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<String>,
    body: Result<Json<PayOrderInput>, JsonRejection>,
) -> ApiResult<Json<PaymentReceipt>> {
    let Json(input) = body?;
    Ok(Json(state.engine.transitions().pay(&caller, &id, &input).await?))
}

/// POST /orders/{id}/void
#[tracing::instrument(skip_all, fields(order_id = %id))]
pub async fn void(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<String>,
) -> ApiResult<Json<Order>> {
    Ok(Json(state.engine.transitions().void(&caller, &id).await?))
}

/// GET /orders/{id}/transactions
pub async fn transactions(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Transaction>>> {
    Ok(Json(state.engine.queries().transactions(&caller, &id).await?))
}
