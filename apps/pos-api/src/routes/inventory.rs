//! Inventory endpoints: manual stock adjustments and the audit log.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tavola_core::input::{PageRequest, StockAdjustmentInput};
use tavola_core::{InventoryLogEntry, Page};

use crate::auth::Caller;
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct InventoryLogQuery {
    pub product_id: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// POST /inventory/adjust
#[tracing::instrument(skip_all, fields(user = %caller.user_id))]
pub async fn adjust(
    State(state): State<AppState>,
    Caller(caller): Caller,
    body: Result<Json<StockAdjustmentInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<InventoryLogEntry>)> {
    let Json(input) = body?;
    let entry = state.engine.ledger().adjust(&caller, &input).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// GET /inventory/logs
pub async fn logs(
    State(state): State<AppState>,
    Caller(caller): Caller,
    query: Result<Query<InventoryLogQuery>, QueryRejection>,
) -> ApiResult<Json<Page<InventoryLogEntry>>> {
    let Query(query) = query?;
    let page = PageRequest::new(query.page, query.limit);
    let logs = state
        .engine
        .queries()
        .inventory_logs(&caller, query.product_id.as_deref(), page)
        .await?;
    Ok(Json(logs))
}
