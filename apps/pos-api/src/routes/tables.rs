//! Table endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use tavola_core::Table;

use crate::auth::Caller;
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ResetTableRequest {
    /// Free the table even with unpaid orders on it. Needs void capability.
    #[serde(default)]
    pub force: bool,
}

/// GET /tables
pub async fn list(State(state): State<AppState>, Caller(caller): Caller) -> ApiResult<Json<Vec<Table>>> {
    Ok(Json(state.engine.tables().list(&caller).await?))
}

/// GET /tables/{id}
pub async fn get(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<String>,
) -> ApiResult<Json<Table>> {
    Ok(Json(state.engine.tables().get(&caller, &id).await?))
}

/// POST /tables/{id}/reset
#[tracing::instrument(skip_all, fields(table_id = %id))]
pub async fn reset(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<String>,
    body: Result<Json<ResetTableRequest>, JsonRejection>,
) -> ApiResult<Json<Table>> {
    let Json(request) = body?;
    let table = state.engine.tables().reset(&caller, &id, request.force).await?;
    Ok(Json(table))
}
