use std::collections::HashMap;

use axum::extract::{
    rejection::{JsonRejection, QueryRejection},
    Extension, Json, Query, State,
};
use serde_json::{json, Value};

use crate::app::{AppState, TableKey};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

/// GET /api/v1/:table - every remaining query parameter is a filter
/// candidate; the registry decides which ones apply.
pub async fn get(
    State(state): State<AppState>,
    Extension(TableKey(key)): Extension<TableKey>,
    Extension(user): Extension<AuthUser>,
    params: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> ApiResult<Vec<Value>> {
    let Query(params) = params?;
    let rows = state.tables.list(key, Some(&user), &params).await?;
    Ok(ApiResponse::success(rows))
}

/// POST /api/v1/:table
pub async fn post(
    State(state): State<AppState>,
    Extension(TableKey(key)): Extension<TableKey>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(body) = payload?;
    let id = state.tables.create(key, Some(&user), &body).await?;

    Ok(ApiResponse::created(json!({
        "id": id,
        "message": format!("Created {} record {}", key, id),
    })))
}
