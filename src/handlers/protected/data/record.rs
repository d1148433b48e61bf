use axum::extract::{
    rejection::{JsonRejection, PathRejection},
    Extension, Json, Path, State,
};
use serde_json::Value;

use crate::app::{AppState, TableKey};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

/// GET /api/v1/:table/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(TableKey(key)): Extension<TableKey>,
    Extension(user): Extension<AuthUser>,
    id: Result<Path<i32>, PathRejection>,
) -> ApiResult<Value> {
    let Path(id) = id?;
    Ok(ApiResponse::success(state.tables.get(key, Some(&user), id).await?))
}

/// PUT /api/v1/:table/:id
pub async fn put(
    State(state): State<AppState>,
    Extension(TableKey(key)): Extension<TableKey>,
    Extension(user): Extension<AuthUser>,
    id: Result<Path<i32>, PathRejection>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Value> {
    let Path(id) = id?;
    let Json(body) = payload?;

    state.tables.update(key, Some(&user), id, &body).await?;
    Ok(ApiResponse::message(format!("Updated {} record {}", key, id)))
}

/// DELETE /api/v1/:table/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(TableKey(key)): Extension<TableKey>,
    Extension(user): Extension<AuthUser>,
    id: Result<Path<i32>, PathRejection>,
) -> ApiResult<Value> {
    let Path(id) = id?;

    state.tables.delete(key, Some(&user), id).await?;
    Ok(ApiResponse::message(format!("Deleted {} record {}", key, id)))
}
