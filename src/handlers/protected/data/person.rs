use axum::extract::{
    rejection::{PathRejection, QueryRejection},
    Extension, Path, Query, State,
};
use serde_json::Value;

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::types::ShowInactive;

/// GET /api/v1/people/:id/full
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    id: Result<Path<i32>, PathRejection>,
    query: Result<Query<ShowInactive>, QueryRejection>,
) -> ApiResult<Value> {
    let Path(id) = id?;
    let Query(query) = query?;

    let person = state
        .tables
        .person_full(Some(&user), id, query.include_inactive())
        .await?;
    Ok(ApiResponse::success(person))
}
