// handlers/protected/users.rs - /api/v1/users

use axum::extract::{
    rejection::{JsonRejection, PathRejection, QueryRejection},
    Extension, Json, Path, Query, State,
};
use serde::Deserialize;
use serde_json::Value;

use crate::app::AppState;
use crate::database::models::User;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::types::{ListQuery, Page};

const DEFAULT_PAGE_SIZE: i64 = 50;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

fn require_self(user: &AuthUser, id: i32) -> Result<(), ApiError> {
    if user.user_id == id {
        Ok(())
    } else {
        Err(ApiError::forbidden("Users may only modify their own record"))
    }
}

/// GET /api/v1/users
pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Page<User>> {
    let Query(query) = query?;
    let page = query.page(DEFAULT_PAGE_SIZE, state.config.api.max_page_size)?;
    Ok(ApiResponse::success(state.users.list(page).await?))
}

/// GET /api/v1/users/search?q=
pub async fn search(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Page<User>> {
    let Query(query) = query?;
    let term = query.search_term()?;
    let page = query.page(DEFAULT_PAGE_SIZE, state.config.api.max_page_size)?;
    Ok(ApiResponse::success(state.users.search(term, page).await?))
}

/// GET /api/v1/users/:id
pub async fn get(State(state): State<AppState>, id: Result<Path<i32>, PathRejection>) -> ApiResult<User> {
    let Path(id) = id?;
    let user = state
        .users
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("User {} not found", id)))?;
    Ok(ApiResponse::success(user))
}

/// PUT /api/v1/users/:id - self only; absent names keep their value
pub async fn put(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    id: Result<Path<i32>, PathRejection>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> ApiResult<User> {
    let Path(id) = id?;
    require_self(&auth_user, id)?;
    let Json(request) = payload?;

    let current = state
        .users
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("User {} not found", id)))?;

    let first_name = request.first_name.unwrap_or(current.first_name);
    let last_name = request.last_name.unwrap_or(current.last_name);
    if first_name.trim().is_empty() || last_name.trim().is_empty() {
        return Err(ApiError::field_error("name", "first and last name must not be empty"));
    }

    let updated = state
        .users
        .update(id, first_name.trim(), last_name.trim(), &auth_user.username)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("User {} not found", id)))?;
    Ok(ApiResponse::success(updated))
}

/// DELETE /api/v1/users/:id - self only, hard delete
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    id: Result<Path<i32>, PathRejection>,
) -> ApiResult<Value> {
    let Path(id) = id?;
    require_self(&auth_user, id)?;

    if !state.users.delete(id).await? {
        return Err(ApiError::not_found(format!("User {} not found", id)));
    }
    tracing::info!("User {} deleted their account", id);
    Ok(ApiResponse::message("User deleted successfully"))
}
