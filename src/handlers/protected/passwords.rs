// handlers/protected/passwords.rs - /api/v1/passwords
//
// Vault payloads are encrypted and decrypted by the client; these handlers
// move `passwd` through untouched.

use axum::extract::{
    rejection::{JsonRejection, PathRejection, QueryRejection},
    Extension, Json, Path, Query, State,
};
use serde::Deserialize;
use serde_json::Value;

use crate::app::AppState;
use crate::database::models::{NewPasswordEntry, PasswordEntry};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::types::{ListQuery, Page, ShowInactive};

const DEFAULT_PAGE_SIZE: i64 = 50;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordRequest {
    pub descr: Option<String>,
    pub name: Option<String>,
    pub passwd: Option<String>,
    pub opt_link_id: Option<i32>,
    pub link_url: Option<String>,
}

/// Active entry the caller may mutate: missing is 404, foreign is 403
async fn owned_entry(state: &AppState, user: &AuthUser, id: i32) -> Result<PasswordEntry, ApiError> {
    let entry = state
        .passwords
        .find_by_id(id, false)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Password entry {} not found", id)))?;

    if entry.user_id != user.user_id {
        tracing::warn!("User {} attempted to modify password entry {}", user.user_id, id);
        return Err(ApiError::forbidden("Password entry belongs to another user"));
    }
    Ok(entry)
}

/// GET /api/v1/passwords
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Page<PasswordEntry>> {
    let Query(query) = query?;
    let page = query.page(DEFAULT_PAGE_SIZE, state.config.api.max_page_size)?;
    let entries = state
        .passwords
        .list(user.user_id, query.include_inactive(), page)
        .await?;
    Ok(ApiResponse::success(entries))
}

/// GET /api/v1/passwords/search?q=
pub async fn search(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Page<PasswordEntry>> {
    let Query(query) = query?;
    let term = query.search_term()?;
    let page = query.page(DEFAULT_PAGE_SIZE, state.config.api.max_page_size)?;
    Ok(ApiResponse::success(state.passwords.search(user.user_id, term, page).await?))
}

/// GET /api/v1/passwords/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    id: Result<Path<i32>, PathRejection>,
    query: Result<Query<ShowInactive>, QueryRejection>,
) -> ApiResult<PasswordEntry> {
    let Path(id) = id?;
    let Query(query) = query?;
    let entry = state
        .passwords
        .find_by_id(id, query.include_inactive())
        .await?
        .filter(|e| e.user_id == user.user_id)
        .ok_or_else(|| ApiError::not_found(format!("Password entry {} not found", id)))?;
    Ok(ApiResponse::success(entry))
}

/// POST /api/v1/passwords
pub async fn post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<PasswordRequest>, JsonRejection>,
) -> ApiResult<PasswordEntry> {
    let Json(request) = payload?;
    if request.name.as_deref().map_or(true, |n| n.trim().is_empty())
        && request.descr.as_deref().map_or(true, |d| d.trim().is_empty())
    {
        return Err(ApiError::field_error("name", "name or descr is required"));
    }

    let entry = state
        .passwords
        .create(&NewPasswordEntry {
            descr: request.descr,
            name: request.name,
            passwd: request.passwd,
            opt_link_id: request.opt_link_id,
            link_url: request.link_url,
            user_id: user.user_id,
            created_by: user.username.clone(),
        })
        .await?;

    Ok(ApiResponse::created(entry))
}

/// PUT /api/v1/passwords/:id - partial update
pub async fn put(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    id: Result<Path<i32>, PathRejection>,
    payload: Result<Json<PasswordRequest>, JsonRejection>,
) -> ApiResult<PasswordEntry> {
    let Path(id) = id?;
    let Json(request) = payload?;
    let mut entry = owned_entry(&state, &user, id).await?;

    if request.descr.is_some() {
        entry.descr = request.descr;
    }
    if request.name.is_some() {
        entry.name = request.name;
    }
    if request.passwd.is_some() {
        entry.passwd = request.passwd;
    }
    if request.opt_link_id.is_some() {
        entry.opt_link_id = request.opt_link_id;
    }
    if request.link_url.is_some() {
        entry.link_url = request.link_url;
    }

    Ok(ApiResponse::success(state.passwords.update(&entry, &user.username).await?))
}

/// DELETE /api/v1/passwords/:id - soft delete
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    id: Result<Path<i32>, PathRejection>,
) -> ApiResult<Value> {
    let Path(id) = id?;
    owned_entry(&state, &user, id).await?;

    if !state.passwords.delete(id, &user.username).await? {
        return Err(ApiError::not_found(format!("Password entry {} not found", id)));
    }
    Ok(ApiResponse::message("Password entry deleted successfully"))
}
