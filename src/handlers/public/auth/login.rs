// handlers/public/auth/login.rs - POST /api/v1/auth/login

use axum::extract::{rejection::JsonRejection, Json, State};
use serde::Deserialize;

use crate::app::AppState;
use crate::auth::verify_password_blocking;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

use super::session::{issue_session, SessionResponse};

const INVALID_CREDENTIALS: &str = "Invalid credentials";

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Verify the bcrypt credential and hand out an access/refresh pair.
///
/// Unknown account and wrong password are indistinguishable to the caller.
pub async fn post(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<SessionResponse> {
    let Json(request) = payload?;
    let username = request.username.trim();

    let Some(account) = state.users.find_account_by_name(username).await? else {
        tracing::warn!("Login failed for unknown account {}", username);
        return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
    };

    if !verify_password_blocking(request.password, account.password.clone()).await? {
        tracing::warn!("Login failed for account {}: wrong password", account.name);
        return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
    }

    let session = issue_session(&state, account.user_id, &account.name).await?;
    tracing::info!("Account {} logged in", account.name);
    Ok(ApiResponse::success(session))
}
