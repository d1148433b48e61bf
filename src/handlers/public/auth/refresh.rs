// handlers/public/auth/refresh.rs - POST /api/v1/auth/refresh

use axum::extract::{rejection::JsonRejection, Json, State};
use chrono::Utc;
use serde::Deserialize;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

use super::session::{issue_session, SessionResponse};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Exchange a refresh token for a new pair. The presented token is revoked,
/// so each refresh token works exactly once.
pub async fn post(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> ApiResult<SessionResponse> {
    let Json(request) = payload?;

    let stored = state
        .users
        .find_refresh_token(&request.refresh_token)
        .await?
        .filter(|token| token.is_usable(Utc::now()))
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired refresh token"))?;

    // Losing this race to a concurrent refresh means the token is spent
    if !state.users.revoke_refresh_token(&stored.token).await? {
        return Err(ApiError::unauthorized("Invalid or expired refresh token"));
    }

    let account = state
        .users
        .find_account_by_user_id(stored.user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Account no longer exists"))?;

    let session = issue_session(&state, account.user_id, &account.name).await?;
    tracing::debug!("Rotated refresh token for account {}", account.name);
    Ok(ApiResponse::success(session))
}
