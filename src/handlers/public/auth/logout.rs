// handlers/public/auth/logout.rs - POST /api/v1/auth/logout

use axum::extract::{Json, State};
use serde::Deserialize;
use serde_json::Value;

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    pub refresh_token: Option<String>,
}

/// Revoke the refresh token when one is supplied. Access tokens simply
/// expire; there is no server-side session to tear down.
pub async fn post(State(state): State<AppState>, payload: Option<Json<LogoutRequest>>) -> ApiResult<Value> {
    let request = payload.map(|Json(r)| r).unwrap_or_default();

    if let Some(token) = request.refresh_token.as_deref().filter(|t| !t.is_empty()) {
        if state.users.revoke_refresh_token(token).await? {
            tracing::debug!("Revoked refresh token on logout");
        }
    }

    Ok(ApiResponse::message("Logged out successfully"))
}
