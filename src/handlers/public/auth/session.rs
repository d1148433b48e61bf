use chrono::{Duration, Utc};
use serde::Serialize;

use crate::app::AppState;
use crate::auth::{generate_refresh_token, issue_token};
use crate::error::ApiError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: i32,
    pub account_name: String,
}

/// Body returned by login and refresh
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub user: SessionUser,
}

/// Sign an access token and persist a fresh refresh token for the account
pub async fn issue_session(state: &AppState, user_id: i32, account_name: &str) -> Result<SessionResponse, ApiError> {
    let issued = issue_token(&state.config.jwt, user_id, account_name)?;

    let refresh_token = generate_refresh_token();
    let expires_at = Utc::now() + Duration::days(state.config.jwt.refresh_expiration_days);
    state.users.save_refresh_token(user_id, &refresh_token, expires_at).await?;

    Ok(SessionResponse {
        token: issued.token,
        refresh_token,
        expires_in: issued.expires_in,
        user: SessionUser {
            id: user_id,
            account_name: account_name.to_string(),
        },
    })
}
