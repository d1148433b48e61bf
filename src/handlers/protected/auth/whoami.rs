use axum::extract::Extension;
use serde::Serialize;

use crate::middleware::{ApiResponse, ApiResult, AuthUser};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WhoamiResponse {
    pub user_id: i32,
    pub username: String,
}

/// GET /api/v1/auth/whoami - echo the authenticated principal
pub async fn get(Extension(user): Extension<AuthUser>) -> ApiResult<WhoamiResponse> {
    Ok(ApiResponse::success(WhoamiResponse {
        user_id: user.user_id,
        username: user.username,
    }))
}
