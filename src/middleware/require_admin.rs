use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::AuthUser;

/// Gate for `/admin` routes: the caller's account must hold the configured
/// admin role. Runs after [`super::jwt_auth_middleware`].
pub async fn require_admin_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("Authentication required").into_response())?;

    let is_admin = state
        .users
        .account_has_role(&user.username, &state.config.admin.role)
        .await
        .map_err(|e| ApiError::from(e).into_response())?;

    if !is_admin {
        tracing::warn!("User {} denied admin access", user.username);
        return Err(ApiError::forbidden("Admin role required").into_response());
    }

    Ok(next.run(request).await)
}
