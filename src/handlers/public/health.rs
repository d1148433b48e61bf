use axum::{extract::State, http::Uri};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

/// GET /health - 200 when the database answers, 503 otherwise
pub async fn health_get(State(state): State<AppState>) -> ApiResult<Value> {
    if let Err(e) = state.db.health_check().await {
        tracing::warn!("Health check failed: {}", e);
        return Err(ApiError::service_unavailable("Database unreachable"));
    }

    Ok(ApiResponse::success(json!({
        "status": "healthy",
        "database": "connected",
    })))
}

/// GET /api/v1 - service description
pub async fn api_index_get() -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({
        "name": "Magnifimind CRM API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "auth": "/api/v1/auth/{register,login,refresh,logout,whoami}",
            "users": "/api/v1/users[/search|/:id]",
            "persons": "/api/v1/persons[/search|/:id]",
            "passwords": "/api/v1/passwords[/search|/:id]",
            "tables": "/api/v1/{people,addresses,emails,phones,notes,links,accounts,users-table,roles,email-types,phone-types}[/:id]",
            "person_full": "/api/v1/people/:id/full",
            "admin": "/api/v1/admin/{backup,restore}",
        }
    })))
}

pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::not_found(format!("No route for {}", uri.path()))
}
