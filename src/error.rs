// HTTP API Error Types
use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::auth::{JwtError, PasswordError};
use crate::database::dynamic::DispatchError;
use crate::database::manager::DatabaseError;
use crate::services::backup_service::BackupError;
use crate::services::email_service::EmailError;

/// Postgres SQLSTATE for unique_violation.
const UNIQUE_VIOLATION: &str = "23505";
/// Postgres SQLSTATE for foreign_key_violation.
const FOREIGN_KEY_VIOLATION: &str = "23503";
/// Postgres SQLSTATE for not_null_violation.
const NOT_NULL_VIOLATION: &str = "23502";

/// Constraint violations caused by the request's data rather than the server
fn constraint_error(code: Option<&str>, message: &str) -> Option<ApiError> {
    match code? {
        UNIQUE_VIOLATION => Some(ApiError::conflict(format!("Record already exists: {}", message))),
        FOREIGN_KEY_VIOLATION => Some(ApiError::bad_request(format!(
            "Referenced record does not exist: {}",
            message
        ))),
        NOT_NULL_VIOLATION => Some(ApiError::bad_request(format!("Required value missing: {}", message))),
        _ => None,
    }
}

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError {
        message: String,
        field_errors: Option<HashMap<String, String>>,
    },
    InvalidJson(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::ValidationError { .. } => StatusCode::BAD_REQUEST,
            ApiError::InvalidJson(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::ValidationError { message, .. } => message,
            ApiError::InvalidJson(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::Conflict(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::InvalidJson(_) => "INVALID_JSON",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// JSON error body, the failure twin of the `ApiResponse` envelope
    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "success": false,
            "error": self.message(),
            "code": self.error_code()
        });

        if let ApiError::ValidationError {
            field_errors: Some(field_errors),
            ..
        } = self
        {
            body["field_errors"] = json!(field_errors);
        }

        body
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(
        message: impl Into<String>,
        field_errors: Option<HashMap<String, String>>,
    ) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            field_errors,
        }
    }

    /// Single-field validation failure
    pub fn field_error(field: impl Into<String>, problem: impl Into<String>) -> Self {
        let mut field_errors = HashMap::new();
        field_errors.insert(field.into(), problem.into());
        ApiError::validation_error("Validation failed", Some(field_errors))
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        ApiError::InvalidJson(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => ApiError::not_found(msg),
            DatabaseError::Sqlx(sqlx::Error::Database(db_err)) => {
                match constraint_error(db_err.code().as_deref(), db_err.message()) {
                    Some(api_err) => api_err,
                    None => {
                        tracing::error!("Database error: {}", db_err);
                        ApiError::internal_server_error(format!("Database error: {}", db_err))
                    }
                }
            }
            DatabaseError::Sqlx(sqlx::Error::PoolTimedOut) => {
                tracing::error!("Database pool timed out");
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            other => {
                tracing::error!("Database error: {}", other);
                ApiError::internal_server_error(format!("Database error: {}", other))
            }
        }
    }
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::UnknownTable(key) => {
                ApiError::bad_request(format!("Unknown table: {}", key))
            }
            DispatchError::Unsupported { table, operation } => {
                ApiError::bad_request(format!("Table '{}' does not support {}", table, operation))
            }
            DispatchError::Unauthenticated => ApiError::unauthorized("Authentication required"),
            DispatchError::Forbidden(msg) => ApiError::forbidden(msg),
            DispatchError::NotFound(msg) => ApiError::not_found(msg),
            DispatchError::Validation(field_errors) => {
                ApiError::validation_error("Validation failed", Some(field_errors))
            }
            DispatchError::Database(db_err) => db_err.into(),
        }
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Invalid(msg) => ApiError::unauthorized(format!("Invalid token: {}", msg)),
            other => {
                tracing::error!("Token error: {}", other);
                ApiError::internal_server_error(other.to_string())
            }
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        tracing::error!("Password hashing error: {}", err);
        ApiError::internal_server_error("Failed to process password")
    }
}

impl From<BackupError> for ApiError {
    fn from(err: BackupError) -> Self {
        tracing::error!("Backup/restore error: {}", err);
        ApiError::internal_server_error(err.to_string())
    }
}

impl From<EmailError> for ApiError {
    fn from(err: EmailError) -> Self {
        match err {
            EmailError::InvalidAddress(address) => ApiError::field_error("email", format!("invalid address: {}", address)),
            EmailError::Delivery(msg) => {
                tracing::error!("Email delivery error: {}", msg);
                ApiError::service_unavailable("Email delivery failed")
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::invalid_json(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_dispatch_errors_to_distinct_statuses() {
        let cases = vec![
            (DispatchError::UnknownTable("nope".into()), StatusCode::BAD_REQUEST),
            (DispatchError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (DispatchError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (DispatchError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (
                DispatchError::Database(DatabaseError::Query("boom".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status_code(), expected);
        }
    }

    #[test]
    fn constraint_violations_are_client_errors() {
        let cases = [
            (UNIQUE_VIOLATION, StatusCode::CONFLICT),
            (FOREIGN_KEY_VIOLATION, StatusCode::BAD_REQUEST),
            (NOT_NULL_VIOLATION, StatusCode::BAD_REQUEST),
        ];
        for (code, expected) in cases {
            let err = constraint_error(Some(code), "violates constraint").unwrap();
            assert_eq!(err.status_code(), expected, "{}", code);
        }

        assert!(constraint_error(Some("42P01"), "undefined table").is_none());
        assert!(constraint_error(None, "no code").is_none());
    }

    #[test]
    fn database_errors_surface_message() {
        let err = ApiError::from(DatabaseError::Query("relation \"x\" does not exist".into()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.message().contains("relation \"x\" does not exist"));
    }

    #[test]
    fn error_body_has_failure_envelope() {
        let body = ApiError::field_error("username", "must be at least 3 characters").to_json();
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["field_errors"]["username"], "must be at least 3 characters");

        let body = ApiError::not_found("Person not found").to_json();
        assert_eq!(body["error"], "Person not found");
        assert!(body.get("field_errors").is_none());
    }

    #[test]
    fn invalid_token_is_unauthorized() {
        let err = ApiError::from(JwtError::Invalid("ExpiredSignature".into()));
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }
}
