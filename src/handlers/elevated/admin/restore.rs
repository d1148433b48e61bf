// handlers/elevated/admin/restore.rs - POST /api/v1/admin/restore

use axum::{
    extract::{multipart::MultipartRejection, Extension, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, AuthUser};
use crate::services::BackupError;

/// Multipart field carrying the archive
const BACKUP_FIELD: &str = "backup";

/// Replace the database contents with an uploaded `pg_dump` archive
pub async fn post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let mut multipart = multipart.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let (source_name, archive) = read_backup_field(&mut multipart).await?;

    tracing::warn!("Database restore from {} started by {}", source_name, user.username);
    match state.backup.restore(&archive, &source_name).await {
        Ok(outcome) => Ok(ApiResponse::success(json!({
            "message": format!("Database restored from {}", outcome.source_name),
            "output": outcome.output,
        }))
        .into_response()),
        Err(BackupError::RestoreFailed { detail }) => Ok(restore_failed(&detail)),
        Err(e) => Err(e.into()),
    }
}

async fn read_backup_field(multipart: &mut Multipart) -> Result<(String, Vec<u8>), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some(BACKUP_FIELD) {
            continue;
        }

        let source_name = field.file_name().unwrap_or("upload.dump").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {}", e)))?;
        if bytes.is_empty() {
            return Err(ApiError::field_error(BACKUP_FIELD, "uploaded file is empty"));
        }
        return Ok((source_name, bytes.to_vec()));
    }

    Err(ApiError::field_error(BACKUP_FIELD, "no backup file provided"))
}

/// 500 carrying the pg_restore diagnostics alongside the usual error fields
fn restore_failed(detail: &str) -> Response {
    let error = ApiError::internal_server_error("Database restore failed");
    let mut body: Value = error.to_json();
    body["message"] = Value::String(error.message().to_string());
    body["detail"] = Value::String(detail.trim().to_string());
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}
