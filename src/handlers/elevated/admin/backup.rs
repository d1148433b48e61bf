// handlers/elevated/admin/backup.rs - GET /api/v1/admin/backup

use axum::{
    body::Body,
    extract::{Extension, State},
    http::header,
    response::{IntoResponse, Response},
};
use chrono::Local;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::services::BackupService;

/// Stream a `pg_dump` custom-format archive of the whole database
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Response, ApiError> {
    let filename = BackupService::backup_filename(Local::now());
    let stream = state.backup.stream_dump()?;

    tracing::info!("Backup {} requested by {}", filename, user.username);
    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", filename)),
            (header::CACHE_CONTROL, "no-cache".to_string()),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}
