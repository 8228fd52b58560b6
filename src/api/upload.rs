use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;

use super::{detail, DetailError};
use crate::models::{BulkUploadReport, IncomingFile};
use crate::state::AppState;
use crate::upload::report::summarize;

/// Multipart field carrying the files
const FILES_FIELD: &str = "files";

/// POST /upload/memes - Bulk upload with per-file status tracking.
///
/// Every file gets its own outcome; one bad file never fails the request.
pub async fn upload_memes(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<BulkUploadReport>, DetailError> {
    let max_files = state.uploads.config().max_files_per_batch;
    let mut files = Vec::new();
    let mut received = 0usize;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        detail(
            StatusCode::BAD_REQUEST,
            format!("Invalid multipart data: {e}"),
        )
    })? {
        if field.name() != Some(FILES_FIELD) {
            continue;
        }
        received += 1;
        // Past the limit only the count matters; unread fields are skipped
        if received > max_files {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(|e| {
            detail(
                StatusCode::BAD_REQUEST,
                format!(
                    "Failed to read file '{}': {e}",
                    file_name.as_deref().unwrap_or_default()
                ),
            )
        })?;

        files.push(IncomingFile {
            file_name,
            content_type,
            data,
        });
    }

    if received == 0 {
        return Err(detail(StatusCode::BAD_REQUEST, "No files provided"));
    }
    if received > max_files {
        return Err(detail(
            StatusCode::BAD_REQUEST,
            format!("Too many files. Maximum allowed: {max_files}, received: {received}"),
        ));
    }

    tracing::info!("Starting bulk upload of {} files", files.len());
    let total = files.len();
    let results = state.uploads.process_files(files).await;
    let report = summarize(total, results);

    tracing::info!(
        "Bulk upload completed: {} successful, {} failed, {} skipped",
        report.successful_uploads,
        report.failed_uploads,
        report.skipped_uploads
    );

    Ok(Json(report))
}
