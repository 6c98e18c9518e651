//! Axum route handlers for resume uploads.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::document::read_text;
use crate::errors::AppError;
use crate::models::resume::ResumeRecord;
use crate::state::AppState;

const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub status: &'static str,
    pub request_id: Uuid,
    pub file: String,
    pub strategy: &'static str,
    pub resume: ResumeRecord,
}

struct Upload {
    file_name: String,
    bytes: Bytes,
}

/// POST /upload
///
/// Accepts a multipart form with a PDF in the `file` field and returns the
/// structured resume produced by the configured strategy.
pub async fn handle_upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let request_id = Uuid::new_v4();
    let mut multipart =
        multipart.map_err(|e| AppError::Validation(format!("Expected a multipart form: {e}")))?;

    let upload = read_file_field(&mut multipart)
        .await?
        .ok_or(AppError::MissingFile)?;

    info!(
        "[{request_id}] Received '{}' ({} bytes)",
        upload.file_name,
        upload.bytes.len()
    );

    let declared_length = upload.bytes.len();
    let text = read_text(upload.bytes, declared_length).await?;
    let resume = state.strategy.extract(&text).await?;

    if resume.is_empty() {
        warn!("[{request_id}] No resume fields matched in '{}'", upload.file_name);
    }

    info!(
        "[{request_id}] Extracted resume via {} strategy ({} chars of text)",
        state.strategy.name(),
        text.len()
    );

    Ok(Json(UploadResponse {
        status: "success",
        request_id,
        file: upload.file_name,
        strategy: state.strategy.name(),
        resume,
    }))
}

/// Returns the first `file` field of the form, skipping any other fields.
async fn read_file_field(multipart: &mut Multipart) -> Result<Option<Upload>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload.pdf").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read uploaded file: {e}")))?;

        return Ok(Some(Upload { file_name, bytes }));
    }

    Ok(None)
}
