use axum::{
    extract::{multipart::{MultipartError, MultipartRejection}, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::api::{error::ApiError, state::AppState};
use crate::application::sanitize_filename;
use crate::domain::{DomainError, UploadRecord, UploadStatus};

const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub file_id: Uuid,
    pub filename: String,
    pub status: UploadStatus,
}

#[derive(Debug, Serialize)]
pub struct UploadStatusResponse {
    pub file_id: Uuid,
    pub filename: String,
    pub status: UploadStatus,
    pub message: Option<String>,
    pub chunks: Option<usize>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UploadRecord> for UploadStatusResponse {
    fn from(record: UploadRecord) -> Self {
        Self {
            file_id: record.file_id,
            filename: record.filename,
            status: record.status,
            message: record.message,
            chunks: record.chunks,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UploadListResponse {
    pub uploads: Vec<UploadStatusResponse>,
    pub total: usize,
}

fn multipart_error(err: MultipartError, limit: usize) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::payload_too_large(limit)
    } else {
        ApiError::new(err.status(), "Invalid upload", err.body_text())
    }
}

pub async fn upload_pdf(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut multipart = multipart?;
    let limit = state.config.config.upload.max_bytes;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        // Reject by name before reading the body.
        let filename = field.file_name().unwrap_or_default().to_string();
        sanitize_filename(&filename)?;

        let bytes = field.bytes().await.map_err(|e| multipart_error(e, limit))?;
        if bytes.len() > limit {
            return Err(ApiError::payload_too_large(limit));
        }

        let record = state.uploads.accept(&filename, &bytes).await?;

        return Ok(Json(UploadResponse {
            message: "PDF uploaded, processing in background".to_string(),
            file_id: record.file_id,
            filename: record.filename,
            status: record.status,
        }));
    }

    Err(ApiError::unprocessable("Missing multipart field `file`"))
}

pub async fn upload_status(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> Result<Json<UploadStatusResponse>, ApiError> {
    let id = file_id
        .parse::<Uuid>()
        .map_err(|_| DomainError::not_found(format!("File with ID {file_id} not found")))?;

    Ok(Json(state.uploads.status(id)?.into()))
}

pub async fn list_uploads(
    State(state): State<AppState>,
) -> Result<Json<UploadListResponse>, ApiError> {
    let uploads: Vec<UploadStatusResponse> =
        state.uploads.list()?.into_iter().map(Into::into).collect();

    Ok(Json(UploadListResponse {
        total: uploads.len(),
        uploads,
    }))
}
