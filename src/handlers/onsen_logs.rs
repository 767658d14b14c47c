use axum::{
    extract::{multipart::Field, DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::onsen_log::{LogForm, OnsenLog, UpdateOnsenLogRequest};
use crate::services::photos::{PhotoError, PhotoUpload};
use crate::services::submission::SubmissionReport;
use crate::AppState;

/// Body limit for the multipart log routes. Photo parts over the photo cap
/// are drained and dropped rather than failing the whole form.
pub fn upload_body_limit(max_bytes: usize) -> DefaultBodyLimit {
    DefaultBodyLimit::max(max_bytes)
}

pub async fn list_logs(State(state): State<AppState>) -> AppResult<Json<Vec<OnsenLog>>> {
    Ok(Json(state.store.recent().await?))
}

pub async fn get_log(
    State(state): State<AppState>,
    Path(log_id): Path<Uuid>,
) -> AppResult<Json<OnsenLog>> {
    let log = state
        .store
        .get_by_id(log_id)
        .await?
        .ok_or(AppError::NotFound("Onsen log not found".into()))?;

    Ok(Json(log))
}

/// POST /api/logs (multipart form)
pub async fn create_log(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<SubmissionReport>)> {
    let (form, photo) = read_form(multipart, state.config.photo_max_bytes).await?;
    let report = state.submitter.submit(form, photo).await?;
    Ok((StatusCode::CREATED, Json(report)))
}

/// PUT /api/logs/{id}: partial update
pub async fn update_log(
    State(state): State<AppState>,
    Path(log_id): Path<Uuid>,
    Json(body): Json<UpdateOnsenLogRequest>,
) -> AppResult<Json<OnsenLog>> {
    Ok(Json(state.submitter.edit(log_id, body).await?))
}

/// POST /api/logs/{id}/photo (multipart, field `photo`)
pub async fn replace_photo(
    State(state): State<AppState>,
    Path(log_id): Path<Uuid>,
    multipart: Multipart,
) -> AppResult<Json<OnsenLog>> {
    let (_, photo) = read_form(multipart, state.config.photo_max_bytes).await?;
    let photo = photo.ok_or_else(|| AppError::field("photo", "photo is required"))??;
    Ok(Json(state.submitter.replace_photo(log_id, photo).await?))
}

type PhotoPart = Option<Result<PhotoUpload, PhotoError>>;

async fn read_form(
    mut multipart: Multipart,
    max_photo_bytes: usize,
) -> AppResult<(LogForm, PhotoPart)> {
    let mut form = LogForm::default();
    let mut photo = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "photo" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            match read_photo(&mut field, max_photo_bytes).await {
                // Browsers send an empty part when no file was picked.
                Ok(bytes) if bytes.is_empty() => {}
                Ok(bytes) => photo = Some(Ok(PhotoUpload { file_name, bytes })),
                Err(e @ PhotoError::TooLarge { .. }) => photo = Some(Err(e)),
                Err(e) => {
                    // The body stream is unusable past a read error.
                    photo = Some(Err(e));
                    break;
                }
            }
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;
        match name.as_str() {
            "date" => form.date = value,
            "onsenName" => form.onsen_name = value,
            "sleepScore" => form.sleep_score = value,
            "memo" => form.memo = Some(value),
            "rating" => form.rating = parse_rating(&value)?,
            other => tracing::debug!(field = %other, "Ignoring unknown form field"),
        }
    }

    Ok((form, photo))
}

/// Reads a photo part chunk by chunk, keeping at most `limit` bytes. An
/// oversized part is still drained so the fields after it can be read.
async fn read_photo(field: &mut Field<'_>, limit: usize) -> Result<Vec<u8>, PhotoError> {
    let mut bytes = Vec::new();
    let mut size = 0usize;
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| PhotoError::Read(e.body_text()))?
    {
        size += chunk.len();
        if size > limit {
            bytes = Vec::new();
        } else {
            bytes.extend_from_slice(&chunk);
        }
    }

    if size > limit {
        tracing::warn!(size, limit, "Photo part exceeds the size cap");
        return Err(PhotoError::TooLarge { size, limit });
    }
    Ok(bytes)
}

fn parse_rating(value: &str) -> AppResult<Option<i32>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|_| AppError::field("rating", "rating must be between 1 and 5"))
}
