//! Create and edit flows for onsen logs.
//!
//! A creation walks `Validating -> Geocoding -> ResizingPhoto ->
//! UploadingPhoto -> Persisting`. Geocoding and the photo stages only degrade
//! the record when they fail; persistence is the one fatal stage.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::onsen_log::{
    Coordinates, LogForm, OnsenLog, OnsenLogPatch, UpdateOnsenLogRequest,
};
use crate::services::geocoding::Geocoder;
use crate::services::photos::{PhotoError, PhotoPipeline, PhotoUpload};
use crate::services::record_store::RecordStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStage {
    Validating,
    Geocoding,
    ResizingPhoto,
    UploadingPhoto,
    Persisting,
}

/// Best-effort step that failed without aborting the submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradedStep {
    Geocoding,
    Photo,
}

#[derive(Debug, Serialize)]
pub struct SubmissionReport {
    pub log: OnsenLog,
    pub degraded: Vec<DegradedStep>,
}

#[derive(Clone)]
pub struct LogSubmitter {
    store: RecordStore,
    geocoder: Arc<dyn Geocoder>,
    photos: PhotoPipeline,
}

impl LogSubmitter {
    pub fn new(store: RecordStore, geocoder: Arc<dyn Geocoder>, photos: PhotoPipeline) -> Self {
        Self {
            store,
            geocoder,
            photos,
        }
    }

    /// `photo` is the form's photo part as received; a part that could not be
    /// read only degrades the record.
    pub async fn submit(
        &self,
        form: LogForm,
        photo: Option<Result<PhotoUpload, PhotoError>>,
    ) -> AppResult<SubmissionReport> {
        tracing::debug!(stage = ?SubmissionStage::Validating, "Submission started");
        // Nothing leaves the process until the form is valid.
        let mut log = form.into_new_log()?;
        let mut degraded = Vec::new();

        tracing::debug!(stage = ?SubmissionStage::Geocoding, onsen = %log.onsen_name);
        log.coordinates = self.geocode(&log.onsen_name).await;
        if log.coordinates.is_none() {
            degraded.push(DegradedStep::Geocoding);
        }

        match photo {
            Some(Ok(upload)) => match self.upload_photo(upload).await {
                Some(url) => log.photo_url = Some(url),
                None => degraded.push(DegradedStep::Photo),
            },
            Some(Err(e)) => {
                tracing::warn!(error = %e, "Photo part rejected, continuing without photo");
                degraded.push(DegradedStep::Photo);
            }
            None => {}
        }

        tracing::debug!(stage = ?SubmissionStage::Persisting);
        let log = self.store.create(log).await.map_err(|e| {
            tracing::error!(error = %e, "Submission failed while persisting");
            e
        })?;

        Ok(SubmissionReport { log, degraded })
    }

    /// Loads the record, validates and merges the supplied fields, and writes
    /// them back.
    ///
    /// A renamed onsen is geocoded again unless the request carries its own
    /// coordinates; a failed lookup keeps the stored ones.
    pub async fn edit(&self, id: Uuid, request: UpdateOnsenLogRequest) -> AppResult<OnsenLog> {
        let current = self
            .store
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Onsen log not found".into()))?;

        let mut patch = OnsenLogPatch::try_from(request)?;
        if patch.is_empty() {
            return Ok(current);
        }

        let renamed = patch
            .onsen_name
            .as_deref()
            .is_some_and(|name| name != current.onsen_name);
        if renamed && patch.coordinates.is_none() {
            if let Some(name) = patch.onsen_name.as_deref() {
                if let Some(coordinates) = self.geocode(name).await {
                    patch.coordinates = Some(Some(coordinates));
                }
            }
        }

        self.store
            .update(id, &patch)
            .await?
            .ok_or_else(|| AppError::NotFound("Onsen log not found".into()))
    }

    /// Replaces the photo of an existing record.
    pub async fn replace_photo(&self, id: Uuid, upload: PhotoUpload) -> AppResult<OnsenLog> {
        if self.store.get_by_id(id).await?.is_none() {
            return Err(AppError::NotFound("Onsen log not found".into()));
        }

        let url = self.photos.process(upload, Utc::now().timestamp_millis()).await?;
        let patch = OnsenLogPatch {
            photo_url: Some(Some(url)),
            ..Default::default()
        };
        self.store
            .update(id, &patch)
            .await?
            .ok_or_else(|| AppError::NotFound("Onsen log not found".into()))
    }

    async fn geocode(&self, name: &str) -> Option<Coordinates> {
        match self.geocoder.resolve(name).await {
            Ok(coordinates) => Some(coordinates),
            Err(e) => {
                tracing::warn!(error = %e, onsen = %name, "Geocoding failed, continuing without coordinates");
                None
            }
        }
    }

    async fn upload_photo(&self, upload: PhotoUpload) -> Option<String> {
        tracing::debug!(
            stage = ?SubmissionStage::ResizingPhoto,
            next = ?SubmissionStage::UploadingPhoto,
            file_name = %upload.file_name
        );
        match self.photos.process(upload, Utc::now().timestamp_millis()).await {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(error = %e, "Photo step failed, continuing without photo");
                None
            }
        }
    }
}
