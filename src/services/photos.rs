use std::io::Cursor;
use std::sync::Arc;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ExtendedColorType, ImageEncoder};

use crate::storage::{photo_key, ObjectStore, StorageError};

pub const JPEG_QUALITY: u8 = 80;

#[derive(Debug, thiserror::Error)]
pub enum PhotoError {
    #[error("photo is empty")]
    Empty,

    #[error("photo is {size} bytes, limit is {limit}")]
    TooLarge { size: usize, limit: usize },

    #[error("could not read photo upload: {0}")]
    Read(String),

    #[error("could not resize photo: {0}")]
    Resize(#[from] image::ImageError),

    #[error("could not upload photo: {0}")]
    Upload(#[from] StorageError),

    #[error("resize task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// A file picked in the form.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Scales an image to exactly `width` pixels wide, keeping its aspect ratio,
/// and re-encodes it as JPEG.
pub fn resize_to_width(bytes: &[u8], width: u32) -> Result<Vec<u8>, image::ImageError> {
    let img = image::load_from_memory(bytes)?;
    let scale = f64::from(width) / f64::from(img.width().max(1));
    let height = ((f64::from(img.height()) * scale).round() as u32).max(1);

    let rgb = img.resize_exact(width, height, FilterType::Triangle).to_rgb8();

    let mut out = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY).write_image(
        rgb.as_raw(),
        rgb.width(),
        rgb.height(),
        ExtendedColorType::Rgb8,
    )?;
    Ok(out.into_inner())
}

/// Resize-then-upload step of a submission.
#[derive(Clone)]
pub struct PhotoPipeline {
    store: Arc<dyn ObjectStore>,
    target_width: u32,
}

impl PhotoPipeline {
    pub fn new(store: Arc<dyn ObjectStore>, target_width: u32) -> Self {
        Self {
            store,
            target_width,
        }
    }

    /// Returns the public URL of the stored photo.
    pub async fn process(&self, upload: PhotoUpload, epoch_millis: i64) -> Result<String, PhotoError> {
        if upload.bytes.is_empty() {
            return Err(PhotoError::Empty);
        }

        let width = self.target_width;
        let PhotoUpload { file_name, bytes } = upload;
        tracing::debug!(file_name = %file_name, bytes = bytes.len(), width, "Resizing photo");
        let resized = tokio::task::spawn_blocking(move || resize_to_width(&bytes, width)).await??;

        let key = photo_key(epoch_millis, &file_name);
        let url = self.store.put(&key, resized, "image/jpeg").await?;
        tracing::info!(key = %key, "Photo uploaded");
        Ok(url)
    }
}
