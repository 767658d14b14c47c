//! Blob storage for user photos.
//!
//! Keys look like `onsenPhotos/<epoch-millis>_<file-name>` and map to a
//! publicly fetchable URL once stored.

pub mod filesystem;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;

pub use filesystem::FilesystemObjectStore;

pub const PHOTO_PREFIX: &str = "onsenPhotos";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("invalid object key: {0}")]
    InvalidKey(String),

    #[error("invalid public base URL: {0}")]
    PublicUrl(String),

    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stores `data` under `key` and returns its public URL.
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str)
        -> Result<String, StorageError>;
}

/// Builds the object key for an uploaded photo.
pub fn photo_key(epoch_millis: i64, original_name: &str) -> String {
    let name = original_name
        .rsplit(['/', '\\'])
        .next()
        .map(str::trim)
        .filter(|n| !n.is_empty() && *n != "." && *n != "..")
        .unwrap_or("photo.jpg");
    format!("{PHOTO_PREFIX}/{epoch_millis}_{name}")
}

/// Rejects keys that could escape the storage root.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|s| s.is_empty() || s == "." || s == "..");
    if bad {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}
