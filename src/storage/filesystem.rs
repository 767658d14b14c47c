use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use url::Url;

use super::{validate_key, ObjectStore, StorageError};

/// Stores objects as plain files under `base_path`, served at `public_base_url`.
pub struct FilesystemObjectStore {
    base_path: PathBuf,
    public_base_url: Url,
}

impl FilesystemObjectStore {
    pub async fn new(base_path: PathBuf, public_base_url: &str) -> Result<Self, StorageError> {
        let public_base_url = Url::parse(public_base_url)
            .map_err(|e| StorageError::PublicUrl(format!("{public_base_url}: {e}")))?;
        if public_base_url.cannot_be_a_base() {
            return Err(StorageError::PublicUrl(public_base_url.to_string()));
        }

        fs::create_dir_all(&base_path).await?;
        fs::create_dir_all(base_path.join(".tmp")).await?;
        Ok(Self {
            base_path,
            public_base_url,
        })
    }

    /// Public URL of `key`, each segment percent-encoded.
    fn public_url(&self, key: &str) -> String {
        let mut url = self.public_base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(key.split('/'));
        }
        url.into()
    }

    #[cfg(test)]
    pub fn base_path(&self) -> &std::path::Path {
        &self.base_path
    }

    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }
}

#[async_trait]
impl ObjectStore for FilesystemObjectStore {
    async fn put(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        validate_key(key)?;
        let path = self.base_path.join(key);

        // Write to a temp file first so readers never see a partial photo.
        let temp_path = self.temp_path();
        if let Err(e) = fs::write(&temp_path, &data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        if let Err(e) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        tracing::debug!(key = %key, content_type = %content_type, bytes = data.len(), "Stored object");
        Ok(self.public_url(key))
    }
}
