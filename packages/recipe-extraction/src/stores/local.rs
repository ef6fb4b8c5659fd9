//! Filesystem blob storage for downloaded images.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use crate::error::{ExtractionError, Result};
use crate::traits::store::BlobStore;

/// Writes blobs to `<dir>/<uuid>.<ext>` and returns `<public_prefix>/<file>`.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    dir: PathBuf,
    public_prefix: String,
}

impl LocalBlobStore {
    /// Store under `dir`, served from `/media`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            public_prefix: "/media".to_string(),
        }
    }

    pub fn with_public_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.public_prefix = prefix.into().trim_end_matches('/').to_string();
        self
    }

    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn save(&self, bytes: &[u8], extension: &str) -> Result<String> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| ExtractionError::Storage(Box::new(e)))?;

        let filename = format!("{}.{}", Uuid::new_v4(), extension.trim_start_matches('.'));
        let path = self.dir.join(&filename);

        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| ExtractionError::Storage(Box::new(e)))?;

        debug!(path = %path.display(), bytes = bytes.len(), "Saved blob");
        Ok(format!("{}/{}", self.public_prefix, filename))
    }
}
