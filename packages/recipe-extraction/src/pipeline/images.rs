//! Image acquisition - download step images into blob storage.
//!
//! Every image is independently optional: failures are logged and dropped,
//! never propagated. Batch results are keyed by a caller-supplied key
//! because completion order is arbitrary.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::traits::fetcher::ImageFetcher;
use crate::traits::store::BlobStore;
use crate::types::image::DownloadedImage;

/// True for absolute http(s) URLs; local paths and data URLs are skipped.
pub fn is_external_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// File extension from a declared content type. Unknown types → "jpg".
pub fn extension_for_content_type(content_type: Option<&str>) -> &'static str {
    let content_type = content_type.unwrap_or("").to_ascii_lowercase();
    if content_type.contains("png") {
        "png"
    } else if content_type.contains("gif") {
        "gif"
    } else if content_type.contains("webp") {
        "webp"
    } else {
        "jpg"
    }
}

#[derive(Clone)]
pub struct ImageDownloader {
    fetcher: Arc<dyn ImageFetcher>,
    blobs: Arc<dyn BlobStore>,
    timeout: Duration,
    max_concurrent: usize,
}

impl ImageDownloader {
    pub fn new(fetcher: Arc<dyn ImageFetcher>, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            fetcher,
            blobs,
            timeout: Duration::from_secs(15),
            max_concurrent: 8,
        }
    }

    /// Upper bound for fetch plus save of one image.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max.max(1);
        self
    }

    /// Download one image. `None` on any failure, including timeout.
    pub async fn download(&self, url: &str) -> Option<DownloadedImage> {
        if !is_external_url(url) {
            debug!(url = %url, "Skipping non-external image URL");
            return None;
        }

        match tokio::time::timeout(self.timeout, self.fetch_and_save(url)).await {
            Ok(Ok(local_path)) => {
                debug!(url = %url, path = %local_path, "Downloaded image");
                Some(DownloadedImage {
                    id: Uuid::new_v4(),
                    local_path,
                    source_url: url.to_string(),
                })
            }
            Ok(Err(reason)) => {
                warn!(url = %url, error = %reason, "Image download failed");
                None
            }
            Err(_) => {
                warn!(
                    url = %url,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Image download timed out"
                );
                None
            }
        }
    }

    async fn fetch_and_save(&self, url: &str) -> Result<String, String> {
        let image = self
            .fetcher
            .fetch_image(url)
            .await
            .map_err(|e| e.to_string())?;

        if image.bytes.is_empty() {
            return Err("empty response body".to_string());
        }

        let extension = extension_for_content_type(image.content_type.as_deref());
        self.blobs
            .save(&image.bytes, extension)
            .await
            .map_err(|e| e.to_string())
    }

    /// Download a keyed batch concurrently, bounded by `max_concurrent`.
    ///
    /// The result only contains keys whose download succeeded.
    pub async fn download_all<K>(
        &self,
        items: impl IntoIterator<Item = (K, String)>,
    ) -> HashMap<K, DownloadedImage>
    where
        K: Eq + Hash + Send,
    {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));

        let tasks: Vec<_> = items
            .into_iter()
            .filter(|(_, url)| is_external_url(url))
            .map(|(key, url)| {
                let semaphore = semaphore.clone();
                async move {
                    let _permit = semaphore.acquire().await.ok()?;
                    self.download(&url).await.map(|image| (key, image))
                }
            })
            .collect();

        let requested = tasks.len();
        let results: HashMap<K, DownloadedImage> =
            join_all(tasks).await.into_iter().flatten().collect();

        if requested > 0 {
            info!(requested, downloaded = results.len(), "Image batch complete");
        }

        results
    }
}
