//! Network fetch traits for recipe pages and step images.

use async_trait::async_trait;

use crate::error::FetchResult;

/// Raw image response.
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    /// Declared `Content-Type`, if the server sent one.
    pub content_type: Option<String>,
}

/// Fetches recipe pages as HTML text.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, url: &str) -> FetchResult<String>;
}

/// Fetches remote images.
///
/// A timeout must resolve to [`crate::FetchError::Timeout`], never hang.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch_image(&self, url: &str) -> FetchResult<FetchedImage>;
}
