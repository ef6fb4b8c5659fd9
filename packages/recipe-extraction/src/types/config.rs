//! Configuration for the extraction pipeline.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ExtractionError, Result};

/// Configuration for the extraction pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Hard cap on reduced page text sent to inference, in characters.
    ///
    /// Bounds inference cost for long pages. Default: 15000.
    pub max_content_chars: usize,

    /// Timeout for fetching the recipe page. Default: 30s.
    pub page_timeout: Duration,

    /// Timeout for each step image download. Default: 15s.
    pub image_timeout: Duration,

    /// User-Agent sent with page and image requests.
    pub user_agent: String,

    /// Download step images to blob storage.
    ///
    /// When false, steps keep their remote URLs. Default: true.
    pub download_images: bool,

    /// Upper bound on in-flight image downloads. Default: 8.
    pub max_concurrent_downloads: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_content_chars: 15_000,
            page_timeout: Duration::from_secs(30),
            image_timeout: Duration::from_secs(15),
            user_agent: "Mozilla/5.0 (compatible; ChefApp/1.0)".to_string(),
            download_images: true,
            max_concurrent_downloads: 8,
        }
    }
}

impl PipelineConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overlaid with `RECIPE_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(chars) = env_parse::<usize>("RECIPE_MAX_CONTENT_CHARS")? {
            config.max_content_chars = chars;
        }
        if let Some(secs) = env_parse::<u64>("RECIPE_PAGE_TIMEOUT_SECS")? {
            config.page_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = env_parse::<u64>("RECIPE_IMAGE_TIMEOUT_SECS")? {
            config.image_timeout = Duration::from_secs(secs);
        }
        if let Ok(agent) = env::var("RECIPE_USER_AGENT") {
            if !agent.trim().is_empty() {
                config.user_agent = agent;
            }
        }
        if let Some(download) = env_parse::<bool>("RECIPE_DOWNLOAD_IMAGES")? {
            config.download_images = download;
        }

        Ok(config)
    }

    /// Set the reduced-content character cap.
    pub fn with_max_content_chars(mut self, chars: usize) -> Self {
        self.max_content_chars = chars;
        self
    }

    /// Set the page fetch timeout.
    pub fn with_page_timeout(mut self, timeout: Duration) -> Self {
        self.page_timeout = timeout;
        self
    }

    /// Set the per-image download timeout.
    pub fn with_image_timeout(mut self, timeout: Duration) -> Self {
        self.image_timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    pub fn with_download_images(mut self, download: bool) -> Self {
        self.download_images = download;
        self
    }

    /// Set the download concurrency bound (minimum 1).
    pub fn with_max_concurrent_downloads(mut self, max: usize) -> Self {
        self.max_concurrent_downloads = max.max(1);
        self
    }
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ExtractionError::Config(format!("{key}: {e}").into())),
        Err(_) => Ok(None),
    }
}
