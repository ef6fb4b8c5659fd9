//! HTTP page and image fetcher.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, REFERER};
use reqwest::{Client, RequestBuilder};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::error::{ExtractionError, FetchError, FetchResult, Result};
use crate::traits::fetcher::{FetchedImage, ImageFetcher, PageFetcher};
use crate::types::config::PipelineConfig;

/// Fetches recipe pages and step images over HTTP.
///
/// Pages and images have separate time budgets. Image requests carry a
/// `Referer` of the image's own origin, which hotlink-protected recipe CDNs
/// require.
///
/// # Example
///
/// ```rust,ignore
/// use recipe_extraction::fetch::HttpFetcher;
///
/// let fetcher = HttpFetcher::new(&PipelineConfig::default())?;
/// let html = fetcher.fetch_page("https://www.xiachufang.com/recipe/100/").await?;
/// ```
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    page_timeout: Duration,
    image_timeout: Duration,
}

impl HttpFetcher {
    /// Build a client carrying the configured user agent.
    ///
    /// Fails with [`ExtractionError::Config`] when the user agent is not a
    /// valid header value or the TLS backend cannot initialize.
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ExtractionError::Config(Box::new(e)))?;

        Ok(Self {
            client,
            page_timeout: config.page_timeout,
            image_timeout: config.image_timeout,
        })
    }

    async fn send(&self, url: &str, request: RequestBuilder) -> FetchResult<reqwest::Response> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                }
            } else {
                warn!(url = %url, error = %e, "HTTP request failed");
                FetchError::Http(Box::new(e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response)
    }
}

fn parse_url(url: &str) -> FetchResult<Url> {
    Url::parse(url).map_err(|_| FetchError::InvalidUrl {
        url: url.to_string(),
    })
}

fn body_error(url: &str, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Body(Box::new(e))
    }
}

/// `Referer` value for an image: the scheme and host it is served from.
fn referer_for(url: &Url) -> Option<String> {
    match url.origin() {
        origin @ url::Origin::Tuple(..) => Some(format!("{}/", origin.ascii_serialization())),
        url::Origin::Opaque(_) => None,
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    #[instrument(skip(self), fields(url = %url))]
    async fn fetch_page(&self, url: &str) -> FetchResult<String> {
        let parsed = parse_url(url)?;

        let request = self
            .client
            .get(parsed)
            .header(ACCEPT, "text/html,application/xhtml+xml")
            .timeout(self.page_timeout);

        let response = self.send(url, request).await?;
        let html = response.text().await.map_err(|e| body_error(url, e))?;

        debug!(bytes = html.len(), "Fetched page");
        Ok(html)
    }
}

#[async_trait]
impl ImageFetcher for HttpFetcher {
    #[instrument(skip(self), fields(url = %url))]
    async fn fetch_image(&self, url: &str) -> FetchResult<FetchedImage> {
        let parsed = parse_url(url)?;

        let mut request = self
            .client
            .get(parsed.clone())
            .header(ACCEPT, "image/*")
            .timeout(self.image_timeout);
        if let Some(referer) = referer_for(&parsed) {
            request = request.header(REFERER, referer);
        }

        let response = self.send(url, request).await?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let bytes = response.bytes().await.map_err(|e| body_error(url, e))?;

        debug!(bytes = bytes.len(), content_type = ?content_type, "Fetched image");
        Ok(FetchedImage {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}
