//! Typed errors for the recipe extraction library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.

use thiserror::Error;

/// Errors that can occur while extracting a recipe.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Caller supplied no usable input (rejected before any I/O)
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    /// Fetching the recipe page failed; nothing is left to parse
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// The page had no text left after boilerplate removal
    #[error("page has no recipe content")]
    NoContent,

    /// The inference reply held no parseable recipe object
    #[error("could not parse recipe content: {reason}")]
    UnparseableResponse { reason: String },

    /// Inference service unavailable or failed
    #[error("inference service error: {0}")]
    Inference(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Vocabulary or blob storage failed
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Configuration error
    #[error("config error: {0}")]
    Config(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ExtractionError {
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    pub fn unparseable(reason: impl Into<String>) -> Self {
        Self::UnparseableResponse {
            reason: reason.into(),
        }
    }

    /// Message shown to the person who submitted the link or photos.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidInput { reason } => reason.clone(),
            Self::Fetch(_) => "无法获取链接内容".to_string(),
            Self::NoContent | Self::UnparseableResponse { .. } => "无法解析菜谱内容".to_string(),
            Self::Inference(_) => "菜谱解析服务暂时不可用".to_string(),
            Self::Storage(_) | Self::Config(_) => "服务器内部错误".to_string(),
        }
    }

    /// Whether this error class is allowed to abort a whole extraction.
    ///
    /// Caller errors, page fetch failures and the terminal inference layer
    /// coming back empty-handed (nothing to send, service down, reply not
    /// parseable) abort. Storage errors degrade into a partial result.
    pub fn is_fatal_to_pipeline(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput { .. }
                | Self::Fetch(_)
                | Self::NoContent
                | Self::UnparseableResponse { .. }
                | Self::Inference(_)
        )
    }
}

/// Errors from fetching a page or an image over the network.
#[derive(Debug, Error)]
pub enum FetchError {
    /// URL could not be parsed or has no host
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Server answered with a non-success status
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    /// The request did not finish within its time budget
    #[error("timeout fetching: {url}")]
    Timeout { url: String },

    /// Response body could not be read
    #[error("failed to read body: {0}")]
    Body(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractionError>;

/// Result type alias for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;
