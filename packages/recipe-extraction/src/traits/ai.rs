//! Inference trait for LLM operations.
//!
//! The pipeline only needs one capability from a language/vision model:
//! a single request/response completion. Prompt construction and response
//! parsing live in [`crate::pipeline`], so providers stay thin.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::input::InlineImage;

/// A single completion request.
#[derive(Debug, Clone, Default)]
pub struct InferenceRequest {
    /// System instruction, if any.
    pub system: Option<String>,

    /// User prompt text.
    pub prompt: String,

    /// Inline images attached to the user message.
    pub images: Vec<InlineImage>,

    /// Response token limit.
    pub max_tokens: u32,
}

impl InferenceRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            images: Vec::new(),
            max_tokens: 2048,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_images(mut self, images: Vec<InlineImage>) -> Self {
        self.images = images;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Inference service trait.
///
/// Implementations wrap specific LLM providers (OpenAI, etc.) and return
/// the model's free-form reply text. Replies are expected, but not
/// guaranteed, to contain one JSON object.
#[async_trait]
pub trait InferenceService: Send + Sync {
    async fn complete(&self, request: &InferenceRequest) -> Result<String>;
}
