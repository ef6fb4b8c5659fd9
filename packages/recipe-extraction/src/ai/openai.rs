//! OpenAI implementation of the inference service.
//!
//! # Example
//!
//! ```rust,ignore
//! use recipe_extraction::ai::OpenAI;
//!
//! let ai = OpenAI::new("sk-...").with_model("gpt-4o");
//! let pipeline = RecipePipeline::builder().inference(Arc::new(ai)) /* ... */;
//! ```

use async_trait::async_trait;
use openai_client::{ChatRequest, ContentPart, Message, OpenAIClient};
use tracing::debug;

use crate::error::{ExtractionError, Result};
use crate::traits::ai::{InferenceRequest, InferenceService};

/// Sampling temperature for recipe parsing. Low, so replies stay close to the source.
const TEMPERATURE: f32 = 0.2;

/// OpenAI-based inference service.
///
/// Uses a vision-capable chat model (default `gpt-4o`) for both text and
/// photo input.
#[derive(Clone)]
pub struct OpenAI {
    client: OpenAIClient,
    model: String,
}

impl OpenAI {
    /// Create a new OpenAI service with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::from_client(OpenAIClient::new(api_key))
    }

    /// Wrap an already configured client.
    pub fn from_client(client: OpenAIClient) -> Self {
        Self {
            client,
            model: "gpt-4o".to_string(),
        }
    }

    /// Create from environment variable `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let client =
            OpenAIClient::from_env().map_err(|e| ExtractionError::Config(Box::new(e)))?;
        Ok(Self::from_client(client))
    }

    /// Set the chat model (default: gpt-4o).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set a custom base URL (for Azure, proxies, etc.).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.client = self.client.with_base_url(url);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(&self, request: &InferenceRequest) -> ChatRequest {
        let mut chat = ChatRequest::new(&self.model)
            .temperature(TEMPERATURE)
            .token_limit(request.max_tokens);

        if let Some(system) = &request.system {
            chat = chat.message(Message::system(system));
        }

        let user = if request.images.is_empty() {
            Message::user(&request.prompt)
        } else {
            let mut parts: Vec<ContentPart> = request
                .images
                .iter()
                .map(|img| ContentPart::inline_image(&img.media_type, &img.data))
                .collect();
            parts.push(ContentPart::text(&request.prompt));
            Message::user_parts(parts)
        };

        chat.message(user)
    }
}

#[async_trait]
impl InferenceService for OpenAI {
    async fn complete(&self, request: &InferenceRequest) -> Result<String> {
        debug!(
            model = %self.model,
            images = request.images.len(),
            max_tokens = request.max_tokens,
            "Sending completion request"
        );

        let response = self
            .client
            .chat_completion(self.build_request(request))
            .await
            .map_err(|e| ExtractionError::Inference(Box::new(e)))?;

        if let Some(usage) = &response.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Completion finished"
            );
        }

        Ok(response.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::input::InlineImage;
    use openai_client::MessageContent;

    #[test]
    fn test_text_request_has_system_and_user() {
        let ai = OpenAI::new("sk-test");
        let req = InferenceRequest::new("菜谱正文")
            .with_system("你是一个专业的菜谱解析助手")
            .with_max_tokens(4096);

        let chat = ai.build_request(&req);
        assert_eq!(chat.model, "gpt-4o");
        assert_eq!(chat.max_tokens, Some(4096));
        assert_eq!(chat.messages.len(), 2);
        assert_eq!(chat.messages[0].role, "system");
        assert!(matches!(&chat.messages[1].content, MessageContent::Text(t) if t == "菜谱正文"));
    }

    #[test]
    fn test_reasoning_model_gets_default_temperature() {
        let req = InferenceRequest::new("菜谱正文").with_max_tokens(2048);

        let chat = OpenAI::new("sk-test").build_request(&req);
        assert_eq!(chat.temperature, Some(TEMPERATURE));

        let chat = OpenAI::new("sk-test").with_model("o3-mini").build_request(&req);
        assert_eq!(chat.temperature, None);
        assert_eq!(chat.max_completion_tokens, Some(2048));
    }

    #[test]
    fn test_image_request_puts_images_before_text() {
        let ai = OpenAI::new("sk-test").with_model("gpt-4o-mini");
        let image = InlineImage::from_base64("data:image/png;base64,aGVsbG8=").unwrap();
        let req = InferenceRequest::new("提取菜谱").with_images(vec![image.clone(), image]);

        let chat = ai.build_request(&req);
        assert_eq!(chat.messages.len(), 1);
        match &chat.messages[0].content {
            MessageContent::Parts(parts) => {
                assert_eq!(parts.len(), 3);
                assert!(matches!(
                    &parts[0],
                    ContentPart::ImageUrl { image_url } if image_url.url == "data:image/png;base64,aGVsbG8="
                ));
                assert!(matches!(&parts[2], ContentPart::Text { text } if text == "提取菜谱"));
            }
            other => panic!("expected parts, got {:?}", other),
        }
    }
}
