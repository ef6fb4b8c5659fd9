//! Testing utilities including mock implementations.
//!
//! These are useful for testing applications that use the recipe pipeline
//! without making real inference or network calls.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::error::{ExtractionError, FetchError, FetchResult, Result};
use crate::pipeline::RecipePipeline;
use crate::stores::{MemoryBlobStore, MemoryVocabulary};
use crate::traits::ai::{InferenceRequest, InferenceService};
use crate::traits::fetcher::{FetchedImage, ImageFetcher, PageFetcher};
use crate::traits::store::VocabularyStore;
use crate::types::config::PipelineConfig;
use crate::types::vocabulary::{Ingredient, IngredientCategory, InsertOutcome, Unit};

/// A mock inference service for testing.
///
/// Replies are chosen by substring: the first registered key found in the
/// request's system text or prompt wins. Clones share state, so a test can
/// keep one handle for assertions after handing another to the pipeline.
#[derive(Clone, Default)]
pub struct MockAI {
    /// (key, reply) pairs in registration order
    responses: Arc<RwLock<Vec<(String, String)>>>,

    /// Reply when no key matches
    default_response: Arc<RwLock<Option<String>>>,

    /// Every call fails
    failing: bool,

    /// Call tracking for assertions
    calls: Arc<RwLock<Vec<MockAICall>>>,
}

/// Record of a call made to the mock inference service.
#[derive(Debug, Clone)]
pub struct MockAICall {
    pub system: Option<String>,
    pub prompt: String,
    pub image_count: usize,
}

impl MockAI {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `reply` whenever `key` appears in the system text or prompt.
    pub fn with_response(self, key: impl Into<String>, reply: impl Into<String>) -> Self {
        self.responses
            .write()
            .unwrap()
            .push((key.into(), reply.into()));
        self
    }

    pub fn with_default_response(self, reply: impl Into<String>) -> Self {
        *self.default_response.write().unwrap() = Some(reply.into());
        self
    }

    /// Make every call return an inference error.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Get all calls made to this mock.
    pub fn calls(&self) -> Vec<MockAICall> {
        self.calls.read().unwrap().clone()
    }

    /// Clear call history.
    pub fn clear_calls(&self) {
        self.calls.write().unwrap().clear();
    }

    fn reply_for(&self, request: &InferenceRequest) -> Option<String> {
        let haystack = format!(
            "{}\n{}",
            request.system.as_deref().unwrap_or_default(),
            request.prompt
        );

        self.responses
            .read()
            .unwrap()
            .iter()
            .find(|(key, _)| haystack.contains(key.as_str()))
            .map(|(_, reply)| reply.clone())
            .or_else(|| self.default_response.read().unwrap().clone())
    }
}

#[async_trait]
impl InferenceService for MockAI {
    async fn complete(&self, request: &InferenceRequest) -> Result<String> {
        self.calls.write().unwrap().push(MockAICall {
            system: request.system.clone(),
            prompt: request.prompt.clone(),
            image_count: request.images.len(),
        });

        if self.failing {
            return Err(ExtractionError::Inference("mock inference failure".into()));
        }

        self.reply_for(request)
            .ok_or_else(|| ExtractionError::Inference("no mock response configured".into()))
    }
}

/// A vocabulary store with injectable storage failures.
///
/// Delegates to a [`MemoryVocabulary`] unless told to fail reads, or to
/// fail inserts of particular names.
#[derive(Clone, Default)]
pub struct MockVocabulary {
    inner: Arc<MemoryVocabulary>,
    failing_reads: bool,
    failing_inserts: Arc<RwLock<Vec<String>>>,
}

impl MockVocabulary {
    pub fn new(inner: MemoryVocabulary) -> Self {
        Self {
            inner: Arc::new(inner),
            ..Self::default()
        }
    }

    /// Make both list calls return a storage error.
    pub fn failing_reads(mut self) -> Self {
        self.failing_reads = true;
        self
    }

    /// Make inserting `name` return a storage error.
    pub fn failing_insert(self, name: impl Into<String>) -> Self {
        self.failing_inserts.write().unwrap().push(name.into());
        self
    }

    /// The backing store, for assertions.
    pub fn inner(&self) -> &MemoryVocabulary {
        &self.inner
    }

    fn read_error(&self) -> Result<()> {
        if self.failing_reads {
            return Err(ExtractionError::Storage("mock vocabulary unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl VocabularyStore for MockVocabulary {
    async fn list_ingredients(&self) -> Result<Vec<Ingredient>> {
        self.read_error()?;
        self.inner.list_ingredients().await
    }

    async fn list_units(&self) -> Result<Vec<Unit>> {
        self.read_error()?;
        self.inner.list_units().await
    }

    async fn insert_ingredient_if_absent(
        &self,
        name: &str,
        category: IngredientCategory,
    ) -> Result<InsertOutcome> {
        if self.failing_inserts.read().unwrap().iter().any(|n| n == name) {
            return Err(ExtractionError::Storage(
                format!("mock insert failure for {name}").into(),
            ));
        }
        self.inner.insert_ingredient_if_absent(name, category).await
    }
}

/// A mock fetcher serving canned pages and images.
///
/// Unknown URLs answer with HTTP 404.
#[derive(Clone, Default)]
pub struct MockFetcher {
    pages: Arc<RwLock<HashMap<String, String>>>,
    images: Arc<RwLock<HashMap<String, FetchedImage>>>,
    delays: Arc<RwLock<HashMap<String, Duration>>>,
    fail_urls: Arc<RwLock<Vec<String>>>,
    calls: Arc<RwLock<Vec<MockFetchCall>>>,
}

/// Record of a call made to the mock fetcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockFetchCall {
    Page { url: String },
    Image { url: String },
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a predefined page.
    pub fn with_page(self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.write().unwrap().insert(url.into(), html.into());
        self
    }

    /// Add a predefined image.
    pub fn with_image(
        self,
        url: impl Into<String>,
        bytes: impl AsRef<[u8]>,
        content_type: &str,
    ) -> Self {
        self.images.write().unwrap().insert(
            url.into(),
            FetchedImage {
                bytes: bytes.as_ref().to_vec(),
                content_type: Some(content_type.to_string()),
            },
        );
        self
    }

    /// Delay responses for a URL, to simulate a slow server.
    pub fn with_delay(self, url: impl Into<String>, delay: Duration) -> Self {
        self.delays.write().unwrap().insert(url.into(), delay);
        self
    }

    /// Mark a URL as failing at the connection level.
    pub fn failing_url(self, url: impl Into<String>) -> Self {
        self.fail_urls.write().unwrap().push(url.into());
        self
    }

    /// Get all calls made to this mock.
    pub fn calls(&self) -> Vec<MockFetchCall> {
        self.calls.read().unwrap().clone()
    }

    async fn respond<T: Clone>(
        &self,
        url: &str,
        table: &RwLock<HashMap<String, T>>,
    ) -> FetchResult<T> {
        let delay = self.delays.read().unwrap().get(url).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_urls.read().unwrap().iter().any(|u| u == url) {
            return Err(FetchError::Http(Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "Mock connection refused",
            ))));
        }

        table
            .read()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch_page(&self, url: &str) -> FetchResult<String> {
        self.calls
            .write()
            .unwrap()
            .push(MockFetchCall::Page { url: url.to_string() });
        self.respond(url, &self.pages).await
    }
}

#[async_trait]
impl ImageFetcher for MockFetcher {
    async fn fetch_image(&self, url: &str) -> FetchResult<FetchedImage> {
        self.calls
            .write()
            .unwrap()
            .push(MockFetchCall::Image { url: url.to_string() });
        self.respond(url, &self.images).await
    }
}

/// Builder for a pipeline wired entirely to in-memory collaborators.
pub struct TestScenario {
    ai: MockAI,
    fetcher: MockFetcher,
    vocabulary: MemoryVocabulary,
    config: PipelineConfig,
}

/// A built scenario. The mocks and stores are shared with the pipeline.
pub struct Scenario {
    pub pipeline: RecipePipeline,
    pub ai: MockAI,
    pub fetcher: MockFetcher,
    pub vocabulary: Arc<MemoryVocabulary>,
    pub blobs: Arc<MemoryBlobStore>,
}

impl TestScenario {
    /// Create a new scenario with the default unit vocabulary.
    pub fn new() -> Self {
        Self {
            ai: MockAI::new(),
            fetcher: MockFetcher::new(),
            vocabulary: MemoryVocabulary::with_default_units(),
            config: PipelineConfig::default(),
        }
    }

    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.fetcher = self.fetcher.with_page(url, html);
        self
    }

    pub fn with_image(mut self, url: &str, bytes: &[u8], content_type: &str) -> Self {
        self.fetcher = self.fetcher.with_image(url, bytes, content_type);
        self
    }

    pub fn with_ai_response(mut self, key: &str, reply: &str) -> Self {
        self.ai = self.ai.with_response(key, reply);
        self
    }

    pub fn with_ingredient(mut self, name: &str, category: IngredientCategory) -> Self {
        self.vocabulary = self.vocabulary.with_ingredient(name, category);
        self
    }

    pub fn with_ai(mut self, ai: MockAI) -> Self {
        self.ai = ai;
        self
    }

    pub fn with_fetcher(mut self, fetcher: MockFetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Scenario {
        let vocabulary = Arc::new(self.vocabulary);
        let blobs = Arc::new(MemoryBlobStore::new());

        let pipeline = RecipePipeline::builder()
            .inference(Arc::new(self.ai.clone()))
            .vocabulary(vocabulary.clone())
            .fetcher(Arc::new(self.fetcher.clone()))
            .blobs(blobs.clone())
            .config(self.config)
            .build()
            .expect("scenario sets every collaborator");

        Scenario {
            pipeline,
            ai: self.ai,
            fetcher: self.fetcher,
            vocabulary,
            blobs,
        }
    }
}

impl Default for TestScenario {
    fn default() -> Self {
        Self::new()
    }
}
