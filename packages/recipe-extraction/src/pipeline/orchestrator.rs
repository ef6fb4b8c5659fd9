//! The recipe pipeline - layered extraction, then resolution and images.
//!
//! ```text
//! URL    → fetch → site extractor → schema.org → content + inference
//! images → inference
//!        → join(resolve + create missing, download step images) → ParsedRecipeData
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use url::Url;

use super::images::ImageDownloader;
use super::parse::{self, AIIngredient, AIRecipeResponse};
use super::resolve::{create_missing, resolve_ingredients, CreationReport};
use crate::error::{ExtractionError, FetchError, Result};
use crate::extractors::{content, schema_org, ExtractorRegistry};
use crate::traits::ai::InferenceService;
use crate::traits::fetcher::{ImageFetcher, PageFetcher};
use crate::traits::store::{BlobStore, VocabularyStore};
use crate::types::config::PipelineConfig;
use crate::types::image::DownloadedImage;
use crate::types::input::{InlineImage, RecipeInput};
use crate::types::recipe::{ExtractedRecipe, ParsedRecipeData, ResolvedIngredient, ResolvedStep};
use crate::types::vocabulary::VocabularySnapshot;

/// Which extraction layer produced a recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    SiteSpecific,
    StructuredData,
    Inference,
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SiteSpecific => write!(f, "site-specific"),
            Self::StructuredData => write!(f, "structured-data"),
            Self::Inference => write!(f, "inference"),
        }
    }
}

/// Raw output of the winning layer.
#[derive(Debug, Clone)]
pub enum LayerOutput {
    /// Markup layers: free-text ingredient lines, steps with image URLs.
    Extracted(ExtractedRecipe),
    /// Inference layer: ingredients already split into name/count/unit.
    Inferred(AIRecipeResponse),
}

#[derive(Debug, Clone)]
pub struct LayerResult {
    pub layer: Layer,
    pub output: LayerOutput,
}

/// Recipe extraction and normalization pipeline.
///
/// Cheap to clone; all collaborators are shared.
#[derive(Clone)]
pub struct RecipePipeline {
    ai: Arc<dyn InferenceService>,
    vocabulary: Arc<dyn VocabularyStore>,
    pages: Arc<dyn PageFetcher>,
    images: ImageDownloader,
    registry: ExtractorRegistry,
    config: PipelineConfig,
}

impl RecipePipeline {
    pub fn builder() -> RecipePipelineBuilder {
        RecipePipelineBuilder::default()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the pipeline for either input form.
    pub async fn parse(&self, input: RecipeInput) -> Result<ParsedRecipeData> {
        match input {
            RecipeInput::Url(url) => self.parse_url(&url).await,
            RecipeInput::Images(images) => self.parse_images(&images).await,
        }
    }

    /// Fetch a page and extract it through the layer chain.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn parse_url(&self, url: &str) -> Result<ParsedRecipeData> {
        let parsed_url = Url::parse(url).map_err(|_| FetchError::InvalidUrl {
            url: url.to_string(),
        })?;
        if !matches!(parsed_url.scheme(), "http" | "https") || parsed_url.host_str().is_none() {
            return Err(FetchError::InvalidUrl {
                url: url.to_string(),
            }
            .into());
        }

        let html = self.pages.fetch_page(url).await?;
        let vocabulary = self.load_vocabulary().await?;

        let result = self.extract_from_html(url, &html, &vocabulary).await?;
        let data = self.finish(result.output, &vocabulary).await;

        info!(
            layer = %result.layer,
            ingredients = data.ingredients.len(),
            steps = data.steps.len(),
            "Recipe extracted"
        );
        Ok(data)
    }

    /// Extract recipe photos via the inference service. No fallback chain.
    #[instrument(skip_all, fields(images = images.len()))]
    pub async fn parse_images(&self, images: &[InlineImage]) -> Result<ParsedRecipeData> {
        if images.is_empty() {
            return Err(ExtractionError::invalid_input("请提供链接或图片"));
        }

        let vocabulary = self.load_vocabulary().await?;
        let response = parse::parse_images(self.ai.as_ref(), images, &vocabulary).await?;
        let data = self.finish(LayerOutput::Inferred(response), &vocabulary).await;

        info!(
            ingredients = data.ingredients.len(),
            steps = data.steps.len(),
            "Recipe extracted from images"
        );
        Ok(data)
    }

    /// Per-request vocabulary snapshot.
    ///
    /// A store that cannot be read leaves every ingredient unmatched rather
    /// than failing the extraction.
    async fn load_vocabulary(&self) -> Result<VocabularySnapshot> {
        match self.vocabulary.snapshot().await {
            Ok(snapshot) => Ok(snapshot),
            Err(e) if e.is_fatal_to_pipeline() => Err(e),
            Err(e) => {
                warn!(error = %e, "Vocabulary unavailable, resolving against an empty snapshot");
                Ok(VocabularySnapshot::default())
            }
        }
    }

    /// Try each layer in priority order; the first usable result wins.
    ///
    /// Only the terminal inference layer can fail.
    pub async fn extract_from_html(
        &self,
        url: &str,
        html: &str,
        vocabulary: &VocabularySnapshot,
    ) -> Result<LayerResult> {
        let host = Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default();

        if let Some(extractor) = self.registry.get(&host) {
            match extractor.extract(html) {
                Some(recipe) if recipe.is_usable() => {
                    info!(
                        extractor = extractor.name(),
                        steps = recipe.steps.len(),
                        "Site extractor matched"
                    );
                    return Ok(LayerResult {
                        layer: Layer::SiteSpecific,
                        output: LayerOutput::Extracted(recipe),
                    });
                }
                _ => debug!(extractor = extractor.name(), "Site extractor found nothing"),
            }
        }

        match schema_org::extract(html) {
            Some(recipe) if recipe.is_usable() => {
                info!(steps = recipe.steps.len(), "Structured data matched");
                return Ok(LayerResult {
                    layer: Layer::StructuredData,
                    output: LayerOutput::Extracted(recipe),
                });
            }
            _ => debug!("No structured recipe data"),
        }

        let text = content::reduce(html, self.config.max_content_chars);
        if text.is_empty() {
            return Err(ExtractionError::NoContent);
        }

        debug!(chars = text.chars().count(), "Falling back to inference");
        let response = parse::parse_text(self.ai.as_ref(), &text, vocabulary).await?;
        Ok(LayerResult {
            layer: Layer::Inference,
            output: LayerOutput::Inferred(response),
        })
    }

    /// Resolve ingredients and download step images concurrently.
    async fn finish(
        &self,
        output: LayerOutput,
        vocabulary: &VocabularySnapshot,
    ) -> ParsedRecipeData {
        let (name, ingredient_lines, parsed_ingredients, steps) = match output {
            LayerOutput::Extracted(recipe) => {
                let lines = recipe.ingredient_lines();
                let steps: Vec<ResolvedStep> = recipe
                    .steps
                    .into_iter()
                    .map(|s| ResolvedStep {
                        text: s.text,
                        image_url: s.image_url,
                        image_id: None,
                    })
                    .collect();
                (recipe.name, Some(lines), Vec::new(), steps)
            }
            LayerOutput::Inferred(response) => {
                let steps = response
                    .steps
                    .iter()
                    .map(|s| s.text().trim())
                    .filter(|t| !t.is_empty())
                    .map(ResolvedStep::new)
                    .collect();
                (response.name, None, response.ingredients, steps)
            }
        };

        let image_jobs: Vec<(usize, String)> = if self.config.download_images {
            steps
                .iter()
                .enumerate()
                .filter_map(|(i, s)| s.image_url.clone().map(|url| (i, url)))
                .collect()
        } else {
            Vec::new()
        };

        let resolve = self.resolve_stage(ingredient_lines, parsed_ingredients, vocabulary);
        let download = self.images.download_all(image_jobs);
        let ((ingredients, report), downloaded) = tokio::join!(resolve, download);

        assemble(name, ingredients, steps, downloaded, report)
    }

    async fn resolve_stage(
        &self,
        lines: Option<Vec<String>>,
        parsed: Vec<AIIngredient>,
        vocabulary: &VocabularySnapshot,
    ) -> (Vec<ResolvedIngredient>, CreationReport) {
        let parsed = match lines {
            Some(lines) => {
                parse::parse_ingredient_lines(self.ai.as_ref(), &lines, &vocabulary.units).await
            }
            None => parsed,
        };

        let mut ingredients = resolve_ingredients(parsed, vocabulary);
        let report =
            create_missing(self.ai.as_ref(), self.vocabulary.as_ref(), &mut ingredients).await;
        (ingredients, report)
    }
}

fn assemble(
    name: Option<String>,
    ingredients: Vec<ResolvedIngredient>,
    mut steps: Vec<ResolvedStep>,
    mut downloaded: HashMap<usize, DownloadedImage>,
    report: CreationReport,
) -> ParsedRecipeData {
    for (index, step) in steps.iter_mut().enumerate() {
        if let Some(image) = downloaded.remove(&index) {
            step.image_url = Some(image.local_path);
            step.image_id = Some(image.id);
        }
    }

    ParsedRecipeData {
        name: name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
        ingredients,
        steps,
        newly_created_ingredients: (!report.created.is_empty()).then_some(report.created),
        failed_ingredients: report.failed,
    }
}

/// Builder for [`RecipePipeline`].
#[derive(Default)]
pub struct RecipePipelineBuilder {
    ai: Option<Arc<dyn InferenceService>>,
    vocabulary: Option<Arc<dyn VocabularyStore>>,
    pages: Option<Arc<dyn PageFetcher>>,
    images: Option<Arc<dyn ImageFetcher>>,
    blobs: Option<Arc<dyn BlobStore>>,
    registry: Option<ExtractorRegistry>,
    config: Option<PipelineConfig>,
}

impl RecipePipelineBuilder {
    pub fn inference(mut self, ai: Arc<dyn InferenceService>) -> Self {
        self.ai = Some(ai);
        self
    }

    pub fn vocabulary(mut self, store: Arc<dyn VocabularyStore>) -> Self {
        self.vocabulary = Some(store);
        self
    }

    pub fn page_fetcher(mut self, fetcher: Arc<dyn PageFetcher>) -> Self {
        self.pages = Some(fetcher);
        self
    }

    pub fn image_fetcher(mut self, fetcher: Arc<dyn ImageFetcher>) -> Self {
        self.images = Some(fetcher);
        self
    }

    /// Use one fetcher for both pages and images.
    pub fn fetcher<F>(self, fetcher: Arc<F>) -> Self
    where
        F: PageFetcher + ImageFetcher + 'static,
    {
        self.page_fetcher(fetcher.clone()).image_fetcher(fetcher)
    }

    pub fn blobs(mut self, blobs: Arc<dyn BlobStore>) -> Self {
        self.blobs = Some(blobs);
        self
    }

    /// Replace the default site extractor registry.
    pub fn registry(mut self, registry: ExtractorRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn build(self) -> Result<RecipePipeline> {
        let missing =
            |what: &str| ExtractionError::Config(format!("pipeline requires {what}").into());

        let config = self.config.unwrap_or_default();
        let images = ImageDownloader::new(
            self.images.ok_or_else(|| missing("an image fetcher"))?,
            self.blobs.ok_or_else(|| missing("a blob store"))?,
        )
        .with_timeout(config.image_timeout)
        .with_max_concurrent(config.max_concurrent_downloads);

        Ok(RecipePipeline {
            ai: self.ai.ok_or_else(|| missing("an inference service"))?,
            vocabulary: self.vocabulary.ok_or_else(|| missing("a vocabulary store"))?,
            pages: self.pages.ok_or_else(|| missing("a page fetcher"))?,
            images,
            registry: self.registry.unwrap_or_else(ExtractorRegistry::with_defaults),
            config,
        })
    }
}
