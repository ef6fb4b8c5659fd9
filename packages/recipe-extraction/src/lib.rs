//! Recipe Extraction and Normalization Library
//!
//! Turns a recipe web page link, or photos of a recipe, into a structured
//! recipe whose ingredients and units are resolved against the app's own
//! vocabulary.
//!
//! # Design Philosophy
//!
//! - Cheap before expensive: markup extractors run before any inference call
//! - Every layer produces the same shape, so resolution doesn't care who won
//! - Degrade, don't fail: a lost image or an uncategorized ingredient still
//!   yields a recipe
//! - Library handles mechanics, app handles storage schema
//!
//! # Usage
//!
//! ```rust,ignore
//! use recipe_extraction::{RecipeInput, RecipePipeline};
//! use recipe_extraction::fetch::HttpFetcher;
//! use recipe_extraction::stores::{LocalBlobStore, MemoryVocabulary};
//! use recipe_extraction::testing::MockAI;
//!
//! let pipeline = RecipePipeline::builder()
//!     .inference(Arc::new(MockAI::new()))
//!     .vocabulary(Arc::new(MemoryVocabulary::with_default_units()))
//!     .fetcher(Arc::new(HttpFetcher::new(&PipelineConfig::default())?))
//!     .blobs(Arc::new(LocalBlobStore::new("./media")))
//!     .build()?;
//!
//! let input = RecipeInput::from_parts(Some(url), None)?;
//! let recipe = pipeline.parse(input).await?;
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Collaborator seams (inference, vocabulary, blobs, fetchers, site extractors)
//! - [`types`] - Recipe, vocabulary and input data types
//! - [`extractors`] - Site-specific, schema.org and page-text extraction
//! - [`pipeline`] - Layer chain, inference parsing, resolution, image downloads
//! - [`stores`] - Vocabulary and blob storage implementations
//! - [`fetch`] - HTTP page and image fetcher
//! - [`testing`] - Mock implementations for testing

pub mod error;
pub mod extractors;
pub mod fetch;
pub mod pipeline;
pub mod repair;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

#[cfg(feature = "openai")]
pub mod ai;

// Re-export core types at crate root
pub use error::{ExtractionError, FetchError, FetchResult, Result};
pub use extractors::{ExtractorRegistry, XiachufangExtractor};
pub use pipeline::{Layer, LayerOutput, LayerResult, RecipePipeline, RecipePipelineBuilder};
pub use traits::{
    ai::{InferenceRequest, InferenceService},
    extractor::SiteExtractor,
    fetcher::{FetchedImage, ImageFetcher, PageFetcher},
    store::{BlobStore, VocabularyStore},
};
pub use types::{
    config::PipelineConfig,
    image::DownloadedImage,
    input::{InlineImage, RecipeInput},
    recipe::{
        ExtractedIngredient, ExtractedRecipe, ExtractedStep, NewIngredient, ParsedRecipeData,
        ResolvedIngredient, ResolvedStep,
    },
    vocabulary::{Ingredient, IngredientCategory, InsertOutcome, Unit, VocabularySnapshot},
};
