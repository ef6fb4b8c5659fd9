//! Recipe pipeline - the core of the library.
//!
//! The pipeline orchestrates:
//! - Layered extraction (site-specific → schema.org → content + inference)
//! - Inference-based parsing of text, photos and ingredient lines
//! - Entity resolution against the reference vocabulary
//! - Auto-creation of unmatched ingredients
//! - Concurrent step image downloads

pub mod images;
pub mod orchestrator;
pub mod parse;
pub mod prompts;
pub mod resolve;

pub use images::{extension_for_content_type, is_external_url, ImageDownloader};
pub use orchestrator::{Layer, LayerOutput, LayerResult, RecipePipeline, RecipePipelineBuilder};
pub use parse::{
    categorize, heuristic_ingredient, parse_images, parse_ingredient_lines, parse_recipe_response,
    parse_text, AIIngredient, AIRecipeResponse, AIStep,
};
pub use resolve::{
    create_missing, match_ingredient, match_unit, resolve_ingredient, resolve_ingredients,
    CreationReport,
};
