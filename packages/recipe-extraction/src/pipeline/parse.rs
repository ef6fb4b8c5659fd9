//! Inference-based parsing - prompt the model, then read its reply defensively.
//!
//! Full-recipe parsing is strict: a reply without a parseable object fails
//! the layer. The auxiliary calls (ingredient lines, categorization) never
//! fail; they degrade per entry to local fallbacks.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::prompts::{
    format_categorize_prompt, format_ingredient_lines_prompt, format_recipe_system_prompt,
    format_recipe_text_prompt, RECIPE_IMAGE_PROMPT,
};
use crate::error::{ExtractionError, Result};
use crate::repair::extract_json_object;
use crate::traits::ai::{InferenceRequest, InferenceService};
use crate::types::input::InlineImage;
use crate::types::recipe::NewIngredient;
use crate::types::vocabulary::{IngredientCategory, Unit, VocabularySnapshot};

const RECIPE_MAX_TOKENS: u32 = 4096;
const AUX_MAX_TOKENS: u32 = 2048;

static RE_LEADING_QUANTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+(?:\.\d+)?)(?:\s*/\s*(\d+))?\s*(.*)$").unwrap());

static RE_NAME_THEN_DIGIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\D+?)\s*(\d.*)$").unwrap());

/// Recipe object the model is instructed to return.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AIRecipeResponse {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub ingredients: Vec<AIIngredient>,

    #[serde(default)]
    pub steps: Vec<AIStep>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AIIngredient {
    pub name: String,

    /// `None` for 适量/少许 and anything non-numeric.
    #[serde(default, deserialize_with = "lenient_count")]
    pub count: Option<f64>,

    #[serde(default, deserialize_with = "lenient_text")]
    pub unit: Option<String>,
}

impl AIIngredient {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            count: None,
            unit: None,
        }
    }
}

/// A step, given either as `{"text": ...}` or a bare string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AIStep {
    Object { text: String },
    Text(String),
}

impl AIStep {
    pub fn text(&self) -> &str {
        match self {
            Self::Object { text } | Self::Text(text) => text,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AIIngredientList {
    #[serde(default)]
    ingredients: Vec<AIIngredient>,
}

#[derive(Debug, Deserialize)]
struct AICategoryList {
    #[serde(default)]
    ingredients: Vec<AICategory>,
}

#[derive(Debug, Deserialize)]
struct AICategory {
    name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    category: Option<String>,
}

fn lenient_count<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => parse_quantity(&s),
        _ => None,
    }
    .filter(|n| n.is_finite() && *n >= 0.0))
}

fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    })
}

/// "2", "1.5", "1/2" → number. Anything else → `None`.
fn parse_quantity(text: &str) -> Option<f64> {
    let caps = RE_LEADING_QUANTITY.captures(text.trim())?;
    if !caps.get(3).map_or("", |m| m.as_str()).trim().is_empty() {
        return None;
    }
    leading_number(&caps)
}

fn leading_number(caps: &regex::Captures<'_>) -> Option<f64> {
    let whole: f64 = caps.get(1)?.as_str().parse().ok()?;
    match caps.get(2) {
        Some(denominator) => {
            let denominator: f64 = denominator.as_str().parse().ok()?;
            (denominator != 0.0).then(|| whole / denominator)
        }
        None => Some(whole),
    }
}

/// Parse the model's reply into a recipe.
///
/// Only the first balanced `{...}` region is considered, so prose and
/// markdown fences around it are tolerated. An object with neither
/// ingredients nor steps is not a recipe; a truncated reply can leave
/// nothing balanced but one nested ingredient.
pub fn parse_recipe_response(reply: &str) -> Result<AIRecipeResponse> {
    let json = extract_json_object(reply)
        .ok_or_else(|| ExtractionError::unparseable("no JSON object in response"))?;

    let response: AIRecipeResponse =
        serde_json::from_str(json).map_err(|e| ExtractionError::unparseable(e.to_string()))?;

    if response.ingredients.is_empty() && response.steps.is_empty() {
        return Err(ExtractionError::unparseable("no ingredients or steps in response"));
    }
    Ok(response)
}

/// Parse reduced page text with a vocabulary-aware prompt.
pub async fn parse_text(
    ai: &dyn InferenceService,
    content: &str,
    vocabulary: &VocabularySnapshot,
) -> Result<AIRecipeResponse> {
    let request = InferenceRequest::new(format_recipe_text_prompt(content))
        .with_system(format_recipe_system_prompt("网页内容", vocabulary))
        .with_max_tokens(RECIPE_MAX_TOKENS);

    let reply = ai.complete(&request).await?;
    parse_recipe_response(&reply)
}

/// Parse recipe photos with the same prompt and schema as text input.
pub async fn parse_images(
    ai: &dyn InferenceService,
    images: &[InlineImage],
    vocabulary: &VocabularySnapshot,
) -> Result<AIRecipeResponse> {
    let request = InferenceRequest::new(RECIPE_IMAGE_PROMPT)
        .with_system(format_recipe_system_prompt("图片", vocabulary))
        .with_images(images.to_vec())
        .with_max_tokens(RECIPE_MAX_TOKENS);

    let reply = ai.complete(&request).await?;
    parse_recipe_response(&reply)
}

/// Split raw ingredient lines ("番茄 2个") into name, count and unit.
///
/// One inference call for the whole list. On any failure every line is
/// split locally by [`heuristic_ingredient`] instead.
pub async fn parse_ingredient_lines(
    ai: &dyn InferenceService,
    lines: &[String],
    units: &[Unit],
) -> Vec<AIIngredient> {
    if lines.is_empty() {
        return Vec::new();
    }

    let request = InferenceRequest::new(format_ingredient_lines_prompt(lines, units))
        .with_max_tokens(AUX_MAX_TOKENS);

    let parsed = match ai.complete(&request).await {
        Ok(reply) => extract_json_object(&reply)
            .and_then(|json| serde_json::from_str::<AIIngredientList>(json).ok())
            .map(|list| {
                list.ingredients
                    .into_iter()
                    .filter(|i| !i.name.trim().is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|list| !list.is_empty()),
        Err(e) => {
            warn!(error = %e, "Ingredient line parsing failed, using local split");
            None
        }
    };

    match parsed {
        Some(ingredients) => ingredients,
        None => {
            debug!(lines = lines.len(), "Splitting ingredient lines locally");
            lines.iter().map(|line| heuristic_ingredient(line)).collect()
        }
    }
}

/// Local name/count/unit split for one ingredient line.
///
/// "番茄 2个" → (番茄, 2, 个); "盐 适量" → (盐, null, null);
/// "2 cups flour" → (flour, 2, cups). A line with no name left over after
/// the quantity is kept whole as the name.
pub fn heuristic_ingredient(line: &str) -> AIIngredient {
    let line = line.trim();

    let ingredient = match RE_LEADING_QUANTITY.captures(line) {
        Some(caps) => quantity_first(&caps),
        None => name_first(line),
    };

    if ingredient.name.chars().any(char::is_alphabetic) {
        ingredient
    } else {
        AIIngredient::new(line)
    }
}

/// "2 cups flour", "1/2 tsp salt", "3 个 鸡蛋": unit is the token after the number.
fn quantity_first(caps: &regex::Captures<'_>) -> AIIngredient {
    let rest = caps.get(3).map_or("", |m| m.as_str().trim());
    let (unit, name) = match rest.split_once(char::is_whitespace) {
        Some((unit, name)) => (Some(unit), name.trim()),
        None => (None, rest),
    };

    AIIngredient {
        name: name.to_string(),
        count: leading_number(caps),
        unit: unit.map(String::from),
    }
}

/// "番茄 2个", "五花肉500g", "盐 适量".
fn name_first(line: &str) -> AIIngredient {
    let (name, amount) = match line.split_once(char::is_whitespace) {
        Some((name, amount)) => (name.trim(), amount.trim()),
        None => match RE_NAME_THEN_DIGIT.captures(line) {
            Some(caps) => (
                caps.get(1).map_or(line, |m| m.as_str().trim()),
                caps.get(2).map_or("", |m| m.as_str().trim()),
            ),
            None => (line, ""),
        },
    };

    let mut ingredient = AIIngredient::new(name);
    if let Some(caps) = RE_LEADING_QUANTITY.captures(amount) {
        ingredient.count = leading_number(&caps);
        ingredient.unit = caps
            .get(3)
            .map(|m| m.as_str().trim())
            .filter(|u| !u.is_empty())
            .map(String::from);
    }
    ingredient
}

/// Assign a category to each name, falling back to 其他 per name.
///
/// Never fails; the result has exactly one entry per input name, in order.
pub async fn categorize(ai: &dyn InferenceService, names: &[String]) -> Vec<NewIngredient> {
    if names.is_empty() {
        return Vec::new();
    }

    let request =
        InferenceRequest::new(format_categorize_prompt(names)).with_max_tokens(AUX_MAX_TOKENS);

    let assigned: HashMap<String, Option<String>> = match ai.complete(&request).await {
        Ok(reply) => extract_json_object(&reply)
            .and_then(|json| serde_json::from_str::<AICategoryList>(json).ok())
            .map(|list| {
                list.ingredients
                    .into_iter()
                    .map(|c| (c.name.trim().to_string(), c.category))
                    .collect()
            })
            .unwrap_or_else(|| {
                warn!("Categorization reply unparseable, using fallback category");
                HashMap::new()
            }),
        Err(e) => {
            warn!(error = %e, "Categorization failed, using fallback category");
            HashMap::new()
        }
    };

    names
        .iter()
        .map(|name| {
            let category = assigned
                .get(name.trim())
                .and_then(|label| label.as_deref())
                .and_then(IngredientCategory::from_label);

            let category = category.unwrap_or_else(|| {
                warn!(ingredient = %name, "No valid category assigned, using fallback");
                IngredientCategory::FALLBACK
            });

            NewIngredient {
                name: name.clone(),
                category,
            }
        })
        .collect()
}
