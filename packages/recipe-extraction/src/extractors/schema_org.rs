//! schema.org `Recipe` markup.
//!
//! JSON-LD blocks are tried first, each parsed on its own so one broken
//! or stepless block never hides a later valid one. Microdata is only
//! consulted when no JSON-LD block yields a recipe with steps.

use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use tracing::debug;

use super::{element_text, select_text};
use crate::types::recipe::{ExtractedIngredient, ExtractedRecipe, ExtractedStep};

/// Extract a recipe from JSON-LD, falling back to microdata.
pub fn extract(html: &str) -> Option<ExtractedRecipe> {
    let document = Html::parse_document(html);
    extract_json_ld(&document).or_else(|| extract_microdata(&document))
}

fn extract_json_ld(document: &Html) -> Option<ExtractedRecipe> {
    let selector = Selector::parse(r#"script[type="application/ld+json"]"#).ok()?;

    for script in document.select(&selector) {
        let content = script.text().collect::<String>();
        if content.trim().is_empty() {
            continue;
        }

        let parsed: Value = match serde_json::from_str(content.trim()) {
            Ok(v) => v,
            Err(e) => {
                debug!(error = %e, "Skipping malformed JSON-LD block");
                continue;
            }
        };

        if let Some(recipe) = find_recipe(&parsed).map(convert_recipe) {
            if recipe.is_usable() {
                return Some(recipe);
            }
            debug!("JSON-LD recipe has no steps, continuing");
        }
    }

    None
}

/// Recipe node in a single object, a top-level array, or an `@graph`.
pub fn find_recipe(value: &Value) -> Option<&Value> {
    match value {
        Value::Array(items) => items.iter().find(|item| is_recipe(item)),
        Value::Object(map) => {
            if is_recipe(value) {
                return Some(value);
            }
            map.get("@graph")
                .and_then(Value::as_array)
                .and_then(|graph| graph.iter().find(|item| is_recipe(item)))
        }
        _ => None,
    }
}

fn is_recipe(value: &Value) -> bool {
    match value.get("@type") {
        Some(Value::String(t)) => t == "Recipe",
        Some(Value::Array(types)) => types.iter().any(|t| t.as_str() == Some("Recipe")),
        _ => false,
    }
}

fn convert_recipe(recipe: &Value) -> ExtractedRecipe {
    let name = recipe
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(String::from);

    let ingredients = match recipe.get("recipeIngredient") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ExtractedIngredient::new)
            .collect(),
        Some(Value::String(single)) if !single.trim().is_empty() => {
            vec![ExtractedIngredient::new(single.trim())]
        }
        _ => Vec::new(),
    };

    let mut steps = Vec::new();
    if let Some(instructions) = recipe.get("recipeInstructions") {
        collect_steps(instructions, &mut steps);
    }

    ExtractedRecipe {
        name,
        ingredients,
        steps,
    }
}

/// Normalize every instruction form into a flat step list.
fn collect_steps(instructions: &Value, steps: &mut Vec<ExtractedStep>) {
    match instructions {
        Value::String(text) => {
            steps.extend(
                text.lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(ExtractedStep::new),
            );
        }
        Value::Array(items) => {
            for item in items {
                collect_steps(item, steps);
            }
        }
        Value::Object(obj) => {
            if let Some(nested) = obj.get("itemListElement") {
                // HowToSection
                collect_steps(nested, steps);
                return;
            }

            let text = obj
                .get("text")
                .or_else(|| obj.get("name"))
                .and_then(Value::as_str)
                .map(str::trim)
                .unwrap_or("");
            if text.is_empty() {
                return;
            }

            let image = match obj.get("image") {
                Some(Value::String(url)) => Some(url.as_str()),
                Some(Value::Object(img)) => img.get("url").and_then(Value::as_str),
                Some(Value::Array(imgs)) => imgs.first().and_then(|first| match first {
                    Value::String(url) => Some(url.as_str()),
                    other => other.get("url").and_then(Value::as_str),
                }),
                _ => None,
            };

            let mut step = ExtractedStep::new(text);
            step.image_url = image.map(str::trim).filter(|u| !u.is_empty()).map(String::from);
            steps.push(step);
        }
        _ => {}
    }
}

fn extract_microdata(document: &Html) -> Option<ExtractedRecipe> {
    let container_selector = Selector::parse(r#"[itemtype*="schema.org/Recipe"]"#).ok()?;
    let container = document.select(&container_selector).next()?;

    let name = select_text(container, r#"[itemprop="name"]"#);

    let ingredients: Vec<ExtractedIngredient> =
        Selector::parse(r#"[itemprop="recipeIngredient"], [itemprop="ingredients"]"#)
        .map(|sel| {
            container
                .select(&sel)
                .map(element_text)
                .filter(|t| !t.is_empty())
                .map(ExtractedIngredient::new)
                .collect()
        })
        .unwrap_or_default();

    let steps: Vec<ExtractedStep> = Selector::parse(r#"[itemprop="recipeInstructions"]"#)
        .map(|sel| container.select(&sel).filter_map(microdata_step).collect())
        .unwrap_or_default();

    if steps.is_empty() {
        return None;
    }

    Some(ExtractedRecipe {
        name,
        ingredients,
        steps,
    })
}

fn microdata_step(element: ElementRef<'_>) -> Option<ExtractedStep> {
    let text = element_text(element);
    if text.is_empty() {
        return None;
    }
    let image = Selector::parse("img[src]")
        .ok()
        .and_then(|sel| element.select(&sel).next())
        .and_then(|img| img.value().attr("src"))
        .map(String::from);

    let mut step = ExtractedStep::new(text);
    step.image_url = image;
    Some(step)
}
