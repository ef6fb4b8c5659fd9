//! xiachufang.com recipe pages.
//!
//! Two strategies, tried in order:
//! 1. Embedded page state (`window.__NUXT__` / `window.__INITIAL_STATE__`)
//! 2. Rendered mobile DOM (`.recipe-name`, `.ing-line`, `.step`)

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::debug;

use super::{element_text, select_first, select_text};
use crate::repair::{extract_json_object, repair_json};
use crate::traits::extractor::SiteExtractor;
use crate::types::recipe::{ExtractedIngredient, ExtractedRecipe, ExtractedStep};

/// Resize/progressive suffix the image CDN needs for a fetchable step image.
const IMAGE_SIZING_SUFFIX: &str = "?imageView2/2/w/660/interlace/1/q/75";

static RE_EMBEDDED_STATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"window\.(?:__NUXT__|__INITIAL_STATE__)\s*=\s*").unwrap()
});

static RE_BACKGROUND_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"url\(\s*['"]?([^'")]+)['"]?\s*\)"#).unwrap());

#[derive(Debug, Clone, Copy, Default)]
pub struct XiachufangExtractor;

impl SiteExtractor for XiachufangExtractor {
    fn name(&self) -> &str {
        "xiachufang"
    }

    fn extract(&self, html: &str) -> Option<ExtractedRecipe> {
        extract_embedded_state(html).or_else(|| extract_dom(html))
    }
}

/// Recipe from inline script state, if any candidate blob parses.
pub fn extract_embedded_state(html: &str) -> Option<ExtractedRecipe> {
    for found in RE_EMBEDDED_STATE.find_iter(html) {
        let rest = html[found.end()..].trim_start();
        if !rest.starts_with('{') {
            // Minified `(function(a,b){...})` state, not plain JSON
            continue;
        }

        let Some(blob) = extract_json_object(rest) else {
            continue;
        };

        let state: Value = match serde_json::from_str(&repair_json(blob)) {
            Ok(state) => state,
            Err(e) => {
                debug!(error = %e, "Skipping unparseable embedded state");
                continue;
            }
        };

        if let Some(recipe) = find_recipe_object(&state).and_then(recipe_from_state) {
            return Some(recipe);
        }
    }

    None
}

/// Depth-first search for the first object shaped like a recipe.
fn find_recipe_object(value: &Value) -> Option<&Value> {
    match value {
        Value::Object(map) => {
            let looks_like_recipe = map.get("name").is_some_and(Value::is_string)
                && map.get("instruction").is_some_and(Value::is_array);
            if looks_like_recipe {
                return Some(value);
            }
            map.values().find_map(find_recipe_object)
        }
        Value::Array(items) => items.iter().find_map(find_recipe_object),
        _ => None,
    }
}

fn recipe_from_state(recipe: &Value) -> Option<ExtractedRecipe> {
    let name = recipe
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(String::from);

    let ingredients = recipe
        .get("ings")
        .and_then(Value::as_array)
        .map(|ings| {
            ings.iter()
                .filter_map(|ing| {
                    let name = ing.get("name")?.as_str()?.trim();
                    if name.is_empty() {
                        return None;
                    }
                    let amount = ing.get("unit").and_then(Value::as_str).unwrap_or("");
                    Some(ExtractedIngredient::new(name).with_amount(amount.trim()))
                })
                .collect()
        })
        .unwrap_or_default();

    let steps: Vec<ExtractedStep> = recipe
        .get("instruction")
        .and_then(Value::as_array)?
        .iter()
        .filter_map(|step| {
            let text = step
                .get("txt")
                .or_else(|| step.get("text"))
                .and_then(Value::as_str)
                .map(clean_step_text)
                .filter(|t| !t.is_empty())?;

            let image = match step.get("image") {
                Some(Value::String(url)) => Some(url.as_str()),
                Some(Value::Object(img)) => img.get("url").and_then(Value::as_str),
                _ => None,
            };

            let mut extracted = ExtractedStep::new(text);
            extracted.image_url = image.and_then(expand_image_url);
            Some(extracted)
        })
        .collect();

    if steps.is_empty() {
        return None;
    }

    Some(ExtractedRecipe {
        name,
        ingredients,
        steps,
    })
}

/// Recipe from the server-rendered mobile markup.
pub fn extract_dom(html: &str) -> Option<ExtractedRecipe> {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let name = select_text(root, ".recipe-name");

    let mut ingredients = Vec::new();
    if let Ok(line_selector) = Selector::parse(".recipe-ingredient .ing-line") {
        for line in root.select(&line_selector) {
            let Some(ing_name) = select_text(line, ".ing-name") else {
                continue;
            };
            let amount = select_text(line, ".ing-amount").unwrap_or_default();
            ingredients.push(ExtractedIngredient::new(ing_name).with_amount(amount));
        }
    }

    let mut steps = Vec::new();
    if let Ok(step_selector) = Selector::parse(".step") {
        for step in root.select(&step_selector) {
            let text = select_first(step, ".step-text")
                .map(element_text)
                .map(|t| clean_step_text(&t))
                .unwrap_or_default();
            if text.is_empty() {
                continue;
            }

            let cover = select_first(step, ".step-cover");
            let from_style = cover
                .and_then(|c| c.value().attr("style"))
                .and_then(|style| RE_BACKGROUND_URL.captures(style))
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str());
            let from_img = select_first(step, "img[src]").and_then(|img| img.value().attr("src"));

            let mut extracted = ExtractedStep::new(text);
            extracted.image_url = from_style.or(from_img).and_then(expand_image_url);
            steps.push(extracted);
        }
    }

    if steps.is_empty() {
        return None;
    }

    Some(ExtractedRecipe {
        name,
        ingredients,
        steps,
    })
}

fn clean_step_text(text: &str) -> String {
    text.trim().trim_end_matches(['；', '。']).trim_end().to_string()
}

/// Make a step image reference fetchable.
fn expand_image_url(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let url = if raw.starts_with("//") {
        format!("https:{raw}")
    } else {
        raw.to_string()
    };

    if url.contains("chuimg.com") && !url.contains('?') {
        Some(format!("{url}{IMAGE_SIZING_SUFFIX}"))
    } else {
        Some(url)
    }
}
