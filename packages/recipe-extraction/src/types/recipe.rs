//! Recipe shapes - raw extractor output and the normalized pipeline output.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::vocabulary::IngredientCategory;

// =============================================================================
// Extractor output (transient, pipeline-internal)
// =============================================================================

/// A recipe as scraped from a page, before any normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedRecipe {
    pub name: Option<String>,
    pub ingredients: Vec<ExtractedIngredient>,
    pub steps: Vec<ExtractedStep>,
}

impl ExtractedRecipe {
    /// A layer result only counts when it produced at least one step.
    pub fn is_usable(&self) -> bool {
        !self.steps.is_empty()
    }

    /// Ingredient lines as they would be read aloud: "番茄 2个".
    pub fn ingredient_lines(&self) -> Vec<String> {
        self.ingredients.iter().map(ExtractedIngredient::line).collect()
    }
}

/// One ingredient line. `amount` is free text ("2个", "适量").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedIngredient {
    pub name: String,
    pub amount: Option<String>,
}

impl ExtractedIngredient {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            amount: None,
        }
    }

    pub fn with_amount(mut self, amount: impl Into<String>) -> Self {
        let amount = amount.into();
        self.amount = if amount.trim().is_empty() {
            None
        } else {
            Some(amount)
        };
        self
    }

    pub fn line(&self) -> String {
        match &self.amount {
            Some(amount) => format!("{} {}", self.name, amount),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedStep {
    pub text: String,
    pub image_url: Option<String>,
}

impl ExtractedStep {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image_url: None,
        }
    }
}

// =============================================================================
// Pipeline output
// =============================================================================

/// The normalized recipe handed to the recipe-creation collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedRecipeData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub ingredients: Vec<ResolvedIngredient>,

    pub steps: Vec<ResolvedStep>,

    /// Ingredients the resolver could not match and created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub newly_created_ingredients: Option<Vec<NewIngredient>>,

    /// Unmatched names whose creation conflicted or failed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_ingredients: Vec<String>,
}

/// An ingredient after matching against the reference vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedIngredient {
    /// Canonical vocabulary name when matched, otherwise the extracted name.
    pub name: String,

    /// `None` means "to taste" (适量), never zero.
    pub count: Option<f64>,

    pub unit: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_ingredient_id: Option<Uuid>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_unit_id: Option<Uuid>,
}

impl ResolvedIngredient {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            count: None,
            unit: None,
            matched_ingredient_id: None,
            matched_unit_id: None,
        }
    }

    pub fn is_to_taste(&self) -> bool {
        self.count.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedStep {
    pub text: String,

    /// Local path once downloaded, otherwise the original remote URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_id: Option<Uuid>,
}

impl ResolvedStep {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image_url: None,
            image_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewIngredient {
    pub name: String,
    pub category: IngredientCategory,
}
