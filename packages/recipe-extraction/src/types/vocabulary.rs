//! Reference vocabulary - canonical ingredients and units.
//!
//! The vocabulary is owned by the persistence layer and shared by every
//! extraction request. The pipeline only ever reads it as a per-request
//! [`VocabularySnapshot`] and inserts missing ingredients.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fixed ingredient grouping. Labels match the seed data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IngredientCategory {
    #[serde(rename = "蔬菜")]
    Vegetable,
    #[serde(rename = "肉类")]
    Meat,
    #[serde(rename = "海鲜")]
    Seafood,
    #[serde(rename = "调料")]
    Seasoning,
    #[serde(rename = "蛋奶")]
    EggDairy,
    #[serde(rename = "豆制品")]
    Soy,
    #[serde(rename = "主食")]
    Staple,
    #[serde(rename = "坚果")]
    Nut,
    #[serde(rename = "干果")]
    DriedFruit,
    #[serde(rename = "水果")]
    Fruit,
    #[serde(rename = "其他")]
    Other,
}

impl IngredientCategory {
    pub const ALL: [IngredientCategory; 11] = [
        Self::Vegetable,
        Self::Meat,
        Self::Seafood,
        Self::Seasoning,
        Self::EggDairy,
        Self::Soy,
        Self::Staple,
        Self::Nut,
        Self::DriedFruit,
        Self::Fruit,
        Self::Other,
    ];

    /// Category used whenever no valid one could be assigned.
    pub const FALLBACK: IngredientCategory = Self::Other;

    pub fn label(self) -> &'static str {
        match self {
            Self::Vegetable => "蔬菜",
            Self::Meat => "肉类",
            Self::Seafood => "海鲜",
            Self::Seasoning => "调料",
            Self::EggDairy => "蛋奶",
            Self::Soy => "豆制品",
            Self::Staple => "主食",
            Self::Nut => "坚果",
            Self::DriedFruit => "干果",
            Self::Fruit => "水果",
            Self::Other => "其他",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL.into_iter().find(|c| c.label() == label)
    }

    /// Parse a stored or model-supplied label, falling back to 其他.
    pub fn from_label_or_fallback(label: &str) -> Self {
        Self::from_label(label).unwrap_or(Self::FALLBACK)
    }

    /// Labels joined for prompts: "蔬菜, 肉类, ...".
    pub fn label_list() -> String {
        Self::ALL
            .iter()
            .map(|c| c.label())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for IngredientCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: Uuid,
    /// Chinese canonical name, unique across the vocabulary.
    pub name: String,
    pub category: IngredientCategory,
}

impl Ingredient {
    pub fn new(name: impl Into<String>, category: IngredientCategory) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            category,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub id: Uuid,
    /// Short token, e.g. "g", "tbsp".
    pub name: String,
    /// Localized display name, e.g. "克", "大勺".
    pub display_name: String,
}

impl Unit {
    pub fn new(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            display_name: display_name.into(),
        }
    }
}

/// Seed units shipped with a fresh database.
pub fn default_units() -> Vec<Unit> {
    [
        ("g", "克"),
        ("kg", "千克"),
        ("ml", "毫升"),
        ("L", "升"),
        ("cup", "杯"),
        ("tbsp", "大勺"),
        ("tsp", "小勺"),
        ("bunch", "把"),
        ("piece", "个/块"),
        ("slice", "片"),
        ("clove", "瓣"),
        ("drop", "滴"),
        ("pinch", "撮"),
        ("dozen", "打"),
        ("root", "根"),
        ("head", "头"),
        ("stalk", "棵"),
        ("bowl", "碗"),
        ("handful", "抓"),
    ]
    .into_iter()
    .map(|(name, display)| Unit::new(name, display))
    .collect()
}

/// Read-only copy of the vocabulary taken at the start of one request.
#[derive(Debug, Clone, Default)]
pub struct VocabularySnapshot {
    pub ingredients: Vec<Ingredient>,
    pub units: Vec<Unit>,
}

impl VocabularySnapshot {
    pub fn new(ingredients: Vec<Ingredient>, units: Vec<Unit>) -> Self {
        Self { ingredients, units }
    }

    pub fn is_empty(&self) -> bool {
        self.ingredients.is_empty() && self.units.is_empty()
    }
}

/// Result of an insert-if-absent against the shared vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Created(Uuid),
    /// Name already exists, e.g. created by a concurrent request.
    Conflict,
}
