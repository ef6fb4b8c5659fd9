//! Entity resolution against the reference vocabulary.
//!
//! Matching is read-only over a per-request [`VocabularySnapshot`]. The one
//! write, creating ingredients that did not match, relies on the store's
//! uniqueness constraint; losing a creation race is logged and tolerated.

use futures::future::join_all;
use tracing::{info, warn};
use uuid::Uuid;

use super::parse::{categorize, AIIngredient};
use crate::traits::ai::InferenceService;
use crate::traits::store::VocabularyStore;
use crate::types::recipe::{NewIngredient, ResolvedIngredient};
use crate::types::vocabulary::{Ingredient, InsertOutcome, Unit, VocabularySnapshot};

/// Match a free-text name against canonical ingredients.
///
/// Exact equality is checked across all candidates before any containment
/// match. Among several containment matches the first in `candidates`
/// order wins.
pub fn match_ingredient<'a>(name: &str, candidates: &'a [Ingredient]) -> Option<&'a Ingredient> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    candidates
        .iter()
        .find(|c| c.name == name)
        .or_else(|| {
            candidates.iter().find(|c| {
                !c.name.is_empty() && (c.name.contains(name) || name.contains(c.name.as_str()))
            })
        })
}

/// Case-insensitive exact match on the unit's short name.
pub fn match_unit<'a>(unit: &str, units: &'a [Unit]) -> Option<&'a Unit> {
    let unit = unit.trim().to_lowercase();
    if unit.is_empty() {
        return None;
    }
    units.iter().find(|u| u.name.to_lowercase() == unit)
}

/// Resolve one parsed ingredient. Matched entries take the canonical name.
pub fn resolve_ingredient(
    parsed: AIIngredient,
    vocabulary: &VocabularySnapshot,
) -> ResolvedIngredient {
    let matched = match_ingredient(&parsed.name, &vocabulary.ingredients);
    let matched_unit = parsed
        .unit
        .as_deref()
        .and_then(|u| match_unit(u, &vocabulary.units));

    ResolvedIngredient {
        name: matched
            .map(|i| i.name.clone())
            .unwrap_or_else(|| parsed.name.trim().to_string()),
        count: parsed.count,
        unit: parsed.unit,
        matched_ingredient_id: matched.map(|i| i.id),
        matched_unit_id: matched_unit.map(|u| u.id),
    }
}

pub fn resolve_ingredients(
    parsed: Vec<AIIngredient>,
    vocabulary: &VocabularySnapshot,
) -> Vec<ResolvedIngredient> {
    parsed
        .into_iter()
        .map(|p| resolve_ingredient(p, vocabulary))
        .collect()
}

/// Outcome of auto-creating unmatched ingredients.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreationReport {
    pub created: Vec<NewIngredient>,
    /// Names whose insert conflicted or errored.
    pub failed: Vec<String>,
}

impl CreationReport {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.failed.is_empty()
    }
}

/// Unmatched, non-empty names in first-seen order, without duplicates.
pub fn unmatched_names(ingredients: &[ResolvedIngredient]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for ingredient in ingredients {
        let name = ingredient.name.trim();
        if ingredient.matched_ingredient_id.is_none()
            && !name.is_empty()
            && !names.iter().any(|n| n == name)
        {
            names.push(name.to_string());
        }
    }
    names
}

/// Categorize and insert every unmatched ingredient, back-filling ids.
///
/// Inserts run concurrently. A conflict or storage error for one name is
/// logged and reported in [`CreationReport::failed`]; it never aborts the
/// others.
pub async fn create_missing(
    ai: &dyn InferenceService,
    store: &dyn VocabularyStore,
    ingredients: &mut [ResolvedIngredient],
) -> CreationReport {
    let names = unmatched_names(ingredients);
    if names.is_empty() {
        return CreationReport::default();
    }

    let categorized = categorize(ai, &names).await;

    let inserts = categorized.into_iter().map(|new| async move {
        let outcome = store
            .insert_ingredient_if_absent(&new.name, new.category)
            .await;
        (new, outcome)
    });

    let mut report = CreationReport::default();
    for (new, outcome) in join_all(inserts).await {
        match outcome {
            Ok(InsertOutcome::Created(id)) => {
                backfill(ingredients, &new.name, id);
                report.created.push(new);
            }
            Ok(InsertOutcome::Conflict) => {
                warn!(ingredient = %new.name, "Ingredient already exists, created concurrently");
                report.failed.push(new.name);
            }
            Err(e) => {
                warn!(ingredient = %new.name, error = %e, "Failed to create ingredient");
                report.failed.push(new.name);
            }
        }
    }

    info!(
        created = report.created.len(),
        failed = report.failed.len(),
        "Auto-created missing ingredients"
    );

    report
}

fn backfill(ingredients: &mut [ResolvedIngredient], name: &str, id: Uuid) {
    for ingredient in ingredients
        .iter_mut()
        .filter(|i| i.matched_ingredient_id.is_none() && i.name.trim() == name)
    {
        ingredient.matched_ingredient_id = Some(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::MemoryVocabulary;
    use crate::testing::{MockAI, MockVocabulary};
    use crate::types::vocabulary::{default_units, IngredientCategory};

    fn ingredients(names: &[&str]) -> Vec<Ingredient> {
        names
            .iter()
            .map(|n| Ingredient::new(*n, IngredientCategory::Other))
            .collect()
    }

    #[test]
    fn test_exact_match_beats_containment() {
        // Containment candidate listed first on purpose
        let candidates = ingredients(&["土鸡蛋", "鸡蛋"]);
        let matched = match_ingredient("鸡蛋", &candidates).unwrap();
        assert_eq!(matched.name, "鸡蛋");

        let candidates = ingredients(&["鸡蛋", "土鸡蛋"]);
        assert_eq!(match_ingredient("鸡蛋", &candidates).unwrap().name, "鸡蛋");
    }

    #[test]
    fn test_containment_both_directions() {
        let candidates = ingredients(&["番茄", "生抽"]);
        assert_eq!(match_ingredient("大番茄", &candidates).unwrap().name, "番茄");

        let candidates = ingredients(&["老抽酱油"]);
        assert_eq!(match_ingredient("老抽", &candidates).unwrap().name, "老抽酱油");
    }

    #[test]
    fn test_no_match_and_empty_names() {
        let candidates = ingredients(&["鸡蛋", ""]);
        assert!(match_ingredient("神秘食材", &candidates).is_none());
        assert!(match_ingredient("  ", &candidates).is_none());
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let vocabulary = VocabularySnapshot::new(ingredients(&["鸡蛋", "番茄"]), default_units());
        let first = resolve_ingredient(AIIngredient::new("番茄"), &vocabulary);
        let second = resolve_ingredient(AIIngredient::new("番茄"), &vocabulary);
        assert!(first.matched_ingredient_id.is_some());
        assert_eq!(first.matched_ingredient_id, second.matched_ingredient_id);
    }

    #[test]
    fn test_unit_matching_is_case_insensitive_exact() {
        let units = default_units();
        assert_eq!(match_unit("TBSP", &units).unwrap().name, "tbsp");
        assert_eq!(match_unit("l", &units).unwrap().name, "L");
        assert!(match_unit("tbs", &units).is_none());
        assert!(match_unit("大勺", &units).is_none());
    }

    #[test]
    fn test_null_count_is_kept() {
        let vocabulary = VocabularySnapshot::default();
        let resolved = resolve_ingredient(AIIngredient::new("盐"), &vocabulary);
        assert_eq!(resolved.count, None);
        assert!(resolved.is_to_taste());
    }

    #[test]
    fn test_unmatched_names_are_deduped() {
        let vocabulary = VocabularySnapshot::new(ingredients(&["鸡蛋"]), vec![]);
        let resolved = resolve_ingredients(
            vec![
                AIIngredient::new("神秘食材"),
                AIIngredient::new("鸡蛋"),
                AIIngredient::new("神秘食材"),
                AIIngredient::new(""),
            ],
            &vocabulary,
        );
        assert_eq!(unmatched_names(&resolved), vec!["神秘食材".to_string()]);
    }

    #[tokio::test]
    async fn test_create_missing_backfills_ids() {
        let store = MemoryVocabulary::new();
        let ai = MockAI::new().with_response(
            "分配合适的分类",
            r#"{"ingredients": [{"name": "神秘食材", "category": "不存在的分类"}]}"#,
        );

        let mut resolved = vec![
            ResolvedIngredient::new("神秘食材"),
            ResolvedIngredient::new("神秘食材"),
        ];
        let report = create_missing(&ai, &store, &mut resolved).await;

        assert_eq!(report.created.len(), 1);
        assert_eq!(report.created[0].category, IngredientCategory::Other);
        assert!(report.failed.is_empty());
        assert!(resolved.iter().all(|r| r.matched_ingredient_id.is_some()));
        assert_eq!(resolved[0].matched_ingredient_id, resolved[1].matched_ingredient_id);
    }

    #[tokio::test]
    async fn test_create_missing_swallows_conflicts() {
        let store = MemoryVocabulary::new();
        store
            .insert_ingredient_if_absent("神秘食材", IngredientCategory::Other)
            .await
            .unwrap();

        let ai = MockAI::new().failing();
        let mut resolved = vec![
            ResolvedIngredient::new("神秘食材"),
            ResolvedIngredient::new("龙须菜"),
        ];
        let report = create_missing(&ai, &store, &mut resolved).await;

        assert_eq!(report.failed, vec!["神秘食材".to_string()]);
        assert_eq!(report.created.len(), 1);
        assert_eq!(report.created[0].name, "龙须菜");
        assert!(resolved[0].matched_ingredient_id.is_none());
        assert!(resolved[1].matched_ingredient_id.is_some());
    }

    #[tokio::test]
    async fn test_create_missing_survives_storage_errors() {
        let store = MockVocabulary::new(MemoryVocabulary::new()).failing_insert("龙须菜");
        let ai = MockAI::new().failing();
        let mut resolved = vec![
            ResolvedIngredient::new("神秘食材"),
            ResolvedIngredient::new("龙须菜"),
            ResolvedIngredient::new("冰糖"),
        ];

        let report = create_missing(&ai, &store, &mut resolved).await;

        assert_eq!(report.failed, vec!["龙须菜".to_string()]);
        let created: Vec<&str> = report.created.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(created, vec!["神秘食材", "冰糖"]);
        assert!(resolved[0].matched_ingredient_id.is_some());
        assert!(resolved[1].matched_ingredient_id.is_none());
        assert!(resolved[2].matched_ingredient_id.is_some());
        assert_eq!(store.inner().ingredient_count(), 2);
    }

    #[tokio::test]
    async fn test_create_missing_noop_when_all_matched() {
        let ai = MockAI::new();
        let store = MemoryVocabulary::new();
        let mut resolved = vec![ResolvedIngredient {
            matched_ingredient_id: Some(Uuid::new_v4()),
            ..ResolvedIngredient::new("鸡蛋")
        }];

        let report = create_missing(&ai, &store, &mut resolved).await;
        assert!(report.is_empty());
        assert!(ai.calls().is_empty());
    }
}
