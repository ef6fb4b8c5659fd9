//! In-memory storage implementations for testing and development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use crate::error::{ExtractionError, Result};
use crate::traits::store::{BlobStore, VocabularyStore};
use crate::types::vocabulary::{default_units, Ingredient, IngredientCategory, InsertOutcome, Unit};

fn poisoned<T>(_: T) -> ExtractionError {
    ExtractionError::Storage("memory store lock poisoned".into())
}

/// In-memory ingredient and unit vocabulary.
///
/// Ingredient names are unique; a second insert of the same name returns
/// [`InsertOutcome::Conflict`] just like the database constraint would.
#[derive(Default)]
pub struct MemoryVocabulary {
    ingredients: RwLock<Vec<Ingredient>>,
    units: RwLock<Vec<Unit>>,
}

impl MemoryVocabulary {
    /// Create a new empty vocabulary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Vocabulary seeded with [`default_units`].
    pub fn with_default_units() -> Self {
        Self::new().with_units(default_units())
    }

    pub fn with_units(self, units: Vec<Unit>) -> Self {
        *self.units.write().unwrap() = units;
        self
    }

    pub fn with_ingredient(self, name: impl Into<String>, category: IngredientCategory) -> Self {
        self.ingredients
            .write()
            .unwrap()
            .push(Ingredient::new(name, category));
        self
    }

    /// Get the number of stored ingredients.
    pub fn ingredient_count(&self) -> usize {
        self.ingredients.read().unwrap().len()
    }

    pub fn find_ingredient(&self, name: &str) -> Option<Ingredient> {
        self.ingredients
            .read()
            .unwrap()
            .iter()
            .find(|i| i.name == name)
            .cloned()
    }
}

#[async_trait]
impl VocabularyStore for MemoryVocabulary {
    async fn list_ingredients(&self) -> Result<Vec<Ingredient>> {
        Ok(self.ingredients.read().map_err(poisoned)?.clone())
    }

    async fn list_units(&self) -> Result<Vec<Unit>> {
        Ok(self.units.read().map_err(poisoned)?.clone())
    }

    async fn insert_ingredient_if_absent(
        &self,
        name: &str,
        category: IngredientCategory,
    ) -> Result<InsertOutcome> {
        let mut ingredients = self.ingredients.write().map_err(poisoned)?;
        if ingredients.iter().any(|i| i.name == name) {
            return Ok(InsertOutcome::Conflict);
        }

        let ingredient = Ingredient::new(name, category);
        let id = ingredient.id;
        ingredients.push(ingredient);
        Ok(InsertOutcome::Created(id))
    }
}

/// In-memory blob storage. Paths look like `/media/<uuid>.<ext>`.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.blobs.read().unwrap().get(path).cloned()
    }

    /// Get the number of stored blobs.
    pub fn len(&self) -> usize {
        self.blobs.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn save(&self, bytes: &[u8], extension: &str) -> Result<String> {
        let path = format!("/media/{}.{}", Uuid::new_v4(), extension);
        self.blobs
            .write()
            .map_err(poisoned)?
            .insert(path.clone(), bytes.to_vec());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_insert_conflicts_on_duplicate_name() {
        let store = MemoryVocabulary::new();

        let first = store
            .insert_ingredient_if_absent("鸡蛋", IngredientCategory::EggDairy)
            .await
            .unwrap();
        assert!(matches!(first, InsertOutcome::Created(_)));

        let second = store
            .insert_ingredient_if_absent("鸡蛋", IngredientCategory::Other)
            .await
            .unwrap();
        assert_eq!(second, InsertOutcome::Conflict);
        assert_eq!(store.ingredient_count(), 1);
        assert_eq!(
            store.find_ingredient("鸡蛋").unwrap().category,
            IngredientCategory::EggDairy
        );
    }

    #[tokio::test]
    async fn test_concurrent_inserts_create_once() {
        let store = Arc::new(MemoryVocabulary::new());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .insert_ingredient_if_absent("神秘食材", IngredientCategory::Other)
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            if let InsertOutcome::Created(_) = handle.await.unwrap() {
                created += 1;
            }
        }
        assert_eq!(created, 1);
        assert_eq!(store.ingredient_count(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_reads_both_tables() {
        let store = MemoryVocabulary::with_default_units()
            .with_ingredient("番茄", IngredientCategory::Vegetable);
        let snapshot = store.snapshot().await.unwrap();
        assert_eq!(snapshot.ingredients.len(), 1);
        assert_eq!(snapshot.units.len(), default_units().len());
    }

    #[tokio::test]
    async fn test_blob_store_round_trip() {
        let blobs = MemoryBlobStore::new();
        let path = blobs.save(b"abc", "webp").await.unwrap();
        assert!(path.starts_with("/media/"));
        assert!(path.ends_with(".webp"));
        assert_eq!(blobs.get(&path).unwrap(), b"abc".to_vec());
        assert_eq!(blobs.len(), 1);
    }
}
