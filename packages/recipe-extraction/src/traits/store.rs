//! Storage traits for the reference vocabulary and image blobs.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::vocabulary::{
    Ingredient, IngredientCategory, InsertOutcome, Unit, VocabularySnapshot,
};

/// Shared ingredient/unit vocabulary.
///
/// Read-mostly. The pipeline never updates or deletes entries; the only
/// write is an insert that must be rejected by the store (not by the
/// caller) when the name already exists.
#[async_trait]
pub trait VocabularyStore: Send + Sync {
    async fn list_ingredients(&self) -> Result<Vec<Ingredient>>;

    async fn list_units(&self) -> Result<Vec<Unit>>;

    /// Insert an ingredient unless one with the same name exists.
    async fn insert_ingredient_if_absent(
        &self,
        name: &str,
        category: IngredientCategory,
    ) -> Result<InsertOutcome>;

    /// Load ingredients and units concurrently into one snapshot.
    async fn snapshot(&self) -> Result<VocabularySnapshot> {
        let (ingredients, units) = tokio::try_join!(self.list_ingredients(), self.list_units())?;
        Ok(VocabularySnapshot::new(ingredients, units))
    }
}

/// Blob storage for downloaded images.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Persist bytes and return the path they are served from.
    ///
    /// `extension` has no leading dot ("jpg", "png").
    async fn save(&self, bytes: &[u8], extension: &str) -> Result<String>;
}
