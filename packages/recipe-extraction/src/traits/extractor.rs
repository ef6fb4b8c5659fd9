use crate::types::recipe::ExtractedRecipe;

/// Parser for one recipe site's markup.
///
/// Returns `None` when the expected structure is absent or malformed.
/// Implementations never panic or error on bad input; a miss lets the
/// pipeline fall through to the generic layers.
pub trait SiteExtractor: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    fn extract(&self, html: &str) -> Option<ExtractedRecipe>;
}
