use async_trait::async_trait;
use larder_shared::{BrandPreference, IngredientCategory, PriceSensitivity};

#[derive(Debug, thiserror::Error)]
pub enum PreferenceError {
    #[error("Preference storage error: {0}")]
    Storage(String),
}

/// Household shopping preferences consulted during product selection
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Brand rules for an ingredient; ingredient-level rules replace
    /// category-level ones when both exist
    async fn brands_for_ingredient(
        &self,
        ingredient: &str,
        category: IngredientCategory,
    ) -> Result<Vec<BrandPreference>, PreferenceError>;

    async fn price_sensitivity(&self) -> Result<PriceSensitivity, PreferenceError>;
}
