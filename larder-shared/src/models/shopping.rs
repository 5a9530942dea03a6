use serde::{Deserialize, Serialize};
use std::fmt;

/// Grocery store aisle categories
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IngredientCategory {
    Produce,
    Meat,
    Dairy,
    Bakery,
    PantryDry,
    Frozen,
    Beverages,
    Deli,
    Other,
}

impl IngredientCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngredientCategory::Produce => "produce",
            IngredientCategory::Meat => "meat",
            IngredientCategory::Dairy => "dairy",
            IngredientCategory::Bakery => "bakery",
            IngredientCategory::PantryDry => "pantry_dry",
            IngredientCategory::Frozen => "frozen",
            IngredientCategory::Beverages => "beverages",
            IngredientCategory::Deli => "deli",
            IngredientCategory::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let category = match value.trim().to_lowercase().as_str() {
            "produce" => IngredientCategory::Produce,
            "meat" => IngredientCategory::Meat,
            "dairy" => IngredientCategory::Dairy,
            "bakery" => IngredientCategory::Bakery,
            "pantry_dry" => IngredientCategory::PantryDry,
            "frozen" => IngredientCategory::Frozen,
            "beverages" => IngredientCategory::Beverages,
            "deli" => IngredientCategory::Deli,
            "other" => IngredientCategory::Other,
            _ => return None,
        };
        Some(category)
    }
}

impl fmt::Display for IngredientCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a shopping list entry came from
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Needed by one or more planned meals
    Meals(Vec<String>),
    /// Added by hand
    #[default]
    Manual,
    /// Replenishing pantry stock that ran low
    Restock,
}

/// A single ingredient need on the consolidated shopping list.
///
/// Immutable once created; the cart builder only ever reads it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShoppingListItem {
    pub ingredient: String,
    pub quantity: f64,
    pub unit: String,
    pub category: IngredientCategory,
    pub search_term: String,
    #[serde(default)]
    pub provenance: Provenance,
    #[serde(default)]
    pub estimated_price: Option<f64>,
}

impl ShoppingListItem {
    /// Create an item whose search term is the ingredient name itself
    pub fn new(
        ingredient: impl Into<String>,
        quantity: f64,
        unit: impl Into<String>,
        category: IngredientCategory,
    ) -> Self {
        let ingredient = ingredient.into();
        Self {
            search_term: ingredient.clone(),
            ingredient,
            quantity,
            unit: unit.into(),
            category,
            provenance: Provenance::Manual,
            estimated_price: None,
        }
    }

    pub fn with_search_term(mut self, search_term: impl Into<String>) -> Self {
        self.search_term = search_term.into();
        self
    }

    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = provenance;
        self
    }

    /// Ingredient name used for duplicate detection and pantry matching
    pub fn normalized_ingredient(&self) -> String {
        self.ingredient.trim().to_lowercase()
    }
}
