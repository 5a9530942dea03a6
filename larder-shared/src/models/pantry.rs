use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::shopping::{IngredientCategory, Provenance, ShoppingListItem};

/// Household inventory lifecycle: on_hand -> low -> out -> on_hand (restock)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InventoryStatus {
    OnHand,
    Low,
    Out,
}

impl InventoryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InventoryStatus::OnHand => "on_hand",
            InventoryStatus::Low => "low",
            InventoryStatus::Out => "out",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "on_hand" => Some(InventoryStatus::OnHand),
            "low" => Some(InventoryStatus::Low),
            "out" => Some(InventoryStatus::Out),
            _ => None,
        }
    }

    pub fn needs_restock(&self) -> bool {
        matches!(self, InventoryStatus::Low | InventoryStatus::Out)
    }
}

/// A tracked pantry staple
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryItem {
    pub ingredient: String,
    pub display_name: String,
    pub category: Option<IngredientCategory>,
    pub status: InventoryStatus,
    pub default_quantity: Option<f64>,
    pub default_unit: Option<String>,
    pub default_search_term: Option<String>,
    pub last_restocked: Option<DateTime<Utc>>,
}

impl InventoryItem {
    pub fn new(ingredient: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            ingredient: ingredient.into(),
            display_name: display_name.into(),
            category: None,
            status: InventoryStatus::OnHand,
            default_quantity: None,
            default_unit: None,
            default_search_term: None,
            last_restocked: None,
        }
    }

    /// Shopping list entry that replenishes this item
    pub fn to_restock_item(&self) -> ShoppingListItem {
        ShoppingListItem {
            ingredient: self.ingredient.clone(),
            quantity: self.default_quantity.unwrap_or(1.0),
            unit: self.default_unit.clone().unwrap_or_else(|| "each".to_string()),
            category: self.category.unwrap_or(IngredientCategory::Other),
            search_term: self
                .default_search_term
                .clone()
                .unwrap_or_else(|| self.display_name.clone()),
            provenance: Provenance::Restock,
            estimated_price: None,
        }
    }
}
