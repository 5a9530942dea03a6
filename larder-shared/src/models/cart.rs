use serde::{Deserialize, Serialize};
use std::fmt;

use super::product::Product;
use super::shopping::ShoppingListItem;

/// A shopping list item resolved to a concrete product
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartItem {
    pub shopping_list_item: ShoppingListItem,
    pub product: Product,
    pub quantity_to_order: u32,
    pub estimated_cost: f64,
}

/// An item no product could be found for
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FailedItem {
    pub item: ShoppingListItem,
    pub reason: String,
}

/// An item deliberately left out of the cart
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkippedItem {
    pub item: ShoppingListItem,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubstitutionSuitability {
    Excellent,
    Good,
    Acceptable,
    Poor,
}

impl SubstitutionSuitability {
    /// Lenient parse; anything unrecognised is treated as acceptable
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "excellent" => SubstitutionSuitability::Excellent,
            "good" => SubstitutionSuitability::Good,
            "poor" => SubstitutionSuitability::Poor,
            _ => SubstitutionSuitability::Acceptable,
        }
    }
}

/// One candidate replacement for an unavailable item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubstitutionOption {
    pub product: Product,
    pub suitability: SubstitutionSuitability,
    pub form_warning: Option<String>,
    pub reasoning: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubstitutionStatus {
    AlternativesFound,
    NoAlternatives,
    AllAvoided,
}

/// Outcome of the substitution attempt for one item.
///
/// Substitutions are never silent: they are reported for review and are
/// not submitted with the order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubstitutionResult {
    pub status: SubstitutionStatus,
    pub original_item: ShoppingListItem,
    pub original_product: Option<Product>,
    pub alternatives: Vec<SubstitutionOption>,
    pub selected: Option<SubstitutionOption>,
    pub message: String,
}

impl SubstitutionResult {
    pub fn is_usable(&self) -> bool {
        self.selected.is_some()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentType {
    Pickup,
    Delivery,
}

impl FulfillmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FulfillmentType::Pickup => "pickup",
            FulfillmentType::Delivery => "delivery",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pickup" => Some(FulfillmentType::Pickup),
            "delivery" => Some(FulfillmentType::Delivery),
            _ => None,
        }
    }
}

impl fmt::Display for FulfillmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bookable pickup or delivery slot
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FulfillmentWindow {
    #[serde(default)]
    pub display: Option<String>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FulfillmentOption {
    #[serde(rename = "type")]
    pub fulfillment_type: FulfillmentType,
    pub available: bool,
    pub fee: f64,
    pub windows: Vec<FulfillmentWindow>,
    pub next_window: Option<String>,
}

/// Output of one cart build.
///
/// Every input item lands in exactly one of `items`, `restock_items`,
/// `failed_items`, `substituted_items` or `skipped_items`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartSummary {
    pub items: Vec<CartItem>,
    pub failed_items: Vec<FailedItem>,
    pub substituted_items: Vec<SubstitutionResult>,
    pub skipped_items: Vec<SkippedItem>,
    pub restock_items: Vec<CartItem>,
    pub subtotal: f64,
    pub fulfillment_options: Vec<FulfillmentOption>,
    pub recommended_fulfillment: FulfillmentType,
    pub estimated_total: f64,
}

impl CartSummary {
    /// True when there is nothing to submit
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.restock_items.is_empty()
    }

    /// Items that go into the order payload, ordered items first
    pub fn orderable_items(&self) -> impl Iterator<Item = &CartItem> {
        self.items.iter().chain(self.restock_items.iter())
    }

    pub fn orderable_count(&self) -> usize {
        self.items.len() + self.restock_items.len()
    }

    /// Number of input items accounted for across all buckets
    pub fn classified_count(&self) -> usize {
        self.items.len()
            + self.restock_items.len()
            + self.failed_items.len()
            + self.substituted_items.len()
            + self.skipped_items.len()
    }
}
