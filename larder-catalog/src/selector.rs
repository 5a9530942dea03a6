use larder_core::{OracleRequest, PreferenceError, PreferenceStore, SelectionOracle};
use larder_shared::{BrandPreference, PriceSensitivity, Product, ShoppingListItem};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::brands::{filter_avoided_brands, format_brand_preferences, matches_any_brand, preferred_brands};
use crate::prompt::{extract_json_text, products_json, text_or};

const SELECTION_MAX_TOKENS: u32 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMethod {
    Oracle,
    Heuristic,
}

/// Outcome of choosing among search candidates
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub product: Option<Product>,
    pub reasoning: String,
    pub method: SelectionMethod,
}

impl Selection {
    fn none(reasoning: impl Into<String>) -> Self {
        Self {
            product: None,
            reasoning: reasoning.into(),
            method: SelectionMethod::Heuristic,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SelectionError {
    #[error("Could not load brand preferences: {0}")]
    Preferences(#[from] PreferenceError),
}

/// Picks the best product for a shopping list item.
///
/// With an oracle configured the choice is delegated to it; unusable oracle
/// output falls back to the deterministic heuristic.
pub struct ProductSelector {
    preferences: Arc<dyn PreferenceStore>,
    oracle: Option<Arc<dyn SelectionOracle>>,
}

impl ProductSelector {
    pub fn new(
        preferences: Arc<dyn PreferenceStore>,
        oracle: Option<Arc<dyn SelectionOracle>>,
    ) -> Self {
        Self { preferences, oracle }
    }

    pub fn has_oracle(&self) -> bool {
        self.oracle.is_some()
    }

    pub async fn select(
        &self,
        item: &ShoppingListItem,
        candidates: &[Product],
    ) -> Result<Selection, SelectionError> {
        if candidates.is_empty() {
            return Ok(Selection::none("No products available"));
        }

        let prefs = self
            .preferences
            .brands_for_ingredient(&item.ingredient, item.category)
            .await?;
        let filtered = filter_avoided_brands(candidates, &prefs);
        if filtered.is_empty() {
            return Ok(Selection::none(
                "All available products are from avoided brands",
            ));
        }

        let Some(oracle) = &self.oracle else {
            return Ok(heuristic_selection(&filtered, &prefs));
        };

        let sensitivity = match self.preferences.price_sensitivity().await {
            Ok(sensitivity) => sensitivity,
            Err(e) => {
                warn!(error = %e, "price sensitivity unavailable, using default");
                PriceSensitivity::default()
            }
        };

        let prompt = build_selection_prompt(item, &filtered, &prefs, sensitivity);
        match oracle
            .complete(OracleRequest::new(prompt, SELECTION_MAX_TOKENS))
            .await
        {
            Ok(text) => match parse_selection_response(&text, &filtered) {
                Some((product, reasoning)) => {
                    debug!(
                        ingredient = %item.ingredient,
                        product_id = product.as_ref().map(|p| p.product_id.as_str()),
                        "oracle selection"
                    );
                    Ok(Selection {
                        product,
                        reasoning,
                        method: SelectionMethod::Oracle,
                    })
                }
                None => {
                    warn!(ingredient = %item.ingredient, "unusable oracle selection, using heuristic");
                    Ok(heuristic_selection(&filtered, &prefs))
                }
            },
            Err(e) => {
                warn!(ingredient = %item.ingredient, error = %e, "oracle selection failed, using heuristic");
                Ok(heuristic_selection(&filtered, &prefs))
            }
        }
    }
}

fn heuristic_selection(candidates: &[Product], prefs: &[BrandPreference]) -> Selection {
    let preferred = preferred_brands(prefs);
    match heuristic_select(candidates, &preferred) {
        Some(product) => {
            let reasoning = if matches_any_brand(&product, &preferred) {
                "Cheapest in-stock product from a preferred brand"
            } else {
                "Cheapest in-stock product"
            };
            Selection {
                product: Some(product),
                reasoning: reasoning.to_string(),
                method: SelectionMethod::Heuristic,
            }
        }
        None => Selection::none("No products available"),
    }
}

/// Deterministic pick: in-stock first, then preferred brands, then cheapest.
///
/// Ties keep search rank order.
pub fn heuristic_select(candidates: &[Product], preferred: &[String]) -> Option<Product> {
    let in_stock: Vec<&Product> = candidates.iter().filter(|p| p.in_stock).collect();
    let pool: Vec<&Product> = if in_stock.is_empty() {
        candidates.iter().collect()
    } else {
        in_stock
    };

    let branded: Vec<&Product> = pool
        .iter()
        .copied()
        .filter(|p| matches_any_brand(p, preferred))
        .collect();
    let pool = if branded.is_empty() { pool } else { branded };

    // min_by keeps the first of equal elements
    pool.into_iter()
        .min_by(|a, b| a.price.total_cmp(&b.price))
        .cloned()
}

/// Parse `{"selected_index": n, "reasoning": "..."}`.
///
/// `-1` means no candidate matches. Returns `None` for anything unusable.
pub fn parse_selection_response(
    text: &str,
    candidates: &[Product],
) -> Option<(Option<Product>, String)> {
    let value: Value = serde_json::from_str(extract_json_text(text)).ok()?;
    let index = value.get("selected_index")?.as_i64()?;
    let reasoning = text_or(value.get("reasoning"), "No reasoning provided");

    if index == -1 {
        return Some((None, reasoning));
    }

    let index = usize::try_from(index).ok()?;
    candidates
        .get(index)
        .map(|product| (Some(product.clone()), reasoning))
}

fn build_selection_prompt(
    item: &ShoppingListItem,
    candidates: &[Product],
    prefs: &[BrandPreference],
    sensitivity: PriceSensitivity,
) -> String {
    format!(
        "You are helping a household pick grocery products.\n\n\
         Shopping list item:\n\
         - ingredient: {ingredient}\n\
         - quantity: {quantity} {unit}\n\
         - category: {category}\n\
         - search term: {search_term}\n\n\
         Brand preferences:\n{brands}\n\n\
         Price sensitivity: {sensitivity}\n\n\
         Candidate products:\n{products}\n\n\
         Pick the single best candidate. Respect avoided brands and favour \
         preferred ones. Respond with JSON only:\n\
         {{\"selected_index\": <index or -1 if nothing fits>, \"reasoning\": \"<one sentence>\"}}",
        ingredient = item.ingredient,
        quantity = item.quantity,
        unit = item.unit,
        category = item.category,
        search_term = item.search_term,
        brands = format_brand_preferences(prefs),
        sensitivity = sensitivity.as_str(),
        products = products_json(candidates),
    )
}
