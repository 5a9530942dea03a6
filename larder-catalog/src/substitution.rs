use larder_core::{
    CatalogError, CatalogSearch, OracleRequest, PreferenceError, PreferenceStore, SelectionOracle,
};
use larder_shared::{
    BrandPreference, Product, ShoppingListItem, SubstitutionOption, SubstitutionResult,
    SubstitutionStatus, SubstitutionSuitability,
};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::brands::{filter_avoided_brands, format_brand_preferences};
use crate::prompt::{extract_json_text, products_json, text_or};

const RANKING_MAX_TOKENS: u32 = 2048;

/// What the cart builder already learned about an item
#[derive(Debug, Clone, Copy, Default)]
pub struct PriorAttempt<'a> {
    pub candidates: &'a [Product],
    pub rejected: Option<&'a Product>,
}

#[derive(Debug, thiserror::Error)]
pub enum SubstitutionError {
    #[error(transparent)]
    Search(#[from] CatalogError),

    #[error("Could not load brand preferences: {0}")]
    Preferences(#[from] PreferenceError),
}

/// Finds ranked alternatives for items that could not be bought as listed
pub struct SubstitutionResolver {
    search: Arc<dyn CatalogSearch>,
    preferences: Arc<dyn PreferenceStore>,
    oracle: Option<Arc<dyn SelectionOracle>>,
}

impl SubstitutionResolver {
    pub fn new(
        search: Arc<dyn CatalogSearch>,
        preferences: Arc<dyn PreferenceStore>,
        oracle: Option<Arc<dyn SelectionOracle>>,
    ) -> Self {
        Self {
            search,
            preferences,
            oracle,
        }
    }

    /// One broadened search, merged with what was seen before, then ranked.
    ///
    /// The top alternative is pre-selected but never placed in the cart.
    pub async fn substitute(
        &self,
        item: &ShoppingListItem,
        prior: &PriorAttempt<'_>,
    ) -> Result<SubstitutionResult, SubstitutionError> {
        let term = broadened_search_term(item);
        let fresh = self.search.search_products(&term).await?;
        let pool = merge_alternatives(&fresh, prior);

        let original_product = prior.rejected.cloned();
        let outcome = |status: SubstitutionStatus,
                       alternatives: Vec<SubstitutionOption>,
                       message: String| {
            SubstitutionResult {
                status,
                original_item: item.clone(),
                original_product: original_product.clone(),
                selected: alternatives.first().cloned(),
                alternatives,
                message,
            }
        };

        if pool.is_empty() {
            debug!(ingredient = %item.ingredient, term = %term, "no substitution candidates");
            return Ok(outcome(
                SubstitutionStatus::NoAlternatives,
                Vec::new(),
                format!("No alternatives found for {}", item.ingredient),
            ));
        }

        let prefs = self
            .preferences
            .brands_for_ingredient(&item.ingredient, item.category)
            .await?;
        let allowed = filter_avoided_brands(&pool, &prefs);
        if allowed.is_empty() {
            return Ok(outcome(
                SubstitutionStatus::AllAvoided,
                Vec::new(),
                format!("All alternatives for {} are from avoided brands", item.ingredient),
            ));
        }

        let ranked = self.rank(item, &allowed, &prefs).await;
        info!(
            ingredient = %item.ingredient,
            alternatives = ranked.len(),
            "substitution alternatives found"
        );
        let message = format!("Found {} alternative(s) for {}", ranked.len(), item.ingredient);
        Ok(outcome(SubstitutionStatus::AlternativesFound, ranked, message))
    }

    async fn rank(
        &self,
        item: &ShoppingListItem,
        alternatives: &[Product],
        prefs: &[BrandPreference],
    ) -> Vec<SubstitutionOption> {
        let Some(oracle) = &self.oracle else {
            return fallback_ranking(alternatives);
        };

        let prompt = build_ranking_prompt(item, alternatives, prefs);
        match oracle
            .complete(OracleRequest::new(prompt, RANKING_MAX_TOKENS))
            .await
        {
            Ok(text) => parse_ranking_response(&text, alternatives).unwrap_or_else(|| {
                warn!(ingredient = %item.ingredient, "unusable oracle ranking, ranking by price");
                fallback_ranking(alternatives)
            }),
            Err(e) => {
                warn!(ingredient = %item.ingredient, error = %e, "oracle ranking failed, ranking by price");
                fallback_ranking(alternatives)
            }
        }
    }
}

/// The ingredient name when it differs from the search term, else the term
pub fn broadened_search_term(item: &ShoppingListItem) -> String {
    let ingredient = item.ingredient.trim();
    let term = item.search_term.trim();
    if !ingredient.is_empty() && !ingredient.eq_ignore_ascii_case(term) {
        ingredient.to_string()
    } else {
        term.to_string()
    }
}

/// In-stock products from both searches, deduplicated by id, rejected excluded
pub fn merge_alternatives(fresh: &[Product], prior: &PriorAttempt<'_>) -> Vec<Product> {
    let mut seen: HashSet<&str> = HashSet::new();
    if let Some(rejected) = prior.rejected {
        seen.insert(rejected.product_id.as_str());
    }

    fresh
        .iter()
        .chain(prior.candidates.iter())
        .filter(|product| product.in_stock)
        .filter(|product| seen.insert(product.product_id.as_str()))
        .cloned()
        .collect()
}

/// Cheapest first, every option rated acceptable
pub fn fallback_ranking(alternatives: &[Product]) -> Vec<SubstitutionOption> {
    let mut sorted = alternatives.to_vec();
    sorted.sort_by(|a, b| a.price.total_cmp(&b.price));
    sorted
        .into_iter()
        .map(|product| SubstitutionOption {
            product,
            suitability: SubstitutionSuitability::Acceptable,
            form_warning: None,
            reasoning: "Ranked by price".to_string(),
        })
        .collect()
}

/// Parse `[{"index", "suitability", "form_warning", "reasoning"}, ...]`.
///
/// Out-of-range and repeated indexes are skipped; `None` if nothing usable.
pub fn parse_ranking_response(
    text: &str,
    alternatives: &[Product],
) -> Option<Vec<SubstitutionOption>> {
    let value: Value = serde_json::from_str(extract_json_text(text)).ok()?;
    let entries = value.as_array()?;

    let mut used = HashSet::new();
    let mut ranked = Vec::new();
    for entry in entries {
        let Some(index) = entry.get("index").and_then(Value::as_u64) else {
            continue;
        };
        let Ok(index) = usize::try_from(index) else {
            continue;
        };
        let Some(product) = alternatives.get(index) else {
            continue;
        };
        if !used.insert(index) {
            continue;
        }

        let suitability = entry
            .get("suitability")
            .and_then(Value::as_str)
            .map(SubstitutionSuitability::parse_lenient)
            .unwrap_or(SubstitutionSuitability::Acceptable);
        let form_warning = entry
            .get("form_warning")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|warning| !warning.is_empty())
            .map(str::to_string);

        ranked.push(SubstitutionOption {
            product: product.clone(),
            suitability,
            form_warning,
            reasoning: text_or(entry.get("reasoning"), ""),
        });
    }

    (!ranked.is_empty()).then_some(ranked)
}

fn build_ranking_prompt(
    item: &ShoppingListItem,
    alternatives: &[Product],
    prefs: &[BrandPreference],
) -> String {
    format!(
        "A grocery item is unavailable and needs a substitute.\n\n\
         Original item: {ingredient} ({quantity} {unit}, category {category})\n\n\
         Brand preferences:\n{brands}\n\n\
         Alternatives:\n{products}\n\n\
         Rank the alternatives from best to worst substitute. Flag any change \
         of form (for example fresh versus frozen) in form_warning. Respond \
         with a JSON array only:\n\
         [{{\"index\": <n>, \"suitability\": \"excellent|good|acceptable|poor\", \
         \"form_warning\": <string or null>, \"reasoning\": \"<one sentence>\"}}]",
        ingredient = item.ingredient,
        quantity = item.quantity,
        unit = item.unit,
        category = item.category,
        brands = format_brand_preferences(prefs),
        products = products_json(alternatives),
    )
}
