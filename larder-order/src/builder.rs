use larder_catalog::pricing::price_cart_item;
use larder_catalog::{
    PriorAttempt, ProductSelector, SelectionError, SubstitutionError, SubstitutionResolver,
};
use larder_core::{CatalogError, CatalogSearch, RetailerClient};
use larder_shared::{
    round_cents, CartItem, CartSummary, FailedItem, FulfillmentOption, Product, ShoppingListItem,
    SkippedItem, SubstitutionResult,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::fulfillment::{
    default_fulfillment_options, parse_fulfillment_response, recommend_fulfillment,
};

/// Where a single shopping list item ended up
#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome {
    Resolved(CartItem),
    Substituted(SubstitutionResult),
    Failed(FailedItem),
    Skipped(SkippedItem),
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    Search(#[from] CatalogError),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Substitution(#[from] SubstitutionError),
}

/// Turns shopping list items into a priced cart, one item at a time.
///
/// A failing item is recorded in `failed_items` and never stops the build.
pub struct CartBuilder {
    search: Arc<dyn CatalogSearch>,
    selector: ProductSelector,
    substitution: SubstitutionResolver,
    client: Arc<dyn RetailerClient>,
}

#[derive(Default)]
struct Buckets {
    items: Vec<CartItem>,
    restock_items: Vec<CartItem>,
    failed_items: Vec<FailedItem>,
    substituted_items: Vec<SubstitutionResult>,
    skipped_items: Vec<SkippedItem>,
}

impl CartBuilder {
    pub fn new(
        search: Arc<dyn CatalogSearch>,
        selector: ProductSelector,
        substitution: SubstitutionResolver,
        client: Arc<dyn RetailerClient>,
    ) -> Self {
        Self {
            search,
            selector,
            substitution,
            client,
        }
    }

    pub fn has_oracle(&self) -> bool {
        self.selector.has_oracle()
    }

    pub async fn build_cart(
        &self,
        items: &[ShoppingListItem],
        restock_items: Option<&[ShoppingListItem]>,
    ) -> CartSummary {
        let restock_items = restock_items.unwrap_or_default();
        let sequence = items
            .iter()
            .map(|item| (item, false))
            .chain(restock_items.iter().map(|item| (item, true)));

        let mut buckets = Buckets::default();
        let mut seen: HashSet<String> = HashSet::new();

        for (item, is_restock) in sequence {
            let outcome = match skip_reason(item, &mut seen) {
                Some(reason) => ItemOutcome::Skipped(SkippedItem {
                    item: item.clone(),
                    reason,
                }),
                None => self.resolve_item(item).await.unwrap_or_else(|e| {
                    warn!(ingredient = %item.ingredient, error = %e, "item resolution failed");
                    ItemOutcome::Failed(FailedItem {
                        item: item.clone(),
                        reason: e.to_string(),
                    })
                }),
            };

            match outcome {
                ItemOutcome::Resolved(cart_item) if is_restock => buckets.restock_items.push(cart_item),
                ItemOutcome::Resolved(cart_item) => buckets.items.push(cart_item),
                ItemOutcome::Substituted(result) => buckets.substituted_items.push(result),
                ItemOutcome::Failed(failed) => {
                    warn!(ingredient = %failed.item.ingredient, reason = %failed.reason, "item failed");
                    buckets.failed_items.push(failed)
                }
                ItemOutcome::Skipped(skipped) => {
                    debug!(ingredient = %skipped.item.ingredient, reason = %skipped.reason, "item skipped");
                    buckets.skipped_items.push(skipped)
                }
            }
        }

        let fulfillment_options = self.fulfillment_options().await;
        let (recommended_fulfillment, fee) = recommend_fulfillment(&fulfillment_options);
        let subtotal = round_cents(
            buckets
                .items
                .iter()
                .chain(buckets.restock_items.iter())
                .map(|item| item.estimated_cost)
                .sum(),
        );
        let estimated_total = round_cents(subtotal + fee);

        info!(
            items = buckets.items.len(),
            restock = buckets.restock_items.len(),
            failed = buckets.failed_items.len(),
            substituted = buckets.substituted_items.len(),
            skipped = buckets.skipped_items.len(),
            subtotal,
            estimated_total,
            "cart built"
        );

        CartSummary {
            items: buckets.items,
            failed_items: buckets.failed_items,
            substituted_items: buckets.substituted_items,
            skipped_items: buckets.skipped_items,
            restock_items: buckets.restock_items,
            subtotal,
            fulfillment_options,
            recommended_fulfillment,
            estimated_total,
        }
    }

    /// Search, select, and substitute at most once
    pub async fn resolve_item(&self, item: &ShoppingListItem) -> Result<ItemOutcome, ResolveError> {
        let candidates = self.search.search_or_cached(&item.search_term).await?;
        let selection = self.selector.select(item, &candidates).await?;

        let rejected = match selection.product {
            Some(product) if product.in_stock => {
                debug!(
                    ingredient = %item.ingredient,
                    product_id = %product.product_id,
                    method = ?selection.method,
                    "product selected"
                );
                return Ok(ItemOutcome::Resolved(price_cart_item(item, product)));
            }
            other => other,
        };

        let prior = PriorAttempt {
            candidates: &candidates,
            rejected: rejected.as_ref(),
        };
        let result = self.substitution.substitute(item, &prior).await?;
        if result.is_usable() {
            return Ok(ItemOutcome::Substituted(result));
        }

        Ok(ItemOutcome::Failed(FailedItem {
            item: item.clone(),
            reason: failure_reason(item, rejected.as_ref(), &selection.reasoning, &result),
        }))
    }

    async fn fulfillment_options(&self) -> Vec<FulfillmentOption> {
        match self.client.fulfillment_options().await {
            Ok(data) => {
                let options = parse_fulfillment_response(&data);
                if options.is_empty() {
                    warn!("retailer listed no fulfillment options, using defaults");
                    default_fulfillment_options()
                } else {
                    options
                }
            }
            Err(e) => {
                warn!(error = %e, "could not fetch fulfillment options, using defaults");
                default_fulfillment_options()
            }
        }
    }
}

/// Policy exclusions; `seen` tracks normalised ingredient names
fn skip_reason(item: &ShoppingListItem, seen: &mut HashSet<String>) -> Option<String> {
    if !item.quantity.is_finite() || item.quantity <= 0.0 {
        return Some(format!("Nothing to order (quantity {})", item.quantity));
    }
    if !seen.insert(item.normalized_ingredient()) {
        return Some(format!("Duplicate of an earlier '{}' entry", item.ingredient.trim()));
    }
    None
}

fn failure_reason(
    item: &ShoppingListItem,
    rejected: Option<&Product>,
    selection_reasoning: &str,
    substitution: &SubstitutionResult,
) -> String {
    match rejected {
        Some(product) => format!(
            "'{}' is out of stock; {}",
            product.name, substitution.message
        ),
        None => format!(
            "No product found for '{}' ({}); {}",
            item.search_term, selection_reasoning, substitution.message
        ),
    }
}
