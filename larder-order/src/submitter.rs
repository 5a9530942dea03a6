use larder_core::{PantryReconciler, RetailerClient};
use larder_shared::{CartSummary, OrderConfirmation, OrderLine, OrderPayload, OrderResult};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

pub const EMPTY_CART_MESSAGE: &str = "Cart is empty — nothing to order";
pub const SUBMISSION_FAILED_MESSAGE: &str = "Order submission failed — check logs";
pub const UNKNOWN_ORDER_ERROR: &str = "Unknown order error";

/// Typed reading of one order submission attempt
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    Confirmed(OrderConfirmation),
    /// The retailer answered but did not accept the order
    Rejected(String),
    /// The request itself failed; the cause is only logged
    TransportFailure(String),
}

/// Submits built carts and reconciles the pantry afterwards
pub struct OrderSubmitter {
    client: Arc<dyn RetailerClient>,
    pantry: Arc<dyn PantryReconciler>,
}

impl OrderSubmitter {
    pub fn new(client: Arc<dyn RetailerClient>, pantry: Arc<dyn PantryReconciler>) -> Self {
        Self { client, pantry }
    }

    pub async fn submit(&self, cart: &CartSummary) -> OrderResult {
        if cart.is_empty() {
            info!("empty cart, nothing submitted");
            return OrderResult::failed(EMPTY_CART_MESSAGE);
        }

        let payload = build_order_payload(cart);
        info!(
            lines = payload.items.len(),
            fulfillment = %payload.fulfillment_type,
            estimated_total = payload.estimated_total,
            "submitting order"
        );

        let outcome = match self.client.submit_order(&payload).await {
            Ok(response) => interpret_response(&response, cart),
            Err(e) => SubmissionOutcome::TransportFailure(e.to_string()),
        };

        match outcome {
            SubmissionOutcome::Confirmed(confirmation) => {
                info!(
                    order_id = %confirmation.order_id,
                    total = confirmation.total,
                    items = confirmation.item_count,
                    "order confirmed"
                );
                let restocked = self.reconcile(cart).await;
                OrderResult::confirmed(confirmation, restocked)
            }
            SubmissionOutcome::Rejected(reason) => {
                warn!(reason = %reason, "order rejected by retailer");
                OrderResult::failed(reason)
            }
            SubmissionOutcome::TransportFailure(cause) => {
                error!(error = %cause, "order submission failed");
                OrderResult::failed(SUBMISSION_FAILED_MESSAGE)
            }
        }
    }

    /// Best effort; a pantry failure never affects the order
    async fn reconcile(&self, cart: &CartSummary) -> u32 {
        let names = collect_restock_ingredients(cart);
        if names.is_empty() {
            return 0;
        }

        match self.pantry.mark_restocked(&names).await {
            Ok(updated) => {
                info!(updated, "pantry reconciled");
                updated
            }
            Err(e) => {
                error!(error = %e, ingredients = ?names, "pantry reconciliation failed");
                0
            }
        }
    }
}

/// Order lines for ordered then restock items. Pure in the cart.
pub fn build_order_payload(cart: &CartSummary) -> OrderPayload {
    OrderPayload {
        items: cart
            .orderable_items()
            .map(|item| OrderLine {
                product_id: item.product.product_id.clone(),
                quantity: item.quantity_to_order.max(1),
            })
            .collect(),
        fulfillment_type: cart.recommended_fulfillment.as_str().to_string(),
        estimated_total: cart.estimated_total,
    }
}

pub fn collect_restock_ingredients(cart: &CartSummary) -> Vec<String> {
    cart.restock_items
        .iter()
        .map(|item| item.shopping_list_item.ingredient.clone())
        .collect()
}

/// Classify an order-creation response.
///
/// An error status wins over everything else; a missing order id is a
/// rejection too. Fulfillment type and item count always come from the cart.
pub fn interpret_response(response: &Value, cart: &CartSummary) -> SubmissionOutcome {
    let Some(body) = response.as_object() else {
        return SubmissionOutcome::Rejected(UNKNOWN_ORDER_ERROR.to_string());
    };

    let error_message = || {
        body.get("error")
            .and_then(Value::as_str)
            .filter(|message| !message.trim().is_empty())
            .unwrap_or(UNKNOWN_ORDER_ERROR)
            .to_string()
    };

    if body.get("status").and_then(Value::as_str) == Some("error") {
        return SubmissionOutcome::Rejected(error_message());
    }

    let Some(order_id) = body.get("orderId").and_then(order_id_text) else {
        return SubmissionOutcome::Rejected(error_message());
    };

    let text_or = |key: &str, fallback: &str| {
        body.get(key)
            .and_then(Value::as_str)
            .unwrap_or(fallback)
            .to_string()
    };

    SubmissionOutcome::Confirmed(OrderConfirmation {
        order_id,
        status: text_or("status", "confirmed"),
        estimated_time: text_or("estimatedTime", "Unknown"),
        total: body
            .get("total")
            .and_then(parse_total)
            .unwrap_or(cart.estimated_total),
        fulfillment_type: cart.recommended_fulfillment,
        item_count: cart.orderable_count(),
    })
}

fn order_id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Numeric total from a number or numeric string; never panics
fn parse_total(value: &Value) -> Option<f64> {
    let total = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    total.is_finite().then_some(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use larder_shared::{CartItem, FulfillmentType, IngredientCategory, Product, ShoppingListItem};
    use serde_json::json;

    fn cart_item(ingredient: &str, product_id: &str, qty: u32, cost: f64) -> CartItem {
        CartItem {
            shopping_list_item: ShoppingListItem::new(ingredient, 1.0, "each", IngredientCategory::Other),
            product: Product::new(product_id, ingredient, cost, ""),
            quantity_to_order: qty,
            estimated_cost: cost,
        }
    }

    fn cart(items: Vec<CartItem>, restock: Vec<CartItem>, total: f64) -> CartSummary {
        CartSummary {
            items,
            failed_items: vec![],
            substituted_items: vec![],
            skipped_items: vec![],
            restock_items: restock,
            subtotal: total,
            fulfillment_options: vec![],
            recommended_fulfillment: FulfillmentType::Delivery,
            estimated_total: total,
        }
    }

    #[test]
    fn test_payload_merges_restock_items() {
        let cart = cart(
            vec![cart_item("milk", "M1", 2, 6.98)],
            vec![cart_item("butter", "B1", 1, 5.25)],
            12.23,
        );

        let payload = build_order_payload(&cart);
        assert_eq!(
            payload.items,
            vec![
                OrderLine { product_id: "M1".into(), quantity: 2 },
                OrderLine { product_id: "B1".into(), quantity: 1 },
            ]
        );
        assert_eq!(payload.fulfillment_type, "delivery");
        assert_eq!(payload.estimated_total, 12.23);

        let first = serde_json::to_vec(&payload).unwrap();
        let second = serde_json::to_vec(&build_order_payload(&cart)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_confirmed_response() {
        let cart = cart(vec![cart_item("milk", "M1", 1, 3.49)], vec![cart_item("rice", "R1", 1, 2.0)], 5.49);
        let outcome = interpret_response(
            &json!({"orderId": 991, "status": "placed", "estimatedTime": "Tomorrow", "total": "5.10", "fulfillmentType": "pickup"}),
            &cart,
        );

        let SubmissionOutcome::Confirmed(confirmation) = outcome else {
            panic!("expected confirmation");
        };
        assert_eq!(confirmation.order_id, "991");
        assert_eq!(confirmation.status, "placed");
        assert_eq!(confirmation.estimated_time, "Tomorrow");
        assert_eq!(confirmation.total, 5.10);
        assert_eq!(confirmation.fulfillment_type, FulfillmentType::Delivery);
        assert_eq!(confirmation.item_count, 2);
    }

    #[test]
    fn test_confirmation_defaults() {
        let cart = cart(vec![cart_item("milk", "M1", 1, 3.49)], vec![], 3.49);
        let SubmissionOutcome::Confirmed(confirmation) =
            interpret_response(&json!({"orderId": "ORD-7", "total": null}), &cart)
        else {
            panic!("expected confirmation");
        };

        assert_eq!(confirmation.status, "confirmed");
        assert_eq!(confirmation.estimated_time, "Unknown");
        assert_eq!(confirmation.total, 3.49);
    }

    #[test]
    fn test_error_status_wins_over_order_id() {
        let cart = cart(vec![], vec![], 0.0);
        assert_eq!(
            interpret_response(&json!({"status": "error", "orderId": "ORD-1", "error": "No slots"}), &cart),
            SubmissionOutcome::Rejected("No slots".into())
        );
        assert_eq!(
            interpret_response(&json!({"status": "error"}), &cart),
            SubmissionOutcome::Rejected(UNKNOWN_ORDER_ERROR.into())
        );
    }

    #[test]
    fn test_missing_order_id_or_unstructured_body() {
        let cart = cart(vec![], vec![], 0.0);
        assert_eq!(
            interpret_response(&json!({"status": "pending"}), &cart),
            SubmissionOutcome::Rejected(UNKNOWN_ORDER_ERROR.into())
        );
        assert_eq!(
            interpret_response(&json!({"error": "Cart expired"}), &cart),
            SubmissionOutcome::Rejected("Cart expired".into())
        );
        assert_eq!(
            interpret_response(&json!(["ORD-1"]), &cart),
            SubmissionOutcome::Rejected(UNKNOWN_ORDER_ERROR.into())
        );
        assert_eq!(
            interpret_response(&json!("ok"), &cart),
            SubmissionOutcome::Rejected(UNKNOWN_ORDER_ERROR.into())
        );
    }

    #[test]
    fn test_parse_total() {
        assert_eq!(parse_total(&json!(8.99)), Some(8.99));
        assert_eq!(parse_total(&json!(" 12.5 ")), Some(12.5));
        assert_eq!(parse_total(&json!("N/A")), None);
        assert_eq!(parse_total(&json!("NaN")), None);
        assert_eq!(parse_total(&json!({"amount": 3})), None);
    }

    #[test]
    fn test_collect_restock_ingredients() {
        let cart = cart(
            vec![cart_item("milk", "M1", 1, 1.0)],
            vec![cart_item("eggs", "E1", 1, 1.0), cart_item("flour", "F1", 1, 1.0)],
            3.0,
        );
        assert_eq!(collect_restock_ingredients(&cart), vec!["eggs", "flour"]);
    }
}
