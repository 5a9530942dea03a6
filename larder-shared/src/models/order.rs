use serde::{Deserialize, Serialize};

use super::cart::FulfillmentType;

/// One product line in an order submission
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: String,
    pub quantity: u32,
}

/// Request body for the retailer's order-creation endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderPayload {
    pub items: Vec<OrderLine>,
    pub fulfillment_type: String,
    pub estimated_total: f64,
}

/// Retailer acknowledgement of a submitted order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderConfirmation {
    pub order_id: String,
    pub status: String,
    pub estimated_time: String,
    pub total: f64,
    pub fulfillment_type: FulfillmentType,
    pub item_count: usize,
}

/// Outcome of one submission attempt.
///
/// Only constructible through [`OrderResult::confirmed`] and
/// [`OrderResult::failed`], so `success` holds exactly when a confirmation
/// is present.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OrderResult {
    success: bool,
    confirmation: Option<OrderConfirmation>,
    error_message: String,
    items_restocked: u32,
}

impl OrderResult {
    pub fn confirmed(confirmation: OrderConfirmation, items_restocked: u32) -> Self {
        Self {
            success: true,
            confirmation: Some(confirmation),
            error_message: String::new(),
            items_restocked,
        }
    }

    pub fn failed(error_message: impl Into<String>) -> Self {
        Self {
            success: false,
            confirmation: None,
            error_message: error_message.into(),
            items_restocked: 0,
        }
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn confirmation(&self) -> Option<&OrderConfirmation> {
        self.confirmation.as_ref()
    }

    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    pub fn items_restocked(&self) -> u32 {
        self.items_restocked
    }
}
