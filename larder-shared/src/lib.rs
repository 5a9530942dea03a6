pub mod models;

pub use models::cart::{
    CartItem, CartSummary, FailedItem, FulfillmentOption, FulfillmentType, FulfillmentWindow,
    SkippedItem, SubstitutionOption, SubstitutionResult, SubstitutionStatus,
    SubstitutionSuitability,
};
pub use models::order::{OrderConfirmation, OrderLine, OrderPayload, OrderResult};
pub use models::pantry::{InventoryItem, InventoryStatus};
pub use models::preferences::{BrandMatchType, BrandPreference, BrandPreferenceType, PriceSensitivity};
pub use models::product::Product;
pub use models::shopping::{IngredientCategory, Provenance, ShoppingListItem};

/// Round a currency amount to whole cents.
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}
