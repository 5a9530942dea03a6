use serde::{Deserialize, Serialize};

/// A purchasable entry in the retailer's catalog.
///
/// Owned by the catalog; the pipeline only references it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub product_id: String,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub unit_price: Option<f64>,
    #[serde(default)]
    pub size: String,
    #[serde(default = "default_in_stock")]
    pub in_stock: bool,
}

fn default_in_stock() -> bool {
    true
}

impl Product {
    pub fn new(
        product_id: impl Into<String>,
        name: impl Into<String>,
        price: f64,
        size: impl Into<String>,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            name: name.into(),
            price: price.max(0.0),
            unit_price: None,
            size: size.into(),
            in_stock: true,
        }
    }

    pub fn out_of_stock(mut self) -> Self {
        self.in_stock = false;
        self
    }
}
