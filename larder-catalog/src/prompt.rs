//! Helpers shared by the oracle-backed selection and ranking prompts.

use larder_shared::Product;
use serde_json::json;

/// Strip markdown code fences and surrounding whitespace from a reply
pub fn extract_json_text(raw: &str) -> &str {
    let mut text = raw.trim();
    if text.starts_with("```") {
        text = match text.find('\n') {
            Some(newline) => &text[newline + 1..],
            None => "",
        };
    }
    if let Some(stripped) = text.trim_end().strip_suffix("```") {
        text = stripped;
    }
    text.trim()
}

/// Zero-indexed candidate list as pretty JSON
pub fn products_json(products: &[Product]) -> String {
    let entries: Vec<_> = products
        .iter()
        .enumerate()
        .map(|(index, product)| {
            json!({
                "index": index,
                "product_id": product.product_id,
                "name": product.name,
                "price": product.price,
                "unit_price": product.unit_price,
                "size": product.size,
                "in_stock": product.in_stock,
            })
        })
        .collect();

    serde_json::to_string_pretty(&entries).unwrap_or_else(|_| "[]".to_string())
}

/// Read a JSON value as text, tolerating non-string scalars
pub fn text_or(value: Option<&serde_json::Value>, fallback: &str) -> String {
    match value {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Null) | None => fallback.to_string(),
        Some(other) => other.to_string(),
    }
}
