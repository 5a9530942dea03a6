use larder_shared::{FulfillmentOption, FulfillmentType, FulfillmentWindow};
use serde_json::Value;

pub const DEFAULT_DELIVERY_FEE: f64 = 9.95;

/// Used when the retailer cannot be asked
pub fn default_fulfillment_options() -> Vec<FulfillmentOption> {
    vec![
        FulfillmentOption {
            fulfillment_type: FulfillmentType::Pickup,
            available: true,
            fee: 0.0,
            windows: Vec::new(),
            next_window: None,
        },
        FulfillmentOption {
            fulfillment_type: FulfillmentType::Delivery,
            available: true,
            fee: DEFAULT_DELIVERY_FEE,
            windows: Vec::new(),
            next_window: None,
        },
    ]
}

/// Parse `fulfillmentOptions[]`; entries of an unknown type are skipped
pub fn parse_fulfillment_response(data: &Value) -> Vec<FulfillmentOption> {
    data.get("fulfillmentOptions")
        .and_then(Value::as_array)
        .map(|entries| entries.iter().filter_map(parse_option).collect())
        .unwrap_or_default()
}

fn parse_option(entry: &Value) -> Option<FulfillmentOption> {
    let fulfillment_type = match entry.get("type").and_then(Value::as_str) {
        Some(raw) => FulfillmentType::parse(&raw.trim().to_lowercase())?,
        None => FulfillmentType::Pickup,
    };

    let fee = match entry.get("fee") {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|fee| fee.is_finite() && *fee >= 0.0)
    .unwrap_or(0.0);

    let windows: Vec<FulfillmentWindow> = entry
        .get("windows")
        .and_then(Value::as_array)
        .map(|windows| windows.iter().map(parse_window).collect())
        .unwrap_or_default();
    let next_window = windows.first().and_then(|w| w.display.clone());

    Some(FulfillmentOption {
        fulfillment_type,
        available: entry.get("available").and_then(Value::as_bool).unwrap_or(false),
        fee,
        windows,
        next_window,
    })
}

fn parse_window(window: &Value) -> FulfillmentWindow {
    let text = |key: &str| window.get(key).and_then(Value::as_str).map(str::to_string);
    FulfillmentWindow {
        display: text("display"),
        start: text("start"),
        end: text("end"),
    }
}

/// Cheapest available option; equal fees favour pickup, then retailer order.
///
/// `None` when nothing is available.
pub fn recommended_option(options: &[FulfillmentOption]) -> Option<&FulfillmentOption> {
    let mut best: Option<&FulfillmentOption> = None;
    for option in options.iter().filter(|o| o.available) {
        best = match best {
            None => Some(option),
            Some(current) => {
                let better = match option.fee.total_cmp(&current.fee) {
                    std::cmp::Ordering::Less => true,
                    std::cmp::Ordering::Equal => {
                        option.fulfillment_type == FulfillmentType::Pickup
                            && current.fulfillment_type != FulfillmentType::Pickup
                    }
                    std::cmp::Ordering::Greater => false,
                };
                Some(if better { option } else { current })
            }
        };
    }
    best
}

/// Recommended type and the fee of that exact option.
///
/// Falls back to pickup with no fee when nothing is available.
pub fn recommend_fulfillment(options: &[FulfillmentOption]) -> (FulfillmentType, f64) {
    recommended_option(options)
        .map(|o| (o.fulfillment_type, o.fee))
        .unwrap_or((FulfillmentType::Pickup, 0.0))
}
