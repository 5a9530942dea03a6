use larder_shared::{round_cents, CartItem, Product, ShoppingListItem};

/// Leading numeric quantity of a size descriptor ("2 lb" -> 2.0).
///
/// Returns 0.0 when the descriptor does not start with a number.
pub fn parse_product_size(size: &str) -> f64 {
    let digits: String = size
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    digits.parse::<f64>().unwrap_or(0.0)
}

/// How many packages cover the requested quantity (at least one)
pub fn quantity_to_order(item: &ShoppingListItem, product: &Product) -> u32 {
    let per_package = parse_product_size(&product.size);
    if per_package <= 0.0 || !item.quantity.is_finite() {
        return 1;
    }

    let needed = (item.quantity / per_package).ceil();
    (needed as u32).max(1)
}

pub fn estimated_cost(product: &Product, quantity: u32) -> f64 {
    round_cents(product.price * quantity as f64)
}

/// Pair an item with its chosen product and price the line
pub fn price_cart_item(item: &ShoppingListItem, product: Product) -> CartItem {
    let quantity = quantity_to_order(item, &product);
    let cost = estimated_cost(&product, quantity);
    CartItem {
        shopping_list_item: item.clone(),
        product,
        quantity_to_order: quantity,
        estimated_cost: cost,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use larder_shared::IngredientCategory;

    fn item(quantity: f64) -> ShoppingListItem {
        ShoppingListItem::new("chicken thighs", quantity, "lb", IngredientCategory::Meat)
    }

    #[test]
    fn test_parse_product_size() {
        assert_eq!(parse_product_size("2 lb"), 2.0);
        assert_eq!(parse_product_size("16.9 fl oz"), 16.9);
        assert_eq!(parse_product_size("  1 gal"), 1.0);
        assert_eq!(parse_product_size("family pack"), 0.0);
        assert_eq!(parse_product_size(""), 0.0);
    }

    #[test]
    fn test_quantity_rounds_up() {
        let product = Product::new("P-1", "Chicken Thighs", 6.99, "2 lb");

        assert_eq!(quantity_to_order(&item(2.0), &product), 1);
        assert_eq!(quantity_to_order(&item(4.0), &product), 2);
        assert_eq!(quantity_to_order(&item(3.0), &product), 2);
        assert_eq!(quantity_to_order(&item(0.5), &product), 1);
    }

    #[test]
    fn test_unparseable_size_orders_one() {
        let product = Product::new("P-1", "Chicken Thighs", 6.99, "value pack");
        assert_eq!(quantity_to_order(&item(5.0), &product), 1);
    }

    #[test]
    fn test_price_cart_item() {
        let product = Product::new("P-1", "Chicken Thighs", 6.99, "2 lb");
        let cart_item = price_cart_item(&item(3.0), product);

        assert_eq!(cart_item.quantity_to_order, 2);
        assert_eq!(cart_item.estimated_cost, 13.98);
    }
}
