use larder_shared::{BrandPreference, BrandPreferenceType, Product};

fn brands_of(prefs: &[BrandPreference], kind: BrandPreferenceType) -> Vec<String> {
    prefs
        .iter()
        .filter(|pref| pref.preference_type == kind)
        .map(|pref| pref.brand.to_lowercase())
        .collect()
}

/// Lowercased names of preferred brands
pub fn preferred_brands(prefs: &[BrandPreference]) -> Vec<String> {
    brands_of(prefs, BrandPreferenceType::Preferred)
}

pub fn matches_any_brand(product: &Product, brands: &[String]) -> bool {
    let name = product.name.to_lowercase();
    brands.iter().any(|brand| name.contains(brand.as_str()))
}

/// Drop products whose name contains an avoided brand (case-insensitive)
pub fn filter_avoided_brands(products: &[Product], prefs: &[BrandPreference]) -> Vec<Product> {
    let avoided = brands_of(prefs, BrandPreferenceType::Avoid);
    products
        .iter()
        .filter(|product| !matches_any_brand(product, &avoided))
        .cloned()
        .collect()
}

/// Human-readable rule list for oracle prompts
pub fn format_brand_preferences(prefs: &[BrandPreference]) -> String {
    if prefs.is_empty() {
        return "No brand preferences set.".to_string();
    }

    prefs
        .iter()
        .map(|pref| {
            let action = match pref.preference_type {
                BrandPreferenceType::Preferred => "PREFER",
                BrandPreferenceType::Avoid => "AVOID",
            };
            let scope = match pref.match_type {
                larder_shared::BrandMatchType::Category => "category",
                larder_shared::BrandMatchType::Ingredient => "ingredient",
            };
            format!("- {}: {} (for {}: {})", action, pref.brand, scope, pref.match_target)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
