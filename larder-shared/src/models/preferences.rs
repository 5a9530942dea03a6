use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BrandPreferenceType {
    Preferred,
    Avoid,
}

/// Whether a rule targets a whole category or a single ingredient
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BrandMatchType {
    Category,
    Ingredient,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BrandPreference {
    pub match_target: String,
    pub match_type: BrandMatchType,
    pub brand: String,
    pub preference_type: BrandPreferenceType,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PriceSensitivity {
    Budget,
    #[default]
    Moderate,
    Premium,
}

impl PriceSensitivity {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceSensitivity::Budget => "budget",
            PriceSensitivity::Moderate => "moderate",
            PriceSensitivity::Premium => "premium",
        }
    }

    /// Unknown values fall back to moderate
    pub fn parse_or_default(value: &str) -> Self {
        match value {
            "budget" => PriceSensitivity::Budget,
            "premium" => PriceSensitivity::Premium,
            _ => PriceSensitivity::Moderate,
        }
    }
}
