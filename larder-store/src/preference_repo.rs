use async_trait::async_trait;
use larder_core::{PreferenceError, PreferenceStore};
use larder_shared::{
    BrandMatchType, BrandPreference, BrandPreferenceType, IngredientCategory, PriceSensitivity,
};
use sqlx::SqlitePool;

use crate::error::StoreError;

const PRICE_SENSITIVITY_KEY: &str = "price_sensitivity";

#[derive(Clone)]
pub struct SqlitePreferenceStore {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct BrandRow {
    match_target: String,
    match_type: String,
    brand: String,
    preference_type: String,
    notes: String,
}

impl TryFrom<BrandRow> for BrandPreference {
    type Error = StoreError;

    fn try_from(row: BrandRow) -> Result<Self, Self::Error> {
        let corrupt = |reason: String| StoreError::CorruptRow {
            table: "brand_preferences",
            reason,
        };
        let match_type = match row.match_type.as_str() {
            "category" => BrandMatchType::Category,
            "ingredient" => BrandMatchType::Ingredient,
            other => return Err(corrupt(format!("unknown match_type '{}'", other))),
        };
        let preference_type = match row.preference_type.as_str() {
            "preferred" => BrandPreferenceType::Preferred,
            "avoid" => BrandPreferenceType::Avoid,
            other => return Err(corrupt(format!("unknown preference_type '{}'", other))),
        };

        Ok(BrandPreference {
            match_target: row.match_target,
            match_type,
            brand: row.brand,
            preference_type,
            notes: row.notes,
        })
    }
}

impl SqlitePreferenceStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn add_brand_preference(&self, pref: &BrandPreference) -> Result<i64, StoreError> {
        let match_type = match pref.match_type {
            BrandMatchType::Category => "category",
            BrandMatchType::Ingredient => "ingredient",
        };
        let preference_type = match pref.preference_type {
            BrandPreferenceType::Preferred => "preferred",
            BrandPreferenceType::Avoid => "avoid",
        };

        let result = sqlx::query(
            "INSERT INTO brand_preferences (match_target, match_type, brand, preference_type, notes) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(pref.match_target.trim().to_lowercase())
        .bind(match_type)
        .bind(&pref.brand)
        .bind(preference_type)
        .bind(&pref.notes)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn set_preference(&self, key: &str, value: &str) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO preferences (key, value) VALUES (?, ?) \
             ON CONFLICT (key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn set_price_sensitivity(&self, level: PriceSensitivity) -> Result<(), StoreError> {
        self.set_preference(PRICE_SENSITIVITY_KEY, level.as_str()).await
    }

    pub async fn get_preference(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value: Option<(String,)> = sqlx::query_as("SELECT value FROM preferences WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(value.map(|(v,)| v))
    }

    async fn brands_matching(
        &self,
        match_type: &str,
        target: &str,
    ) -> Result<Vec<BrandPreference>, StoreError> {
        let rows: Vec<BrandRow> = sqlx::query_as(
            "SELECT match_target, match_type, brand, preference_type, notes \
             FROM brand_preferences WHERE match_type = ? AND match_target = ? ORDER BY id",
        )
        .bind(match_type)
        .bind(target.trim().to_lowercase())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(BrandPreference::try_from).collect()
    }

    async fn lookup_brands(
        &self,
        ingredient: &str,
        category: IngredientCategory,
    ) -> Result<Vec<BrandPreference>, StoreError> {
        let specific = self.brands_matching("ingredient", ingredient).await?;
        if !specific.is_empty() {
            return Ok(specific);
        }
        self.brands_matching("category", category.as_str()).await
    }
}

fn storage_error(e: StoreError) -> PreferenceError {
    PreferenceError::Storage(e.to_string())
}

#[async_trait]
impl PreferenceStore for SqlitePreferenceStore {
    async fn brands_for_ingredient(
        &self,
        ingredient: &str,
        category: IngredientCategory,
    ) -> Result<Vec<BrandPreference>, PreferenceError> {
        self.lookup_brands(ingredient, category)
            .await
            .map_err(storage_error)
    }

    async fn price_sensitivity(&self) -> Result<PriceSensitivity, PreferenceError> {
        let raw = self
            .get_preference(PRICE_SENSITIVITY_KEY)
            .await
            .map_err(storage_error)?;
        Ok(raw
            .as_deref()
            .map(PriceSensitivity::parse_or_default)
            .unwrap_or_default())
    }
}
