use async_trait::async_trait;
use chrono::Utc;
use larder_core::{PantryError, PantryReconciler};
use larder_shared::{IngredientCategory, InventoryItem, InventoryStatus, ShoppingListItem};
use sqlx::SqlitePool;
use std::collections::BTreeSet;
use tracing::{debug, info};

use crate::database::parse_timestamp;
use crate::error::StoreError;

const TABLE: &str = "household_inventory";

/// Household inventory backed by SQLite
#[derive(Clone)]
pub struct SqlitePantryRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct InventoryRow {
    ingredient: String,
    display_name: String,
    category: Option<String>,
    status: String,
    default_quantity: Option<f64>,
    default_unit: Option<String>,
    default_search_term: Option<String>,
    last_restocked: Option<String>,
}

impl TryFrom<InventoryRow> for InventoryItem {
    type Error = StoreError;

    fn try_from(row: InventoryRow) -> Result<Self, Self::Error> {
        let status = InventoryStatus::parse(&row.status).ok_or_else(|| StoreError::CorruptRow {
            table: TABLE,
            reason: format!("unknown status '{}'", row.status),
        })?;
        let last_restocked = row
            .last_restocked
            .as_deref()
            .map(|raw| parse_timestamp(TABLE, raw))
            .transpose()?;

        Ok(InventoryItem {
            ingredient: row.ingredient,
            display_name: row.display_name,
            category: row.category.as_deref().and_then(IngredientCategory::parse),
            status,
            default_quantity: row.default_quantity,
            default_unit: row.default_unit,
            default_search_term: row.default_search_term,
            last_restocked,
        })
    }
}

const SELECT_COLUMNS: &str = "SELECT ingredient, display_name, category, status, default_quantity, \
     default_unit, default_search_term, last_restocked FROM household_inventory";

impl SqlitePantryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert an item, or replace the stored one with the same ingredient
    pub async fn add_item(&self, item: &InventoryItem) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO household_inventory
                (ingredient, display_name, category, status, default_quantity,
                 default_unit, default_search_term, last_restocked, last_status_change)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (ingredient) DO UPDATE SET
                display_name = excluded.display_name,
                category = excluded.category,
                status = excluded.status,
                default_quantity = excluded.default_quantity,
                default_unit = excluded.default_unit,
                default_search_term = excluded.default_search_term,
                last_status_change = excluded.last_status_change
            "#,
        )
        .bind(&item.ingredient)
        .bind(&item.display_name)
        .bind(item.category.map(|c| c.as_str()))
        .bind(item.status.as_str())
        .bind(item.default_quantity)
        .bind(&item.default_unit)
        .bind(&item.default_search_term)
        .bind(item.last_restocked.map(|ts| ts.to_rfc3339()))
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_item(&self, ingredient: &str) -> Result<Option<InventoryItem>, StoreError> {
        let row: Option<InventoryRow> =
            sqlx::query_as(&format!("{} WHERE LOWER(ingredient) = ?", SELECT_COLUMNS))
                .bind(ingredient.trim().to_lowercase())
                .fetch_optional(&self.pool)
                .await?;

        row.map(InventoryItem::try_from).transpose()
    }

    pub async fn inventory(&self) -> Result<Vec<InventoryItem>, StoreError> {
        let rows: Vec<InventoryRow> =
            sqlx::query_as(&format!("{} ORDER BY ingredient", SELECT_COLUMNS))
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(InventoryItem::try_from).collect()
    }

    /// Returns false when no such ingredient is tracked
    pub async fn set_status(
        &self,
        ingredient: &str,
        status: InventoryStatus,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE household_inventory SET status = ?, last_status_change = ? \
             WHERE LOWER(ingredient) = ?",
        )
        .bind(status.as_str())
        .bind(Utc::now().to_rfc3339())
        .bind(ingredient.trim().to_lowercase())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn remove_item(&self, ingredient: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM household_inventory WHERE LOWER(ingredient) = ?")
            .bind(ingredient.trim().to_lowercase())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Low and out items as restock shopping list entries
    pub async fn restock_queue(&self) -> Result<Vec<ShoppingListItem>, StoreError> {
        let rows: Vec<InventoryRow> = sqlx::query_as(&format!(
            "{} WHERE status IN ('low', 'out') ORDER BY ingredient",
            SELECT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(|row| InventoryItem::try_from(row).map(|item| item.to_restock_item()))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(count = items.len(), "restock queue loaded");
        Ok(items)
    }

    /// Mark every low or out item on hand; returns how many changed
    pub async fn clear_restock_queue(&self) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE household_inventory SET status = 'on_hand', last_status_change = ? \
             WHERE status IN ('low', 'out')",
        )
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        info!(cleared = result.rows_affected(), "restock queue cleared");
        Ok(result.rows_affected())
    }

    async fn mark_on_hand(&self, ingredients: &[String]) -> Result<u32, StoreError> {
        let names: BTreeSet<String> = ingredients
            .iter()
            .map(|name| name.trim().to_lowercase())
            .filter(|name| !name.is_empty())
            .collect();
        if names.is_empty() {
            return Ok(0);
        }

        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;
        let mut updated = 0u64;
        for name in &names {
            let result = sqlx::query(
                "UPDATE household_inventory \
                 SET status = 'on_hand', last_restocked = ?, last_status_change = ? \
                 WHERE LOWER(ingredient) = ?",
            )
            .bind(&now)
            .bind(&now)
            .bind(name)
            .execute(&mut *tx)
            .await?;
            updated += result.rows_affected();
        }
        tx.commit().await?;

        info!(updated, requested = names.len(), "pantry items marked restocked");
        Ok(u32::try_from(updated).unwrap_or(u32::MAX))
    }
}

#[async_trait]
impl PantryReconciler for SqlitePantryRepository {
    async fn mark_restocked(&self, ingredients: &[String]) -> Result<u32, PantryError> {
        self.mark_on_hand(ingredients)
            .await
            .map_err(|e| PantryError::Storage(e.to_string()))
    }
}
