use async_trait::async_trait;
use chrono::Utc;
use larder_core::{CachedMapping, CatalogError, MappingCache};
use larder_shared::Product;
use sqlx::SqlitePool;

use crate::database::parse_timestamp;
use crate::error::StoreError;

/// Search-term to product cache in the `product_mapping` table
#[derive(Clone)]
pub struct SqliteMappingCache {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct MappingRow {
    id: i64,
    search_term: String,
    product_id: String,
    product_name: String,
    price: f64,
    unit_price: Option<f64>,
    size: String,
    in_stock: bool,
    is_pinned: bool,
    times_selected: i64,
    last_used: String,
}

impl TryFrom<MappingRow> for CachedMapping {
    type Error = StoreError;

    fn try_from(row: MappingRow) -> Result<Self, Self::Error> {
        let mut product = Product::new(row.product_id, row.product_name, row.price, row.size);
        product.unit_price = row.unit_price;
        product.in_stock = row.in_stock;

        Ok(CachedMapping {
            mapping_id: row.id,
            last_used: parse_timestamp("product_mapping", &row.last_used)?,
            product,
            search_term: row.search_term,
            is_pinned: row.is_pinned,
            times_selected: row.times_selected,
        })
    }
}

impl SqliteMappingCache {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find(&self, search_term: &str) -> Result<Option<CachedMapping>, StoreError> {
        let row: Option<MappingRow> = sqlx::query_as(
            r#"
            SELECT id, search_term, product_id, product_name, price, unit_price, size,
                   in_stock, is_pinned, times_selected, last_used
            FROM product_mapping
            WHERE search_term = ?
            ORDER BY is_pinned DESC, times_selected DESC, id ASC
            LIMIT 1
            "#,
        )
        .bind(search_term)
        .fetch_optional(&self.pool)
        .await?;

        row.map(CachedMapping::try_from).transpose()
    }

    async fn upsert(
        &self,
        search_term: &str,
        product: &Product,
        pinned: bool,
    ) -> Result<i64, StoreError> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        if pinned {
            sqlx::query("UPDATE product_mapping SET is_pinned = 0 WHERE search_term = ?")
                .bind(search_term)
                .execute(&mut *tx)
                .await?;
        }

        // Re-saving an existing pair counts as another selection
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO product_mapping
                (search_term, product_id, product_name, price, unit_price, size, in_stock,
                 is_pinned, times_selected, last_used)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1, ?)
            ON CONFLICT (search_term, product_id) DO UPDATE SET
                product_name = excluded.product_name,
                price = excluded.price,
                unit_price = excluded.unit_price,
                size = excluded.size,
                in_stock = excluded.in_stock,
                is_pinned = MAX(product_mapping.is_pinned, excluded.is_pinned),
                times_selected = product_mapping.times_selected + 1,
                last_used = excluded.last_used
            RETURNING id
            "#,
        )
        .bind(search_term)
        .bind(&product.product_id)
        .bind(&product.name)
        .bind(product.price)
        .bind(product.unit_price)
        .bind(&product.size)
        .bind(product.in_stock)
        .bind(pinned)
        .bind(&now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(id)
    }

    /// Pin a product for a term; any other pin for the term is cleared
    pub async fn pin(&self, search_term: &str, product: &Product) -> Result<i64, StoreError> {
        self.upsert(search_term, product, true).await
    }

    /// Returns false if the term had no pinned mapping
    pub async fn unpin(&self, search_term: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE product_mapping SET is_pinned = 0 WHERE search_term = ? AND is_pinned = 1",
        )
        .bind(search_term)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove every mapping for a term; returns how many were deleted
    pub async fn delete(&self, search_term: &str) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM product_mapping WHERE search_term = ?")
            .bind(search_term)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn touch(&self, mapping_id: i64) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE product_mapping SET times_selected = times_selected + 1, last_used = ? \
             WHERE id = ?",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(mapping_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn cache_error(e: StoreError) -> CatalogError {
    CatalogError::Cache(e.to_string())
}

#[async_trait]
impl MappingCache for SqliteMappingCache {
    async fn get_mapping(&self, search_term: &str) -> Result<Option<CachedMapping>, CatalogError> {
        self.find(search_term).await.map_err(cache_error)
    }

    async fn save_mapping(&self, search_term: &str, product: &Product) -> Result<i64, CatalogError> {
        self.upsert(search_term, product, false)
            .await
            .map_err(cache_error)
    }

    async fn touch_mapping(&self, mapping_id: i64) -> Result<(), CatalogError> {
        self.touch(mapping_id).await.map_err(cache_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::DbClient;

    async fn cache() -> SqliteMappingCache {
        let db = DbClient::in_memory().await.unwrap();
        db.migrate().await.unwrap();
        SqliteMappingCache::new(db.pool)
    }

    fn milk(id: &str) -> Product {
        Product::new(id, format!("Milk {}", id), 3.49, "1 gal")
    }

    #[tokio::test]
    async fn test_save_and_lookup() {
        let cache = cache().await;
        assert!(cache.get_mapping("milk").await.unwrap().is_none());

        let id = cache.save_mapping("milk", &milk("A")).await.unwrap();
        let mapping = cache.get_mapping("milk").await.unwrap().unwrap();

        assert_eq!(mapping.mapping_id, id);
        assert_eq!(mapping.product.product_id, "A");
        assert_eq!(mapping.product.size, "1 gal");
        assert_eq!(mapping.times_selected, 1);
        assert!(!mapping.is_pinned);
    }

    #[tokio::test]
    async fn test_lookup_keeps_stock_flag_and_unit_price() {
        let cache = cache().await;
        let mut product = milk("A").out_of_stock();
        product.unit_price = Some(0.03);
        cache.save_mapping("milk", &product).await.unwrap();

        let mapping = cache.get_mapping("milk").await.unwrap().unwrap();
        assert!(!mapping.product.in_stock);
        assert_eq!(mapping.product.unit_price, Some(0.03));

        // a later in-stock sighting of the same product overwrites the flag
        cache.save_mapping("milk", &milk("A")).await.unwrap();
        let mapping = cache.get_mapping("milk").await.unwrap().unwrap();
        assert!(mapping.product.in_stock);
        assert_eq!(mapping.product.unit_price, None);
    }

    #[tokio::test]
    async fn test_resave_bumps_selection_count() {
        let cache = cache().await;
        let first = cache.save_mapping("milk", &milk("A")).await.unwrap();
        let second = cache.save_mapping("milk", &milk("A")).await.unwrap();

        assert_eq!(first, second);
        let mapping = cache.get_mapping("milk").await.unwrap().unwrap();
        assert_eq!(mapping.times_selected, 2);
    }

    #[tokio::test]
    async fn test_touch_increments() {
        let cache = cache().await;
        let id = cache.save_mapping("milk", &milk("A")).await.unwrap();
        cache.touch_mapping(id).await.unwrap();

        let mapping = cache.get_mapping("milk").await.unwrap().unwrap();
        assert_eq!(mapping.times_selected, 2);
    }

    #[tokio::test]
    async fn test_pin_wins_over_popularity() {
        let cache = cache().await;
        cache.save_mapping("milk", &milk("A")).await.unwrap();
        cache.save_mapping("milk", &milk("A")).await.unwrap();
        cache.pin("milk", &milk("B")).await.unwrap();

        let mapping = cache.get_mapping("milk").await.unwrap().unwrap();
        assert_eq!(mapping.product.product_id, "B");
        assert!(mapping.is_pinned);

        // pinning another product moves the pin
        cache.pin("milk", &milk("A")).await.unwrap();
        let mapping = cache.get_mapping("milk").await.unwrap().unwrap();
        assert_eq!(mapping.product.product_id, "A");

        assert!(cache.unpin("milk").await.unwrap());
        assert!(!cache.unpin("milk").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_removes_all_for_term() {
        let cache = cache().await;
        cache.save_mapping("milk", &milk("A")).await.unwrap();
        cache.save_mapping("milk", &milk("B")).await.unwrap();
        cache.save_mapping("eggs", &milk("C")).await.unwrap();

        assert_eq!(cache.delete("milk").await.unwrap(), 2);
        assert!(cache.get_mapping("milk").await.unwrap().is_none());
        assert!(cache.get_mapping("eggs").await.unwrap().is_some());
    }
}
