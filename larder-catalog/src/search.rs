use async_trait::async_trait;
use chrono::{Duration, Utc};
use larder_core::{CatalogError, CatalogSearch, MappingCache, RetailerClient};
use larder_shared::Product;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

pub const DEFAULT_SEARCH_ROWS: u32 = 10;
pub const DEFAULT_CACHE_MAX_AGE_DAYS: i64 = 7;

/// Catalog search backed by the retailer API with a mapping cache in front
pub struct ProductSearchService {
    client: Arc<dyn RetailerClient>,
    cache: Arc<dyn MappingCache>,
    rows: u32,
    max_age: Duration,
}

impl ProductSearchService {
    pub fn new(client: Arc<dyn RetailerClient>, cache: Arc<dyn MappingCache>) -> Self {
        Self {
            client,
            cache,
            rows: DEFAULT_SEARCH_ROWS,
            max_age: Duration::days(DEFAULT_CACHE_MAX_AGE_DAYS),
        }
    }

    pub fn with_limits(mut self, rows: u32, cache_max_age_days: i64) -> Self {
        self.rows = rows.max(1);
        self.max_age = Duration::days(cache_max_age_days.max(0));
        self
    }
}

#[async_trait]
impl CatalogSearch for ProductSearchService {
    async fn search_or_cached(&self, search_term: &str) -> Result<Vec<Product>, CatalogError> {
        // Cache failures degrade to a live search
        match self.cache.get_mapping(search_term).await {
            Ok(Some(mapping)) if mapping.is_fresh(self.max_age, Utc::now()) => {
                debug!(search_term, product_id = %mapping.product.product_id, "mapping cache hit");
                if let Err(e) = self.cache.touch_mapping(mapping.mapping_id).await {
                    warn!(search_term, error = %e, "failed to record mapping hit");
                }
                return Ok(vec![mapping.product]);
            }
            Ok(_) => {}
            Err(e) => warn!(search_term, error = %e, "mapping cache lookup failed"),
        }

        let products = self.search_products(search_term).await?;
        if let Some(top) = products.first() {
            if let Err(e) = self.cache.save_mapping(search_term, top).await {
                warn!(search_term, error = %e, "failed to save product mapping");
            }
        }
        Ok(products)
    }

    async fn search_products(&self, query: &str) -> Result<Vec<Product>, CatalogError> {
        let data = self
            .client
            .search(query, self.rows)
            .await
            .map_err(|e| CatalogError::Search {
                term: query.to_string(),
                reason: e.to_string(),
            })?;

        let products = parse_search_results(&data);
        debug!(query, count = products.len(), "catalog search");
        Ok(products)
    }
}

/// Parse the `productsInfo` array of a search response.
///
/// Entries missing an id or a name are dropped.
pub fn parse_search_results(data: &Value) -> Vec<Product> {
    data.get("productsInfo")
        .and_then(Value::as_array)
        .map(|entries| entries.iter().filter_map(parse_product_entry).collect())
        .unwrap_or_default()
}

fn parse_product_entry(entry: &Value) -> Option<Product> {
    let product_id = ["upc", "pid"]
        .iter()
        .find_map(|key| entry.get(*key).and_then(non_empty_text))?;
    let name = entry.get("name").and_then(non_empty_text)?;

    let price = ["salePrice", "price", "basePrice"]
        .iter()
        .filter_map(|key| entry.get(*key).and_then(lenient_number))
        .find(|value| *value > 0.0)
        .unwrap_or(0.0);

    let size = entry
        .get("size")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string();

    let mut product = Product::new(product_id, name, price, size);
    product.unit_price = entry.get("unitPrice").and_then(lenient_number);
    product.in_stock = entry.get("inStock") != Some(&Value::Bool(false));
    Some(product)
}

fn non_empty_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn lenient_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use larder_core::{CachedMapping, RetailerError};
    use larder_shared::OrderPayload;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct StubClient {
        response: Value,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RetailerClient for StubClient {
        fn store_id(&self) -> &str {
            "1234"
        }
        async fn is_authenticated(&self) -> bool {
            true
        }
        async fn authenticate(&self) -> Result<(), RetailerError> {
            Ok(())
        }
        async fn search(&self, _query: &str, _rows: u32) -> Result<Value, RetailerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.response.clone())
        }
        async fn fulfillment_options(&self) -> Result<Value, RetailerError> {
            Ok(json!({}))
        }
        async fn submit_order(&self, _payload: &OrderPayload) -> Result<Value, RetailerError> {
            Ok(json!({}))
        }
        async fn close(&self) {}
    }

    #[derive(Default)]
    struct MemoryCache {
        mapping: Mutex<Option<CachedMapping>>,
        saved: Mutex<Vec<(String, String)>>,
        touched: AtomicUsize,
    }

    #[async_trait]
    impl MappingCache for MemoryCache {
        async fn get_mapping(&self, _term: &str) -> Result<Option<CachedMapping>, CatalogError> {
            Ok(self.mapping.lock().unwrap().clone())
        }
        async fn save_mapping(&self, term: &str, product: &Product) -> Result<i64, CatalogError> {
            self.saved
                .lock()
                .unwrap()
                .push((term.to_string(), product.product_id.clone()));
            Ok(1)
        }
        async fn touch_mapping(&self, _id: i64) -> Result<(), CatalogError> {
            self.touched.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn search_response() -> Value {
        json!({
            "productsInfo": [
                {"upc": "0001", "name": "Whole Milk", "salePrice": 0, "price": "3.49", "size": "1 gal", "unitPrice": 0.03},
                {"pid": "0002", "name": "Oat Milk", "basePrice": 4.99, "inStock": false},
                {"name": "No Id Milk", "price": 1.0},
                {"upc": "0003", "name": "  "}
            ]
        })
    }

    fn cached(last_used: DateTime<Utc>, pinned: bool) -> CachedMapping {
        CachedMapping {
            mapping_id: 7,
            search_term: "milk".to_string(),
            product: Product::new("0009", "Cached Milk", 2.99, "1 gal"),
            is_pinned: pinned,
            times_selected: 4,
            last_used,
        }
    }

    fn service(cache: Arc<MemoryCache>) -> (ProductSearchService, Arc<StubClient>) {
        let client = Arc::new(StubClient {
            response: search_response(),
            calls: AtomicUsize::new(0),
        });
        (ProductSearchService::new(client.clone(), cache), client)
    }

    #[test]
    fn test_parse_search_results() {
        let products = parse_search_results(&search_response());

        assert_eq!(products.len(), 2);
        assert_eq!(products[0].product_id, "0001");
        assert_eq!(products[0].price, 3.49);
        assert_eq!(products[0].unit_price, Some(0.03));
        assert!(products[0].in_stock);
        assert_eq!(products[1].product_id, "0002");
        assert_eq!(products[1].price, 4.99);
        assert!(!products[1].in_stock);
    }

    #[test]
    fn test_parse_missing_products_info() {
        assert!(parse_search_results(&json!({"error": "nope"})).is_empty());
    }

    #[tokio::test]
    async fn test_cache_miss_searches_and_saves_top_result() {
        let cache = Arc::new(MemoryCache::default());
        let (service, client) = service(cache.clone());

        let products = service.search_or_cached("milk").await.unwrap();

        assert_eq!(products.len(), 2);
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            cache.saved.lock().unwrap().as_slice(),
            &[("milk".to_string(), "0001".to_string())]
        );
    }

    #[tokio::test]
    async fn test_fresh_mapping_skips_search() {
        let cache = Arc::new(MemoryCache::default());
        *cache.mapping.lock().unwrap() = Some(cached(Utc::now(), false));
        let (service, client) = service(cache.clone());

        let products = service.search_or_cached("milk").await.unwrap();

        assert_eq!(products.len(), 1);
        assert_eq!(products[0].product_id, "0009");
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
        assert_eq!(cache.touched.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stale_mapping_searches_again() {
        let cache = Arc::new(MemoryCache::default());
        *cache.mapping.lock().unwrap() = Some(cached(Utc::now() - Duration::days(30), false));
        let (service, client) = service(cache.clone());

        let products = service.search_or_cached("milk").await.unwrap();

        assert_eq!(products[0].product_id, "0001");
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_pinned_mapping_never_stale() {
        let cache = Arc::new(MemoryCache::default());
        *cache.mapping.lock().unwrap() = Some(cached(Utc::now() - Duration::days(300), true));
        let (service, client) = service(cache);

        let products = service.search_or_cached("milk").await.unwrap();

        assert_eq!(products[0].product_id, "0009");
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }
}
