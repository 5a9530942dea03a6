use async_trait::async_trait;
use chrono::{DateTime, Utc};
use larder_shared::Product;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Product search failed for '{term}': {reason}")]
    Search { term: String, reason: String },

    #[error("Product mapping cache error: {0}")]
    Cache(String),
}

/// Catalog lookup used by the cart builder and substitution resolver
#[async_trait]
pub trait CatalogSearch: Send + Sync {
    /// Cached lookup; may return a single remembered product
    async fn search_or_cached(&self, search_term: &str) -> Result<Vec<Product>, CatalogError>;

    /// Always hits the live catalog
    async fn search_products(&self, query: &str) -> Result<Vec<Product>, CatalogError>;
}

/// A remembered search-term to product mapping
#[derive(Debug, Clone, PartialEq)]
pub struct CachedMapping {
    pub mapping_id: i64,
    pub search_term: String,
    pub product: Product,
    pub is_pinned: bool,
    pub times_selected: i64,
    pub last_used: DateTime<Utc>,
}

impl CachedMapping {
    /// Pinned mappings never go stale
    pub fn is_fresh(&self, max_age: chrono::Duration, now: DateTime<Utc>) -> bool {
        self.is_pinned || self.last_used >= now - max_age
    }
}

/// Persistence for search-term to product mappings
#[async_trait]
pub trait MappingCache: Send + Sync {
    /// Best mapping for a term: pinned first, then most selected
    async fn get_mapping(&self, search_term: &str) -> Result<Option<CachedMapping>, CatalogError>;

    /// Insert a mapping or bump an existing one; returns its id
    async fn save_mapping(&self, search_term: &str, product: &Product) -> Result<i64, CatalogError>;

    /// Record a cache hit
    async fn touch_mapping(&self, mapping_id: i64) -> Result<(), CatalogError>;
}
