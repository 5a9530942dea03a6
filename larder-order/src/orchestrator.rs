use larder_catalog::{ProductSearchService, ProductSelector, SubstitutionResolver};
use larder_core::{
    CatalogSearch, PantryReconciler, PreferenceStore, RetailerClient, RetailerError,
    SelectionOracle,
};
use larder_shared::{CartSummary, OrderResult, ShoppingListItem};
use larder_store::app_config::Config;
use larder_store::{
    DbClient, HttpOracle, HttpRetailerClient, SqliteMappingCache, SqlitePantryRepository,
    SqlitePreferenceStore, StoreError,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::builder::CartBuilder;
use crate::submitter::OrderSubmitter;

/// Setup failures. Business failures travel inside [`OrderResult`] instead.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Could not sign in to the retailer")]
    Authentication(#[source] RetailerError),

    #[error("Storage error: {0}")]
    Store(String),
}

impl From<StoreError> for PipelineError {
    fn from(e: StoreError) -> Self {
        PipelineError::Store(e.to_string())
    }
}

/// Cart builder and order submitter behind one lazily authenticated client.
///
/// Call [`Pipeline::close`] when done; dropping it still releases the pool.
pub struct Pipeline {
    client: Arc<dyn RetailerClient>,
    builder: CartBuilder,
    submitter: OrderSubmitter,
    auth_gate: Mutex<()>,
    pantry: Option<SqlitePantryRepository>,
    db: Option<DbClient>,
}

impl Pipeline {
    /// Wire the production collaborators from configuration.
    ///
    /// Missing credentials are reported before any file or network access.
    pub async fn bootstrap(config: &Config) -> Result<Self, PipelineError> {
        config
            .retailer
            .validate()
            .map_err(PipelineError::Config)?;

        let client: Arc<dyn RetailerClient> = Arc::new(
            HttpRetailerClient::new(config.retailer.clone())
                .map_err(|e| PipelineError::Config(e.to_string()))?,
        );
        let oracle: Option<Arc<dyn SelectionOracle>> = match &config.oracle {
            Some(oracle_config) => Some(Arc::new(
                HttpOracle::new(oracle_config.clone(), config.retailer.timeout_secs)
                    .map_err(|e| PipelineError::Config(e.to_string()))?,
            )),
            None => None,
        };

        let db = DbClient::connect(&config.database.path).await?;
        db.migrate().await?;

        let cache = Arc::new(SqliteMappingCache::new(db.pool.clone()));
        let search = Arc::new(
            ProductSearchService::new(client.clone(), cache)
                .with_limits(config.search.rows, config.search.cache_max_age_days),
        );
        let preferences = Arc::new(SqlitePreferenceStore::new(db.pool.clone()));
        let pantry = SqlitePantryRepository::new(db.pool.clone());

        let mut pipeline =
            Self::from_parts(client, search, preferences, Arc::new(pantry.clone()), oracle);
        pipeline.pantry = Some(pantry);
        pipeline.db = Some(db);

        info!(
            store_id = %config.retailer.store_id,
            database = %config.database.path,
            oracle = pipeline.has_oracle(),
            "pipeline ready"
        );
        Ok(pipeline)
    }

    /// Assemble a pipeline from already-built collaborators
    pub fn from_parts(
        client: Arc<dyn RetailerClient>,
        search: Arc<dyn CatalogSearch>,
        preferences: Arc<dyn PreferenceStore>,
        pantry: Arc<dyn PantryReconciler>,
        oracle: Option<Arc<dyn SelectionOracle>>,
    ) -> Self {
        let selector = ProductSelector::new(preferences.clone(), oracle.clone());
        let substitution = SubstitutionResolver::new(search.clone(), preferences, oracle);

        Self {
            builder: CartBuilder::new(search, selector, substitution, client.clone()),
            submitter: OrderSubmitter::new(client.clone(), pantry),
            client,
            auth_gate: Mutex::new(()),
            pantry: None,
            db: None,
        }
    }

    pub fn has_oracle(&self) -> bool {
        self.builder.has_oracle()
    }

    /// Build then submit
    pub async fn run(
        &self,
        items: &[ShoppingListItem],
        restock_items: Option<&[ShoppingListItem]>,
    ) -> Result<OrderResult, PipelineError> {
        self.ensure_authenticated().await?;
        let cart = self.builder.build_cart(items, restock_items).await;
        Ok(self.submitter.submit(&cart).await)
    }

    /// Build for review without submitting
    pub async fn build_cart_only(
        &self,
        items: &[ShoppingListItem],
        restock_items: Option<&[ShoppingListItem]>,
    ) -> Result<CartSummary, PipelineError> {
        self.ensure_authenticated().await?;
        Ok(self.builder.build_cart(items, restock_items).await)
    }

    /// Submit a previously built cart as-is
    pub async fn submit_cart(&self, cart: &CartSummary) -> OrderResult {
        self.submitter.submit(cart).await
    }

    /// Low and out-of-stock pantry items, empty without a database
    pub async fn restock_queue(&self) -> Result<Vec<ShoppingListItem>, PipelineError> {
        match &self.pantry {
            Some(pantry) => Ok(pantry.restock_queue().await?),
            None => Ok(Vec::new()),
        }
    }

    /// Release the retailer connection and the database pool
    pub async fn close(self) {
        self.client.close().await;
        if let Some(db) = &self.db {
            db.close().await;
        }
        info!("pipeline closed");
    }

    async fn ensure_authenticated(&self) -> Result<(), PipelineError> {
        let _gate = self.auth_gate.lock().await;
        if self.client.is_authenticated().await {
            return Ok(());
        }
        self.client
            .authenticate()
            .await
            .map_err(PipelineError::Authentication)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use larder_shared::{InventoryItem, InventoryStatus};
    use larder_store::app_config::{OracleConfig, RetailerConfig};

    fn configured(db_name: &str, oracle: Option<OracleConfig>) -> Config {
        let path = std::env::temp_dir().join(format!("{}-{}.db", db_name, std::process::id()));
        let _ = std::fs::remove_file(&path);
        Config {
            retailer: RetailerConfig {
                username: "shopper@example.com".into(),
                password: "hunter2".into(),
                store_id: "1502".into(),
                ..RetailerConfig::default()
            },
            database: larder_store::app_config::DatabaseConfig {
                path: path.to_string_lossy().into_owned(),
            },
            oracle,
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_bootstrap_rejects_missing_credentials() {
        let config = Config {
            retailer: RetailerConfig {
                username: "shopper@example.com".into(),
                ..RetailerConfig::default()
            },
            ..Config::default()
        };

        let err = Pipeline::bootstrap(&config).await.err().unwrap();
        match err {
            PipelineError::Config(message) => {
                assert!(message.contains("retailer.password"));
                assert!(message.contains("retailer.store_id"));
                assert!(!message.contains("retailer.username"));
            }
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_bootstrap_reads_restock_queue_from_database() {
        let config = configured("larder-restock", None);
        let pipeline = Pipeline::bootstrap(&config).await.unwrap();
        assert!(!pipeline.has_oracle());
        assert!(pipeline.restock_queue().await.unwrap().is_empty());

        let db = DbClient::connect(&config.database.path).await.unwrap();
        let pantry = SqlitePantryRepository::new(db.pool.clone());
        let mut butter = InventoryItem::new("butter", "Butter");
        butter.status = InventoryStatus::Low;
        pantry.add_item(&butter).await.unwrap();
        pantry.add_item(&InventoryItem::new("rice", "Rice")).await.unwrap();
        db.close().await;

        let queue = pipeline.restock_queue().await.unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].ingredient, "butter");

        pipeline.close().await;
        let _ = std::fs::remove_file(&config.database.path);
    }

    #[tokio::test]
    async fn test_oracle_presence_follows_config() {
        let oracle = OracleConfig {
            api_key: "test-key".into(),
            model: "test-model".into(),
            max_tokens: 256,
            base_url: "https://llm.example.com".into(),
        };
        let config = configured("larder-oracle", Some(oracle));
        let pipeline = Pipeline::bootstrap(&config).await.unwrap();

        assert!(pipeline.has_oracle());

        pipeline.close().await;
        let _ = std::fs::remove_file(&config.database.path);
    }
}
