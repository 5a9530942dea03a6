pub mod app_config;
pub mod database;
pub mod error;
pub mod mapping_repo;
pub mod oracle_client;
pub mod pantry_repo;
pub mod preference_repo;
pub mod retailer_client;

pub use database::DbClient;
pub use error::StoreError;
pub use mapping_repo::SqliteMappingCache;
pub use oracle_client::HttpOracle;
pub use pantry_repo::SqlitePantryRepository;
pub use preference_repo::SqlitePreferenceStore;
pub use retailer_client::HttpRetailerClient;
