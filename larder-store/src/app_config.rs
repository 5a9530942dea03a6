use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub retailer: RetailerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub search: SearchConfig,
    pub oracle: Option<OracleConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetailerConfig {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub store_id: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_auth_base_url")]
    pub auth_base_url: String,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
    #[serde(default = "default_min_request_interval_ms")]
    pub min_request_interval_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_base_url() -> String { "https://nimbus.safeway.com".into() }
fn default_auth_base_url() -> String { "https://albertsons.okta.com".into() }
fn default_client_id() -> String { "ausp6soxrIyPrm8rS2p6".into() }
fn default_redirect_uri() -> String { "https://www.safeway.com".into() }
fn default_min_request_interval_ms() -> u64 { 500 }
fn default_timeout_secs() -> u64 { 30 }

impl Default for RetailerConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            store_id: String::new(),
            api_base_url: default_api_base_url(),
            auth_base_url: default_auth_base_url(),
            client_id: default_client_id(),
            redirect_uri: default_redirect_uri(),
            min_request_interval_ms: default_min_request_interval_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl RetailerConfig {
    /// Names of required settings that are blank
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("retailer.username", &self.username),
            ("retailer.password", &self.password),
            ("retailer.store_id", &self.store_id),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    pub fn validate(&self) -> Result<(), String> {
        let missing = self.missing_fields();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(format!("missing required settings: {}", missing.join(", ")))
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String { "larder.db".into() }

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: default_db_path() }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_rows")]
    pub rows: u32,
    #[serde(default = "default_cache_max_age_days")]
    pub cache_max_age_days: i64,
}

fn default_rows() -> u32 { 10 }
fn default_cache_max_age_days() -> i64 { 7 }

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            rows: default_rows(),
            cache_max_age_days: default_cache_max_age_days(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OracleConfig {
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_oracle_base_url")]
    pub base_url: String,
}

fn default_model() -> String { "claude-sonnet-4-20250514".into() }
fn default_max_tokens() -> u32 { 1024 }
fn default_oracle_base_url() -> String { "https://api.anthropic.com".into() }

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            // Per-environment overrides, e.g. config/production.toml
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Not checked in; holds credentials
            .add_source(config::File::with_name("config/local").required(false))
            // LARDER__RETAILER__STORE_ID=1234 sets retailer.store_id
            .add_source(config::Environment::with_prefix("LARDER").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
