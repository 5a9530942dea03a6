//! Retailer API client: two-step login, bearer-token requests, rate limiting.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use larder_core::{RetailerClient, RetailerError};
use larder_shared::OrderPayload;
use reqwest::{header, Method, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::app_config::RetailerConfig;
use crate::error::StoreError;

const SEARCH_PATH: &str = "/api/v2/grocerystore/search";
const ORDERS_PATH: &str = "/abs/pub/web/orders";

const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;
const MAX_TOKEN_LIFETIME_SECS: i64 = 86_400 * 365;
const TOKEN_REFRESH_BUFFER_SECS: i64 = 300;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenState {
    pub access_token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenState {
    /// Tokens are refreshed five minutes before they expire
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) if !self.access_token.is_empty() => {
                expires_at
                    .checked_sub_signed(ChronoDuration::seconds(TOKEN_REFRESH_BUFFER_SECS))
                    .is_some_and(|refresh_at| now < refresh_at)
            }
            _ => false,
        }
    }
}

pub struct HttpRetailerClient {
    config: RetailerConfig,
    http: RwLock<Option<reqwest::Client>>,
    token: RwLock<TokenState>,
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl HttpRetailerClient {
    pub fn new(config: RetailerConfig) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            // the authorize step answers with a redirect we must read, not follow
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            min_interval: Duration::from_millis(config.min_request_interval_ms),
            config,
            http: RwLock::new(Some(http)),
            token: RwLock::new(TokenState::default()),
            last_request: Mutex::new(None),
        })
    }

    async fn http(&self) -> Result<reqwest::Client, RetailerError> {
        self.http.read().await.clone().ok_or(RetailerError::Closed)
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url.trim_end_matches('/'), path)
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}{}", self.config.auth_base_url.trim_end_matches('/'), path)
    }

    /// Space requests at least `min_request_interval_ms` apart
    async fn rate_limit(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn session_token(&self, http: &reqwest::Client) -> Result<String, RetailerError> {
        self.rate_limit().await;
        let resp = http
            .post(self.auth_url("/api/v1/authn"))
            .header(header::ACCEPT, "application/json")
            .json(&json!({
                "username": self.config.username,
                "password": self.config.password,
            }))
            .send()
            .await
            .map_err(|e| RetailerError::Authentication(format!("authn request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RetailerError::Authentication(format!(
                "authn failed: {}",
                status.as_u16()
            )));
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| RetailerError::Authentication(format!("unreadable authn response: {}", e)))?;
        extract_session_token(&body)
    }

    async fn access_token(
        &self,
        http: &reqwest::Client,
        session_token: &str,
    ) -> Result<TokenState, RetailerError> {
        self.rate_limit().await;
        let path = format!("/oauth2/{}/v1/authorize", self.config.client_id);
        let resp = http
            .get(self.auth_url(&path))
            .query(&[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("response_type", "token"),
                ("scope", "openid profile email"),
                ("sessionToken", session_token),
                ("state", "larder"),
            ])
            .send()
            .await
            .map_err(|e| {
                RetailerError::Authentication(format!("authorize request failed: {}", e))
            })?;

        let location = resp
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        parse_token_from_redirect(location, Utc::now())
    }

    async fn ensure_authenticated(&self) -> Result<(), RetailerError> {
        if self.token.read().await.is_usable(Utc::now()) {
            return Ok(());
        }
        self.authenticate().await
    }

    /// One attempt; `Ok(None)` means the token was rejected
    async fn send_once(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Option<Value>, RetailerError> {
        let http = self.http().await?;
        let bearer = self.token.read().await.access_token.clone();

        self.rate_limit().await;
        let mut request = http
            .request(method, url)
            .bearer_auth(bearer)
            .header(header::ACCEPT, "application/json")
            .query(query);
        if let Some(body) = body {
            request = request.json(body);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| RetailerError::Transport(e.to_string()))?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            return Ok(None);
        }
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(RetailerError::Api {
                status: status.as_u16(),
                message,
            });
        }

        resp.json::<Value>()
            .await
            .map(Some)
            .map_err(|e| RetailerError::InvalidResponse(e.to_string()))
    }

    /// Authenticated request with a single re-login on 401
    async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Value, RetailerError> {
        self.ensure_authenticated().await?;
        let url = self.api_url(path);

        if let Some(value) = self.send_once(method.clone(), &url, query, body).await? {
            return Ok(value);
        }

        warn!(path, "retailer rejected token, re-authenticating");
        self.authenticate().await?;
        self.send_once(method.clone(), &url, query, body)
            .await?
            .ok_or_else(|| RetailerError::Api {
                status: StatusCode::UNAUTHORIZED.as_u16(),
                message: format!("{} {} still unauthorized after re-authentication", method, path),
            })
    }
}

#[async_trait]
impl RetailerClient for HttpRetailerClient {
    fn store_id(&self) -> &str {
        &self.config.store_id
    }

    async fn is_authenticated(&self) -> bool {
        self.http.read().await.is_some() && self.token.read().await.is_usable(Utc::now())
    }

    async fn authenticate(&self) -> Result<(), RetailerError> {
        let http = self.http().await?;
        let session = self.session_token(&http).await?;
        let token = self.access_token(&http, &session).await?;
        *self.token.write().await = token;
        info!("Authenticated with retailer");
        Ok(())
    }

    async fn search(&self, query: &str, rows: u32) -> Result<Value, RetailerError> {
        debug!(query, rows, "retailer search");
        let params = [
            ("q", query.to_string()),
            ("storeId", self.config.store_id.clone()),
            ("rows", rows.to_string()),
        ];
        self.request(Method::GET, SEARCH_PATH, &params, None).await
    }

    async fn fulfillment_options(&self) -> Result<Value, RetailerError> {
        let path = format!("/abs/pub/web/stores/{}/fulfillment", self.config.store_id);
        self.request(Method::GET, &path, &[], None).await
    }

    async fn submit_order(&self, payload: &OrderPayload) -> Result<Value, RetailerError> {
        let body = serde_json::to_value(payload)
            .map_err(|e| RetailerError::Transport(format!("could not encode order: {}", e)))?;
        self.request(Method::POST, ORDERS_PATH, &[], Some(&body)).await
    }

    async fn close(&self) {
        if self.http.write().await.take().is_some() {
            *self.token.write().await = TokenState::default();
            info!("Retailer client closed");
        }
    }
}

/// Session token from the authn response body
pub fn extract_session_token(data: &Value) -> Result<String, RetailerError> {
    match data.get("sessionToken").and_then(Value::as_str) {
        Some(token) if !token.is_empty() => Ok(token.to_string()),
        _ => {
            let status = data
                .get("status")
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            Err(RetailerError::Authentication(format!(
                "no session token in authn response (status={})",
                status
            )))
        }
    }
}

/// Access token from an implicit-grant redirect (`...#access_token=..&expires_in=..`)
pub fn parse_token_from_redirect(
    location: &str,
    now: DateTime<Utc>,
) -> Result<TokenState, RetailerError> {
    let (_, fragment) = location
        .split_once('#')
        .ok_or_else(|| RetailerError::Authentication("no fragment in redirect URL".into()))?;

    let param = |key: &str| {
        fragment
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    };

    let access_token = param("access_token")
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            RetailerError::Authentication("no access_token in redirect fragment".into())
        })?;

    let lifetime = ChronoDuration::try_seconds(parse_expires_in(param("expires_in")))
        .unwrap_or_else(|| ChronoDuration::seconds(DEFAULT_TOKEN_LIFETIME_SECS));
    Ok(TokenState {
        access_token: access_token.to_string(),
        expires_at: now.checked_add_signed(lifetime),
    })
}

/// Token lifetime in seconds, 3600 when absent, malformed or out of range
pub fn parse_expires_in(raw: Option<&str>) -> i64 {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
        .filter(|secs| (0..=MAX_TOKEN_LIFETIME_SECS).contains(secs))
        .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS)
}
