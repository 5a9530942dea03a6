use async_trait::async_trait;
use larder_core::{OracleError, OracleRequest, SelectionOracle};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::app_config::OracleConfig;
use crate::error::StoreError;

const API_VERSION: &str = "2023-06-01";

/// Selection oracle backed by a messages-style LLM endpoint
pub struct HttpOracle {
    client: reqwest::Client,
    config: OracleConfig,
}

impl HttpOracle {
    pub fn new(config: OracleConfig, timeout_secs: u64) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// First text block of a messages response
fn first_text(response: MessagesResponse) -> Result<String, OracleError> {
    response
        .content
        .into_iter()
        .find(|block| block.kind == "text")
        .and_then(|block| block.text)
        .ok_or_else(|| OracleError::Response("response has no text content".to_string()))
}

#[async_trait]
impl SelectionOracle for HttpOracle {
    async fn complete(&self, request: OracleRequest) -> Result<String, OracleError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("anthropic-version", HeaderValue::from_static(API_VERSION));
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(&self.config.api_key).map_err(|e| OracleError::Http(e.to_string()))?,
        );

        // config.max_tokens caps every call
        let body = MessagesRequest {
            model: &self.config.model,
            max_tokens: request.max_tokens.min(self.config.max_tokens).max(1),
            messages: vec![Message {
                role: "user",
                content: &request.prompt,
            }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(|e| OracleError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(OracleError::Response(format!("HTTP {}: {}", status, text)));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| OracleError::Response(e.to_string()))?;
        first_text(parsed)
    }
}
