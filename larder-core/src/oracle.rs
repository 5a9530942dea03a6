use async_trait::async_trait;

/// A single prompt for the selection oracle
#[derive(Debug, Clone)]
pub struct OracleRequest {
    pub prompt: String,
    pub max_tokens: u32,
}

impl OracleRequest {
    pub fn new(prompt: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("http error: {0}")]
    Http(String),
    #[error("response error: {0}")]
    Response(String),
}

/// Model-backed helper used to disambiguate products.
///
/// Optional everywhere: callers hold `Option<Arc<dyn SelectionOracle>>` and
/// fall back to deterministic heuristics when it is absent or fails.
#[async_trait]
pub trait SelectionOracle: Send + Sync {
    async fn complete(&self, request: OracleRequest) -> Result<String, OracleError>;
}
