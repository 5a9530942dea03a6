use async_trait::async_trait;
use larder_shared::OrderPayload;
use serde_json::Value;

#[derive(Debug, Clone, thiserror::Error)]
pub enum RetailerError {
    #[error("Retailer authentication failed: {0}")]
    Authentication(String),

    #[error("Retailer API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Retailer request failed: {0}")]
    Transport(String),

    #[error("Unreadable retailer response: {0}")]
    InvalidResponse(String),

    #[error("Retailer client is closed")]
    Closed,
}

/// Narrow view of the retailer's network API.
///
/// Responses are returned as loosely-typed JSON; interpreting them is the
/// caller's job so that parsing stays testable without a network.
#[async_trait]
pub trait RetailerClient: Send + Sync {
    /// Store the client is bound to
    fn store_id(&self) -> &str;

    /// Whether a usable (non-expired) session exists
    async fn is_authenticated(&self) -> bool;

    /// Run the full login flow, replacing any existing session
    async fn authenticate(&self) -> Result<(), RetailerError>;

    /// Raw product search for `query`, at most `rows` entries
    async fn search(&self, query: &str, rows: u32) -> Result<Value, RetailerError>;

    /// Raw fulfillment options for the configured store
    async fn fulfillment_options(&self) -> Result<Value, RetailerError>;

    /// Post an order to the order-creation endpoint
    async fn submit_order(&self, payload: &OrderPayload) -> Result<Value, RetailerError>;

    /// Release the underlying connection. Safe to call more than once.
    async fn close(&self);
}
