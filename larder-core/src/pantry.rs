use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum PantryError {
    #[error("Pantry storage error: {0}")]
    Storage(String),
}

/// Post-order inventory update
#[async_trait]
pub trait PantryReconciler: Send + Sync {
    /// Mark the named ingredients back on hand; returns how many were updated
    async fn mark_restocked(&self, ingredients: &[String]) -> Result<u32, PantryError>;
}
