use async_trait::async_trait;

use crate::provider::ModelProviderError;

/// A type that turns text into a fixed-length vector.
///
/// All vectors produced by one provider must have the same dimension,
/// since the retrieval engine compares them against each other.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Computes the embedding of `text`.
    async fn embed(
        &self,
        text: &str,
    ) -> Result<Vec<f32>, Box<dyn ModelProviderError>>;
}
