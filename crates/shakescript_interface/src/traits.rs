//! Trait definitions for the model backend and embeddings.

use async_trait::async_trait;
use shakescript_core::{GenerateRequest, GenerateResponse};
use shakescript_error::ShakescriptResult;

/// Core trait that every language-model backend implements.
///
/// Prompt in, text out. The pipeline treats the backend as unreliable:
/// output may be truncated, unparseable or off-format.
#[async_trait]
pub trait ShakescriptDriver: Send + Sync {
    /// Generate text for a request.
    async fn generate(&self, req: &GenerateRequest) -> ShakescriptResult<GenerateResponse>;

    /// Provider name (e.g., "gemini").
    fn provider_name(&self) -> &'static str;

    /// Model identifier (e.g., "gemini-2.0-flash").
    fn model_name(&self) -> &str;
}

/// Text → vector embeddings for retrieval.
#[async_trait]
pub trait Embeddings: Send + Sync {
    /// One embedding per input, in input order.
    async fn embed(&self, inputs: &[String]) -> ShakescriptResult<Vec<Vec<f32>>>;

    /// Dimensionality of the embedding vectors.
    fn embedding_dimensions(&self) -> usize;
}
