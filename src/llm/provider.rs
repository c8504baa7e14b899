use async_trait::async_trait;

use super::types::ChatRequest;
use crate::core::errors::ApiError;

/// Capability interface over an external chat-completion service.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// return the provider name (e.g. "together")
    fn name(&self) -> &str;

    /// chat completion (non-streaming)
    async fn chat(&self, request: ChatRequest) -> Result<String, ApiError>;
}

/// Capability interface over an external text-embedding service.
///
/// `embed` is length- and order-preserving: one vector per input text,
/// in input order.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// return the provider name (e.g. "together")
    fn name(&self) -> &str;

    /// generate embeddings for a batch of texts
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError>;
}
