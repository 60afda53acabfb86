//! Embedding client abstraction and provider adapters.
//!
//! Every adapter reports a stable `model_id` so that an index built with one model is never
//! queried with vectors from another.

mod gemini;
pub mod hashed;
mod ollama;

pub use gemini::GeminiEmbeddingClient;
pub use hashed::HashedEmbeddingClient;
pub use ollama::OllamaEmbeddingClient;

use crate::config::{Config, ModelProvider};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingClientError {
    /// Provider could not be reached or timed out.
    #[error("Embedding provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider was unable to produce embeddings for the supplied input.
    #[error("Failed to generate embeddings: {0}")]
    GenerationFailed(String),
    /// Provider response could not be decoded or did not match the request.
    #[error("Malformed embedding response: {0}")]
    InvalidResponse(String),
}

/// How the embedded text will be used. Hosted providers tune vectors per task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmbeddingPurpose {
    /// Text stored in the index.
    Document,
    /// Text used to query the index.
    Query,
}

/// Interface implemented by embedding backends.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Produce one embedding vector per supplied text, in input order.
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
        purpose: EmbeddingPurpose,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError>;

    /// Identifier of the model producing the vectors.
    fn model_id(&self) -> &str;
}

/// Build the embedding client selected by configuration.
pub fn get_embedding_client(
    config: &Config,
) -> Result<Arc<dyn EmbeddingClient>, EmbeddingClientError> {
    let timeout = Duration::from_secs(config.model_request_timeout_secs);
    match config.model_provider {
        ModelProvider::Gemini => {
            let api_key = config.google_api_key.clone().ok_or_else(|| {
                EmbeddingClientError::ProviderUnavailable("GOOGLE_API_KEY is not set".into())
            })?;
            Ok(Arc::new(GeminiEmbeddingClient::new(
                config.gemini_api_base.clone(),
                api_key,
                config.embedding_model.clone(),
                timeout,
            )?))
        }
        ModelProvider::Ollama => Ok(Arc::new(OllamaEmbeddingClient::new(
            config.ollama_url.clone(),
            config.embedding_model.clone(),
            timeout,
        )?)),
    }
}

pub(crate) fn map_transport_error(provider: &str, error: reqwest::Error) -> EmbeddingClientError {
    if error.is_timeout() {
        EmbeddingClientError::ProviderUnavailable(format!("{provider} request timed out: {error}"))
    } else {
        EmbeddingClientError::ProviderUnavailable(format!("failed to reach {provider}: {error}"))
    }
}
