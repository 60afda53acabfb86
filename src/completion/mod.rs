//! Completion-model abstraction used to turn a rendered prompt into an answer.
//!
//! Adapters issue HTTP requests directly to the provider and never retry; every failure is
//! surfaced to the caller.

mod gemini;
mod ollama;

pub use gemini::GeminiCompletionClient;
pub use ollama::OllamaCompletionClient;

use crate::config::{Config, ModelProvider};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced while requesting a completion.
#[derive(Debug, Error)]
pub enum CompletionClientError {
    /// Provider was unreachable or the request timed out.
    #[error("Completion provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response (quota, invalid request, server error).
    #[error("Failed to generate completion: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed or carried no text.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Request payload passed to the completion provider.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Fully rendered prompt text.
    pub prompt: String,
    /// Sampling temperature; low values favour faithful answers.
    pub temperature: f32,
}

/// Interface implemented by completion providers.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Generate text for the supplied prompt.
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionClientError>;
}

/// Build the completion client selected by configuration.
pub fn get_completion_client(
    config: &Config,
) -> Result<Arc<dyn CompletionClient>, CompletionClientError> {
    let timeout = Duration::from_secs(config.model_request_timeout_secs);
    match config.model_provider {
        ModelProvider::Gemini => {
            let api_key = config.google_api_key.clone().ok_or_else(|| {
                CompletionClientError::ProviderUnavailable("GOOGLE_API_KEY is not set".into())
            })?;
            Ok(Arc::new(GeminiCompletionClient::new(
                config.gemini_api_base.clone(),
                api_key,
                config.completion_model.clone(),
                timeout,
            )?))
        }
        ModelProvider::Ollama => Ok(Arc::new(OllamaCompletionClient::new(
            config.ollama_url.clone(),
            config.completion_model.clone(),
            timeout,
        )?)),
    }
}

pub(crate) fn map_transport_error(provider: &str, error: reqwest::Error) -> CompletionClientError {
    if error.is_timeout() {
        CompletionClientError::ProviderUnavailable(format!("{provider} request timed out: {error}"))
    } else {
        CompletionClientError::ProviderUnavailable(format!("failed to reach {provider}: {error}"))
    }
}
