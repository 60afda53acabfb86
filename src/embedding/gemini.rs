//! Gemini embedding adapter speaking the `embedContent` / `batchEmbedContents` REST API.

use super::{EmbeddingClient, EmbeddingClientError, EmbeddingPurpose, map_transport_error};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;

/// Largest batch accepted by `batchEmbedContents`.
const MAX_BATCH: usize = 100;

/// Embedding client for the hosted Gemini API.
pub struct GeminiEmbeddingClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

impl GeminiEmbeddingClient {
    /// Construct a client for `model` (with or without the `models/` prefix).
    ///
    /// The model is stored in its `models/`-qualified form, which is also the [`model_id`].
    ///
    /// [`model_id`]: EmbeddingClient::model_id
    pub fn new(
        base_url: String,
        api_key: String,
        model: String,
        timeout: Duration,
    ) -> Result<Self, EmbeddingClientError> {
        let http = Client::builder()
            .user_agent("pdfchat/embedding")
            .timeout(timeout)
            .build()
            .map_err(|error| EmbeddingClientError::ProviderUnavailable(error.to_string()))?;
        let model = if model.starts_with("models/") {
            model
        } else {
            format!("models/{model}")
        };
        Ok(Self {
            http,
            base_url,
            api_key,
            model,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}:batchEmbedContents",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    fn request_body(&self, texts: &[String], purpose: EmbeddingPurpose) -> Value {
        let model = self.model.as_str();
        let task_type = match purpose {
            EmbeddingPurpose::Document => "RETRIEVAL_DOCUMENT",
            EmbeddingPurpose::Query => "RETRIEVAL_QUERY",
        };
        let requests: Vec<Value> = texts
            .iter()
            .map(|text| {
                json!({
                    "model": model,
                    "content": { "parts": [{ "text": text }] },
                    "taskType": task_type,
                })
            })
            .collect();
        json!({ "requests": requests })
    }

    async fn embed_batch(
        &self,
        texts: &[String],
        purpose: EmbeddingPurpose,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&self.request_body(texts, purpose))
            .send()
            .await
            .map_err(|error| map_transport_error("Gemini", error))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, "Gemini embedding request failed");
            return Err(EmbeddingClientError::GenerationFailed(format!(
                "Gemini returned {status}: {body}"
            )));
        }

        let body: BatchEmbedResponse = response.json().await.map_err(|error| {
            EmbeddingClientError::InvalidResponse(format!(
                "failed to decode Gemini response: {error}"
            ))
        })?;

        if body.embeddings.len() != texts.len() {
            return Err(EmbeddingClientError::InvalidResponse(format!(
                "expected {} embeddings, received {}",
                texts.len(),
                body.embeddings.len()
            )));
        }

        Ok(body
            .embeddings
            .into_iter()
            .map(|embedding| embedding.values)
            .collect())
    }
}

#[async_trait]
impl EmbeddingClient for GeminiEmbeddingClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
        purpose: EmbeddingPurpose,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        tracing::debug!(
            model = %self.model,
            texts = texts.len(),
            ?purpose,
            "Requesting Gemini embeddings"
        );

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(MAX_BATCH) {
            vectors.extend(self.embed_batch(batch, purpose).await?);
        }
        Ok(vectors)
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}
