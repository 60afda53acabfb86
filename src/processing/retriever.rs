use super::types::RetrievalError;
use crate::{
    embedding::{EmbeddingClient, EmbeddingPurpose},
    index::{IndexStore, ScoredChunk},
};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Default number of chunks returned per query.
pub const DEFAULT_TOP_K: usize = 4;

/// Loads the persisted index and returns the chunks nearest to a query.
pub struct Retriever {
    embedding_client: Arc<dyn EmbeddingClient>,
    store: Arc<dyn IndexStore>,
    index_lock: Arc<RwLock<()>>,
    top_k: usize,
}

impl Retriever {
    /// Create a retriever returning up to `top_k` chunks (at least one).
    pub fn new(
        embedding_client: Arc<dyn EmbeddingClient>,
        store: Arc<dyn IndexStore>,
        index_lock: Arc<RwLock<()>>,
        top_k: usize,
    ) -> Self {
        Self {
            embedding_client,
            store,
            index_lock,
            top_k: top_k.max(1),
        }
    }

    /// Return the nearest chunks to `query`, nearest first.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<ScoredChunk>, RetrievalError> {
        let index = {
            let _guard = self.index_lock.read().await;
            self.store.load().await?
        };

        let current = self.embedding_client.model_id();
        if index.header().embedding_model != current {
            return Err(RetrievalError::ModelMismatch {
                indexed: index.header().embedding_model.clone(),
                current: current.to_string(),
            });
        }

        let vector = self
            .embedding_client
            .generate_embeddings(vec![query.to_string()], EmbeddingPurpose::Query)
            .await?
            .into_iter()
            .next()
            .ok_or(RetrievalError::EmptyEmbedding)?;

        let hits = index.search(&vector, self.top_k)?;
        tracing::debug!(
            top_k = self.top_k,
            hits = hits.len(),
            indexed_chunks = index.len(),
            positions = ?hits.iter().map(|hit| hit.position).collect::<Vec<_>>(),
            "Retrieved context"
        );
        Ok(hits)
    }
}
