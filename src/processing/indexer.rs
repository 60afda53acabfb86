//! Embeds chunks and persists them as the one vector index.

use super::types::IndexBuildError;
use crate::{
    embedding::{EmbeddingClient, EmbeddingPurpose},
    index::{IndexEntry, IndexStore, VectorIndex},
};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Default number of chunks sent per embedding request.
pub const DEFAULT_EMBEDDING_BATCH_SIZE: usize = 100;

/// Result of a successful index build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSummary {
    /// Chunks persisted.
    pub chunk_count: usize,
    /// Vector dimension of the index.
    pub dimension: usize,
}

/// Builds a [`VectorIndex`] from chunks and hands it to the [`IndexStore`].
///
/// Every chunk is embedded before anything is written, so a failed build leaves the previously
/// persisted index in place.
pub struct IndexBuilder {
    embedding_client: Arc<dyn EmbeddingClient>,
    store: Arc<dyn IndexStore>,
    index_lock: Arc<RwLock<()>>,
    batch_size: usize,
}

impl IndexBuilder {
    /// Create a builder. `index_lock` must be shared with the [`super::Retriever`] reading the
    /// same store.
    pub fn new(
        embedding_client: Arc<dyn EmbeddingClient>,
        store: Arc<dyn IndexStore>,
        index_lock: Arc<RwLock<()>>,
    ) -> Self {
        Self {
            embedding_client,
            store,
            index_lock,
            batch_size: DEFAULT_EMBEDDING_BATCH_SIZE,
        }
    }

    /// Override the number of chunks per embedding request.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Embed `chunks` and atomically replace the persisted index.
    pub async fn build(&self, chunks: Vec<String>) -> Result<IndexSummary, IndexBuildError> {
        let mut vectors = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.batch_size) {
            let embedded = self
                .embedding_client
                .generate_embeddings(batch.to_vec(), EmbeddingPurpose::Document)
                .await?;
            if embedded.len() != batch.len() {
                return Err(IndexBuildError::EmbeddingCount {
                    expected: batch.len(),
                    actual: embedded.len(),
                });
            }
            vectors.extend(embedded);
        }

        let entries = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexEntry { chunk, vector })
            .collect();
        let index = VectorIndex::build(self.embedding_client.model_id(), entries)?;
        let summary = IndexSummary {
            chunk_count: index.len(),
            dimension: index.header().dimension,
        };

        {
            let _guard = self.index_lock.write().await;
            self.store.save(&index).await?;
        }

        tracing::info!(
            location = %self.store.location(),
            chunks = summary.chunk_count,
            dimension = summary.dimension,
            model = %self.embedding_client.model_id(),
            "Vector index rebuilt"
        );
        Ok(summary)
    }
}
