//! Vector index: (embedding, chunk) pairs with brute-force nearest-neighbour search.

mod store;

pub use store::{FileIndexStore, InMemoryIndexStore, IndexStore, IndexStoreError};

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error;
use time::OffsetDateTime;

/// Errors raised while building or querying an index.
#[derive(Debug, Error, PartialEq)]
pub enum IndexError {
    /// An index needs at least one entry.
    #[error("cannot build an index without entries")]
    Empty,
    /// A vector did not match the index dimension.
    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension recorded for the index.
        expected: usize,
        /// Dimension of the offending vector.
        actual: usize,
    },
    /// Header metadata disagrees with the stored entries.
    #[error("index header records {recorded} chunks but {actual} are stored")]
    ChunkCountMismatch {
        /// Count in the header.
        recorded: usize,
        /// Number of entries present.
        actual: usize,
    },
}

/// Metadata describing how an index was built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexHeader {
    /// Embedding model that produced every vector in the index.
    pub embedding_model: String,
    /// Vector dimension shared by all entries.
    pub dimension: usize,
    /// Number of stored chunks.
    pub chunk_count: usize,
    /// RFC3339 build time.
    pub built_at: String,
}

/// One chunk and its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Chunk text.
    pub chunk: String,
    /// Embedding of `chunk`.
    pub vector: Vec<f32>,
}

/// A search hit, nearest first.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    /// Position of the chunk in the original document order.
    pub position: usize,
    /// Chunk text.
    pub text: String,
    /// Euclidean distance between the query and chunk vectors.
    pub distance: f32,
}

/// In-memory form of the persisted index.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndex {
    header: IndexHeader,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    /// Build an index from entries in chunk order, stamping the current time.
    pub fn build(
        embedding_model: impl Into<String>,
        entries: Vec<IndexEntry>,
    ) -> Result<Self, IndexError> {
        let dimension = entries.first().ok_or(IndexError::Empty)?.vector.len();
        let header = IndexHeader {
            embedding_model: embedding_model.into(),
            dimension,
            chunk_count: entries.len(),
            built_at: current_timestamp_rfc3339(),
        };
        Self::from_parts(header, entries)
    }

    /// Reassemble an index from stored parts, checking that they agree.
    pub fn from_parts(header: IndexHeader, entries: Vec<IndexEntry>) -> Result<Self, IndexError> {
        if entries.is_empty() {
            return Err(IndexError::Empty);
        }
        if header.chunk_count != entries.len() {
            return Err(IndexError::ChunkCountMismatch {
                recorded: header.chunk_count,
                actual: entries.len(),
            });
        }
        if header.dimension == 0 {
            return Err(IndexError::DimensionMismatch {
                expected: 1,
                actual: 0,
            });
        }
        if let Some(entry) = entries
            .iter()
            .find(|entry| entry.vector.len() != header.dimension)
        {
            return Err(IndexError::DimensionMismatch {
                expected: header.dimension,
                actual: entry.vector.len(),
            });
        }
        Ok(Self { header, entries })
    }

    /// Build metadata.
    pub fn header(&self) -> &IndexHeader {
        &self.header
    }

    /// Stored entries in chunk order.
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Number of stored chunks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return the `k` chunks closest to `query` by L2 distance.
    ///
    /// Equal distances keep chunk order, so identical queries yield identical results.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>, IndexError> {
        if query.len() != self.header.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.header.dimension,
                actual: query.len(),
            });
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| (position, l2_distance(&entry.vector, query)))
            .collect();

        scored.sort_by(|left, right| {
            left.1
                .partial_cmp(&right.1)
                .unwrap_or(Ordering::Equal)
                .then(left.0.cmp(&right.0))
        });
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(position, distance)| ScoredChunk {
                position,
                text: self.entries[position].chunk.clone(),
                distance,
            })
            .collect())
    }
}

fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}
