//! Core data types and error definitions for the processing pipeline.

use crate::{
    completion::CompletionClientError,
    embedding::EmbeddingClientError,
    index::{IndexError, IndexStoreError},
};
use serde::Serialize;
use thiserror::Error;

/// Errors produced while configuring the chunker.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkingError {
    /// The window would be empty or never advance.
    #[error(
        "invalid chunking configuration: size {chunk_size}, overlap {chunk_overlap} (size must be > 0 and > overlap)"
    )]
    InvalidConfiguration {
        /// Requested chunk size.
        chunk_size: usize,
        /// Requested overlap.
        chunk_overlap: usize,
    },
}

/// Errors raised while extracting text from uploaded documents.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// A document could not be parsed as a PDF.
    #[error("failed to parse '{document}': {reason}")]
    Unparsable {
        /// Client-supplied file name.
        document: String,
        /// Parser diagnostic.
        reason: String,
    },
    /// The blocking extraction task did not complete.
    #[error("extraction task failed: {0}")]
    Task(String),
}

/// Errors raised while turning chunks into a persisted index.
#[derive(Debug, Error)]
pub enum IndexBuildError {
    /// Embedding provider failed for at least one chunk.
    #[error(transparent)]
    Embedding(#[from] EmbeddingClientError),
    /// Provider output could not form a consistent index.
    #[error("embedding output rejected: {0}")]
    InvalidEmbeddings(#[from] IndexError),
    /// Provider returned the wrong number of vectors.
    #[error("expected {expected} embeddings, received {actual}")]
    EmbeddingCount {
        /// Number of chunks submitted.
        expected: usize,
        /// Number of vectors returned.
        actual: usize,
    },
    /// The index could not be written.
    #[error(transparent)]
    Store(#[from] IndexStoreError),
}

/// Errors raised while retrieving context for a query.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Loading the index failed.
    #[error(transparent)]
    Store(#[from] IndexStoreError),
    /// The index was built with a different embedding model.
    #[error("index was built with embedding model '{indexed}' but queries use '{current}'")]
    ModelMismatch {
        /// Model recorded in the index header.
        indexed: String,
        /// Model configured now.
        current: String,
    },
    /// Embedding the query failed.
    #[error(transparent)]
    Embedding(#[from] EmbeddingClientError),
    /// Query vector was unusable against the index.
    #[error("query embedding rejected: {0}")]
    Search(#[from] IndexError),
    /// Provider returned no vector for the query.
    #[error("embedding provider returned no vector for the query")]
    EmptyEmbedding,
}

/// Errors raised while producing an answer.
#[derive(Debug, Error)]
pub enum AnswerError {
    /// The rendered prompt exceeds the configured bound.
    #[error("prompt of {actual} characters exceeds the limit of {limit}")]
    ContextTooLarge {
        /// Rendered prompt length in characters.
        actual: usize,
        /// Configured limit.
        limit: usize,
    },
    /// The completion model call failed.
    #[error(transparent)]
    Completion(#[from] CompletionClientError),
}

/// Errors raised while assembling the service at startup.
#[derive(Debug, Error)]
pub enum ServiceInitError {
    /// Chunker settings are inconsistent.
    #[error(transparent)]
    Chunking(#[from] ChunkingError),
    /// Embedding client could not be constructed.
    #[error("embedding client: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Completion client could not be constructed.
    #[error("completion client: {0}")]
    Completion(#[from] CompletionClientError),
}

/// Caller-facing failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing or empty question, no files, or no extractable text.
    InvalidInput,
    /// A document could not be parsed.
    ExtractionFailure,
    /// Embedding provider error or timeout.
    EmbeddingFailure,
    /// Query attempted before any upload.
    IndexNotFound,
    /// Persisted index unreadable or built with another model.
    IndexCorrupt,
    /// Index could not be written.
    PersistenceFailure,
    /// Completion model error or timeout.
    GenerationFailure,
    /// Retrieved context is larger than the prompt bound.
    ContextTooLarge,
}

/// Errors emitted by the document processing pipeline.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// Request was missing required input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Text extraction failed.
    #[error("Failed to extract text: {0}")]
    Extraction(#[from] ExtractionError),
    /// Index build failed; nothing was persisted.
    #[error("Failed to build index: {0}")]
    IndexBuild(#[from] IndexBuildError),
    /// Retrieval failed.
    #[error("Failed to retrieve context: {0}")]
    Retrieval(#[from] RetrievalError),
    /// Answer generation failed.
    #[error("Failed to generate answer: {0}")]
    Answer(#[from] AnswerError),
}

impl ProcessingError {
    /// Classify the error for callers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Extraction(_) => ErrorKind::ExtractionFailure,
            Self::IndexBuild(IndexBuildError::Store(_)) => ErrorKind::PersistenceFailure,
            Self::IndexBuild(_) => ErrorKind::EmbeddingFailure,
            Self::Retrieval(RetrievalError::Store(IndexStoreError::NotFound { .. })) => {
                ErrorKind::IndexNotFound
            }
            Self::Retrieval(
                RetrievalError::Store(_)
                | RetrievalError::ModelMismatch { .. }
                | RetrievalError::Search(_),
            ) => ErrorKind::IndexCorrupt,
            Self::Retrieval(RetrievalError::Embedding(_) | RetrievalError::EmptyEmbedding) => {
                ErrorKind::EmbeddingFailure
            }
            Self::Answer(AnswerError::ContextTooLarge { .. }) => ErrorKind::ContextTooLarge,
            Self::Answer(AnswerError::Completion(_)) => ErrorKind::GenerationFailure,
        }
    }
}

/// Raw bytes of one uploaded file.
#[derive(Debug, Clone)]
pub struct Document {
    /// Client-supplied file name, used in diagnostics.
    pub name: String,
    /// File contents.
    pub bytes: Vec<u8>,
}

impl Document {
    /// Wrap uploaded bytes.
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

/// Summary of a completed upload produced by [`crate::processing::ProcessingService::upload`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    /// Documents whose text made it into the index.
    pub documents_indexed: usize,
    /// Documents skipped because they could not be parsed.
    pub skipped_documents: Vec<String>,
    /// Chunks embedded and persisted.
    pub chunk_count: usize,
}

/// Generated answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    /// Model output, trimmed of surrounding whitespace.
    pub text: String,
    /// Number of retrieved chunks placed in the prompt.
    pub context_chunks: usize,
}
