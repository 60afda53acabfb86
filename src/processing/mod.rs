//! Document pipeline: extraction, chunking, indexing, retrieval, and answering.

mod answer;
pub mod chunking;
pub mod extraction;
mod indexer;
pub mod prompt;
mod retriever;
mod service;
pub mod types;

pub use answer::{AnswerEngine, DEFAULT_MAX_PROMPT_CHARS, DEFAULT_TEMPERATURE};
pub use chunking::TextSplitter;
pub use extraction::{ExtractedText, LopdfParser, PdfParseError, PdfParser, TextExtractor};
pub use indexer::{DEFAULT_EMBEDDING_BATCH_SIZE, IndexBuilder, IndexSummary};
pub use retriever::{DEFAULT_TOP_K, Retriever};
pub use service::{PipelineSettings, ProcessingApi, ProcessingService};
pub use types::{
    Answer, AnswerError, ChunkingError, Document, ErrorKind, ExtractionError, IndexBuildError,
    ProcessingError, RetrievalError, ServiceInitError, UploadOutcome,
};
