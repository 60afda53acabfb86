//! Processing service coordinating extraction, indexing, retrieval, and answering.

use crate::{
    completion::{CompletionClient, get_completion_client},
    config::{Config, ExtractionFailurePolicy},
    embedding::{EmbeddingClient, get_embedding_client},
    index::{FileIndexStore, IndexStore},
    metrics::{MetricsSnapshot, PipelineMetrics},
    processing::{
        answer::{AnswerEngine, DEFAULT_MAX_PROMPT_CHARS, DEFAULT_TEMPERATURE},
        chunking::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, TextSplitter},
        extraction::{LopdfParser, PdfParser, TextExtractor},
        indexer::IndexBuilder,
        prompt::{SUMMARY_QUESTION, SUMMARY_RETRIEVAL_QUERY},
        retriever::{DEFAULT_TOP_K, Retriever},
        types::{Answer, Document, ProcessingError, ServiceInitError, UploadOutcome},
    },
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Tunables for the pipeline, normally taken from [`Config`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineSettings {
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Characters shared by consecutive chunks.
    pub chunk_overlap: usize,
    /// Chunks retrieved per question.
    pub top_k: usize,
    /// Completion sampling temperature.
    pub temperature: f32,
    /// Upper bound on the rendered prompt, in characters.
    pub max_prompt_chars: usize,
    /// What to do with a document that fails to parse.
    pub extraction_failure_policy: ExtractionFailurePolicy,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            top_k: DEFAULT_TOP_K,
            temperature: DEFAULT_TEMPERATURE,
            max_prompt_chars: DEFAULT_MAX_PROMPT_CHARS,
            extraction_failure_policy: ExtractionFailurePolicy::default(),
        }
    }
}

impl From<&Config> for PipelineSettings {
    fn from(config: &Config) -> Self {
        Self {
            chunk_size: config.text_splitter_chunk_size,
            chunk_overlap: config.text_splitter_chunk_overlap,
            top_k: config.retrieval_top_k,
            temperature: config.completion_temperature,
            max_prompt_chars: config.max_prompt_chars,
            extraction_failure_policy: config.extraction_failure_policy,
        }
    }
}

/// Coordinates the full pipeline: upload rebuilds the index, ask and summarize read it.
///
/// The service owns long-lived handles to the model clients, the index store, and the metrics
/// registry. Construct it once near process start and share it through an `Arc`.
pub struct ProcessingService {
    extractor: TextExtractor,
    splitter: TextSplitter,
    indexer: IndexBuilder,
    retriever: Retriever,
    answer_engine: AnswerEngine,
    metrics: PipelineMetrics,
}

/// Abstraction over the processing pipeline used by the HTTP surface.
#[async_trait]
pub trait ProcessingApi: Send + Sync {
    /// Extract, chunk, embed, and persist the documents, replacing any prior index.
    async fn upload(&self, documents: Vec<Document>) -> Result<UploadOutcome, ProcessingError>;

    /// Summarize the indexed documents.
    async fn summarize(&self) -> Result<Answer, ProcessingError>;

    /// Answer a question from the indexed documents.
    async fn ask(&self, question: &str) -> Result<Answer, ProcessingError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl ProcessingService {
    /// Assemble a service from explicit components.
    pub fn new(
        parser: Arc<dyn PdfParser>,
        embedding_client: Arc<dyn EmbeddingClient>,
        completion_client: Arc<dyn CompletionClient>,
        store: Arc<dyn IndexStore>,
        settings: PipelineSettings,
    ) -> Result<Self, ServiceInitError> {
        let splitter = TextSplitter::new(settings.chunk_size, settings.chunk_overlap)?;
        let index_lock = Arc::new(RwLock::new(()));

        Ok(Self {
            extractor: TextExtractor::new(parser, settings.extraction_failure_policy),
            splitter,
            indexer: IndexBuilder::new(
                embedding_client.clone(),
                store.clone(),
                index_lock.clone(),
            ),
            retriever: Retriever::new(embedding_client, store, index_lock, settings.top_k),
            answer_engine: AnswerEngine::new(
                completion_client,
                settings.temperature,
                settings.max_prompt_chars,
            ),
            metrics: PipelineMetrics::new(),
        })
    }

    /// Build the production service: lopdf parsing, configured providers, file-backed index.
    pub fn from_config(config: &Config) -> Result<Self, ServiceInitError> {
        tracing::info!(provider = ?config.model_provider, "Initializing model clients");
        let embedding_client = get_embedding_client(config)?;
        let completion_client = get_completion_client(config)?;
        tracing::info!(
            embedding_model = %embedding_client.model_id(),
            completion_model = %config.completion_model,
            index_path = %config.index_path.display(),
            "Model clients initialized"
        );

        Self::new(
            Arc::new(LopdfParser),
            embedding_client,
            completion_client,
            Arc::new(FileIndexStore::new(config.index_path.clone())),
            PipelineSettings::from(config),
        )
    }

    /// Extract, chunk, embed, and persist `documents` as the new index.
    pub async fn upload(&self, documents: Vec<Document>) -> Result<UploadOutcome, ProcessingError> {
        self.run_upload(documents)
            .await
            .inspect_err(|error| self.record_failure("upload", error))
    }

    /// Summarize the indexed documents.
    pub async fn summarize(&self) -> Result<Answer, ProcessingError> {
        let answer = self
            .answer_from_index(SUMMARY_RETRIEVAL_QUERY, SUMMARY_QUESTION)
            .await
            .inspect_err(|error| self.record_failure("summarize", error))?;
        self.metrics.record_summary();
        Ok(answer)
    }

    /// Answer `question`; blank questions are rejected before any model call.
    pub async fn ask(&self, question: &str) -> Result<Answer, ProcessingError> {
        let question = question.trim();
        if question.is_empty() {
            let error = ProcessingError::InvalidInput("question must not be empty".into());
            self.record_failure("ask", &error);
            return Err(error);
        }

        let answer = self
            .answer_from_index(question, question)
            .await
            .inspect_err(|error| self.record_failure("ask", error))?;
        self.metrics.record_question();
        Ok(answer)
    }

    /// Return the current pipeline metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    async fn run_upload(&self, documents: Vec<Document>) -> Result<UploadOutcome, ProcessingError> {
        if documents.is_empty() {
            return Err(ProcessingError::InvalidInput("no files uploaded".into()));
        }
        tracing::info!(documents = documents.len(), "Processing upload");

        let extracted = self.extractor.extract_blocking(documents).await?;
        if extracted.text.trim().is_empty() {
            return Err(ProcessingError::InvalidInput(
                "uploaded documents contain no extractable text".into(),
            ));
        }

        let chunks: Vec<String> = self
            .splitter
            .split(&extracted.text)
            .map(str::to_string)
            .collect();
        tracing::debug!(
            characters = extracted.text.chars().count(),
            pages = extracted.pages_read,
            chunks = chunks.len(),
            chunk_size = self.splitter.chunk_size(),
            chunk_overlap = self.splitter.chunk_overlap(),
            "Split extracted text"
        );

        let summary = self.indexer.build(chunks).await?;
        self.metrics
            .record_upload(extracted.documents_read as u64, summary.chunk_count as u64);
        tracing::info!(
            documents = extracted.documents_read,
            skipped = extracted.skipped.len(),
            chunks = summary.chunk_count,
            "Upload indexed"
        );

        Ok(UploadOutcome {
            documents_indexed: extracted.documents_read,
            skipped_documents: extracted.skipped,
            chunk_count: summary.chunk_count,
        })
    }

    async fn answer_from_index(
        &self,
        retrieval_query: &str,
        question: &str,
    ) -> Result<Answer, ProcessingError> {
        let hits = self.retriever.retrieve(retrieval_query).await?;
        let context: Vec<String> = hits.into_iter().map(|hit| hit.text).collect();
        Ok(self.answer_engine.answer(question, &context).await?)
    }

    fn record_failure(&self, operation: &'static str, error: &ProcessingError) {
        self.metrics.record_failure();
        tracing::warn!(operation, kind = ?error.kind(), error = %error, "Request failed");
    }
}

#[async_trait]
impl ProcessingApi for ProcessingService {
    async fn upload(&self, documents: Vec<Document>) -> Result<UploadOutcome, ProcessingError> {
        ProcessingService::upload(self, documents).await
    }

    async fn summarize(&self) -> Result<Answer, ProcessingError> {
        ProcessingService::summarize(self).await
    }

    async fn ask(&self, question: &str) -> Result<Answer, ProcessingError> {
        ProcessingService::ask(self, question).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        ProcessingService::metrics_snapshot(self)
    }
}
