use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing pipeline activity since startup.
#[derive(Default)]
pub struct PipelineMetrics {
    uploads_completed: AtomicU64,
    documents_extracted: AtomicU64,
    chunks_indexed: AtomicU64,
    questions_answered: AtomicU64,
    summaries_generated: AtomicU64,
    failed_requests: AtomicU64,
}

impl PipelineMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed upload. Counters accumulate across index rebuilds.
    pub fn record_upload(&self, documents: u64, chunks: u64) {
        self.uploads_completed.fetch_add(1, Ordering::Relaxed);
        self.documents_extracted
            .fetch_add(documents, Ordering::Relaxed);
        self.chunks_indexed.fetch_add(chunks, Ordering::Relaxed);
    }

    /// Record an answered question.
    pub fn record_question(&self) {
        self.questions_answered.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a generated summary.
    pub fn record_summary(&self) {
        self.summaries_generated.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a request that ended in an error.
    pub fn record_failure(&self) {
        self.failed_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uploads_completed: self.uploads_completed.load(Ordering::Relaxed),
            documents_extracted: self.documents_extracted.load(Ordering::Relaxed),
            chunks_indexed: self.chunks_indexed.load(Ordering::Relaxed),
            questions_answered: self.questions_answered.load(Ordering::Relaxed),
            summaries_generated: self.summaries_generated.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of pipeline counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Uploads that rebuilt the index successfully.
    pub uploads_completed: u64,
    /// Documents whose text was extracted across all uploads.
    pub documents_extracted: u64,
    /// Chunks embedded and persisted across all uploads.
    pub chunks_indexed: u64,
    /// Questions answered through `ask`.
    pub questions_answered: u64,
    /// Summaries produced through `summarize`.
    pub summaries_generated: u64,
    /// Requests that surfaced an error to the caller.
    pub failed_requests: u64,
}
