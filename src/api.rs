//! HTTP surface for the document chat service.
//!
//! This module exposes a compact Axum router:
//!
//! - `GET /` – Bundled landing page for uploading files and asking questions.
//! - `POST /upload` – Multipart upload (field `files`, repeatable). Rebuilds the index from the
//!   uploaded documents and returns `{"message": "Files processed successfully."}`.
//! - `POST /summarize` – Summarize the indexed documents, returning `{"summary": ...}`.
//! - `POST /ask` – Answer `{"question": ...}` from the indexed documents, returning
//!   `{"response": ...}`.
//! - `GET /metrics` – Pipeline counters.
//!
//! Failures are returned as `{"error": <kind>, "message": <text>}` with a status derived from
//! the error kind.

use crate::metrics::MetricsSnapshot;
use crate::processing::{Document, ErrorKind, ProcessingApi, ProcessingError};
use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

const INDEX_HTML: &str = include_str!("../static/index.html");
const UPLOAD_FIELD: &str = "files";
const UPLOAD_SUCCESS_MESSAGE: &str = "Files processed successfully.";

/// Build the HTTP router. Request bodies are capped at `max_upload_bytes`.
pub fn create_router<S>(service: Arc<S>, max_upload_bytes: usize) -> Router
where
    S: ProcessingApi + 'static,
{
    Router::new()
        .route("/", get(index_page))
        .route("/upload", post(upload_documents::<S>))
        .route("/summarize", post(summarize::<S>))
        .route("/ask", post(ask::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(service)
}

async fn index_page() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Success response for `POST /upload`.
#[derive(Serialize)]
struct UploadResponse {
    message: &'static str,
}

/// Collect every `files` part in order and rebuild the index from them.
async fn upload_documents<S>(
    State(service): State<Arc<S>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError>
where
    S: ProcessingApi,
{
    let mut multipart = multipart?;
    let mut documents = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            tracing::debug!(field = ?field.name(), "Ignoring unexpected multipart field");
            continue;
        }
        let name = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("upload-{}", documents.len() + 1));
        let bytes = field.bytes().await?;
        documents.push(Document::new(name, bytes.to_vec()));
    }

    let outcome = service.upload(documents).await?;
    tracing::info!(
        documents = outcome.documents_indexed,
        chunks = outcome.chunk_count,
        skipped = outcome.skipped_documents.len(),
        "Upload request completed"
    );
    Ok(Json(UploadResponse {
        message: UPLOAD_SUCCESS_MESSAGE,
    }))
}

/// Response body for `POST /summarize`.
#[derive(Serialize)]
struct SummaryResponse {
    summary: String,
}

async fn summarize<S>(State(service): State<Arc<S>>) -> Result<Json<SummaryResponse>, AppError>
where
    S: ProcessingApi,
{
    let answer = service.summarize().await?;
    Ok(Json(SummaryResponse {
        summary: answer.text,
    }))
}

/// Request body for `POST /ask`.
#[derive(Deserialize)]
struct AskRequest {
    #[serde(default)]
    question: Option<String>,
}

/// Response body for `POST /ask`.
#[derive(Serialize)]
struct AskResponse {
    response: String,
}

/// A missing body or question is passed through as blank so the service rejects it uniformly.
async fn ask<S>(
    State(service): State<Arc<S>>,
    request: Option<Json<AskRequest>>,
) -> Result<Json<AskResponse>, AppError>
where
    S: ProcessingApi,
{
    let question = request
        .and_then(|Json(request)| request.question)
        .unwrap_or_default();
    let answer = service.ask(&question).await?;
    Ok(Json(AskResponse {
        response: answer.text,
    }))
}

async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: ProcessingApi,
{
    Json(service.metrics_snapshot())
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::IndexNotFound => StatusCode::NOT_FOUND,
        ErrorKind::ContextTooLarge | ErrorKind::ExtractionFailure => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ErrorKind::EmbeddingFailure | ErrorKind::GenerationFailure => StatusCode::BAD_GATEWAY,
        ErrorKind::IndexCorrupt | ErrorKind::PersistenceFailure => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

enum AppError {
    Processing(ProcessingError),
    Multipart(MultipartError),
    MultipartRejection(MultipartRejection),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            Self::Processing(error) => {
                let kind = error.kind();
                (status_for(kind), kind, error.to_string())
            }
            Self::Multipart(error) => (error.status(), ErrorKind::InvalidInput, error.body_text()),
            Self::MultipartRejection(rejection) => (
                rejection.status(),
                ErrorKind::InvalidInput,
                rejection.body_text(),
            ),
        };
        (status, Json(json!({ "error": kind, "message": message }))).into_response()
    }
}

impl From<ProcessingError> for AppError {
    fn from(inner: ProcessingError) -> Self {
        Self::Processing(inner)
    }
}

impl From<MultipartError> for AppError {
    fn from(inner: MultipartError) -> Self {
        Self::Multipart(inner)
    }
}

impl From<MultipartRejection> for AppError {
    fn from(inner: MultipartRejection) -> Self {
        Self::MultipartRejection(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::{create_router, status_for};
    use crate::index::IndexStoreError;
    use crate::metrics::MetricsSnapshot;
    use crate::processing::{
        Answer, AnswerError, Document, ErrorKind, ProcessingApi, ProcessingError, RetrievalError,
        UploadOutcome,
    };
    use async_trait::async_trait;
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
    };
    use serde_json::json;
    use std::sync::Arc;
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    const BOUNDARY: &str = "pdfchat-test-boundary";

    #[derive(Default)]
    struct StubProcessingService {
        uploads: Mutex<Vec<Vec<Document>>>,
        questions: Mutex<Vec<String>>,
        index_missing: bool,
    }

    #[async_trait]
    impl ProcessingApi for StubProcessingService {
        async fn upload(
            &self,
            documents: Vec<Document>,
        ) -> Result<UploadOutcome, ProcessingError> {
            let count = documents.len();
            self.uploads.lock().await.push(documents);
            if count == 0 {
                return Err(ProcessingError::InvalidInput("no files uploaded".into()));
            }
            Ok(UploadOutcome {
                documents_indexed: count,
                skipped_documents: Vec::new(),
                chunk_count: count * 2,
            })
        }

        async fn summarize(&self) -> Result<Answer, ProcessingError> {
            if self.index_missing {
                return Err(RetrievalError::Store(IndexStoreError::NotFound {
                    location: "memory".into(),
                })
                .into());
            }
            Ok(Answer {
                text: "A short summary.".into(),
                context_chunks: 4,
            })
        }

        async fn ask(&self, question: &str) -> Result<Answer, ProcessingError> {
            self.questions.lock().await.push(question.to_string());
            if question.trim().is_empty() {
                return Err(ProcessingError::InvalidInput(
                    "question must not be empty".into(),
                ));
            }
            Ok(Answer {
                text: format!("Answer to: {question}"),
                context_chunks: 1,
            })
        }

        fn metrics_snapshot(&self) -> MetricsSnapshot {
            MetricsSnapshot {
                uploads_completed: 3,
                questions_answered: 7,
                ..MetricsSnapshot::default()
            }
        }
    }

    fn router(service: Arc<StubProcessingService>) -> Router {
        create_router(service, 1024 * 1024)
    }

    fn multipart_body(parts: &[(&str, &str, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (field, file_name, bytes) in parts {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; \
filename=\"{file_name}\"\r\nContent-Type: application/pdf\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload_request(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/upload")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("request")
    }

    fn ask_request(body: Option<serde_json::Value>) -> Request<Body> {
        let builder = Request::builder().method(Method::POST).uri("/ask");
        match body {
            Some(value) => builder
                .header("content-type", "application/json")
                .body(Body::from(value.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request")
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&body).expect("json body")
    }

    #[tokio::test]
    async fn landing_page_is_served() {
        let response = router(Arc::default())
            .oneshot(Request::get("/").body(Body::empty()).expect("request"))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers()["content-type"].to_str().expect("header");
        assert!(content_type.starts_with("text/html"));
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        assert!(String::from_utf8_lossy(&body).contains("/upload"));
    }

    #[tokio::test]
    async fn upload_collects_files_in_order() {
        let service = Arc::new(StubProcessingService::default());
        let body = multipart_body(&[
            ("files", "first.pdf", b"%PDF-1 first".as_slice()),
            ("notes", "ignored.txt", b"ignored".as_slice()),
            ("files", "second.pdf", b"%PDF-1 second".as_slice()),
        ]);

        let response = router(service.clone())
            .oneshot(upload_request(body))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json, json!({ "message": "Files processed successfully." }));

        let uploads = service.uploads.lock().await;
        assert_eq!(uploads.len(), 1);
        let names: Vec<_> = uploads[0].iter().map(|doc| doc.name.as_str()).collect();
        assert_eq!(names, vec!["first.pdf", "second.pdf"]);
        assert_eq!(uploads[0][1].bytes, b"%PDF-1 second");
    }

    #[tokio::test]
    async fn upload_without_files_is_bad_request() {
        let response = router(Arc::default())
            .oneshot(upload_request(multipart_body(&[])))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await;
        assert_eq!(json["error"], "invalid_input");
    }

    #[tokio::test]
    async fn non_multipart_upload_gets_structured_error() {
        let service = Arc::new(StubProcessingService::default());
        let response = router(service.clone())
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/upload")
                    .header("content-type", "application/json")
                    .body(Body::from("{}"))
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert!(response.status().is_client_error());
        let json = json_body(response).await;
        assert_eq!(json["error"], "invalid_input");
        assert!(json["message"].as_str().is_some_and(|m| !m.is_empty()));
        assert!(service.uploads.lock().await.is_empty());
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected_before_processing() {
        let service = Arc::new(StubProcessingService::default());
        let payload = vec![b'x'; 4096];
        let body = multipart_body(&[("files", "big.pdf", payload.as_slice())]);

        let response = create_router(service.clone(), 512)
            .oneshot(upload_request(body))
            .await
            .expect("router response");

        assert!(response.status().is_client_error());
        assert!(service.uploads.lock().await.is_empty());
    }

    #[tokio::test]
    async fn ask_returns_model_response() {
        let service = Arc::new(StubProcessingService::default());
        let response = router(service.clone())
            .oneshot(ask_request(Some(json!({ "question": "What is Rust?" }))))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["response"], "Answer to: What is Rust?");
        assert_eq!(*service.questions.lock().await, vec!["What is Rust?"]);
    }

    #[tokio::test]
    async fn ask_without_question_is_invalid_input() {
        for body in [None, Some(json!({})), Some(json!({ "question": "  " }))] {
            let response = router(Arc::default())
                .oneshot(ask_request(body))
                .await
                .expect("router response");

            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let json = json_body(response).await;
            assert_eq!(json["error"], "invalid_input");
            assert!(json["message"].as_str().is_some());
        }
    }

    #[tokio::test]
    async fn summarize_returns_summary() {
        let response = router(Arc::default())
            .oneshot(
                Request::post("/summarize")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["summary"], "A short summary.");
    }

    #[tokio::test]
    async fn summarize_without_index_is_not_found() {
        let service = Arc::new(StubProcessingService {
            index_missing: true,
            ..Default::default()
        });
        let response = router(service)
            .oneshot(
                Request::post("/summarize")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["error"], "index_not_found");
    }

    #[tokio::test]
    async fn metrics_expose_snapshot() {
        let response = router(Arc::default())
            .oneshot(Request::get("/metrics").body(Body::empty()).expect("request"))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["uploads_completed"], 3);
        assert_eq!(json["questions_answered"], 7);
        assert_eq!(json["failed_requests"], 0);
    }

    #[test]
    fn error_kinds_map_to_statuses() {
        let cases = [
            (ErrorKind::InvalidInput, StatusCode::BAD_REQUEST),
            (ErrorKind::IndexNotFound, StatusCode::NOT_FOUND),
            (ErrorKind::ContextTooLarge, StatusCode::UNPROCESSABLE_ENTITY),
            (ErrorKind::ExtractionFailure, StatusCode::UNPROCESSABLE_ENTITY),
            (ErrorKind::EmbeddingFailure, StatusCode::BAD_GATEWAY),
            (ErrorKind::GenerationFailure, StatusCode::BAD_GATEWAY),
            (ErrorKind::IndexCorrupt, StatusCode::INTERNAL_SERVER_ERROR),
            (ErrorKind::PersistenceFailure, StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (kind, status) in cases {
            assert_eq!(status_for(kind), status, "{kind:?}");
        }

        let too_large = ProcessingError::from(AnswerError::ContextTooLarge {
            actual: 2,
            limit: 1,
        });
        assert_eq!(status_for(too_large.kind()), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
