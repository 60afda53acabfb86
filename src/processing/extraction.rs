//! PDF text extraction for an upload batch.
//!
//! Pages are read in order and their text is concatenated without separators, document after
//! document. Whether one unparsable document aborts the batch is decided by
//! [`ExtractionFailurePolicy`].

use super::types::{Document, ExtractionError};
use crate::config::ExtractionFailurePolicy;
use std::sync::Arc;
use thiserror::Error;

/// Parser diagnostic for a single document.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct PdfParseError(pub String);

/// Byte-level PDF parsing boundary.
pub trait PdfParser: Send + Sync {
    /// Return the text of every page, in page order. Pages without text yield `""`.
    fn page_texts(&self, bytes: &[u8]) -> Result<Vec<String>, PdfParseError>;
}

/// [`PdfParser`] backed by `lopdf`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfParser;

impl PdfParser for LopdfParser {
    fn page_texts(&self, bytes: &[u8]) -> Result<Vec<String>, PdfParseError> {
        let document = lopdf::Document::load_mem(bytes)
            .map_err(|error| PdfParseError(format!("failed to load PDF: {error}")))?;

        document
            .get_pages()
            .keys()
            .map(|&page_number| {
                document.extract_text(&[page_number]).map_err(|error| {
                    PdfParseError(format!("failed to extract page {page_number}: {error}"))
                })
            })
            .collect()
    }
}

/// Text extracted from one upload batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedText {
    /// Concatenated page text across all parsed documents.
    pub text: String,
    /// Number of documents parsed.
    pub documents_read: usize,
    /// Number of pages read across parsed documents.
    pub pages_read: usize,
    /// Names of documents skipped under [`ExtractionFailurePolicy::Skip`].
    pub skipped: Vec<String>,
}

/// Turns a batch of uploaded documents into a single text blob.
#[derive(Clone)]
pub struct TextExtractor {
    parser: Arc<dyn PdfParser>,
    policy: ExtractionFailurePolicy,
}

impl TextExtractor {
    /// Create an extractor using `parser` and the given failure policy.
    pub fn new(parser: Arc<dyn PdfParser>, policy: ExtractionFailurePolicy) -> Self {
        Self { parser, policy }
    }

    /// Extract all documents in order on the calling thread.
    pub fn extract(&self, documents: &[Document]) -> Result<ExtractedText, ExtractionError> {
        let mut extracted = ExtractedText::default();

        for document in documents {
            match self.parser.page_texts(&document.bytes) {
                Ok(pages) => {
                    tracing::debug!(
                        document = %document.name,
                        pages = pages.len(),
                        "Extracted document text"
                    );
                    extracted.pages_read += pages.len();
                    extracted.documents_read += 1;
                    for page in pages {
                        extracted.text.push_str(&page);
                    }
                }
                Err(error) => match self.policy {
                    ExtractionFailurePolicy::Abort => {
                        return Err(ExtractionError::Unparsable {
                            document: document.name.clone(),
                            reason: error.0,
                        });
                    }
                    ExtractionFailurePolicy::Skip => {
                        tracing::warn!(
                            document = %document.name,
                            error = %error,
                            "Skipping unparsable document"
                        );
                        extracted.skipped.push(document.name.clone());
                    }
                },
            }
        }

        Ok(extracted)
    }

    /// Extract on the blocking thread pool; PDF parsing is CPU-bound.
    pub async fn extract_blocking(
        &self,
        documents: Vec<Document>,
    ) -> Result<ExtractedText, ExtractionError> {
        let extractor = self.clone();
        tokio::task::spawn_blocking(move || extractor.extract(&documents))
            .await
            .map_err(|error| ExtractionError::Task(error.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{Object, Stream, dictionary};

    /// Treats bytes as UTF-8 with form feeds between pages; `%CORRUPT` marks a broken file.
    struct PlainTextParser;

    impl PdfParser for PlainTextParser {
        fn page_texts(&self, bytes: &[u8]) -> Result<Vec<String>, PdfParseError> {
            let text = std::str::from_utf8(bytes).map_err(|e| PdfParseError(e.to_string()))?;
            if text.starts_with("%CORRUPT") {
                return Err(PdfParseError("bad xref".into()));
            }
            Ok(text.split('\u{c}').map(str::to_string).collect())
        }
    }

    fn extractor(policy: ExtractionFailurePolicy) -> TextExtractor {
        TextExtractor::new(Arc::new(PlainTextParser), policy)
    }

    fn single_page_pdf(text: &str) -> Vec<u8> {
        let mut doc = lopdf::Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode content"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("save pdf");
        bytes
    }

    #[test]
    fn concatenates_pages_and_documents_in_order() {
        let documents = vec![
            Document::new("a.pdf", "page one \u{c}page two "),
            Document::new("b.pdf", "second doc"),
        ];
        let extracted = extractor(ExtractionFailurePolicy::Abort)
            .extract(&documents)
            .expect("extract");

        assert_eq!(extracted.text, "page one page two second doc");
        assert_eq!(extracted.documents_read, 2);
        assert_eq!(extracted.pages_read, 3);
        assert!(extracted.skipped.is_empty());
    }

    #[test]
    fn empty_pages_contribute_nothing() {
        let documents = vec![Document::new("a.pdf", "\u{c}\u{c}text")];
        let extracted = extractor(ExtractionFailurePolicy::Abort)
            .extract(&documents)
            .expect("extract");
        assert_eq!(extracted.text, "text");
        assert_eq!(extracted.pages_read, 3);
    }

    #[test]
    fn abort_policy_fails_the_batch_naming_the_document() {
        let documents = vec![
            Document::new("good.pdf", "fine"),
            Document::new("broken.pdf", "%CORRUPT"),
        ];
        let error = extractor(ExtractionFailurePolicy::Abort)
            .extract(&documents)
            .unwrap_err();
        assert!(
            matches!(error, ExtractionError::Unparsable { ref document, .. } if document == "broken.pdf")
        );
    }

    #[test]
    fn skip_policy_keeps_going() {
        let documents = vec![
            Document::new("broken.pdf", "%CORRUPT"),
            Document::new("good.pdf", "fine"),
        ];
        let extracted = extractor(ExtractionFailurePolicy::Skip)
            .extract(&documents)
            .expect("extract");
        assert_eq!(extracted.text, "fine");
        assert_eq!(extracted.skipped, vec!["broken.pdf".to_string()]);
    }

    #[tokio::test]
    async fn blocking_extraction_matches_inline() {
        let documents = vec![Document::new("a.pdf", "hello")];
        let extracted = extractor(ExtractionFailurePolicy::Abort)
            .extract_blocking(documents)
            .await
            .expect("extract");
        assert_eq!(extracted.text, "hello");
    }

    #[test]
    fn lopdf_parser_reads_generated_pdf() {
        let bytes = single_page_pdf("The capital of France is Paris.");
        let pages = LopdfParser.page_texts(&bytes).expect("parse");
        assert_eq!(pages.len(), 1);
        assert!(pages[0].contains("Paris"), "page text: {:?}", pages[0]);
    }

    #[test]
    fn lopdf_parser_rejects_garbage() {
        assert!(LopdfParser.page_texts(b"definitely not a pdf").is_err());
    }
}
