#![deny(missing_docs)]

//! Core library for the PDF chat service: upload documents, then ask questions about them.

/// HTTP routing and REST handlers.
pub mod api;
/// Completion client abstraction and adapters.
pub mod completion;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Vector index and its persistence.
pub mod index;
/// Structured logging and tracing setup.
pub mod logging;
/// Pipeline metrics helpers.
pub mod metrics;
/// Document processing pipeline.
pub mod processing;
