#![deny(missing_docs)]

//! Core library for the docrubric document evaluation server.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Document model, durable store, and indexed lookup.
pub mod documents;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Asynchronous rubric evaluation pipeline.
pub mod evaluation;
/// Text-generation client used to score documents.
pub mod evaluator;
/// Plain-text extraction from uploaded files.
pub mod extract;
/// Document submission pipeline.
pub mod ingestion;
/// Structured logging and tracing setup.
pub mod logging;
/// Pipeline metrics helpers.
pub mod metrics;
/// Qdrant vector store integration.
pub mod qdrant;
/// S3-compatible object storage.
pub mod storage;

#[cfg(test)]
mod testing;
