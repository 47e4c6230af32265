//! Plain-text extraction from uploaded documents.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while turning a document into text.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The document could not be parsed.
    #[error("Failed to extract text: {0}")]
    Unreadable(String),
    /// Parsing succeeded but yielded no text (scanned or empty document).
    #[error("Document contains no extractable text")]
    Empty,
}

/// Converts a staged document into plain text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract the text of the document stored at `path`.
    async fn extract(&self, path: &Path) -> Result<String, ExtractionError>;
}

/// PDF extractor backed by `pdf-extract`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTextExtractor;

impl PdfTextExtractor {
    /// Construct a new extractor.
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TextExtractor for PdfTextExtractor {
    async fn extract(&self, path: &Path) -> Result<String, ExtractionError> {
        let path: PathBuf = path.to_path_buf();
        // PDF parsing is CPU-bound and synchronous.
        let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text(&path))
            .await
            .map_err(|error| ExtractionError::Unreadable(error.to_string()))?
            .map_err(|error| ExtractionError::Unreadable(error.to_string()))?;

        if text.trim().is_empty() {
            return Err(ExtractionError::Empty);
        }
        Ok(text)
    }
}
