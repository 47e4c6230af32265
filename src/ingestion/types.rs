//! Input and error types for document submission.

use crate::documents::DocumentStoreError;
use crate::embedding::EmbeddingClientError;
use crate::extract::ExtractionError;
use crate::qdrant::QdrantError;
use crate::storage::ObjectStoreError;
use thiserror::Error;

/// Content type assumed when the upload does not declare one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/pdf";

/// Raw file received from a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    /// Client-supplied file name; only its final path component is used.
    pub file_name: String,
    /// Declared MIME type, if any.
    pub content_type: Option<String>,
    /// File contents.
    pub bytes: Vec<u8>,
}

impl Upload {
    /// Build an upload from its parts.
    pub fn new(file_name: impl Into<String>, content_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type,
            bytes,
        }
    }

    /// Declared content type, falling back to [`DEFAULT_CONTENT_TYPE`].
    pub fn content_type(&self) -> &str {
        self.content_type
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
    }

    /// File name with any directory components and surrounding whitespace removed.
    pub fn base_name(&self) -> &str {
        self.file_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or_default()
            .trim()
    }
}

/// Errors returned by [`crate::ingestion::IngestionService::submit`].
///
/// Each variant names the step that aborted. Earlier steps are not rolled back.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The request is missing a required field.
    #[error("Invalid submission: {0}")]
    InvalidInput(String),
    /// The upload could not be written to a scratch file.
    #[error("Failed to stage upload: {0}")]
    Staging(#[source] std::io::Error),
    /// No text could be extracted from the upload.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    /// The embedding provider failed or returned a vector of the wrong size.
    #[error(transparent)]
    Embedding(#[from] EmbeddingClientError),
    /// The object store rejected the bucket check or the upload.
    #[error("Object storage failed: {0}")]
    Storage(#[from] ObjectStoreError),
    /// The document row could not be written.
    #[error(transparent)]
    Database(#[from] DocumentStoreError),
    /// The vector index upsert failed after the row was written.
    #[error("Vector index upsert failed: {0}")]
    Index(#[from] QdrantError),
}
