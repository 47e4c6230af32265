//! Document model, the durable document store, and the indexed read path.

pub mod lookup;
pub mod sqlite;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

pub use lookup::{DocumentLookup, DocumentView};
pub use sqlite::SqliteDocumentStore;

/// A submitted file plus its derived text and embedding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    /// Identifier shared by the document store row and the vector index point.
    pub id: String,
    /// Owner of the document.
    pub owner_id: String,
    /// Human-supplied title.
    pub title: String,
    /// Plain text extracted from the uploaded file.
    pub summary_text: String,
    /// Object store key of the original upload.
    pub raw_file_reference: String,
    /// Dense embedding of `summary_text`; never mutated after creation.
    #[serde(skip_serializing)]
    pub embedding: Vec<f32>,
    /// Creation timestamp (RFC 3339).
    pub created_at: String,
}

/// Errors returned by document store adapters.
#[derive(Debug, Error)]
pub enum DocumentStoreError {
    /// SQLite rejected the statement or transaction.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A stored row could not be decoded.
    #[error("Corrupt document row: {0}")]
    Corrupt(String),
    /// The blocking database task did not complete.
    #[error("Database task failed: {0}")]
    Task(String),
}

/// Durable system of record for document metadata.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Persist a new document inside a single transaction.
    async fn create(&self, document: &Document) -> Result<(), DocumentStoreError>;

    /// Load a document by ID, or `None` when absent.
    async fn get_by_id(&self, id: &str) -> Result<Option<Document>, DocumentStoreError>;
}

/// Serialize an embedding as little-endian `f32` bytes.
pub fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding
        .iter()
        .flat_map(|value| value.to_le_bytes())
        .collect()
}

/// Decode little-endian `f32` bytes produced by [`encode_embedding`].
pub fn decode_embedding(bytes: &[u8]) -> Result<Vec<f32>, DocumentStoreError> {
    if bytes.len() % 4 != 0 {
        return Err(DocumentStoreError::Corrupt(format!(
            "embedding length must be a multiple of 4, got {}",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_bytes_decode_to_same_values() {
        let embedding = vec![0.25_f32, -1.5, f32::MIN_POSITIVE];
        let bytes = encode_embedding(&embedding);
        assert_eq!(bytes.len(), 12);
        assert_eq!(decode_embedding(&bytes).expect("decode"), embedding);
    }

    #[test]
    fn decode_rejects_truncated_bytes() {
        assert!(matches!(
            decode_embedding(&[0, 0, 128]),
            Err(DocumentStoreError::Corrupt(_))
        ));
    }
}
