//! Read path resolving a document through the vector index.

use crate::qdrant::{DocumentPayload, QdrantError, VectorIndex};
use crate::storage::ObjectStore;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Indexed representation of a document with a resolved file link.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentView {
    /// Document identifier.
    pub id: String,
    /// Owner of the document.
    pub owner_id: String,
    /// Human-supplied title.
    pub title: String,
    /// Extracted plain text.
    pub summary: String,
    /// Presigned URL for the original file, or the raw object key when presigning failed.
    pub file_path: String,
    /// Stored embedding.
    #[serde(skip_serializing)]
    pub embedding: Vec<f32>,
}

/// Resolves documents from the vector index and presigns their file references.
#[derive(Clone)]
pub struct DocumentLookup {
    index: Arc<dyn VectorIndex>,
    objects: Arc<dyn ObjectStore>,
    bucket: String,
    presign_ttl: Duration,
}

impl DocumentLookup {
    /// Build a lookup over the given index and object store.
    pub fn new(
        index: Arc<dyn VectorIndex>,
        objects: Arc<dyn ObjectStore>,
        bucket: impl Into<String>,
        presign_ttl: Duration,
    ) -> Self {
        Self {
            index,
            objects,
            bucket: bucket.into(),
            presign_ttl,
        }
    }

    /// Fetch the document stored under `id`, or `None` when the index has no such point.
    ///
    /// A presign failure is not fatal: the raw object key is returned in its place.
    pub async fn fetch(&self, id: &str) -> Result<Option<DocumentView>, QdrantError> {
        let Some(point) = self.index.get_by_id(id).await? else {
            return Ok(None);
        };

        let payload = DocumentPayload::from_map(&point.payload);
        let file_path = match self
            .objects
            .presign_get(&self.bucket, &payload.file, self.presign_ttl)
            .await
        {
            Ok(url) => url,
            Err(error) => {
                tracing::warn!(
                    document_id = id,
                    file = %payload.file,
                    error = %error,
                    "Failed to presign file; falling back to raw reference"
                );
                payload.file.clone()
            }
        };

        let id = if point.id.is_empty() {
            id.to_string()
        } else {
            point.id
        };

        Ok(Some(DocumentView {
            id,
            owner_id: payload.owner_id,
            title: payload.title,
            summary: payload.summary,
            file_path,
            embedding: point.vector,
        }))
    }
}
