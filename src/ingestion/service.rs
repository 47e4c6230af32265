//! Submission pipeline: extraction, embedding, upload, and dual persistence.

use super::types::{SubmitError, Upload};
use crate::documents::{Document, DocumentStore};
use crate::embedding::{EmbeddingClient, EmbeddingClientError};
use crate::extract::TextExtractor;
use crate::metrics::PipelineMetrics;
use crate::qdrant::{DocumentPayload, VectorIndex, payload::current_timestamp_rfc3339};
use crate::storage::ObjectStore;
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use tempfile::NamedTempFile;
use time::OffsetDateTime;
use uuid::Uuid;

/// Capability adapters used by the ingestion pipeline.
#[derive(Clone)]
pub struct IngestionDeps {
    /// Blob storage for the original upload.
    pub objects: Arc<dyn ObjectStore>,
    /// Converts the staged upload into plain text.
    pub extractor: Arc<dyn TextExtractor>,
    /// Produces the document embedding.
    pub embedder: Arc<dyn EmbeddingClient>,
    /// Durable system of record.
    pub documents: Arc<dyn DocumentStore>,
    /// Similarity index read back during evaluation.
    pub index: Arc<dyn VectorIndex>,
}

/// Static settings for the ingestion pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionSettings {
    /// Bucket receiving uploads.
    pub bucket: String,
    /// Required embedding length.
    pub embedding_dimension: usize,
}

/// Coordinates document submission across the object store, document store, and vector index.
///
/// Construct once near process start and share through an `Arc`. Submissions carry no internal
/// concurrency; each runs its steps strictly in order and stops at the first failure.
pub struct IngestionService {
    deps: IngestionDeps,
    settings: IngestionSettings,
    metrics: Arc<PipelineMetrics>,
}

impl IngestionService {
    /// Wire the service to its adapters.
    pub fn new(
        deps: IngestionDeps,
        settings: IngestionSettings,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        Self {
            deps,
            settings,
            metrics,
        }
    }

    /// Ingest an uploaded file and persist it to both stores under a fresh ID.
    ///
    /// Steps that completed before a failure are not rolled back. In particular an
    /// [`SubmitError::Index`] leaves the document row in place.
    pub async fn submit(
        &self,
        owner_id: &str,
        title: &str,
        upload: Upload,
    ) -> Result<Document, SubmitError> {
        match self.run_submission(owner_id, title, upload).await {
            Ok(document) => {
                self.metrics.record_submission();
                tracing::info!(
                    document_id = %document.id,
                    owner_id,
                    file = %document.raw_file_reference,
                    "Document submitted"
                );
                Ok(document)
            }
            Err(error) => {
                self.metrics.record_submission_failure();
                tracing::warn!(owner_id, error = %error, "Document submission failed");
                Err(error)
            }
        }
    }

    async fn run_submission(
        &self,
        owner_id: &str,
        title: &str,
        upload: Upload,
    ) -> Result<Document, SubmitError> {
        validate(owner_id, title, &upload)?;
        let IngestionDeps {
            objects,
            extractor,
            embedder,
            documents,
            index,
        } = &self.deps;
        let bucket = self.settings.bucket.as_str();

        objects.ensure_bucket(bucket).await?;
        tracing::debug!(bucket, "Bucket ready");

        let text = {
            let staged = stage_upload(&upload.bytes, upload.base_name())
                .await
                .map_err(SubmitError::Staging)?;
            extractor.extract(staged.path()).await?
        };
        tracing::debug!(chars = text.len(), "Extracted document text");

        let embedding = embedder.embed(&text).await?;
        if embedding.len() != self.settings.embedding_dimension {
            return Err(EmbeddingClientError::GenerationFailed(format!(
                "expected {} dimensions, got {}",
                self.settings.embedding_dimension,
                embedding.len()
            ))
            .into());
        }
        tracing::debug!(dimension = embedding.len(), "Embedded document text");

        let key = object_key(OffsetDateTime::now_utc(), owner_id, upload.base_name());
        let content_type = upload.content_type().to_string();
        objects.put(bucket, &key, upload.bytes, &content_type).await?;
        tracing::debug!(bucket, key = %key, "Uploaded original file");

        let document = Document {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            title: title.to_string(),
            summary_text: text,
            raw_file_reference: key,
            embedding,
            created_at: current_timestamp_rfc3339(),
        };
        documents.create(&document).await?;
        tracing::debug!(document_id = %document.id, "Document row created");

        let payload = DocumentPayload {
            owner_id: document.owner_id.clone(),
            title: document.title.clone(),
            summary: document.summary_text.clone(),
            file: document.raw_file_reference.clone(),
        }
        .into_map(&document.id, &document.created_at);
        index
            .upsert(&document.id, document.embedding.clone(), payload)
            .await?;
        tracing::debug!(document_id = %document.id, "Vector index point upserted");

        Ok(document)
    }
}

fn validate(owner_id: &str, title: &str, upload: &Upload) -> Result<(), SubmitError> {
    if owner_id.trim().is_empty() {
        return Err(SubmitError::InvalidInput("owner_id is required".into()));
    }
    if title.trim().is_empty() {
        return Err(SubmitError::InvalidInput("title is required".into()));
    }
    if upload.base_name().is_empty() {
        return Err(SubmitError::InvalidInput("file name is required".into()));
    }
    if upload.bytes.is_empty() {
        return Err(SubmitError::InvalidInput("file is empty".into()));
    }
    Ok(())
}

/// Object key for an upload: `{year}/{unix_nanos}_{owner}_{file_name}`.
pub(crate) fn object_key(now: OffsetDateTime, owner_id: &str, file_name: &str) -> String {
    format!(
        "{}/{}_{}_{}",
        now.year(),
        now.unix_timestamp_nanos(),
        owner_id,
        file_name
    )
}

/// Write the upload to a named temporary file, deleted when the handle drops.
///
/// The file keeps the upload's extension so the extractor can sniff the format.
async fn stage_upload(bytes: &[u8], file_name: &str) -> std::io::Result<NamedTempFile> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(OsStr::to_str)
        .unwrap_or("bin");
    let staged = tempfile::Builder::new()
        .prefix("docrubric-")
        .suffix(&format!(".{extension}"))
        .tempfile()?;
    tokio::fs::write(staged.path(), bytes).await?;
    Ok(staged)
}
