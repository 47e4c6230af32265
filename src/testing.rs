//! In-memory adapters shared by unit tests.

use crate::evaluator::{EvaluatorClient, EvaluatorClientError};
use crate::extract::{ExtractionError, TextExtractor};
use crate::qdrant::{IndexedPoint, QdrantError, VectorIndex};
use crate::storage::{ObjectStore, ObjectStoreError};
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

pub(crate) const GOOD_RESPONSE: &str = "```json\n{\"cv_match_rate\":0.8,\"cv_feedback\":\"Strong\",\"project_score\":4.0,\"project_feedback\":\"Solid\",\"overall_summary\":\"Hire\"}\n```";

#[derive(Default)]
pub(crate) struct MemoryIndex {
    points: Mutex<HashMap<String, IndexedPoint>>,
}

impl MemoryIndex {
    pub(crate) fn with_document(id: &str, file: &str) -> Self {
        let index = Self::default();
        let mut payload = Map::new();
        payload.insert("owner_id".into(), json!("owner"));
        payload.insert("title".into(), json!("Backend CV"));
        payload.insert("summary".into(), json!("Senior backend engineer"));
        payload.insert("file".into(), json!(file));
        index.points.lock().unwrap().insert(
            id.to_string(),
            IndexedPoint {
                id: id.to_string(),
                vector: vec![0.0; 4],
                payload,
            },
        );
        index
    }

    pub(crate) fn ids(&self) -> Vec<String> {
        self.points.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn ensure_collection(&self, _vector_size: u64) -> Result<(), QdrantError> {
        Ok(())
    }

    async fn upsert(
        &self,
        id: &str,
        vector: Vec<f32>,
        payload: Map<String, Value>,
    ) -> Result<(), QdrantError> {
        self.points.lock().unwrap().insert(
            id.to_string(),
            IndexedPoint {
                id: id.to_string(),
                vector,
                payload,
            },
        );
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<IndexedPoint>, QdrantError> {
        Ok(self.points.lock().unwrap().get(id).cloned())
    }
}

#[derive(Default)]
pub(crate) struct MemoryObjectStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    pub(crate) fail_presign: bool,
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn ensure_bucket(&self, _bucket: &str) -> Result<(), ObjectStoreError> {
        Ok(())
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        self.objects
            .lock()
            .unwrap()
            .insert(format!("{bucket}/{key}"), bytes);
        Ok(())
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        _ttl: Duration,
    ) -> Result<String, ObjectStoreError> {
        if self.fail_presign {
            return Err(ObjectStoreError::Signing("presign disabled".into()));
        }
        Ok(format!("https://store.local/{bucket}/{key}?signed"))
    }
}

/// Extractor returning fixed text regardless of input.
pub(crate) struct StaticExtractor(pub(crate) &'static str);

#[async_trait]
impl TextExtractor for StaticExtractor {
    async fn extract(&self, path: &Path) -> Result<String, ExtractionError> {
        if !path.exists() {
            return Err(ExtractionError::Unreadable("scratch file missing".into()));
        }
        Ok(self.0.to_string())
    }
}

/// Evaluator answering every prompt with the same text.
pub(crate) struct ScriptedEvaluator(pub(crate) &'static str);

#[async_trait]
impl EvaluatorClient for ScriptedEvaluator {
    async fn generate(&self, _prompt: &str) -> Result<String, EvaluatorClientError> {
        Ok(self.0.to_string())
    }
}
