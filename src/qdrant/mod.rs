//! Qdrant vector store integration.
//!
//! Each document maps to exactly one point whose ID equals the document ID. The point payload
//! mirrors the descriptive fields of the document so a single lookup yields both the vector and
//! everything the evaluator needs.

pub mod client;
pub mod payload;
pub mod types;

use async_trait::async_trait;
use serde_json::{Map, Value};

pub use client::QdrantService;
pub use payload::DocumentPayload;
pub use types::{IndexedPoint, QdrantError};

/// Similarity collection keyed by document ID.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Create the backing collection when it is missing.
    async fn ensure_collection(&self, vector_size: u64) -> Result<(), QdrantError>;

    /// Insert or replace the point stored under `id`.
    async fn upsert(
        &self,
        id: &str,
        vector: Vec<f32>,
        payload: Map<String, Value>,
    ) -> Result<(), QdrantError>;

    /// Fetch a point with its payload and vector, or `None` when it does not exist.
    async fn get_by_id(&self, id: &str) -> Result<Option<IndexedPoint>, QdrantError>;
}
