//! Shared types used by the Qdrant client and helpers.

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors returned while interacting with Qdrant.
#[derive(Debug, Error)]
pub enum QdrantError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid Qdrant URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Qdrant responded with an unexpected status code.
    #[error("Unexpected Qdrant response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned from Qdrant.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
}

/// Point retrieved by identifier, including its vector.
#[derive(Debug, Clone, Default)]
pub struct IndexedPoint {
    /// Identifier assigned to the point.
    pub id: String,
    /// Stored dense vector; empty when Qdrant returned none.
    pub vector: Vec<f32>,
    /// Stored payload.
    pub payload: Map<String, Value>,
}

#[derive(Deserialize)]
pub(crate) struct RetrieveResponse {
    #[serde(default)]
    pub(crate) result: Vec<RetrievedPoint>,
}

#[derive(Deserialize)]
pub(crate) struct RetrievedPoint {
    pub(crate) id: Value,
    #[serde(default)]
    pub(crate) payload: Option<Map<String, Value>>,
    #[serde(default)]
    pub(crate) vector: Option<Value>,
}
