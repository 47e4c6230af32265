//! Object storage for uploaded source files.

pub mod s3_store;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub use s3_store::{Credentials, S3ObjectStore};

/// Errors returned by object store adapters.
#[derive(Debug, Error)]
pub enum ObjectStoreError {
    /// Endpoint URL failed to parse or lacks a host.
    #[error("Invalid object store URL: {0}")]
    InvalidUrl(String),
    /// Object read or write failed in the storage backend.
    #[error("Object store request failed: {0}")]
    Backend(#[from] object_store::Error),
    /// Bucket could not be created.
    #[error("Bucket setup failed: {0}")]
    Bucket(String),
    /// Request signing failed.
    #[error("Failed to sign request: {0}")]
    Signing(String),
}

/// Durable blob storage with presigned retrieval links.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Create `bucket` if it does not exist yet.
    async fn ensure_bucket(&self, bucket: &str) -> Result<(), ObjectStoreError>;

    /// Store `bytes` under `key`.
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ObjectStoreError>;

    /// Produce a time-limited GET URL for `key`.
    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        ttl: Duration,
    ) -> Result<String, ObjectStoreError>;
}
