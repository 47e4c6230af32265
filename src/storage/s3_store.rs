//! Path-style S3 client for MinIO and other S3-compatible stores.
//!
//! Objects are written and presigned through `object_store`'s `AmazonS3`, one handle per
//! bucket. Bucket creation goes through `rust-s3`, since `object_store` has no bucket API.

use super::{ObjectStore, ObjectStoreError};
use ::s3::error::S3Error;
use ::s3::{Bucket, BucketConfiguration, Region};
use async_trait::async_trait;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::signer::Signer;
use object_store::{
    Attribute, AttributeValue, Attributes, ObjectStore as _, PutOptions, PutPayload,
};
use reqwest::{Method, Url};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

/// Longest expiry S3 accepts for a presigned URL.
pub(crate) const MAX_PRESIGN_EXPIRY: Duration = Duration::from_secs(7 * 24 * 60 * 60);

const BUCKET_ALREADY_EXISTS: u16 = 409;

/// Static access credentials and signing region.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Access key identifier.
    pub access_key: String,
    /// Secret access key.
    pub secret_key: String,
    /// Region included in the credential scope.
    pub region: String,
}

/// S3-compatible object store addressed with path-style URLs (`{endpoint}/{bucket}/{key}`).
pub struct S3ObjectStore {
    endpoint: Url,
    credentials: Credentials,
    buckets: RwLock<HashMap<String, Arc<AmazonS3>>>,
}

impl S3ObjectStore {
    /// Construct a client for the store at `endpoint`.
    pub fn new(endpoint: &str, credentials: Credentials) -> Result<Self, ObjectStoreError> {
        let mut endpoint =
            Url::parse(endpoint).map_err(|error| ObjectStoreError::InvalidUrl(error.to_string()))?;
        if endpoint.host_str().is_none() {
            return Err(ObjectStoreError::InvalidUrl(format!("{endpoint} has no host")));
        }
        let path = endpoint.path().trim_end_matches('/').to_string();
        endpoint.set_path(&path);
        tracing::debug!(
            endpoint = %endpoint,
            region = %credentials.region,
            "Initialized object store client"
        );
        Ok(Self {
            endpoint,
            credentials,
            buckets: RwLock::new(HashMap::new()),
        })
    }

    fn endpoint(&self) -> String {
        self.endpoint.as_str().trim_end_matches('/').to_string()
    }

    /// Handle bound to `bucket`, built on first use.
    fn bucket(&self, bucket: &str) -> Result<Arc<AmazonS3>, ObjectStoreError> {
        if let Some(store) = self
            .buckets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(bucket)
        {
            return Ok(Arc::clone(store));
        }

        let store = AmazonS3Builder::new()
            .with_bucket_name(bucket)
            .with_region(&self.credentials.region)
            .with_endpoint(self.endpoint())
            .with_virtual_hosted_style_request(false)
            .with_allow_http(self.endpoint.scheme() == "http")
            .with_access_key_id(&self.credentials.access_key)
            .with_secret_access_key(&self.credentials.secret_key)
            .build()?;
        let store = Arc::new(store);
        self.buckets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(bucket.to_string(), Arc::clone(&store));
        Ok(store)
    }

    fn bucket_credentials(&self) -> Result<::s3::creds::Credentials, ObjectStoreError> {
        ::s3::creds::Credentials::new(
            Some(&self.credentials.access_key),
            Some(&self.credentials.secret_key),
            None,
            None,
            None,
        )
        .map_err(|error| ObjectStoreError::Bucket(error.to_string()))
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn ensure_bucket(&self, bucket: &str) -> Result<(), ObjectStoreError> {
        let region = Region::Custom {
            region: self.credentials.region.clone(),
            endpoint: self.endpoint(),
        };
        let outcome = Bucket::create_with_path_style(
            bucket,
            region,
            self.bucket_credentials()?,
            BucketConfiguration::default(),
        )
        .await;

        // An existing bucket answers 409; it is ready either way.
        let status = match outcome {
            Ok(response) => response.response_code,
            Err(S3Error::HttpFailWithBody(status, _)) if status == BUCKET_ALREADY_EXISTS => status,
            Err(error) => {
                tracing::error!(bucket, error = %error, "Bucket creation failed");
                return Err(ObjectStoreError::Bucket(error.to_string()));
            }
        };
        if (200..300).contains(&status) || status == BUCKET_ALREADY_EXISTS {
            tracing::info!(bucket, status, "Bucket ready");
            Ok(())
        } else {
            tracing::error!(bucket, status, "Bucket creation rejected");
            Err(ObjectStoreError::Bucket(format!(
                "unexpected status {status} creating {bucket}"
            )))
        }
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        let size = bytes.len();
        let mut attributes = Attributes::new();
        attributes.insert(
            Attribute::ContentType,
            AttributeValue::from(content_type.to_string()),
        );
        let options = PutOptions {
            attributes,
            ..PutOptions::default()
        };

        let store = self.bucket(bucket)?;
        match store
            .put_opts(&Path::from(key), PutPayload::from(bytes), options)
            .await
        {
            Ok(_) => {
                tracing::debug!(bucket, key, size, "Object stored");
                Ok(())
            }
            Err(error) => {
                tracing::error!(bucket, key, error = %error, "Object upload failed");
                Err(error.into())
            }
        }
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        ttl: Duration,
    ) -> Result<String, ObjectStoreError> {
        if key.trim().is_empty() {
            return Err(ObjectStoreError::InvalidUrl("empty object key".into()));
        }
        let expires_in = ttl.clamp(Duration::from_secs(1), MAX_PRESIGN_EXPIRY);
        let url = self
            .bucket(bucket)?
            .signed_url(Method::GET, &Path::from(key), expires_in)
            .await
            .map_err(|error| ObjectStoreError::Signing(error.to_string()))?;
        Ok(url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::PUT, MockServer};

    fn store(server: &MockServer) -> S3ObjectStore {
        S3ObjectStore::new(
            &server.base_url(),
            Credentials {
                access_key: "minio".into(),
                secret_key: "minio123".into(),
                region: "us-east-1".into(),
            },
        )
        .expect("store")
    }

    #[test]
    fn rejects_endpoint_without_host() {
        let result = S3ObjectStore::new(
            "unix:/var/run/minio.sock",
            Credentials {
                access_key: "a".into(),
                secret_key: "b".into(),
                region: "us-east-1".into(),
            },
        );
        assert!(matches!(result, Err(ObjectStoreError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn ensure_bucket_creates_missing_bucket() {
        let server = MockServer::start_async().await;
        let create = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path_contains("/documents")
                    .header_exists("authorization");
                then.status(200);
            })
            .await;

        store(&server).ensure_bucket("documents").await.expect("ensure");
        create.assert();
    }

    #[tokio::test]
    async fn ensure_bucket_accepts_existing_bucket() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(PUT).path_contains("/documents");
                then.status(409).body(
                    "<Error><Code>BucketAlreadyOwnedByYou</Code><Message>exists</Message></Error>",
                );
            })
            .await;

        store(&server).ensure_bucket("documents").await.expect("ensure");
    }

    #[tokio::test]
    async fn ensure_bucket_surfaces_denied_creation() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(PUT).path_contains("/documents");
                then.status(403)
                    .body("<Error><Code>AccessDenied</Code><Message>denied</Message></Error>");
            })
            .await;

        let error = store(&server)
            .ensure_bucket("documents")
            .await
            .expect_err("denied");
        assert!(matches!(error, ObjectStoreError::Bucket(_)));
    }

    #[tokio::test]
    async fn put_uploads_bytes_with_content_type() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/documents/2025/1_owner_cv.pdf")
                    .header("content-type", "application/pdf")
                    .header_exists("authorization")
                    .body("%PDF-1.4");
                then.status(200).header("ETag", "\"d41d8cd98f00b204\"");
            })
            .await;

        store(&server)
            .put(
                "documents",
                "2025/1_owner_cv.pdf",
                b"%PDF-1.4".to_vec(),
                "application/pdf",
            )
            .await
            .expect("put");

        mock.assert();
    }

    #[tokio::test]
    async fn put_surfaces_error_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(PUT).path("/documents/key.pdf");
                then.status(403)
                    .body("<Error><Code>AccessDenied</Code><Message>denied</Message></Error>");
            })
            .await;

        let error = store(&server)
            .put("documents", "key.pdf", vec![1], "application/pdf")
            .await
            .expect_err("denied");
        assert!(matches!(error, ObjectStoreError::Backend(_)));
    }

    #[tokio::test]
    async fn presign_get_targets_object_path() {
        let server = MockServer::start_async().await;
        let url = store(&server)
            .presign_get("documents", "2025/cv.pdf", Duration::from_secs(3600))
            .await
            .expect("presign");

        assert!(url.starts_with(&format!("{}/documents/2025/cv.pdf?", server.base_url())));
        assert!(url.contains("X-Amz-Expires=3600"));
        assert!(url.contains("X-Amz-Signature="));
    }

    #[tokio::test]
    async fn presign_get_caps_expiry_at_one_week() {
        let server = MockServer::start_async().await;
        let url = store(&server)
            .presign_get("documents", "cv.pdf", Duration::from_secs(30 * 24 * 3600))
            .await
            .expect("presign");
        assert!(url.contains("X-Amz-Expires=604800"));
    }

    #[tokio::test]
    async fn presign_get_rejects_empty_key() {
        let server = MockServer::start_async().await;
        let error = store(&server)
            .presign_get("documents", "  ", Duration::from_secs(60))
            .await
            .expect_err("empty");
        assert!(matches!(error, ObjectStoreError::InvalidUrl(_)));
    }
}
