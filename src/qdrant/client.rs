//! HTTP client wrapper for interacting with Qdrant.

use crate::qdrant::VectorIndex;
use crate::qdrant::types::{IndexedPoint, QdrantError, RetrieveResponse};
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde_json::{Map, Value, json};
use uuid::Uuid;

/// Lightweight HTTP client for a single Qdrant collection.
pub struct QdrantService {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) api_key: Option<String>,
    pub(crate) collection: String,
}

impl QdrantService {
    /// Construct a new client for `collection` on the Qdrant instance at `url`.
    pub fn new(
        url: &str,
        api_key: Option<String>,
        collection: impl Into<String>,
    ) -> Result<Self, QdrantError> {
        let client = Client::builder().user_agent("docrubric/0.1").build()?;
        let base_url = normalize_base_url(url).map_err(QdrantError::InvalidUrl)?;
        let collection = collection.into();
        tracing::debug!(
            url = %base_url,
            collection = %collection,
            has_api_key = api_key.as_deref().is_some_and(|value| !value.is_empty()),
            "Initialized Qdrant HTTP client"
        );

        Ok(Self {
            client,
            base_url,
            api_key,
            collection,
        })
    }

    /// Name of the collection this client reads and writes.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Create the collection with cosine distance and the given vector size.
    pub async fn create_collection(&self, vector_size: u64) -> Result<(), QdrantError> {
        let body = json!({
            "vectors": {
                "size": vector_size,
                "distance": "Cosine"
            }
        });

        let response = self
            .request(Method::PUT, &format!("collections/{}", self.collection))
            .json(&body)
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(collection = %self.collection, vector_size, "Collection created");
        })
        .await
    }

    async fn collection_exists(&self) -> Result<bool, QdrantError> {
        let response = self
            .request(Method::GET, &format!("collections/{}", self.collection))
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => {
                let body = response.text().await.unwrap_or_default();
                let error = QdrantError::UnexpectedStatus { status, body };
                tracing::error!(collection = %self.collection, error = %error, "Collection existence check failed");
                Err(error)
            }
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format_endpoint(&self.base_url, path);
        let mut req = self.client.request(method, url);
        if let Some(api_key) = self.api_key.as_deref().filter(|key| !key.is_empty()) {
            req = req.header("api-key", api_key);
        }
        req
    }

    async fn ensure_success<F>(
        &self,
        response: reqwest::Response,
        on_success: F,
    ) -> Result<(), QdrantError>
    where
        F: FnOnce(),
    {
        if response.status().is_success() {
            on_success();
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = QdrantError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Qdrant request failed");
            Err(error)
        }
    }
}

#[async_trait]
impl VectorIndex for QdrantService {
    async fn ensure_collection(&self, vector_size: u64) -> Result<(), QdrantError> {
        if self.collection_exists().await? {
            return Ok(());
        }
        tracing::debug!(collection = %self.collection, vector_size, "Creating collection");
        self.create_collection(vector_size).await
    }

    async fn upsert(
        &self,
        id: &str,
        vector: Vec<f32>,
        payload: Map<String, Value>,
    ) -> Result<(), QdrantError> {
        let body = json!({
            "points": [
                {
                    "id": id,
                    "vector": vector,
                    "payload": payload,
                }
            ]
        });

        let response = self
            .request(
                Method::PUT,
                &format!("collections/{}/points", self.collection),
            )
            .query(&[("wait", true)])
            .json(&body)
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(collection = %self.collection, point_id = id, "Point upserted");
        })
        .await
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<IndexedPoint>, QdrantError> {
        // Qdrant rejects string ids that are not UUIDs; no such point can exist.
        if Uuid::parse_str(id).is_err() {
            tracing::debug!(collection = %self.collection, point_id = id, "Not a point id");
            return Ok(None);
        }

        let body = json!({
            "ids": [id],
            "with_payload": true,
            "with_vector": true,
        });

        let response = self
            .request(
                Method::POST,
                &format!("collections/{}/points", self.collection),
            )
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = QdrantError::UnexpectedStatus { status, body };
            tracing::error!(collection = %self.collection, point_id = id, error = %error, "Qdrant retrieve failed");
            return Err(error);
        }

        let RetrieveResponse { result } = response.json().await?;
        Ok(result.into_iter().next().map(|point| IndexedPoint {
            id: stringify_point_id(point.id),
            vector: point.vector.map(extract_vector).unwrap_or_default(),
            payload: point.payload.unwrap_or_default(),
        }))
    }
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

fn stringify_point_id(id: Value) -> String {
    match id {
        Value::String(text) => text,
        Value::Number(number) => number.to_string(),
        Value::Object(map) => map
            .get("uuid")
            .map(|value| match value {
                Value::String(uuid) => uuid.clone(),
                other => other.to_string(),
            })
            .unwrap_or_else(|| Value::Object(map).to_string()),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Accept both the unnamed (`[..]`) and single named-vector (`{"name": [..]}`) layouts.
fn extract_vector(value: Value) -> Vec<f32> {
    let array = match value {
        Value::Array(items) => items,
        Value::Object(map) => match map.into_iter().next() {
            Some((_, Value::Array(items))) => items,
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };
    array
        .iter()
        .filter_map(Value::as_f64)
        .map(|value| value as f32)
        .collect()
}
