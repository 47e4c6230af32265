use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

/// Dimensionality of the document embeddings stored in the vector index.
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 768;
/// Default bound on outstanding evaluation jobs.
pub const DEFAULT_JOB_QUEUE_CAPACITY: usize = 100;
/// Base URL of a local Ollama runtime, used for embeddings and evaluation.
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the docrubric server.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base URL of the Qdrant instance that stores document vectors.
    pub qdrant_url: String,
    /// Name of the Qdrant collection holding one point per document.
    pub qdrant_collection_name: String,
    /// Optional API key required to access Qdrant.
    pub qdrant_api_key: Option<String>,
    /// Base URL of the S3-compatible object store.
    pub object_store_url: String,
    /// Bucket receiving uploaded source files.
    pub object_store_bucket: String,
    /// Access key used to sign object store requests.
    pub object_store_access_key: String,
    /// Secret key used to sign object store requests.
    pub object_store_secret_key: String,
    /// Signing region for the object store.
    pub object_store_region: String,
    /// Embedding provider used to generate document vectors.
    pub embedding_provider: EmbeddingProvider,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors.
    pub embedding_dimension: usize,
    /// Ollama base URL shared by the embedding and evaluator clients.
    pub ollama_url: String,
    /// Generation model used to score documents against the rubrics.
    pub evaluator_model: String,
    /// Path to the SQLite database file backing the document store.
    pub database_path: PathBuf,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
    /// Capacity of the evaluation job queue.
    pub job_queue_capacity: usize,
    /// Deadline for a single evaluator call; `None` disables it.
    pub evaluation_timeout: Option<Duration>,
    /// How long terminal job states remain queryable.
    pub status_retention: Duration,
    /// Lifetime of presigned file URLs.
    pub presign_ttl: Duration,
    /// How long the HTTP surface waits for queue admission before giving up.
    pub enqueue_timeout: Duration,
}

/// Supported embedding backends.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Local Ollama runtime.
    Ollama,
    /// Deterministic hashing embedder for offline runs.
    Hash,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let evaluation_timeout_secs: u64 = parse_or("EVALUATION_TIMEOUT_SECS", 300)?;
        Ok(Self {
            qdrant_url: load_env("QDRANT_URL")?,
            qdrant_collection_name: load_env("QDRANT_COLLECTION_NAME")?,
            qdrant_api_key: load_env_optional("QDRANT_API_KEY"),
            object_store_url: load_env("OBJECT_STORE_URL")?,
            object_store_bucket: load_env("OBJECT_STORE_BUCKET")?,
            object_store_access_key: load_env("OBJECT_STORE_ACCESS_KEY")?,
            object_store_secret_key: load_env("OBJECT_STORE_SECRET_KEY")?,
            object_store_region: load_env_or("OBJECT_STORE_REGION", "us-east-1"),
            embedding_provider: load_env("EMBEDDING_PROVIDER")?.parse().map_err(|()| {
                ConfigError::InvalidValue("EMBEDDING_PROVIDER".to_string())
            })?,
            embedding_model: load_env("EMBEDDING_MODEL")?,
            embedding_dimension: parse_or("EMBEDDING_DIMENSION", DEFAULT_EMBEDDING_DIMENSION)?,
            ollama_url: load_env_or("OLLAMA_URL", DEFAULT_OLLAMA_URL),
            evaluator_model: load_env("EVALUATOR_MODEL")?,
            database_path: load_env_optional("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/documents.db")),
            server_port: load_env_optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
            job_queue_capacity: parse_or("JOB_QUEUE_CAPACITY", DEFAULT_JOB_QUEUE_CAPACITY)
                .and_then(|capacity: usize| {
                    if capacity == 0 {
                        Err(ConfigError::InvalidValue("JOB_QUEUE_CAPACITY".into()))
                    } else {
                        Ok(capacity)
                    }
                })?,
            evaluation_timeout: (evaluation_timeout_secs > 0)
                .then(|| Duration::from_secs(evaluation_timeout_secs)),
            status_retention: Duration::from_secs(parse_or("STATUS_RETENTION_SECS", 3600)?),
            presign_ttl: Duration::from_secs(parse_or("PRESIGN_TTL_SECS", 3600)?),
            enqueue_timeout: Duration::from_secs(parse_or("ENQUEUE_TIMEOUT_SECS", 5)?),
        })
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn load_env_or(key: &str, default: &str) -> String {
    load_env_optional(key).unwrap_or_else(|| default.to_string())
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match load_env_optional(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "hash" => Ok(Self::Hash),
            _ => Err(()),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() -> Result<&'static Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        qdrant_url = %config.qdrant_url,
        collection = %config.qdrant_collection_name,
        bucket = %config.object_store_bucket,
        server_port = ?config.server_port,
        embedding_provider = ?config.embedding_provider,
        queue_capacity = config.job_queue_capacity,
        "Loaded configuration"
    );
    Ok(CONFIG.get_or_init(|| config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_provider_parses_case_insensitively() {
        assert_eq!("Ollama".parse::<EmbeddingProvider>(), Ok(EmbeddingProvider::Ollama));
        assert_eq!("HASH".parse::<EmbeddingProvider>(), Ok(EmbeddingProvider::Hash));
        assert!("openai".parse::<EmbeddingProvider>().is_err());
    }

    #[test]
    fn parse_or_falls_back_when_unset() {
        let value: u64 = parse_or("DOCRUBRIC_TEST_UNSET_VARIABLE", 42).expect("default");
        assert_eq!(value, 42);
    }

    #[test]
    fn unset_ollama_url_points_at_local_runtime() {
        let url = load_env_or("DOCRUBRIC_TEST_UNSET_OLLAMA_URL", DEFAULT_OLLAMA_URL);
        assert_eq!(url, "http://127.0.0.1:11434");
    }
}
