//! Text-generation backend used to score documents.
//!
//! The evaluator receives the fully assembled rubric prompt and returns raw model text. Parsing
//! that text into an [`crate::evaluation::EvaluationResult`] is the caller's job, so transport
//! failures and malformed responses stay distinguishable.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// Errors surfaced while calling the generation backend.
#[derive(Debug, Error)]
pub enum EvaluatorClientError {
    /// Provider was unreachable.
    #[error("Evaluator unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate evaluation: {0}")]
    GenerationFailed(String),
    /// Provider response envelope could not be decoded.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Interface implemented by text-generation providers.
#[async_trait]
pub trait EvaluatorClient: Send + Sync {
    /// Generate free-form text for the supplied prompt.
    async fn generate(&self, prompt: &str) -> Result<String, EvaluatorClientError>;
}

/// Evaluator backed by Ollama's `/api/generate` endpoint.
pub struct OllamaEvaluatorClient {
    http: Client,
    base_url: String,
    model: String,
}

impl OllamaEvaluatorClient {
    /// Construct a client targeting `base_url` with the given generation model.
    pub fn new(base_url: String, model: String) -> Self {
        let http = Client::builder()
            .user_agent("docrubric/evaluate")
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            http,
            base_url,
            model,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    done: bool,
}

#[async_trait]
impl EvaluatorClient for OllamaEvaluatorClient {
    async fn generate(&self, prompt: &str) -> Result<String, EvaluatorClientError> {
        let payload = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "temperature": 0.1,
            }
        });

        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                EvaluatorClientError::ProviderUnavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(EvaluatorClientError::ProviderUnavailable(format!(
                "Ollama endpoint {} returned 404",
                self.endpoint()
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EvaluatorClientError::GenerationFailed(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: OllamaResponse = response.json().await.map_err(|error| {
            EvaluatorClientError::InvalidResponse(format!(
                "failed to decode Ollama response: {error}"
            ))
        })?;

        if !body.done {
            return Err(EvaluatorClientError::InvalidResponse(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }

        Ok(body.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    #[tokio::test]
    async fn ollama_client_returns_raw_response_text() {
        let server = MockServer::start_async().await;
        let client = OllamaEvaluatorClient::new(server.base_url(), "llama3".into());

        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(200).json_body(json!({
                    "response": "```json\n{\"cv_match_rate\":0.5}\n```",
                    "done": true
                }));
            })
            .await;

        let text = client.generate("Evaluate").await.expect("text");

        mock.assert();
        assert!(text.starts_with("```json"));
    }

    #[tokio::test]
    async fn ollama_client_handles_error_status() {
        let server = MockServer::start_async().await;
        let client = OllamaEvaluatorClient::new(server.base_url(), "llama3".into());

        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(500).body("boom");
            })
            .await;

        let error = client.generate("Evaluate").await.expect_err("error response");
        assert!(
            matches!(error, EvaluatorClientError::GenerationFailed(message) if message.contains("500"))
        );
    }

    #[tokio::test]
    async fn ollama_client_rejects_incomplete_response() {
        let server = MockServer::start_async().await;
        let client = OllamaEvaluatorClient::new(server.base_url(), "llama3".into());

        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(200)
                    .json_body(json!({ "response": "{", "done": false }));
            })
            .await;

        let error = client.generate("Evaluate").await.expect_err("incomplete");
        assert!(matches!(error, EvaluatorClientError::InvalidResponse(_)));
    }
}
