//! Result and error types for the evaluation pipeline.

use crate::evaluator::EvaluatorClientError;
use crate::qdrant::QdrantError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Scores and feedback produced by the evaluator for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// How well the CV matches the rubric, in `[0, 1]`.
    pub cv_match_rate: f64,
    /// Free-form feedback on the CV.
    pub cv_feedback: String,
    /// Project score on the rubric scale.
    pub project_score: f64,
    /// Free-form feedback on the project work.
    pub project_feedback: String,
    /// Overall assessment.
    pub overall_summary: String,
}

/// Reasons a single evaluation job did not produce a result.
///
/// These never reach a caller directly; the worker records them as job state.
#[derive(Debug, Error)]
pub enum EvaluationError {
    /// The vector index holds no point for the document.
    #[error("document {0} not found in vector index")]
    NotFound(String),
    /// The vector index lookup itself failed.
    #[error("vector index lookup failed: {0}")]
    Lookup(#[from] QdrantError),
    /// The evaluator call failed at the transport level.
    #[error("evaluator call failed: {0}")]
    Evaluator(#[from] EvaluatorClientError),
    /// The evaluator answered with text that is not the expected JSON shape.
    #[error("failed to parse evaluator response: {source}")]
    Parse {
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
        /// Response text after fence stripping, kept for diagnostics.
        raw: String,
    },
    /// The evaluator did not answer within the per-job deadline.
    #[error("evaluator did not respond within {0:?}")]
    Timeout(Duration),
}

/// Errors returned when a job cannot be admitted to the queue.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnqueueError {
    /// The queue stayed full for the whole timeout.
    #[error("evaluation queue is full; timed out after {0:?}")]
    Timeout(Duration),
    /// The worker task is gone and no longer accepts jobs.
    #[error("evaluation worker has shut down")]
    Closed,
}
