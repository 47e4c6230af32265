//! Concurrent status table tracking one evaluation job per document.
//!
//! The table is created alongside the worker and shared (via `Arc`) by the enqueue path, status
//! readers, and the worker task. It is never torn down; terminal records are dropped once they
//! outlive the retention window.

use super::types::EvaluationResult;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

/// Lifecycle state of an evaluation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// No job recorded for the document (never stored).
    NotFound,
    /// Admitted to the queue, waiting for the worker.
    Queued,
    /// Picked up by the worker.
    Processing,
    /// Evaluation succeeded; a result is attached.
    Done,
    /// The document could not be retrieved from the vector index.
    Error,
    /// The evaluator call failed or its response could not be parsed.
    Failed,
}

impl JobState {
    /// Whether no further automatic transition can happen from this state.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error | Self::Failed)
    }

    /// Wire name of the state.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Done => "done",
            Self::Error => "error",
            Self::Failed => "failed",
        }
    }

    fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::Processing)
                | (Self::Processing, Self::Done | Self::Error | Self::Failed)
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a document's evaluation job as seen by callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobStatus {
    /// Document identifier.
    pub id: String,
    /// Current state.
    pub state: JobState,
    /// Attached result; present only when `state` is `done`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<EvaluationResult>,
    /// Failure description for `error` and `failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobStatus {
    /// Status reported for documents with no recorded job.
    pub fn not_found(id: &str) -> Self {
        Self {
            id: id.to_string(),
            state: JobState::NotFound,
            result: None,
            error: None,
        }
    }
}

#[derive(Debug, Clone)]
struct JobRecord {
    generation: u64,
    state: JobState,
    result: Option<EvaluationResult>,
    error: Option<String>,
    finished_at: Option<Instant>,
}

/// Thread-safe map from document ID to its latest job record.
#[derive(Debug)]
pub struct StatusTable {
    entries: RwLock<HashMap<String, JobRecord>>,
    next_generation: AtomicU64,
    retention: Duration,
}

impl StatusTable {
    /// Create an empty table whose terminal records expire after `retention`.
    pub fn new(retention: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            next_generation: AtomicU64::new(1),
            retention,
        }
    }

    /// Record a fresh `queued` job for `id`, replacing any previous record.
    ///
    /// Returns the generation identifying this job; updates carrying an older generation are
    /// ignored from now on.
    pub fn begin(&self, id: &str) -> u64 {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        entries.insert(
            id.to_string(),
            JobRecord {
                generation,
                state: JobState::Queued,
                result: None,
                error: None,
                finished_at: None,
            },
        );
        generation
    }

    /// Move job `generation` of `id` to `next`.
    ///
    /// Only `queued → processing` and `processing → terminal` are accepted, and only while the
    /// record still belongs to `generation`. Returns whether the transition was applied.
    pub fn advance(
        &self,
        id: &str,
        generation: u64,
        next: JobState,
        result: Option<EvaluationResult>,
        error: Option<String>,
    ) -> bool {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(record) = entries.get_mut(id) else {
            return false;
        };
        if record.generation != generation || !record.state.can_advance_to(next) {
            return false;
        }
        record.state = next;
        record.result = if next == JobState::Done { result } else { None };
        record.error = error;
        record.finished_at = next.is_terminal().then(Instant::now);
        true
    }

    /// Read the current status for `id`; absent or expired records read as `not_found`.
    pub fn get(&self, id: &str) -> JobStatus {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        match entries.get(id) {
            Some(record) if !self.is_expired(record, Instant::now()) => JobStatus {
                id: id.to_string(),
                state: record.state,
                result: record.result.clone(),
                error: record.error.clone(),
            },
            _ => JobStatus::not_found(id),
        }
    }

    /// Drop terminal records older than the retention window, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, record| !self.is_expired(record, now));
        before - entries.len()
    }

    /// Number of records currently held, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the table holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_expired(&self, record: &JobRecord, now: Instant) -> bool {
        record
            .finished_at
            .is_some_and(|finished| now.duration_since(finished) >= self.retention)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result() -> EvaluationResult {
        EvaluationResult {
            cv_match_rate: 0.8,
            cv_feedback: "Strong".into(),
            project_score: 4.0,
            project_feedback: "Solid".into(),
            overall_summary: "Hire".into(),
        }
    }

    #[test]
    fn unknown_ids_read_as_not_found() {
        let table = StatusTable::new(Duration::from_secs(60));
        let status = table.get("never-enqueued");
        assert_eq!(status, JobStatus::not_found("never-enqueued"));
    }

    #[test]
    fn follows_queued_processing_done() {
        let table = StatusTable::new(Duration::from_secs(60));
        let generation = table.begin("doc");
        assert_eq!(table.get("doc").state, JobState::Queued);

        assert!(table.advance("doc", generation, JobState::Processing, None, None));
        assert_eq!(table.get("doc").state, JobState::Processing);

        assert!(table.advance("doc", generation, JobState::Done, Some(result()), None));
        let status = table.get("doc");
        assert_eq!(status.state, JobState::Done);
        assert_eq!(status.result, Some(result()));
    }

    #[test]
    fn rejects_skipped_and_backward_transitions() {
        let table = StatusTable::new(Duration::from_secs(60));
        let generation = table.begin("doc");
        assert!(!table.advance("doc", generation, JobState::Done, Some(result()), None));

        assert!(table.advance("doc", generation, JobState::Processing, None, None));
        assert!(table.advance("doc", generation, JobState::Failed, None, Some("bad".into())));
        assert!(!table.advance("doc", generation, JobState::Processing, None, None));
        assert!(!table.advance("doc", generation, JobState::Done, Some(result()), None));

        let status = table.get("doc");
        assert_eq!(status.state, JobState::Failed);
        assert_eq!(status.result, None);
        assert_eq!(status.error.as_deref(), Some("bad"));
    }

    #[test]
    fn superseded_generation_cannot_overwrite_new_job() {
        let table = StatusTable::new(Duration::from_secs(60));
        let first = table.begin("doc");
        assert!(table.advance("doc", first, JobState::Processing, None, None));

        let second = table.begin("doc");
        assert!(second > first);
        assert!(!table.advance("doc", first, JobState::Done, Some(result()), None));
        assert_eq!(table.get("doc").state, JobState::Queued);
    }

    #[test]
    fn result_only_attached_when_done() {
        let table = StatusTable::new(Duration::from_secs(60));
        let generation = table.begin("doc");
        table.advance("doc", generation, JobState::Processing, None, None);
        table.advance("doc", generation, JobState::Error, Some(result()), None);
        assert_eq!(table.get("doc").result, None);
    }

    #[test]
    fn terminal_records_expire_after_retention() {
        let table = StatusTable::new(Duration::ZERO);
        let generation = table.begin("doc");
        table.advance("doc", generation, JobState::Processing, None, None);
        assert_eq!(table.get("doc").state, JobState::Processing);

        table.advance("doc", generation, JobState::Done, Some(result()), None);
        assert_eq!(table.get("doc").state, JobState::NotFound);
        assert_eq!(table.purge_expired(), 1);
        assert!(table.is_empty());
    }

    #[test]
    fn in_flight_records_survive_purge() {
        let table = StatusTable::new(Duration::ZERO);
        table.begin("queued");
        assert_eq!(table.purge_expired(), 0);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn status_serializes_with_snake_case_state() {
        let json = serde_json::to_value(JobStatus::not_found("doc")).expect("json");
        assert_eq!(json, serde_json::json!({ "id": "doc", "state": "not_found" }));
    }
}
