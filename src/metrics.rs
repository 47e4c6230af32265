use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing ingestion and evaluation activity.
#[derive(Default)]
pub struct PipelineMetrics {
    documents_submitted: AtomicU64,
    submissions_failed: AtomicU64,
    evaluations_enqueued: AtomicU64,
    evaluations_done: AtomicU64,
    evaluations_errored: AtomicU64,
    evaluations_failed: AtomicU64,
}

impl PipelineMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a document that reached both stores.
    pub fn record_submission(&self) {
        self.documents_submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a submission that aborted at any step.
    pub fn record_submission_failure(&self) {
        self.submissions_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a job admitted to the evaluation queue.
    pub fn record_enqueue(&self) {
        self.evaluations_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an evaluation that produced a result.
    pub fn record_done(&self) {
        self.evaluations_done.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an evaluation whose document could not be retrieved.
    pub fn record_error(&self) {
        self.evaluations_errored.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an evaluation whose evaluator call or response parsing failed.
    pub fn record_failed(&self) {
        self.evaluations_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_submitted: self.documents_submitted.load(Ordering::Relaxed),
            submissions_failed: self.submissions_failed.load(Ordering::Relaxed),
            evaluations_enqueued: self.evaluations_enqueued.load(Ordering::Relaxed),
            evaluations_done: self.evaluations_done.load(Ordering::Relaxed),
            evaluations_errored: self.evaluations_errored.load(Ordering::Relaxed),
            evaluations_failed: self.evaluations_failed.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of pipeline counters used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Documents successfully persisted to both stores since startup.
    pub documents_submitted: u64,
    /// Submissions that returned an error.
    pub submissions_failed: u64,
    /// Evaluation jobs admitted to the queue.
    pub evaluations_enqueued: u64,
    /// Evaluations that ended in `done`.
    pub evaluations_done: u64,
    /// Evaluations that ended in `error`.
    pub evaluations_errored: u64,
    /// Evaluations that ended in `failed`.
    pub evaluations_failed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_submissions_and_outcomes() {
        let metrics = PipelineMetrics::new();
        metrics.record_submission();
        metrics.record_submission_failure();
        metrics.record_enqueue();
        metrics.record_enqueue();
        metrics.record_done();
        metrics.record_failed();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.documents_submitted, 1);
        assert_eq!(snapshot.submissions_failed, 1);
        assert_eq!(snapshot.evaluations_enqueued, 2);
        assert_eq!(snapshot.evaluations_done, 1);
        assert_eq!(snapshot.evaluations_errored, 0);
        assert_eq!(snapshot.evaluations_failed, 1);
    }

    #[test]
    fn snapshot_starts_empty() {
        let snapshot = PipelineMetrics::new().snapshot();
        assert_eq!(snapshot.documents_submitted, 0);
        assert_eq!(snapshot.evaluations_done, 0);
    }
}
