//! Background worker that evaluates queued documents one at a time.

use super::prompt::{build_prompt, parse_evaluation, strip_code_fence};
use super::rubric::RubricCatalog;
use super::status::{JobState, JobStatus, StatusTable};
use super::types::{EnqueueError, EvaluationError, EvaluationResult};
use crate::config::DEFAULT_JOB_QUEUE_CAPACITY;
use crate::documents::DocumentLookup;
use crate::evaluator::EvaluatorClient;
use crate::metrics::PipelineMetrics;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Tuning knobs for the evaluation worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerSettings {
    /// Maximum number of admitted jobs waiting for the worker.
    pub queue_capacity: usize,
    /// Deadline applied to each evaluator call; `None` waits indefinitely.
    pub evaluation_timeout: Option<Duration>,
    /// How long terminal states stay visible to status readers.
    pub status_retention: Duration,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_JOB_QUEUE_CAPACITY,
            evaluation_timeout: Some(Duration::from_secs(300)),
            status_retention: Duration::from_secs(3600),
        }
    }
}

#[derive(Debug)]
struct Job {
    document_id: String,
    generation: u64,
}

/// Handle to the evaluation queue and its status table.
///
/// Cloning the handle shares the same queue and table. The background task exits once every
/// handle has been dropped and the queue has drained.
#[derive(Clone)]
pub struct EvaluationWorker {
    sender: mpsc::Sender<Job>,
    status: Arc<StatusTable>,
    metrics: Arc<PipelineMetrics>,
}

struct JobRunner {
    lookup: DocumentLookup,
    evaluator: Arc<dyn EvaluatorClient>,
    rubrics: Arc<RubricCatalog>,
    status: Arc<StatusTable>,
    metrics: Arc<PipelineMetrics>,
    evaluation_timeout: Option<Duration>,
}

impl EvaluationWorker {
    /// Create the queue and status table and start the background task.
    ///
    /// Must be called from within a tokio runtime. The returned [`JoinHandle`] resolves when the
    /// queue closes.
    pub fn spawn(
        lookup: DocumentLookup,
        evaluator: Arc<dyn EvaluatorClient>,
        rubrics: Arc<RubricCatalog>,
        metrics: Arc<PipelineMetrics>,
        settings: WorkerSettings,
    ) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(settings.queue_capacity.max(1));
        let status = Arc::new(StatusTable::new(settings.status_retention));

        let runner = JobRunner {
            lookup,
            evaluator,
            rubrics,
            status: Arc::clone(&status),
            metrics: Arc::clone(&metrics),
            evaluation_timeout: settings.evaluation_timeout,
        };
        let handle = tokio::spawn(runner.run(receiver));

        tracing::info!(
            capacity = settings.queue_capacity,
            evaluation_timeout = ?settings.evaluation_timeout,
            retention_secs = settings.status_retention.as_secs(),
            "Evaluation worker started"
        );

        (
            Self {
                sender,
                status,
                metrics,
            },
            handle,
        )
    }

    /// Queue an evaluation of `document_id`, waiting for room when the queue is full.
    ///
    /// The document is not checked for existence here; a missing document surfaces later as the
    /// `error` state. Fails only with [`EnqueueError::Closed`] once the worker task is gone.
    pub async fn enqueue(&self, document_id: &str) -> Result<JobStatus, EnqueueError> {
        let permit = self
            .sender
            .reserve()
            .await
            .map_err(|_| EnqueueError::Closed)?;
        Ok(self.admit(permit, document_id))
    }

    /// Like [`enqueue`](Self::enqueue) but gives up when no slot frees up within `timeout`.
    ///
    /// A timed-out call leaves the status table untouched.
    pub async fn enqueue_with_timeout(
        &self,
        document_id: &str,
        timeout: Duration,
    ) -> Result<JobStatus, EnqueueError> {
        let permit = tokio::time::timeout(timeout, self.sender.reserve())
            .await
            .map_err(|_| EnqueueError::Timeout(timeout))?
            .map_err(|_| EnqueueError::Closed)?;
        Ok(self.admit(permit, document_id))
    }

    /// Current status of the latest job for `document_id`.
    pub fn get_status(&self, document_id: &str) -> JobStatus {
        self.status.get(document_id)
    }

    /// Shared status table backing this worker.
    pub fn status_table(&self) -> Arc<StatusTable> {
        Arc::clone(&self.status)
    }

    fn admit(&self, permit: mpsc::Permit<'_, Job>, document_id: &str) -> JobStatus {
        let generation = self.status.begin(document_id);
        permit.send(Job {
            document_id: document_id.to_string(),
            generation,
        });
        self.metrics.record_enqueue();
        tracing::debug!(document_id, generation, "Evaluation queued");

        JobStatus {
            id: document_id.to_string(),
            state: JobState::Queued,
            result: None,
            error: None,
        }
    }
}

impl JobRunner {
    async fn run(self, mut receiver: mpsc::Receiver<Job>) {
        while let Some(job) = receiver.recv().await {
            self.process(job).await;
            let purged = self.status.purge_expired();
            if purged > 0 {
                tracing::debug!(purged, "Purged expired job records");
            }
        }
        tracing::info!("Evaluation queue closed; worker exiting");
    }

    async fn process(&self, job: Job) {
        let Job {
            document_id,
            generation,
        } = job;

        if !self
            .status
            .advance(&document_id, generation, JobState::Processing, None, None)
        {
            tracing::debug!(
                document_id = %document_id,
                generation,
                "Skipping superseded evaluation job"
            );
            return;
        }

        match self.evaluate(&document_id).await {
            Ok(result) => {
                let applied = self.status.advance(
                    &document_id,
                    generation,
                    JobState::Done,
                    Some(result),
                    None,
                );
                if applied {
                    self.metrics.record_done();
                    tracing::info!(document_id = %document_id, "Evaluation completed");
                } else {
                    tracing::debug!(
                        document_id = %document_id,
                        generation,
                        "Discarding result of superseded evaluation"
                    );
                }
            }
            Err(error) => {
                let state = error.job_state();
                if let EvaluationError::Parse { raw, .. } = &error {
                    tracing::debug!(document_id = %document_id, raw = %raw, "Unparseable evaluator output");
                }
                tracing::warn!(
                    document_id = %document_id,
                    state = %state,
                    error = %error,
                    "Evaluation did not complete"
                );
                let applied = self.status.advance(
                    &document_id,
                    generation,
                    state,
                    None,
                    Some(error.to_string()),
                );
                if applied {
                    match state {
                        JobState::Error => self.metrics.record_error(),
                        _ => self.metrics.record_failed(),
                    }
                }
            }
        }
    }

    async fn evaluate(&self, document_id: &str) -> Result<EvaluationResult, EvaluationError> {
        let document = self
            .lookup
            .fetch(document_id)
            .await?
            .ok_or_else(|| EvaluationError::NotFound(document_id.to_string()))?;

        let prompt = build_prompt(&self.rubrics, &document);
        let raw = match self.evaluation_timeout {
            Some(limit) => tokio::time::timeout(limit, self.evaluator.generate(&prompt))
                .await
                .map_err(|_| EvaluationError::Timeout(limit))??,
            None => self.evaluator.generate(&prompt).await?,
        };

        parse_evaluation(&raw).map_err(|source| EvaluationError::Parse {
            source,
            raw: strip_code_fence(&raw).to_string(),
        })
    }
}

impl EvaluationError {
    /// Terminal state recorded for this failure.
    pub fn job_state(&self) -> JobState {
        match self {
            Self::NotFound(_) | Self::Lookup(_) => JobState::Error,
            Self::Evaluator(_) | Self::Parse { .. } | Self::Timeout(_) => JobState::Failed,
        }
    }
}
