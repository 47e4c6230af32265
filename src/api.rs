//! HTTP surface for docrubric.
//!
//! A thin Axum binding over the ingestion service, the document lookup, and the evaluation
//! worker:
//!
//! - `POST /documents` – multipart upload (`owner_id`, `title`, `file`); returns the stored
//!   document with `201 Created`.
//! - `GET /documents/{id}` – indexed view of a document with a presigned file URL.
//! - `POST /documents/{id}/evaluate` – queue a rubric evaluation; returns `202 Accepted`.
//! - `GET /documents/{id}/status` and `GET /documents/{id}/result` – poll the job status.
//! - `GET /metrics` – submission and evaluation counters.
//! - `GET /commands` – machine-readable command catalog.
//!
//! There is no authentication; deploy behind a trusted gateway.

use crate::documents::{Document, DocumentLookup, DocumentView};
use crate::evaluation::{EnqueueError, EvaluationWorker, JobStatus};
use crate::ingestion::{IngestionService, SubmitError, Upload};
use crate::metrics::{MetricsSnapshot, PipelineMetrics};
use crate::qdrant::QdrantError;
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, State, multipart::MultipartError},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// Largest accepted multipart body.
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Shared handles injected into every handler.
#[derive(Clone)]
pub struct AppState {
    /// Submission pipeline.
    pub ingestion: Arc<IngestionService>,
    /// Indexed read path.
    pub lookup: DocumentLookup,
    /// Evaluation queue and status table.
    pub worker: EvaluationWorker,
    /// Pipeline counters.
    pub metrics: Arc<PipelineMetrics>,
    /// How long `POST /documents/{id}/evaluate` waits for a queue slot.
    pub enqueue_timeout: Duration,
}

/// Build the HTTP router exposing the document and evaluation API.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/documents", post(submit_document))
        .route("/documents/:id", get(get_document))
        .route("/documents/:id/evaluate", post(evaluate_document))
        .route("/documents/:id/status", get(get_status))
        .route("/documents/:id/result", get(get_status))
        .route("/metrics", get(get_metrics))
        .route("/commands", get(get_commands))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

/// Accept a multipart upload and run it through the ingestion pipeline.
async fn submit_document(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Document>), AppError> {
    let form = read_submission(multipart).await?;
    let document = state
        .ingestion
        .submit(&form.owner_id, &form.title, form.upload)
        .await?;
    Ok((StatusCode::CREATED, Json(document)))
}

struct SubmissionForm {
    owner_id: String,
    title: String,
    upload: Upload,
}

async fn read_submission(mut multipart: Multipart) -> Result<SubmissionForm, AppError> {
    let mut owner_id = None;
    let mut title = None;
    let mut upload = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("owner_id") => owner_id = Some(field.text().await?),
            Some("title") => title = Some(field.text().await?),
            Some("file") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;
                upload = Some(Upload::new(file_name, content_type, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let missing = |name: &str| AppError::BadRequest(format!("missing multipart field `{name}`"));
    Ok(SubmissionForm {
        owner_id: owner_id.ok_or_else(|| missing("owner_id"))?,
        title: title.ok_or_else(|| missing("title"))?,
        upload: upload.ok_or_else(|| missing("file"))?,
    })
}

/// Return the indexed view of a document, with its file reference presigned.
async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DocumentView>, AppError> {
    state
        .lookup
        .fetch(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("document {id} not found")))
}

/// Response body for `POST /documents/{id}/evaluate`.
#[derive(Serialize)]
struct EnqueueResponse {
    id: String,
    status: &'static str,
}

/// Queue an evaluation for a document.
async fn evaluate_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<EnqueueResponse>), AppError> {
    let queued = state
        .worker
        .enqueue_with_timeout(&id, state.enqueue_timeout)
        .await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(EnqueueResponse {
            id: queued.id,
            status: queued.state.as_str(),
        }),
    ))
}

/// Report the status (and result, once done) of a document's latest evaluation.
async fn get_status(State(state): State<AppState>, Path(id): Path<String>) -> Json<JobStatus> {
    Json(state.worker.get_status(&id))
}

/// Return a snapshot of pipeline counters.
async fn get_metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery by hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "submit_document",
                method: "POST",
                path: "/documents",
                description: "Upload a document as multipart form data. Text is extracted, embedded, and stored in the document store and vector index.",
                request_example: Some(json!({
                    "owner_id": "owner-123",
                    "title": "Backend CV",
                    "file": "<binary PDF>"
                })),
            },
            CommandDescriptor {
                name: "get_document",
                method: "GET",
                path: "/documents/{id}",
                description: "Return the indexed document with a presigned URL for the original file.",
                request_example: None,
            },
            CommandDescriptor {
                name: "evaluate_document",
                method: "POST",
                path: "/documents/{id}/evaluate",
                description: "Queue a rubric evaluation. Response returns { \"id\": string, \"status\": \"queued\" }.",
                request_example: None,
            },
            CommandDescriptor {
                name: "evaluation_status",
                method: "GET",
                path: "/documents/{id}/status",
                description: "Poll evaluation state: not_found, queued, processing, done, error, or failed. The result is attached once done.",
                request_example: None,
            },
            CommandDescriptor {
                name: "evaluation_result",
                method: "GET",
                path: "/documents/{id}/result",
                description: "Alias of the status endpoint.",
                request_example: None,
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return submission and evaluation counters.",
                request_example: None,
            },
        ],
    })
}

enum AppError {
    BadRequest(String),
    NotFound(String),
    Submit(SubmitError),
    Lookup(QdrantError),
    Enqueue(EnqueueError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::NotFound(message) => (StatusCode::NOT_FOUND, message),
            Self::Submit(error @ SubmitError::InvalidInput(_)) => {
                (StatusCode::BAD_REQUEST, error.to_string())
            }
            Self::Submit(error) => (StatusCode::INTERNAL_SERVER_ERROR, error.to_string()),
            Self::Lookup(error) => {
                tracing::warn!(error = %error, "Document lookup failed");
                (StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
            }
            Self::Enqueue(error) => (StatusCode::SERVICE_UNAVAILABLE, error.to_string()),
        };
        (status, message).into_response()
    }
}

impl From<SubmitError> for AppError {
    fn from(inner: SubmitError) -> Self {
        Self::Submit(inner)
    }
}

impl From<QdrantError> for AppError {
    fn from(inner: QdrantError) -> Self {
        Self::Lookup(inner)
    }
}

impl From<EnqueueError> for AppError {
    fn from(inner: EnqueueError) -> Self {
        Self::Enqueue(inner)
    }
}

impl From<MultipartError> for AppError {
    fn from(inner: MultipartError) -> Self {
        Self::BadRequest(inner.body_text())
    }
}
