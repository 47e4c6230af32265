//! Asynchronous rubric evaluation of stored documents.
//!
//! Callers enqueue a document ID and poll its status. A single background task consumes the
//! queue in FIFO order, resolves the document through the vector index, asks the evaluator to
//! score it against the [`RubricCatalog`], and records a terminal state.

pub mod prompt;
pub mod rubric;
pub mod status;
pub mod types;
pub mod worker;

pub use prompt::{build_prompt, parse_evaluation, strip_code_fence};
pub use rubric::{Rubric, RubricCatalog};
pub use status::{JobState, JobStatus, StatusTable};
pub use types::{EnqueueError, EvaluationError, EvaluationResult};
pub use worker::{EvaluationWorker, WorkerSettings};
