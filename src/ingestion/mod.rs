//! Document submission pipeline.

pub mod service;
pub mod types;

pub use service::{IngestionDeps, IngestionService, IngestionSettings};
pub use types::{DEFAULT_CONTENT_TYPE, SubmitError, Upload};
