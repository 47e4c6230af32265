//! Tracing setup for the server process.
//!
//! Three sinks are installed:
//!
//! - stdout, compact, no targets;
//! - `docrubric.log` in the log directory, rotated daily, carrying everything that passes the
//!   global filter;
//! - `evaluations.log` in the same directory, carrying only evaluation worker events so a job's
//!   lifecycle (queued, processing, terminal state) can be audited without the HTTP noise.
//!
//! The directory comes from `DOCRUBRIC_LOG_DIR` and defaults to `logs`. When it cannot be
//! created, only stdout logging is installed.
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing::Level;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, filter::Targets, fmt, prelude::*};

/// Target prefix shared by evaluation queue and worker events.
pub const EVALUATION_TARGET: &str = "docrubric::evaluation";

/// Filter used when `RUST_LOG` is unset: our crate at `info`, dependencies at `warn`.
pub const DEFAULT_FILTER: &str = "warn,docrubric=info";

const DEFAULT_LOG_DIR: &str = "logs";

static LOG_GUARDS: OnceLock<Vec<WorkerGuard>> = OnceLock::new();

/// Install the global subscriber.
///
/// Respects `RUST_LOG`, falling back to [`DEFAULT_FILTER`]. Writer guards are parked in a
/// static so buffered lines are flushed for the life of the process.
pub fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let stdout_layer = fmt::layer().with_target(false).compact();

    let mut guards = Vec::new();
    let (service_writer, evaluation_writer) = match log_dir() {
        Some(dir) => (
            Some(rolling_writer(&dir, "docrubric.log", &mut guards)),
            Some(rolling_writer(&dir, "evaluations.log", &mut guards)),
        ),
        None => (None, None),
    };

    let service_layer = service_writer.map(|writer| {
        fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_ansi(false)
            .compact()
    });
    let evaluation_layer = evaluation_writer.map(|writer| {
        fmt::layer()
            .with_writer(writer)
            .with_target(false)
            .with_ansi(false)
            .compact()
            .with_filter(evaluation_targets())
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(service_layer)
        .with(evaluation_layer)
        .init();

    let _ = LOG_GUARDS.set(guards);
}

/// Per-layer filter admitting only evaluation events.
fn evaluation_targets() -> Targets {
    Targets::new().with_target(EVALUATION_TARGET, Level::DEBUG)
}

/// Resolve and create the log directory, or `None` when it cannot be created.
fn log_dir() -> Option<PathBuf> {
    let dir = std::env::var_os("DOCRUBRIC_LOG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR));
    match std::fs::create_dir_all(&dir) {
        Ok(()) => Some(dir),
        Err(err) => {
            eprintln!("Failed to create log directory {}: {err}", dir.display());
            None
        }
    }
}

fn rolling_writer(dir: &Path, file_name: &str, guards: &mut Vec<WorkerGuard>) -> NonBlocking {
    let appender = tracing_appender::rolling::daily(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    guards.push(guard);
    writer
}
