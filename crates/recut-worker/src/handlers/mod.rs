//! Kind-specific job handlers.
//!
//! Every handler first checks whether its output already exists in the
//! registry and short-circuits to success if so; retried attempts are
//! equivalent because job inputs are deterministic functions of registry
//! state.

mod apply;
mod clips;
mod frames;
mod index;
mod plan;
mod probe;
mod scenes;
mod silence;
mod transcribe;

pub use index::build_scene_index;

use std::path::PathBuf;

use tokio::sync::watch;

use recut_models::{Job, JobKind, Media};
use recut_registry::Registry;
use recut_storage::{layout, BlobStore};

use crate::context::WorkerContext;
use crate::error::{WorkerError, WorkerResult};

/// Dispatch a claimed job to its handler. Returns the job's result payload.
pub async fn handle(
    ctx: &WorkerContext,
    job: &Job,
    cancel: watch::Receiver<bool>,
) -> WorkerResult<serde_json::Value> {
    let _ = cancel;
    probe::run(ctx, job).await
}
