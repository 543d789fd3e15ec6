//! Structured job logging utilities.

use tracing::{error, info, warn, Span};
use tracing_subscriber::EnvFilter;

use recut_models::{JobId, JobKind};

/// Initialise the global tracing subscriber from `RUST_LOG`.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();
}

/// Job logger with consistent contextual fields.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    kind: &'static str,
}

impl JobLogger {
    pub fn new(job_id: &JobId, kind: JobKind) -> Self {
        Self {
            job_id: job_id.to_string(),
            kind: kind.as_str(),
        }
    }

    pub fn start(&self, message: &str) {
        info!(job_id = %self.job_id, kind = %self.kind, "Job started: {}", message);
    }

    pub fn progress(&self, message: &str) {
        info!(job_id = %self.job_id, kind = %self.kind, "Job progress: {}", message);
    }

    pub fn warning(&self, message: &str) {
        warn!(job_id = %self.job_id, kind = %self.kind, "Job warning: {}", message);
    }

    pub fn failure(&self, message: &str) {
        error!(job_id = %self.job_id, kind = %self.kind, "Job error: {}", message);
    }

    pub fn completion(&self, message: &str) {
        info!(job_id = %self.job_id, kind = %self.kind, "Job completed: {}", message);
    }

    /// Span for attaching further structured fields.
    pub fn span(&self) -> Span {
        tracing::info_span!("job", job_id = %self.job_id, kind = %self.kind)
    }
}
