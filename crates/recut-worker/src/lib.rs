//! Worker process: the job orchestrator's execution half.
//!
//! Owns the worker pool, the kind-specific handlers, retry supervision and
//! the capability clients for the external speech, vision and planning
//! services.

pub mod capabilities;
pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod handlers;
pub mod logging;
pub mod supervisor;

pub use capabilities::{
    CapabilityClientConfig, FrameDescriber, HttpFrameDescriber, HttpTranscriber, Transcriber,
    TranscriptPayload,
};
pub use config::RecutConfig;
pub use context::WorkerContext;
pub use error::{WorkerError, WorkerResult};
pub use executor::JobExecutor;
pub use logging::{init_tracing, JobLogger};
