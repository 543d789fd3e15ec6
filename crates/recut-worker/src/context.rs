//! Shared handler context.

use std::sync::Arc;

use tokio::sync::Semaphore;

use recut_planner::StoryModel;
use recut_queue::JobQueue;
use recut_registry::Registry;
use recut_storage::BlobStore;

use crate::capabilities::{FrameDescriber, Transcriber};
use crate::config::RecutConfig;

/// Everything a job handler needs, owned explicitly by the worker process
/// (no module-level singletons).
pub struct WorkerContext {
    pub config: RecutConfig,
    pub registry: Arc<dyn Registry>,
    pub blobs: Arc<dyn BlobStore>,
    pub queue: Arc<JobQueue>,
    pub transcriber: Arc<dyn Transcriber>,
    /// Optional: frame description is skipped when no vision service is
    /// configured.
    pub describer: Option<Arc<dyn FrameDescriber>>,
    pub story_model: Arc<dyn StoryModel>,
    /// Bounds in-flight external-model calls across all workers in this
    /// process.
    pub model_semaphore: Arc<Semaphore>,
}

impl WorkerContext {
    pub fn new(
        config: RecutConfig,
        registry: Arc<dyn Registry>,
        blobs: Arc<dyn BlobStore>,
        queue: Arc<JobQueue>,
        transcriber: Arc<dyn Transcriber>,
        describer: Option<Arc<dyn FrameDescriber>>,
        story_model: Arc<dyn StoryModel>,
    ) -> Self {
        let model_semaphore = Arc::new(Semaphore::new(config.model_concurrency_limit));
        Self {
            config,
            registry,
            blobs,
            queue,
            transcriber,
            describer,
            story_model,
            model_semaphore,
        }
    }
}
