//! Shared application state.

use std::sync::Arc;

use recut_queue::JobQueue;
use recut_registry::Registry;
use recut_storage::BlobStore;
use recut_worker::RecutConfig;

use crate::config::ApiConfig;

/// Handles shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub api_config: Arc<ApiConfig>,
    pub pipeline_config: Arc<RecutConfig>,
    pub registry: Arc<dyn Registry>,
    pub queue: Arc<JobQueue>,
    pub blobs: Arc<dyn BlobStore>,
}

impl AppState {
    pub fn new(
        api_config: ApiConfig,
        pipeline_config: RecutConfig,
        registry: Arc<dyn Registry>,
        queue: Arc<JobQueue>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            api_config: Arc::new(api_config),
            pipeline_config: Arc::new(pipeline_config),
            registry,
            queue,
            blobs,
        }
    }
}
