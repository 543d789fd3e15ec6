//! API server entry point.

use std::sync::Arc;

use tracing::info;

use recut_api::{create_router, ApiConfig, AppState};
use recut_queue::JobQueue;
use recut_registry::RedisRegistry;
use recut_storage::FsBlobStore;
use recut_worker::{init_tracing, RecutConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let api_config = ApiConfig::from_env();
    let pipeline_config = RecutConfig::from_env();

    let registry = Arc::new(RedisRegistry::from_env()?);
    let queue = Arc::new(JobQueue::from_env()?);
    queue.init().await?;
    let blobs = Arc::new(FsBlobStore::from_env());

    let metrics_handle = recut_api::metrics::install_metrics(api_config.enable_metrics);

    let bind_addr = api_config.bind_addr.clone();
    let state = AppState::new(api_config, pipeline_config, registry, queue, blobs);
    let router = create_router(state, metrics_handle);

    info!(addr = %bind_addr, "Starting API server");
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}
