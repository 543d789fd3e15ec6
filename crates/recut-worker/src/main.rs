//! Worker entry point.

use std::sync::Arc;

use tracing::info;

use recut_planner::HttpStoryModel;
use recut_queue::JobQueue;
use recut_registry::RedisRegistry;
use recut_storage::FsBlobStore;
use recut_worker::{
    init_tracing, HttpFrameDescriber, HttpTranscriber, JobExecutor, RecutConfig, WorkerContext,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = RecutConfig::from_env();
    info!(pool = config.worker_pool_size, "Loading worker configuration");

    recut_media::check_ffmpeg()?;
    recut_media::check_ffprobe()?;

    let registry = Arc::new(RedisRegistry::from_env()?);
    let queue = Arc::new(JobQueue::from_env()?);
    let blobs = Arc::new(FsBlobStore::from_env());
    let transcriber = Arc::new(HttpTranscriber::from_env()?);
    let describer = match HttpFrameDescriber::from_env() {
        Some(result) => Some(Arc::new(result?) as Arc<dyn recut_worker::FrameDescriber>),
        None => None,
    };
    let story_model = Arc::new(HttpStoryModel::from_env(config.plan_temperature)?);

    let ctx = Arc::new(WorkerContext::new(
        config,
        registry,
        blobs,
        queue,
        transcriber,
        describer,
        story_model,
    ));

    let executor = Arc::new(JobExecutor::new(ctx));

    let shutdown_executor = Arc::clone(&executor);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, shutting down");
            shutdown_executor.shutdown();
        }
    });

    executor.run().await?;
    Ok(())
}
