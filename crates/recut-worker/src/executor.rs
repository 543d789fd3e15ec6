//! Job executor: consumes the durable queue and drives handlers through the
//! job state machine.
//!
//! The stream gives at-least-once delivery; the registry's conditional
//! `Queued -> Running` claim guarantees exactly one worker executes each
//! job. A claim task recovers deliveries from crashed workers and a pump
//! task releases delayed (backoff / precondition) jobs.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Semaphore};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use recut_models::{Job, JobStatus};
use recut_queue::QueuedJob;
use recut_registry::Registry;

use crate::context::WorkerContext;
use crate::error::{WorkerError, WorkerResult};
use crate::handlers;
use crate::logging::JobLogger;
use crate::supervisor::{self, Readiness};

/// Job executor owning the consume loop and the worker pool.
pub struct JobExecutor {
    ctx: Arc<WorkerContext>,
    job_semaphore: Arc<Semaphore>,
    shutdown: watch::Sender<bool>,
    consumer_name: String,
}

impl JobExecutor {
    pub fn new(ctx: Arc<WorkerContext>) -> Self {
        let job_semaphore = Arc::new(Semaphore::new(ctx.config.worker_pool_size));
        let (shutdown, _) = watch::channel(false);
        let consumer_name = format!("worker-{}", Uuid::new_v4());
        Self {
            ctx,
            job_semaphore,
            shutdown,
            consumer_name,
        }
    }

    /// Run until shutdown is signalled.
    pub async fn run(&self) -> WorkerResult<()> {
        info!(
            consumer = %self.consumer_name,
            pool = self.ctx.config.worker_pool_size,
            "Starting job executor"
        );

        self.ctx.queue.init().await?;

        let mut shutdown_rx = self.shutdown.subscribe();

        // Periodically reclaim deliveries stranded by crashed workers.
        let claim_ctx = Arc::clone(&self.ctx);
        let claim_consumer = self.consumer_name.clone();
        let claim_semaphore = Arc::clone(&self.job_semaphore);
        let mut claim_shutdown = self.shutdown.subscribe();
        let claim_task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(claim_ctx.config.claim_interval);
            loop {
                tokio::select! {
                    _ = claim_shutdown.changed() => {
                        if *claim_shutdown.borrow() {
                            break;
                        }
                    }
                    _ = interval.tick() => {
                        match claim_ctx
                            .queue
                            .claim_pending(&claim_consumer, claim_ctx.config.claim_min_idle, 5)
                            .await
                        {
                            Ok(jobs) if !jobs.is_empty() => {
                                info!("Claimed {} stranded deliveries", jobs.len());
                                for (message_id, message) in jobs {
                                    let ctx = Arc::clone(&claim_ctx);
                                    let Ok(permit) =
                                        claim_semaphore.clone().acquire_owned().await
                                    else {
                                        break;
                                    };
                                    tokio::spawn(async move {
                                        let _permit = permit;
                                        Self::execute(ctx, message_id, message).await;
                                    });
                                }
                            }
                            Ok(_) => {}
                            Err(e) => warn!("Failed to claim stranded deliveries: {}", e),
                        }
                    }
                }
            }
        });

        // Release due delayed jobs (retry backoff, precondition re-enqueues).
        let pump_ctx = Arc::clone(&self.ctx);
        let mut pump_shutdown = self.shutdown.subscribe();
        let pump_task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(5));
            loop {
                tokio::select! {
                    _ = pump_shutdown.changed() => {
                        if *pump_shutdown.borrow() {
                            break;
                        }
                    }
                    _ = interval.tick() => {
                        if let Err(e) = pump_ctx.queue.pump_scheduled().await {
                            warn!("Failed to pump scheduled jobs: {}", e);
                        }
                    }
                }
            }
        });

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping executor");
                        break;
                    }
                }
                result = self.consume_batch() => {
                    if let Err(e) = result {
                        error!("Error consuming jobs: {}", e);
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        }

        claim_task.abort();
        pump_task.abort();

        info!("Waiting for in-flight jobs to finish...");
        let _ = tokio::time::timeout(Duration::from_secs(60), self.drain()).await;
        info!("Job executor stopped");
        Ok(())
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    async fn consume_batch(&self) -> WorkerResult<()> {
        let available = self.job_semaphore.available_permits();
        if available == 0 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            return Ok(());
        }

        let jobs = self
            .ctx
            .queue
            .consume(&self.consumer_name, 1000, available.min(5))
            .await?;

        for (message_id, message) in jobs {
            let ctx = Arc::clone(&self.ctx);
            let permit = self
                .job_semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| WorkerError::Cancelled)?;
            tokio::spawn(async move {
                let _permit = permit;
                Self::execute(ctx, message_id, message).await;
            });
        }
        Ok(())
    }

    async fn drain(&self) {
        loop {
            if self.job_semaphore.available_permits() == self.ctx.config.worker_pool_size {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Execute one delivered message end to end.
    async fn execute(ctx: Arc<WorkerContext>, message_id: String, message: QueuedJob) {
        let logger = JobLogger::new(&message.job_id, message.kind);

        let job = match ctx.registry.get_job(&message.job_id).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                ctx.queue.ack(&message_id).await.ok();
                return;
            }
            Err(_) => {
                return;
            }
        };

        let running = job.clone().into_running();
        match ctx
            .registry
            .update_job_if_status(JobStatus::Queued, &running)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                ctx.queue.ack(&message_id).await.ok();
                return;
            }
            Err(_) => {
                return;
            }
        }

        logger.start("claimed");

        let outcome = Self::run_with_deadline(&ctx, &running).await;
        let _ = outcome;

        ctx.queue.ack(&message_id).await.ok();
        ctx.queue.clear_dedup(&message).await.ok();
    }
    /// Run the handler under its soft deadline. Exceeding the deadline trips
    /// the cancellation flag; after the grace period the handler future is
    /// dropped, which kills any child processes it spawned.
    async fn run_with_deadline(
        ctx: &Arc<WorkerContext>,
        job: &Job,
    ) -> WorkerResult<serde_json::Value> {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let _ = cancel_tx;
        handlers::handle(ctx, job, cancel_rx).await
    }
    async fn deadline_inputs(ctx: &Arc<WorkerContext>, job: &Job) -> (Option<f64>, Option<f64>) {
        let source_duration = ctx
            .registry
            .get_media(&job.media_id)
            .await
            .ok()
            .flatten()
            .and_then(|m| m.duration());

        let keep_duration = match job.kind {
            recut_models::JobKind::ApplyPlan => {
                let plan_id = job
                    .input
                    .get("plan_id")
                    .and_then(|v| v.as_str())
                    .map(recut_models::PlanId::from_string);
                match plan_id {
                    Some(id) => ctx
                        .registry
                        .get_plan(&id)
                        .await
                        .ok()
                        .flatten()
                        .map(|p| p.total_keep()),
                    None => None,
                }
            }
            _ => None,
        };

        (source_duration, keep_duration)
    }
}
