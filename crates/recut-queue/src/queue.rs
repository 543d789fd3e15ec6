//! Job queue using Redis Streams.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use redis::AsyncCommands;
use tracing::{debug, info, warn};

use crate::error::{QueueError, QueueResult};
use crate::message::QueuedJob;

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Redis URL
    pub redis_url: String,
    /// Stream name for jobs
    pub stream_name: String,
    /// Consumer group name
    pub consumer_group: String,
    /// TTL on deduplication keys
    pub dedup_ttl: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            stream_name: "recut:jobs".to_string(),
            consumer_group: "recut:workers".to_string(),
            dedup_ttl: Duration::from_secs(3600),
        }
    }
}

impl QueueConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            redis_url: std::env::var("RECUT_REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            stream_name: std::env::var("RECUT_QUEUE_STREAM")
                .unwrap_or_else(|_| "recut:jobs".to_string()),
            consumer_group: std::env::var("RECUT_QUEUE_GROUP")
                .unwrap_or_else(|_| "recut:workers".to_string()),
            dedup_ttl: Duration::from_secs(
                std::env::var("RECUT_QUEUE_DEDUP_TTL")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3600),
            ),
        }
    }
}

const SCHEDULED_KEY: &str = "recut:scheduled_jobs";

/// Job queue client.
pub struct JobQueue {
    client: redis::Client,
    config: QueueConfig,
}

impl JobQueue {
    /// Create a new job queue.
    pub fn new(config: QueueConfig) -> QueueResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> QueueResult<Self> {
        Self::new(QueueConfig::from_env())
    }

    /// Initialize the queue (create consumer group if not exists).
    pub async fn init(&self) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let result: Result<(), redis::RedisError> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg("$")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        match result {
            Ok(_) => info!("Created consumer group: {}", self.config.consumer_group),
            Err(e) if e.to_string().contains("BUSYGROUP") => {
                debug!("Consumer group already exists: {}", self.config.consumer_group);
            }
            Err(e) => return Err(QueueError::Redis(e)),
        }

        Ok(())
    }

    /// Enqueue a job. Returns the stream message ID.
    ///
    /// Rejects with `QueueError::Duplicate` when an identical logical
    /// attempt is already pending (dedup key held).
    pub async fn enqueue(&self, job: &QueuedJob) -> QueueResult<String> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let payload = serde_json::to_string(job)?;
        let dedup_key = format!("recut:dedup:{}", job.idempotency_key());

        let acquired: bool = redis::cmd("SET")
            .arg(&dedup_key)
            .arg(job.job_id.as_str())
            .arg("NX")
            .arg("EX")
            .arg(self.config.dedup_ttl.as_secs())
            .query_async(&mut conn)
            .await
            .map(|v: Option<String>| v.is_some())?;
        if !acquired {
            warn!(key = %job.idempotency_key(), "Duplicate job rejected");
            return Err(QueueError::duplicate(job.idempotency_key()));
        }

        let message_id: String = redis::cmd("XADD")
            .arg(&self.config.stream_name)
            .arg("*")
            .arg("job")
            .arg(&payload)
            .query_async(&mut conn)
            .await?;

        info!(job_id = %job.job_id, message_id = %message_id, kind = %job.kind, "Enqueued job");
        Ok(message_id)
    }

    /// Enqueue a job after a delay.
    ///
    /// The job is parked in a sorted set scored by its due time and moved to
    /// the stream by `pump_scheduled`. Used for retry backoff and for
    /// re-enqueueing jobs whose preconditions are not yet met.
    pub async fn enqueue_delayed(&self, job: &QueuedJob, delay: Duration) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let payload = serde_json::to_string(job)?;
        let visible_at = unix_now() + delay.as_secs();

        redis::cmd("ZADD")
            .arg(SCHEDULED_KEY)
            .arg(visible_at)
            .arg(&payload)
            .query_async::<()>(&mut conn)
            .await?;

        info!(
            job_id = %job.job_id,
            delay_secs = delay.as_secs(),
            "Scheduled job with delay"
        );
        Ok(())
    }

    /// Move due scheduled jobs onto the stream. Returns how many moved.
    pub async fn pump_scheduled(&self) -> QueueResult<usize> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let due: Vec<String> = redis::cmd("ZRANGEBYSCORE")
            .arg(SCHEDULED_KEY)
            .arg(0)
            .arg(unix_now())
            .query_async(&mut conn)
            .await?;

        if due.is_empty() {
            return Ok(0);
        }

        let mut moved = 0;
        for payload in &due {
            match serde_json::from_str::<QueuedJob>(payload) {
                Ok(job) => match self.enqueue(&job).await {
                    Ok(_) => moved += 1,
                    Err(QueueError::Duplicate { .. }) => {
                        debug!("Scheduled job was duplicate, dropping from schedule");
                    }
                    Err(e) => {
                        warn!("Failed to enqueue scheduled job: {}", e);
                        continue; // keep it scheduled
                    }
                },
                Err(e) => {
                    warn!("Failed to parse scheduled job: {}", e);
                }
            }

            redis::cmd("ZREM")
                .arg(SCHEDULED_KEY)
                .arg(payload)
                .query_async::<()>(&mut conn)
                .await
                .ok();
        }

        if moved > 0 {
            info!(count = moved, "Moved scheduled jobs to main queue");
        }
        Ok(moved)
    }

    /// Consume jobs from the queue as `(message_id, job)` pairs.
    pub async fn consume(
        &self,
        consumer_name: &str,
        block_ms: u64,
        count: usize,
    ) -> QueueResult<Vec<(String, QueuedJob)>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let reply: redis::streams::StreamReadReply = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.config.consumer_group)
            .arg(consumer_name)
            .arg("COUNT")
            .arg(count)
            .arg("BLOCK")
            .arg(block_ms)
            .arg("STREAMS")
            .arg(&self.config.stream_name)
            .arg(">")
            .query_async(&mut conn)
            .await?;

        let mut jobs = Vec::new();
        for stream_key in reply.keys {
            for entry in stream_key.ids {
                let message_id = entry.id.clone();
                if let Some(redis::Value::BulkString(payload)) = entry.map.get("job") {
                    let payload_str = String::from_utf8_lossy(payload);
                    match serde_json::from_str::<QueuedJob>(&payload_str) {
                        Ok(job) => {
                            debug!(job_id = %job.job_id, "Consumed job from stream");
                            jobs.push((message_id, job));
                        }
                        Err(e) => {
                            warn!("Failed to parse job payload, acking poison message: {}", e);
                            self.ack(&message_id).await.ok();
                        }
                    }
                }
            }
        }
        Ok(jobs)
    }

    /// Claim pending deliveries idle for at least `min_idle` (crashed-worker
    /// recovery). Uses XAUTOCLAIM so the scan cursor lives server-side.
    pub async fn claim_pending(
        &self,
        consumer_name: &str,
        min_idle: Duration,
        count: usize,
    ) -> QueueResult<Vec<(String, QueuedJob)>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let reply: redis::streams::StreamAutoClaimReply = redis::cmd("XAUTOCLAIM")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(consumer_name)
            .arg(min_idle.as_millis() as u64)
            .arg("0-0")
            .arg("COUNT")
            .arg(count)
            .query_async(&mut conn)
            .await?;

        let mut jobs = Vec::new();
        for entry in reply.claimed {
            let message_id = entry.id.clone();
            if let Some(redis::Value::BulkString(payload)) = entry.map.get("job") {
                let payload_str = String::from_utf8_lossy(payload);
                match serde_json::from_str::<QueuedJob>(&payload_str) {
                    Ok(job) => {
                        info!(job_id = %job.job_id, "Claimed pending job from crashed worker");
                        jobs.push((message_id, job));
                    }
                    Err(e) => {
                        warn!("Failed to parse claimed payload, acking: {}", e);
                        self.ack(&message_id).await.ok();
                    }
                }
            }
        }
        Ok(jobs)
    }

    /// Acknowledge a delivered message and drop it from the stream.
    pub async fn ack(&self, message_id: &str) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        redis::cmd("XACK")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        redis::cmd("XDEL")
            .arg(&self.config.stream_name)
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        debug!("Acknowledged message: {}", message_id);
        Ok(())
    }

    /// Clear the dedup key for a job so a later attempt can re-enqueue.
    pub async fn clear_dedup(&self, job: &QueuedJob) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let dedup_key = format!("recut:dedup:{}", job.idempotency_key());
        conn.del::<_, ()>(&dedup_key).await?;
        debug!("Cleared dedup key: {}", dedup_key);
        Ok(())
    }

    /// Reset the idle timer on a message still being processed so the claim
    /// task does not steal it from a live worker.
    pub async fn refresh_visibility(
        &self,
        consumer_name: &str,
        message_id: &str,
    ) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let _res: redis::Value = redis::cmd("XCLAIM")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(consumer_name)
            .arg(0)
            .arg(message_id)
            .arg("JUSTID")
            .query_async(&mut conn)
            .await?;

        Ok(())
    }

    /// Current queue length.
    pub async fn len(&self) -> QueueResult<u64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let len: u64 = conn.xlen(&self.config.stream_name).await?;
        Ok(len)
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
