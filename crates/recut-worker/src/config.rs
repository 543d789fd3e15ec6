//! Worker configuration.
//!
//! One explicit struct enumerating every pipeline option; constructed once
//! at startup and passed through handlers as a read-only value.

use std::time::Duration;

use recut_models::JobKind;

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct RecutConfig {
    /// Parallel workers in the pool
    pub worker_pool_size: usize,
    /// Total attempts allowed for transient job kinds
    pub max_attempts_default: u32,
    /// Retries allowed after the first PlanStory failure
    pub max_attempts_plan_story: u32,
    /// Base of the exponential retry backoff, in seconds
    pub retry_backoff_base_s: u64,
    /// Uniform jitter added to each backoff, in seconds
    pub retry_jitter_s: u64,
    /// Probe soft deadline, in seconds
    pub probe_timeout_s: u64,
    /// Minimum silence interval length, in seconds
    pub min_silence_s: f64,
    /// Frame sampling interval, in seconds
    pub frame_sample_s: f64,
    /// Minimum clip candidate length, in seconds
    pub clip_min_s: f64,
    /// Maximum clip candidate length, in seconds
    pub clip_max_s: f64,
    /// Maximum clip candidates
    pub clip_n: usize,
    /// Compressor frame ceiling
    pub compress_frame_cap: usize,
    /// Compressor scene ceiling
    pub compress_scene_cap: usize,
    /// Compressor transcript-segment ceiling
    pub compress_segment_cap: usize,
    /// Planner sampling temperature
    pub plan_temperature: f64,
    /// Coverage tolerance band, in percent of the target
    pub plan_coverage_tolerance_pct: f64,
    /// Reference width for aspect-ratio target frames
    pub render_reference_width: u32,
    /// Loudness normalisation target, in LUFS
    pub render_loudness_target_lufs: f64,
    /// Parallel segment extractions within one ratio
    pub render_segment_parallelism: usize,
    /// Concurrent in-flight external-model calls
    pub model_concurrency_limit: usize,
    /// Scene-change score threshold
    pub scene_threshold: f64,
    /// How long a handler gets to wind down after cancellation
    pub cancel_grace: Duration,
    /// How often the claim task scans for orphaned deliveries
    pub claim_interval: Duration,
    /// Minimum delivery idle time before reclaim
    pub claim_min_idle: Duration,
    /// Delay before re-enqueueing a job whose preconditions are unmet
    pub precondition_retry_delay: Duration,
}

impl Default for RecutConfig {
    fn default() -> Self {
        Self {
            worker_pool_size: 4,
            max_attempts_default: 3,
            max_attempts_plan_story: 1,
            retry_backoff_base_s: 60,
            retry_jitter_s: 10,
            probe_timeout_s: 30,
            min_silence_s: 0.6,
            frame_sample_s: 1.0,
            clip_min_s: 15.0,
            clip_max_s: 60.0,
            clip_n: 5,
            compress_frame_cap: 50,
            compress_scene_cap: 20,
            compress_segment_cap: 100,
            plan_temperature: 0.3,
            plan_coverage_tolerance_pct: 10.0,
            render_reference_width: 1080,
            render_loudness_target_lufs: -16.0,
            render_segment_parallelism: 4,
            model_concurrency_limit: 4,
            scene_threshold: 0.4,
            cancel_grace: Duration::from_secs(15),
            claim_interval: Duration::from_secs(60),
            claim_min_idle: Duration::from_secs(1800),
            precondition_retry_delay: Duration::from_secs(5),
        }
    }
}

impl RecutConfig {
    /// Create config from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            worker_pool_size: env_parse("RECUT_WORKER_POOL_SIZE", defaults.worker_pool_size),
            max_attempts_default: env_parse("RECUT_MAX_ATTEMPTS", defaults.max_attempts_default),
            max_attempts_plan_story: env_parse(
                "RECUT_MAX_ATTEMPTS_PLAN_STORY",
                defaults.max_attempts_plan_story,
            ),
            retry_backoff_base_s: env_parse(
                "RECUT_RETRY_BACKOFF_BASE_S",
                defaults.retry_backoff_base_s,
            ),
            retry_jitter_s: env_parse("RECUT_RETRY_JITTER_S", defaults.retry_jitter_s),
            probe_timeout_s: env_parse("RECUT_PROBE_TIMEOUT_S", defaults.probe_timeout_s),
            min_silence_s: env_parse("RECUT_MIN_SILENCE_S", defaults.min_silence_s),
            frame_sample_s: env_parse("RECUT_FRAME_SAMPLE_S", defaults.frame_sample_s),
            clip_min_s: env_parse("RECUT_CLIP_MIN_S", defaults.clip_min_s),
            clip_max_s: env_parse("RECUT_CLIP_MAX_S", defaults.clip_max_s),
            clip_n: env_parse("RECUT_CLIP_N", defaults.clip_n),
            compress_frame_cap: env_parse("RECUT_COMPRESS_FRAME_CAP", defaults.compress_frame_cap),
            compress_scene_cap: env_parse("RECUT_COMPRESS_SCENE_CAP", defaults.compress_scene_cap),
            compress_segment_cap: env_parse(
                "RECUT_COMPRESS_SEGMENT_CAP",
                defaults.compress_segment_cap,
            ),
            plan_temperature: env_parse("RECUT_PLAN_TEMPERATURE", defaults.plan_temperature),
            plan_coverage_tolerance_pct: env_parse(
                "RECUT_PLAN_COVERAGE_TOLERANCE_PCT",
                defaults.plan_coverage_tolerance_pct,
            ),
            render_reference_width: env_parse(
                "RECUT_RENDER_REFERENCE_WIDTH",
                defaults.render_reference_width,
            ),
            render_loudness_target_lufs: env_parse(
                "RECUT_RENDER_LOUDNESS_LUFS",
                defaults.render_loudness_target_lufs,
            ),
            render_segment_parallelism: env_parse(
                "RECUT_RENDER_SEGMENT_PARALLELISM",
                defaults.render_segment_parallelism,
            ),
            model_concurrency_limit: env_parse(
                "RECUT_MODEL_CONCURRENCY",
                defaults.model_concurrency_limit,
            ),
            scene_threshold: env_parse("RECUT_SCENE_THRESHOLD", defaults.scene_threshold),
            cancel_grace: Duration::from_secs(env_parse(
                "RECUT_CANCEL_GRACE_S",
                defaults.cancel_grace.as_secs(),
            )),
            claim_interval: Duration::from_secs(env_parse(
                "RECUT_CLAIM_INTERVAL_S",
                defaults.claim_interval.as_secs(),
            )),
            claim_min_idle: Duration::from_secs(env_parse(
                "RECUT_CLAIM_MIN_IDLE_S",
                defaults.claim_min_idle.as_secs(),
            )),
            precondition_retry_delay: Duration::from_secs(env_parse(
                "RECUT_PRECONDITION_RETRY_S",
                defaults.precondition_retry_delay.as_secs(),
            )),
        }
    }

    /// Total attempts allowed for a kind before the supervisor gives up.
    pub fn max_attempts_for(&self, kind: JobKind) -> u32 {
        match kind {
            JobKind::PlanStory => 1 + self.max_attempts_plan_story,
            JobKind::PlanHeuristic => 1,
            _ => self.max_attempts_default,
        }
    }

    /// Soft deadline for a job. Scales with the source for decode-heavy
    /// kinds and with the plan's Keep duration for renders.
    pub fn soft_deadline(
        &self,
        kind: JobKind,
        source_duration: Option<f64>,
        keep_duration: Option<f64>,
    ) -> Duration {
        let scaled = |factor: f64, base: Option<f64>| {
            let secs = base.unwrap_or(0.0).max(60.0) * factor;
            Duration::from_secs_f64(secs)
        };
        match kind {
            JobKind::Probe => Duration::from_secs(self.probe_timeout_s),
            JobKind::Transcribe | JobKind::DetectScenes => scaled(3.0, source_duration),
            JobKind::ApplyPlan => scaled(5.0, keep_duration),
            _ => Duration::from_secs(600),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_contract() {
        let c = RecutConfig::default();
        assert_eq!(c.max_attempts_default, 3);
        assert_eq!(c.retry_backoff_base_s, 60);
        assert_eq!(c.min_silence_s, 0.6);
        assert_eq!(c.clip_n, 5);
        assert_eq!(c.compress_frame_cap, 50);
        assert_eq!(c.render_reference_width, 1080);
        assert_eq!(c.render_loudness_target_lufs, -16.0);
    }

    #[test]
    fn test_attempts_per_kind() {
        let c = RecutConfig::default();
        assert_eq!(c.max_attempts_for(JobKind::Transcribe), 3);
        assert_eq!(c.max_attempts_for(JobKind::PlanStory), 2);
        assert_eq!(c.max_attempts_for(JobKind::PlanHeuristic), 1);
    }

    #[test]
    fn test_deadlines_scale() {
        let c = RecutConfig::default();
        assert_eq!(c.soft_deadline(JobKind::Probe, None, None), Duration::from_secs(30));
        assert_eq!(
            c.soft_deadline(JobKind::Transcribe, Some(100.0), None),
            Duration::from_secs_f64(300.0)
        );
        assert_eq!(
            c.soft_deadline(JobKind::ApplyPlan, Some(100.0), Some(30.0)),
            Duration::from_secs_f64(300.0)
        );
    }
}
