//! Retry policy with exponential backoff and full jitter.

use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::error::{RegistryError, RegistryResult};

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts.
    pub max_retries: u32,
    /// Base delay for exponential backoff (in milliseconds).
    pub base_delay_ms: u64,
    /// Maximum delay cap (in milliseconds).
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 100,
            max_delay_ms: 5000,
        }
    }
}

/// Execute an async registry operation with retry.
///
/// Retries only errors classified retryable (connection/IO/timeout); logical
/// errors such as `NotFound` surface immediately.
pub async fn with_retry<T, F, Fut>(
    config: &RetryConfig,
    operation: &str,
    op: F,
) -> RegistryResult<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = RegistryResult<T>>,
{
    let mut last_error = None;

    for attempt in 0..=config.max_retries {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < config.max_retries => {
                let delay = backoff_delay(config, attempt);
                warn!(
                    operation = %operation,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Registry operation failed, retrying"
                );
                tokio::time::sleep(delay).await;
                last_error = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_error.unwrap_or_else(|| RegistryError::Internal("retry loop exhausted".into())))
}

/// Exponential backoff with full jitter: uniform in `[0, base * 2^attempt]`,
/// capped at `max_delay_ms`.
pub fn backoff_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let exp = config
        .base_delay_ms
        .saturating_mul(1u64 << attempt.min(16))
        .min(config.max_delay_ms);
    let jittered = rand::thread_rng().gen_range(0..=exp);
    Duration::from_millis(jittered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_is_bounded() {
        let config = RetryConfig::default();
        for attempt in 0..10 {
            let d = backoff_delay(&config, attempt);
            assert!(d.as_millis() as u64 <= config.max_delay_ms);
        }
    }

    #[tokio::test]
    async fn test_non_retryable_surfaces_immediately() {
        let config = RetryConfig::default();
        let result: RegistryResult<()> = with_retry(&config, "test", || async {
            Err(RegistryError::not_found("media", "m-1"))
        })
        .await;
        assert!(matches!(result, Err(RegistryError::NotFound { .. })));
    }
}
