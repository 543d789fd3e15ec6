//! Deterministic frame sampling for the describer.

use std::path::Path;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

/// Timestamps to sample at a fixed interval. Deterministic per
/// `(duration, interval)` so retried describe jobs revisit the same frames.
pub fn sample_timestamps(duration: f64, interval_s: f64) -> Vec<f64> {
    if duration <= 0.0 || interval_s <= 0.0 {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut t = 0.0;
    while t < duration {
        out.push((t * 1000.0).round() / 1000.0);
        t += interval_s;
    }
    out
}

/// Extract a single frame at `t` as a JPEG.
pub async fn extract_frame(source: &str, t: f64, dest: &Path) -> MediaResult<()> {
    let cmd = FfmpegCommand::new(source, dest.to_string_lossy())
        .seek(t)
        .output_args(["-vframes", "1"])
        .output_args(["-q:v", "2"]);
    FfmpegRunner::new().run(&cmd).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sampling_is_deterministic() {
        let a = sample_timestamps(10.0, 1.0);
        let b = sample_timestamps(10.0, 1.0);
        assert_eq!(a, b);
        assert_eq!(a.len(), 10);
        assert_eq!(a[0], 0.0);
        assert_eq!(a[9], 9.0);
    }

    #[test]
    fn test_sampling_excludes_duration() {
        let ts = sample_timestamps(3.0, 1.0);
        assert_eq!(ts, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_empty_source_samples_nothing() {
        assert!(sample_timestamps(0.0, 1.0).is_empty());
        assert!(sample_timestamps(10.0, 0.0).is_empty());
    }
}
