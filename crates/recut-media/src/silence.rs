//! Silence detection over extracted PCM.
//!
//! An energy-threshold scan: the signal is split into short frames, each
//! frame's RMS level is compared against a noise floor, and runs of quiet
//! frames at least `min_silence_s` long become silence intervals.

use recut_models::Interval;

/// Silence scan configuration.
#[derive(Debug, Clone)]
pub struct SilenceConfig {
    /// Minimum silence length in seconds
    pub min_silence_s: f64,
    /// Frames below this RMS level (dBFS) count as silent
    pub noise_floor_dbfs: f64,
    /// Analysis frame length in milliseconds
    pub frame_ms: u64,
}

impl Default for SilenceConfig {
    fn default() -> Self {
        Self {
            min_silence_s: 0.6,
            noise_floor_dbfs: -40.0,
            frame_ms: 30,
        }
    }
}

/// Scan s16le samples for silence intervals.
///
/// The returned intervals are sorted, pairwise disjoint, and each at least
/// `min_silence_s` long, regardless of input.
pub fn scan_silence(samples: &[i16], sample_rate: u32, config: &SilenceConfig) -> Vec<Interval> {
    if samples.is_empty() || sample_rate == 0 {
        return Vec::new();
    }

    let frame_len = ((sample_rate as u64 * config.frame_ms) / 1000).max(1) as usize;
    let threshold = dbfs_to_rms(config.noise_floor_dbfs);

    let mut intervals = Vec::new();
    let mut run_start: Option<f64> = None;
    let mut t = 0.0_f64;

    for chunk in samples.chunks(frame_len) {
        let quiet = rms(chunk) < threshold;
        match (quiet, run_start) {
            (true, None) => run_start = Some(t),
            (false, Some(start)) => {
                if t - start >= config.min_silence_s {
                    intervals.push(Interval::new(start, t));
                }
                run_start = None;
            }
            _ => {}
        }
        t += chunk.len() as f64 / sample_rate as f64;
    }

    if let Some(start) = run_start {
        if t - start >= config.min_silence_s {
            intervals.push(Interval::new(start, t));
        }
    }

    intervals
}

/// RMS level of a frame, normalised to `[0, 1]`.
fn rms(samples: &[i16]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples
        .iter()
        .map(|&s| {
            let v = s as f64 / i16::MAX as f64;
            v * v
        })
        .sum();
    (sum_sq / samples.len() as f64).sqrt()
}

fn dbfs_to_rms(dbfs: f64) -> f64 {
    10f64.powf(dbfs / 20.0)
}
