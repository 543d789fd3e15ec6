//! FFmpeg `-progress` output parsing.

/// Snapshot of ffmpeg encoding progress.
#[derive(Debug, Clone, Default)]
pub struct FfmpegProgress {
    /// Output timestamp in milliseconds
    pub out_time_ms: i64,
    /// Frames encoded
    pub frame: u64,
    /// Encoding fps
    pub fps: f64,
    /// Encoding speed relative to real time
    pub speed: f64,
    /// Whether the run has finished
    pub is_complete: bool,
}

/// Parse one `key=value` line of `-progress` output into `current`.
/// Returns a snapshot when a `progress=` marker closes an update block.
pub fn parse_progress_line(line: &str, current: &mut FfmpegProgress) -> Option<FfmpegProgress> {
    let line = line.trim();

    let (key, value) = line.split_once('=')?;
    match key {
        "out_time_ms" | "out_time_us" => {
            // Despite the name, recent ffmpeg emits microseconds for both.
            if let Ok(us) = value.parse::<i64>() {
                current.out_time_ms = us / 1000;
            }
        }
        "frame" => {
            if let Ok(frame) = value.parse() {
                current.frame = frame;
            }
        }
        "fps" => {
            if let Ok(fps) = value.parse() {
                current.fps = fps;
            }
        }
        "speed" => {
            if value != "N/A" {
                if let Some(speed_str) = value.strip_suffix('x') {
                    if let Ok(speed) = speed_str.trim().parse() {
                        current.speed = speed;
                    }
                }
            }
        }
        "progress" => {
            if value == "end" {
                current.is_complete = true;
            }
            return Some(current.clone());
        }
        _ => {}
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_parsing() {
        let mut progress = FfmpegProgress::default();

        assert!(parse_progress_line("out_time_ms=5000000", &mut progress).is_none());
        assert_eq!(progress.out_time_ms, 5000);

        parse_progress_line("frame=120", &mut progress);
        assert_eq!(progress.frame, 120);

        parse_progress_line("speed=1.5x", &mut progress);
        assert!((progress.speed - 1.5).abs() < 0.01);

        let snapshot = parse_progress_line("progress=continue", &mut progress);
        assert!(snapshot.is_some());
        assert!(!progress.is_complete);

        let snapshot = parse_progress_line("progress=end", &mut progress);
        assert!(snapshot.is_some());
        assert!(progress.is_complete);
    }

    #[test]
    fn test_garbage_lines_ignored() {
        let mut progress = FfmpegProgress::default();
        assert!(parse_progress_line("no equals sign", &mut progress).is_none());
        assert!(parse_progress_line("speed=N/A", &mut progress).is_none());
        assert_eq!(progress.speed, 0.0);
    }
}
