//! Scene-cut detection via ffmpeg's scene-change score.
//!
//! Runs a decode pass with `select='gt(scene,T)',showinfo` and collects the
//! `pts_time` of every frame the filter lets through. Cuts outside
//! `(0, duration)` are discarded so the result always satisfies the
//! `SceneCuts` invariant.

use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// Default scene-change score threshold.
pub const DEFAULT_SCENE_THRESHOLD: f64 = 0.4;

/// Detect scene cuts in a source (path or URL). May return an empty list;
/// callers treat that as one scene covering the whole timeline.
pub async fn detect_scene_cuts(
    source: &str,
    threshold: f64,
    duration: f64,
) -> MediaResult<Vec<f64>> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

    let filter = format!("select='gt(scene,{})',showinfo", threshold);
    debug!(source, %filter, "Detecting scene cuts");

    let mut child = Command::new("ffmpeg")
        .args(["-nostdin", "-v", "info", "-i", source])
        .args(["-vf", &filter])
        .args(["-an", "-f", "null", "-"])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| MediaError::internal("stderr not captured"))?;
    let mut reader = BufReader::new(stderr).lines();

    let mut cuts = Vec::new();
    while let Ok(Some(line)) = reader.next_line().await {
        if let Some(t) = parse_showinfo_pts(&line) {
            cuts.push(t);
        }
    }

    let status = child.wait().await?;
    if !status.success() {
        return Err(MediaError::decode_failed(format!(
            "scene detection pass failed with code {:?}",
            status.code()
        )));
    }

    cuts.sort_by(|a, b| a.total_cmp(b));
    cuts.dedup_by(|a, b| (*a - *b).abs() < 1e-6);
    cuts.retain(|&t| t > 0.0 && t < duration);

    Ok(cuts)
}

/// Extract the `pts_time` value from one showinfo log line.
pub fn parse_showinfo_pts(line: &str) -> Option<f64> {
    if !line.contains("Parsed_showinfo") {
        return None;
    }
    let idx = line.find("pts_time:")?;
    let rest = &line[idx + "pts_time:".len()..];
    let end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-'))
        .unwrap_or(rest.len());
    rest[..end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_showinfo_line() {
        let line = "[Parsed_showinfo_1 @ 0x5555] n:   0 pts:  76800 pts_time:5.12    duration:      256";
        assert_eq!(parse_showinfo_pts(line), Some(5.12));
    }

    #[test]
    fn test_non_showinfo_lines_skipped() {
        assert_eq!(parse_showinfo_pts("frame=  100 fps= 30"), None);
        assert_eq!(
            parse_showinfo_pts("[Parsed_showinfo_1 @ 0x5555] config in time_base: 1/15360"),
            None
        );
    }

    #[test]
    fn test_parse_integer_pts() {
        let line = "[Parsed_showinfo_1 @ 0x7f] n:   3 pts: 153600 pts_time:10 duration: 256";
        assert_eq!(parse_showinfo_pts(line), Some(10.0));
    }
}
