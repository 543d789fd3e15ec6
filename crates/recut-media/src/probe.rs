//! FFprobe source inspection.
//!
//! Works on local paths and remote HTTP(S) URLs alike; ffprobe reads only
//! the container headers, never the full asset.

use serde::Deserialize;
use std::process::Stdio;
use tokio::process::Command;

use crate::error::{MediaError, MediaResult};

/// Technical information about a source.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceInfo {
    /// Duration in seconds
    pub duration: f64,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Frame rate (fps)
    pub fps: f64,
    /// Video codec
    pub video_codec: String,
    /// Audio codec, if an audio stream exists
    pub audio_codec: Option<String>,
    /// Whether an audio stream exists
    pub has_audio: bool,
    /// Bitrate in bits/second
    pub bitrate: u64,
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    bit_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
}

/// Probe a source (path or URL) for technical metadata.
pub async fn probe_source(source: &str) -> MediaResult<SourceInfo> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(source)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        return Err(classify_probe_failure(source, &stderr));
    }

    let probe: FfprobeOutput = serde_json::from_slice(&output.stdout)?;

    let video_stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or_else(|| MediaError::UnrecognisedFormat("no video stream found".to_string()))?;

    let audio_stream = probe.streams.iter().find(|s| s.codec_type == "audio");

    let duration = probe
        .format
        .duration
        .as_ref()
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    let bitrate = probe
        .format
        .bit_rate
        .as_ref()
        .and_then(|b| b.parse::<u64>().ok())
        .unwrap_or(0);

    let fps = video_stream
        .avg_frame_rate
        .as_ref()
        .or(video_stream.r_frame_rate.as_ref())
        .and_then(|r| parse_frame_rate(r))
        .unwrap_or(30.0);

    Ok(SourceInfo {
        duration,
        width: video_stream.width.unwrap_or(0),
        height: video_stream.height.unwrap_or(0),
        fps,
        video_codec: video_stream.codec_name.clone().unwrap_or_default(),
        audio_codec: audio_stream.and_then(|s| s.codec_name.clone()),
        has_audio: audio_stream.is_some(),
        bitrate,
    })
}

/// Map ffprobe stderr to the error taxonomy: connectivity problems are
/// `SourceUnreachable`, everything else is `UnrecognisedFormat`.
fn classify_probe_failure(source: &str, stderr: &str) -> MediaError {
    let lowered = stderr.to_lowercase();
    let unreachable = [
        "no such file",
        "connection refused",
        "connection timed out",
        "could not resolve",
        "failed to resolve",
        "server returned 4",
        "server returned 5",
        "network is unreachable",
        "i/o error",
    ];
    if unreachable.iter().any(|needle| lowered.contains(needle)) {
        MediaError::SourceUnreachable(format!("{}: {}", source, stderr.trim()))
    } else {
        MediaError::UnrecognisedFormat(stderr.trim().to_string())
    }
}

/// Parse a frame-rate string ("30/1", "30000/1001", or "29.97").
fn parse_frame_rate(s: &str) -> Option<f64> {
    if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den > 0.0 {
            return Some(num / den);
        }
        return None;
    }
    s.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_rate() {
        assert!((parse_frame_rate("30/1").unwrap() - 30.0).abs() < 0.01);
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert!((parse_frame_rate("29.97").unwrap() - 29.97).abs() < 0.01);
        assert!(parse_frame_rate("30/0").is_none());
    }

    #[test]
    fn test_failure_classification() {
        let err = classify_probe_failure("http://x/y.mp4", "Connection refused");
        assert!(matches!(err, MediaError::SourceUnreachable(_)));

        let err = classify_probe_failure("/tmp/a.bin", "Invalid data found when processing input");
        assert!(matches!(err, MediaError::UnrecognisedFormat(_)));

        let err = classify_probe_failure("/tmp/gone.mp4", "No such file or directory");
        assert!(matches!(err, MediaError::SourceUnreachable(_)));
    }
}
