//! Renderer primitives: segment extraction, concatenation, finalisation.
//!
//! Per-segment intermediates are re-encoded with one uniform profile so the
//! final per-ratio concatenation is a stream copy. Sources may be remote;
//! extraction streams through ffmpeg, never into memory.

use std::path::Path;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::sync::watch;
use tracing::debug;

use recut_models::EdlSegment;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::filters;

/// Segments whose gap is at most this wide are merged to avoid spurious
/// re-encodes at the join.
pub const MERGE_EPSILON_S: f64 = 0.010;

/// Uniform encode profile shared by all intermediates of one render.
#[derive(Debug, Clone)]
pub struct EncodeProfile {
    pub video_codec: String,
    pub crf: u8,
    pub preset: String,
    pub pixel_format: String,
    pub audio_codec: String,
    pub audio_rate: u32,
    pub audio_channels: u8,
}

impl Default for EncodeProfile {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            crf: 20,
            preset: "veryfast".to_string(),
            pixel_format: "yuv420p".to_string(),
            audio_codec: "aac".to_string(),
            audio_rate: 48_000,
            audio_channels: 2,
        }
    }
}

/// Normalise Keep segments for rendering: sort, merge windows touching
/// within [`MERGE_EPSILON_S`], and drop segments shorter than one output
/// frame.
pub fn normalize_keeps(keeps: &[EdlSegment], output_fps: f64) -> Vec<EdlSegment> {
    let mut sorted: Vec<EdlSegment> = keeps.to_vec();
    sorted.sort_by(|a, b| a.start.total_cmp(&b.start));

    let mut merged: Vec<EdlSegment> = Vec::new();
    for seg in sorted {
        match merged.last_mut() {
            Some(last) if seg.start - last.end <= MERGE_EPSILON_S => {
                if seg.end > last.end {
                    last.end = seg.end;
                }
            }
            _ => merged.push(seg),
        }
    }

    let min_len = if output_fps > 0.0 { 1.0 / output_fps } else { 0.0 };
    merged.retain(|s| s.duration() >= min_len);
    merged
}

/// Extract one Keep segment, scaled with fit-and-pad to the target frame.
#[allow(clippy::too_many_arguments)]
pub async fn extract_segment(
    source: &str,
    segment: &EdlSegment,
    target: (u32, u32),
    profile: &EncodeProfile,
    has_audio: bool,
    dest: &Path,
    cancel: Option<watch::Receiver<bool>>,
    timeout: Option<Duration>,
) -> MediaResult<()> {
    let (width, height) = target;
    debug!(
        source,
        start = segment.start,
        end = segment.end,
        width,
        height,
        "Extracting segment"
    );

    let mut cmd = FfmpegCommand::new(source, dest.to_string_lossy())
        .seek(segment.start)
        .duration(segment.duration())
        .video_filter(filters::fit_and_pad(width, height))
        .video_codec(&profile.video_codec)
        .crf(profile.crf)
        .preset(&profile.preset)
        .output_args(["-pix_fmt", &profile.pixel_format]);

    if has_audio {
        cmd = cmd
            .audio_codec(&profile.audio_codec)
            .output_args(["-ar", &profile.audio_rate.to_string()])
            .output_args(["-ac", &profile.audio_channels.to_string()]);
    } else {
        cmd = cmd.no_audio();
    }

    let mut runner = FfmpegRunner::new();
    if let Some(rx) = cancel {
        runner = runner.with_cancel(rx);
    }
    if let Some(t) = timeout {
        runner = runner.with_timeout(t);
    }
    runner.run(&cmd).await?;

    let metadata = tokio::fs::metadata(dest).await?;
    if metadata.len() == 0 {
        return Err(MediaError::CorruptIntermediate(dest.to_path_buf()));
    }
    Ok(())
}

/// Concatenate intermediates in EDL order with the concat demuxer.
/// No re-encode: all inputs carry the same profile.
pub async fn concat_segments(parts: &[std::path::PathBuf], dest: &Path) -> MediaResult<()> {
    if parts.is_empty() {
        return Err(MediaError::internal("nothing to concatenate"));
    }

    let list_path = dest.with_extension("concat.txt");
    let mut list = tokio::fs::File::create(&list_path).await?;
    for part in parts {
        list.write_all(format!("file '{}'\n", escape_concat_path(part)).as_bytes())
            .await?;
    }
    list.flush().await?;

    let cmd = FfmpegCommand::new(list_path.to_string_lossy(), dest.to_string_lossy())
        .input_args(["-f", "concat", "-safe", "0"])
        .output_args(["-c", "copy"]);

    let result = FfmpegRunner::new().run(&cmd).await;
    tokio::fs::remove_file(&list_path).await.ok();
    result
}

/// Finalise one ratio's output: optional caption burn-in, optional loudness
/// normalisation, and a streaming-friendly moov-atom placement.
///
/// With neither pass requested this is a remux; otherwise a single re-encode
/// applies both filters.
pub async fn finalize_output(
    input: &Path,
    dest: &Path,
    srt_path: Option<&Path>,
    loudnorm_target: Option<f64>,
    profile: &EncodeProfile,
    has_audio: bool,
) -> MediaResult<()> {
    let mut cmd = FfmpegCommand::new(input.to_string_lossy(), dest.to_string_lossy())
        .output_args(["-movflags", "+faststart"]);

    let burn = srt_path.is_some();
    let normalise = loudnorm_target.is_some() && has_audio;

    if let Some(srt) = srt_path {
        cmd = cmd
            .video_filter(filters::subtitles(&srt.to_string_lossy(), "Arial", 24))
            .video_codec(&profile.video_codec)
            .crf(profile.crf)
            .preset(&profile.preset);
    } else {
        cmd = cmd.video_codec("copy");
    }

    if let Some(target) = loudnorm_target.filter(|_| has_audio) {
        cmd = cmd
            .audio_filter(filters::loudnorm(target))
            .audio_codec(&profile.audio_codec);
    } else if has_audio {
        cmd = cmd.audio_codec("copy");
    }

    debug!(
        input = %input.display(),
        dest = %dest.display(),
        burn,
        normalise,
        "Finalising output"
    );

    FfmpegRunner::new().run(&cmd).await.map_err(|e| match e {
        MediaError::Io(io) => MediaError::OutputWriteFailed(io.to_string()),
        other => other,
    })
}

/// Escape a path for a concat-demuxer list file (single quotes doubled per
/// ffmpeg's quoting rules).
fn escape_concat_path(path: &Path) -> String {
    path.to_string_lossy().replace('\'', "'\\''")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_sorts_and_merges_touching() {
        let keeps = vec![
            EdlSegment::keep(20.0, 25.0),
            EdlSegment::keep(0.0, 10.0),
            EdlSegment::keep(10.005, 15.0), // within 10 ms of the first
        ];
        let normalized = normalize_keeps(&keeps, 30.0);
        assert_eq!(normalized.len(), 2);
        assert!((normalized[0].start - 0.0).abs() < 1e-9);
        assert!((normalized[0].end - 15.0).abs() < 1e-9);
        assert!((normalized[1].start - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_normalize_drops_subframe_segments() {
        let keeps = vec![
            EdlSegment::keep(0.0, 10.0),
            EdlSegment::keep(50.0, 50.02), // < 1/30 s
        ];
        let normalized = normalize_keeps(&keeps, 30.0);
        assert_eq!(normalized.len(), 1);
    }

    #[test]
    fn test_normalize_keeps_disjoint_windows_apart() {
        let keeps = vec![EdlSegment::keep(0.0, 5.0), EdlSegment::keep(6.0, 9.0)];
        let normalized = normalize_keeps(&keeps, 30.0);
        assert_eq!(normalized.len(), 2);
    }

    #[test]
    fn test_total_duration_preserved_by_merge() {
        let keeps = vec![EdlSegment::keep(0.0, 10.0), EdlSegment::keep(10.0, 20.0)];
        let normalized = normalize_keeps(&keeps, 30.0);
        let total: f64 = normalized.iter().map(EdlSegment::duration).sum();
        assert!((total - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_concat_path_escaping() {
        let path = std::path::PathBuf::from("/tmp/it's/seg.mkv");
        assert_eq!(escape_concat_path(&path), "/tmp/it'\\''s/seg.mkv");
    }
}
