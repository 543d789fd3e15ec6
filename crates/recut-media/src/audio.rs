//! Audio extraction to the normalised analysis format.

use std::path::Path;

use tracing::debug;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Sample rate of the extracted analysis audio.
pub const ANALYSIS_SAMPLE_RATE: u32 = 16_000;

/// Extract mono 16 kHz 16-bit PCM WAV from a source (path or URL).
///
/// The artefact is what the transcriber and the silence detector consume;
/// extraction is idempotent at the blob-store level (same key, same bytes).
pub async fn extract_audio(source: &str, dest: &Path) -> MediaResult<()> {
    debug!(source, dest = %dest.display(), "Extracting analysis audio");

    let cmd = FfmpegCommand::new(source, dest.to_string_lossy())
        .no_video()
        .output_args(["-ac", "1"])
        .output_args(["-ar", &ANALYSIS_SAMPLE_RATE.to_string()])
        .audio_codec("pcm_s16le");

    match FfmpegRunner::new().run(&cmd).await {
        Ok(()) => {}
        Err(MediaError::EncodeFailed { stderr, .. })
            if stderr
                .as_deref()
                .map(|s| {
                    let s = s.to_lowercase();
                    s.contains("does not contain any stream")
                        || s.contains("output file does not contain any stream")
                })
                .unwrap_or(false) =>
        {
            return Err(MediaError::NoAudioTrack);
        }
        Err(e) => return Err(e),
    }

    let metadata = tokio::fs::metadata(dest).await?;
    if metadata.len() == 0 {
        return Err(MediaError::NoAudioTrack);
    }

    Ok(())
}

/// Load s16le samples from an extracted WAV, skipping the RIFF header.
pub async fn load_pcm_samples(path: &Path) -> MediaResult<Vec<i16>> {
    let bytes = tokio::fs::read(path).await?;
    let data = strip_wav_header(&bytes);

    let samples: Vec<i16> = data
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
        .collect();

    Ok(samples)
}

/// Locate the `data` chunk of a RIFF/WAVE file and return its payload.
/// Falls back to the raw bytes for headerless PCM.
fn strip_wav_header(bytes: &[u8]) -> &[u8] {
    if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return bytes;
    }

    let mut offset = 12;
    while offset + 8 <= bytes.len() {
        let chunk_id = &bytes[offset..offset + 4];
        let chunk_len = u32::from_le_bytes([
            bytes[offset + 4],
            bytes[offset + 5],
            bytes[offset + 6],
            bytes[offset + 7],
        ]) as usize;
        let payload_start = offset + 8;
        if chunk_id == b"data" {
            let payload_end = (payload_start + chunk_len).min(bytes.len());
            return &bytes[payload_start..payload_end];
        }
        offset = payload_start + chunk_len + (chunk_len & 1);
    }

    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_with_samples(samples: &[i16]) -> Vec<u8> {
        let data: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&((36 + data.len()) as u32).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&[1, 0, 1, 0]); // PCM, mono
        out.extend_from_slice(&ANALYSIS_SAMPLE_RATE.to_le_bytes());
        out.extend_from_slice(&(ANALYSIS_SAMPLE_RATE * 2).to_le_bytes());
        out.extend_from_slice(&[2, 0, 16, 0]); // block align, bits
        out.extend_from_slice(b"data");
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(&data);
        out
    }

    #[test]
    fn test_strip_wav_header() {
        let samples = [0i16, 100, -100, 32000];
        let wav = wav_with_samples(&samples);
        let data = strip_wav_header(&wav);
        assert_eq!(data.len(), samples.len() * 2);
        assert_eq!(i16::from_le_bytes([data[2], data[3]]), 100);
    }

    #[test]
    fn test_headerless_falls_through() {
        let raw = [1u8, 0, 2, 0];
        assert_eq!(strip_wav_header(&raw), &raw);
    }

    #[tokio::test]
    async fn test_load_samples_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.wav");
        let samples = [0i16, 5, -5, 1000, -1000];
        tokio::fs::write(&path, wav_with_samples(&samples))
            .await
            .unwrap();

        let loaded = load_pcm_samples(&path).await.unwrap();
        assert_eq!(loaded, samples);
    }
}
