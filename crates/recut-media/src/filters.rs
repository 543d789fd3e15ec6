//! FFmpeg filter-graph construction.
//!
//! The aspect-ratio adaptation is fit-and-pad: scale preserving aspect
//! ratio to fit inside the target frame, then pad with black. Cropping is
//! forbidden by contract; no filter built here ever removes content pixels.

/// Build the fit-and-pad video filter for a target frame.
pub fn fit_and_pad(width: u32, height: u32) -> String {
    format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,\
         pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:color=black,setsar=1",
        w = width,
        h = height
    )
}

/// Build the loudness-normalisation audio filter for a LUFS target.
pub fn loudnorm(target_lufs: f64) -> String {
    format!("loudnorm=I={}:TP=-1.5:LRA=11", target_lufs)
}

/// Build the subtitle burn-in filter for an SRT file.
///
/// The path is escaped for ffmpeg's filter-argument quoting rules.
pub fn subtitles(srt_path: &str, font: &str, font_size: u32) -> String {
    let escaped = escape_filter_path(srt_path);
    format!(
        "subtitles='{}':force_style='FontName={},FontSize={}'",
        escaped, font, font_size
    )
}

/// Escape a path for use inside a quoted filter argument.
fn escape_filter_path(path: &str) -> String {
    path.replace('\\', "\\\\")
        .replace(':', "\\:")
        .replace('\'', "\\'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_and_pad_never_crops() {
        let filter = fit_and_pad(608, 1080);
        assert!(filter.contains("force_original_aspect_ratio=decrease"));
        assert!(filter.contains("pad=608:1080"));
        assert!(!filter.contains("crop"));
    }

    #[test]
    fn test_fit_and_pad_centres_content() {
        let filter = fit_and_pad(1080, 1080);
        assert!(filter.contains("(ow-iw)/2"));
        assert!(filter.contains("(oh-ih)/2"));
        assert!(filter.contains("color=black"));
    }

    #[test]
    fn test_loudnorm_target() {
        assert_eq!(loudnorm(-16.0), "loudnorm=I=-16:TP=-1.5:LRA=11");
    }

    #[test]
    fn test_subtitles_escaping() {
        let filter = subtitles("/tmp/job:1/caps.srt", "Arial", 24);
        assert!(filter.contains("\\:1/caps.srt"));
        assert!(filter.contains("FontName=Arial"));
        assert!(filter.contains("FontSize=24"));
    }
}
