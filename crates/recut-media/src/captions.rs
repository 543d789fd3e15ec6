//! Caption retiming and SRT generation.
//!
//! Burned subtitles are timed on the *output* timeline: the EDL induces a
//! piecewise mapping from source time to output time, and every transcript
//! segment overlapping a Keep window is shifted (and clipped) accordingly.

use recut_models::{EdlSegment, TranscriptSegment};

/// One retimed caption on the output timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Caption {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Map transcript segments through the EDL's Keep windows.
///
/// `keeps` must be the validated, sorted Keep segments. A transcript segment
/// spanning a cut is clipped to each window it overlaps, producing one
/// caption per intersection.
pub fn retime_captions(segments: &[TranscriptSegment], keeps: &[EdlSegment]) -> Vec<Caption> {
    let mut captions = Vec::new();
    let mut out_offset = 0.0_f64;

    for keep in keeps {
        for seg in segments {
            let start = seg.start.max(keep.start);
            let end = seg.end.min(keep.end);
            if end <= start {
                continue;
            }
            let text = seg.text.trim();
            if text.is_empty() {
                continue;
            }
            captions.push(Caption {
                start: out_offset + (start - keep.start),
                end: out_offset + (end - keep.start),
                text: text.to_string(),
            });
        }
        out_offset += keep.duration();
    }

    captions
}

/// Serialise captions as an SRT document.
pub fn to_srt(captions: &[Caption]) -> String {
    let mut out = String::new();
    for (i, cap) in captions.iter().enumerate() {
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            i + 1,
            srt_timestamp(cap.start),
            srt_timestamp(cap.end),
            cap.text
        ));
    }
    out
}

/// Format seconds as an SRT timestamp (`HH:MM:SS,mmm`).
fn srt_timestamp(t: f64) -> String {
    let total_ms = (t.max(0.0) * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let secs = (total_ms / 1000) % 60;
    let mins = (total_ms / 60_000) % 60;
    let hours = total_ms / 3_600_000;
    format!("{:02}:{:02}:{:02},{:03}", hours, mins, secs, ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(start: f64, end: f64, text: &str) -> TranscriptSegment {
        TranscriptSegment {
            start,
            end,
            text: text.into(),
            confidence: None,
            words: Vec::new(),
        }
    }

    #[test]
    fn test_caption_inside_first_keep_is_shifted_to_zero_base() {
        let keeps = [EdlSegment::keep(10.0, 20.0)];
        let caps = retime_captions(&[seg(12.0, 14.0, "hello")], &keeps);
        assert_eq!(caps.len(), 1);
        assert!((caps[0].start - 2.0).abs() < 1e-9);
        assert!((caps[0].end - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_caption_in_second_keep_accounts_for_earlier_windows() {
        let keeps = [EdlSegment::keep(0.0, 10.0), EdlSegment::keep(30.0, 40.0)];
        let caps = retime_captions(&[seg(32.0, 35.0, "later")], &keeps);
        assert_eq!(caps.len(), 1);
        // 10 s of output before the second window.
        assert!((caps[0].start - 12.0).abs() < 1e-9);
        assert!((caps[0].end - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_caption_spanning_cut_is_clipped_per_window() {
        let keeps = [EdlSegment::keep(0.0, 5.0), EdlSegment::keep(10.0, 15.0)];
        let caps = retime_captions(&[seg(4.0, 11.0, "across")], &keeps);
        assert_eq!(caps.len(), 2);
        assert!((caps[0].start - 4.0).abs() < 1e-9);
        assert!((caps[0].end - 5.0).abs() < 1e-9);
        assert!((caps[1].start - 5.0).abs() < 1e-9);
        assert!((caps[1].end - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_caption_in_skipped_region_is_dropped() {
        let keeps = [EdlSegment::keep(0.0, 5.0), EdlSegment::keep(20.0, 25.0)];
        let caps = retime_captions(&[seg(10.0, 12.0, "skipped")], &keeps);
        assert!(caps.is_empty());
    }

    #[test]
    fn test_srt_output_shape() {
        let caps = vec![
            Caption {
                start: 0.0,
                end: 1.5,
                text: "one".into(),
            },
            Caption {
                start: 2.0,
                end: 3.0,
                text: "two".into(),
            },
        ];
        let srt = to_srt(&caps);
        assert!(srt.starts_with("1\n00:00:00,000 --> 00:00:01,500\none\n"));
        assert!(srt.contains("2\n00:00:02,000 --> 00:00:03,000\ntwo\n"));
    }

    #[test]
    fn test_srt_timestamp_rollover() {
        assert_eq!(srt_timestamp(3661.25), "01:01:01,250");
    }
}
