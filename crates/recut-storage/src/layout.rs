//! Blob key layout.
//!
//! ```text
//! originals/<media_id>/<filename>
//! derived/<media_id>/audio.wav
//! derived/<media_id>/frames/<t>.jpg
//! renders/<plan_id>/<aspect>.mp4
//! tmp/<job_id>/segments/<index>.mkv
//! ```

use recut_models::{AspectRatio, JobId, MediaId, PlanId};

/// Key for a registered original.
pub fn original_key(media_id: &MediaId, filename: &str) -> String {
    format!("originals/{}/{}", media_id, filename)
}

/// Key for the extracted mono 16 kHz audio artefact.
pub fn audio_key(media_id: &MediaId) -> String {
    format!("derived/{}/audio.wav", media_id)
}

/// Key for a sampled frame at timestamp `t` (millisecond precision in the
/// filename keeps keys unique per media).
pub fn frame_key(media_id: &MediaId, t: f64) -> String {
    format!("derived/{}/frames/{:.3}.jpg", media_id, t)
}

/// Key for a finished render.
pub fn render_key(plan_id: &PlanId, aspect: &AspectRatio) -> String {
    format!("renders/{}/{}.mp4", plan_id, aspect.as_filename_part())
}

/// Prefix for a job's scratch objects, deleted when the job terminates.
pub fn tmp_prefix(job_id: &JobId) -> String {
    format!("tmp/{}", job_id)
}

/// Key for one extracted segment intermediate.
pub fn tmp_segment_key(job_id: &JobId, aspect: &AspectRatio, index: usize) -> String {
    format!(
        "tmp/{}/segments/{}-{:04}.mkv",
        job_id,
        aspect.as_filename_part(),
        index
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_shapes() {
        let media = MediaId::from_string("m1");
        let plan = PlanId::from_string("p1");
        let job = JobId::from_string("j1");
        assert_eq!(original_key(&media, "in.mp4"), "originals/m1/in.mp4");
        assert_eq!(audio_key(&media), "derived/m1/audio.wav");
        assert_eq!(frame_key(&media, 2.0), "derived/m1/frames/2.000.jpg");
        assert_eq!(
            render_key(&plan, &AspectRatio::VERTICAL),
            "renders/p1/9x16.mp4"
        );
        assert_eq!(
            tmp_segment_key(&job, &AspectRatio::SQUARE, 3),
            "tmp/j1/segments/1x1-0003.mkv"
        );
        assert!(tmp_segment_key(&job, &AspectRatio::SQUARE, 3).starts_with(&tmp_prefix(&job)));
    }
}
