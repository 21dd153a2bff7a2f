//! Per-item timing plans.
//!
//! A plan fixes, before any frame is drawn, how long each item stays on
//! screen and how many frames that is at the output rate.

use slidecast_project_model::{ItemSequence, RenderItem};

use crate::duration::DurationEstimator;

/// Timing decisions for a single item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemTiming {
    /// Estimated narration time, or the default hold without a caption.
    pub hold_secs: f64,

    /// Extra hold added after the narration estimate.
    pub transition_pad_secs: f64,

    /// `hold_secs + transition_pad_secs`.
    pub total_secs: f64,

    /// `floor(total_secs * fps)`.
    pub frame_count: u64,
}

impl ItemTiming {
    /// Plan one item at the given frame rate.
    pub fn plan(estimator: &DurationEstimator, item: &RenderItem, fps: u32) -> Self {
        let hold_secs = if item.has_caption() {
            estimator.estimate(item.caption())
        } else {
            estimator.default_hold_secs()
        };
        let transition_pad_secs = item.transition_pad_secs();
        let total_secs = hold_secs + transition_pad_secs;
        let frame_count = frames_for(total_secs, fps);

        tracing::trace!(
            item = %item.id(),
            hold_secs,
            transition_pad_secs,
            frame_count,
            "Planned item timing"
        );

        Self {
            hold_secs,
            transition_pad_secs,
            total_secs,
            frame_count,
        }
    }
}

/// Plan every item of a sequence, in playback order.
pub fn plan_sequence(
    estimator: &DurationEstimator,
    sequence: &ItemSequence,
    fps: u32,
) -> Vec<ItemTiming> {
    sequence
        .iter()
        .map(|item| ItemTiming::plan(estimator, item, fps))
        .collect()
}

/// Sum of planned durations.
pub fn planned_total_secs(timings: &[ItemTiming]) -> f64 {
    timings.iter().map(|t| t.total_secs).sum()
}

/// Sum of planned frames.
pub fn planned_total_frames(timings: &[ItemTiming]) -> u64 {
    timings.iter().map(|t| t.frame_count).sum()
}

fn frames_for(total_secs: f64, fps: u32) -> u64 {
    let frames = total_secs * f64::from(fps);
    // Absorb float noise such as 4.999999999 * 30 so exact durations
    // still produce whole frame counts.
    (frames + 1e-9).floor().max(0.0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn item(pad: f64, caption: &str) -> RenderItem {
        RenderItem::new(Arc::new(image::RgbaImage::new(2, 2)), pad, caption)
    }

    #[test]
    fn test_captionless_item_with_pad() {
        let estimator = DurationEstimator::with_defaults();
        let timing = ItemTiming::plan(&estimator, &item(2.0, ""), 30);
        assert_eq!(timing.hold_secs, 3.0);
        assert_eq!(timing.total_secs, 5.0);
        assert_eq!(timing.frame_count, 150);
    }

    #[test]
    fn test_captioned_item() {
        let estimator = DurationEstimator::with_defaults();
        let timing = ItemTiming::plan(&estimator, &item(1.0, "one two three four five"), 30);
        assert!((timing.hold_secs - 2.5).abs() < 1e-12);
        assert!((timing.total_secs - 3.5).abs() < 1e-12);
        assert_eq!(timing.frame_count, 105);
    }

    #[test]
    fn test_frame_count_floors() {
        let estimator = DurationEstimator::with_defaults();
        // 3.01s at 30 fps = 90.3 frames
        let timing = ItemTiming::plan(&estimator, &item(0.01, ""), 30);
        assert_eq!(timing.frame_count, 90);
    }

    #[test]
    fn test_plan_sequence_totals() {
        let estimator = DurationEstimator::with_defaults();
        let mut seq = ItemSequence::new();
        for _ in 0..4 {
            seq.push(Arc::new(image::RgbaImage::new(1, 1)), 2.0, "");
        }

        let timings = plan_sequence(&estimator, &seq, 30);
        assert_eq!(timings.len(), 4);
        assert_eq!(planned_total_frames(&timings), 600);
        assert!((planned_total_secs(&timings) - 20.0).abs() < 1e-12);
    }
}
