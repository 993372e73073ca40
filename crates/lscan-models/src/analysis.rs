//! Detection, keyframe, and summary models produced by the analysis pipeline.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::video::{LabelParseError, Verdict};

/// Per-detection class label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ClassLabel {
    Normal,
    Abnormal,
}

impl ClassLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassLabel::Normal => "normal",
            ClassLabel::Abnormal => "abnormal",
        }
    }

    pub fn is_abnormal(&self) -> bool {
        matches!(self, ClassLabel::Abnormal)
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ClassLabel {
    type Err = LabelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(ClassLabel::Normal),
            "abnormal" => Ok(ClassLabel::Abnormal),
            other => Err(LabelParseError(other.to_string())),
        }
    }
}

/// A classified bounding box within one sampled frame.
///
/// Coordinates are integer pixels, clipped to the frame so that
/// `0 <= x1 < x2 <= width` and `0 <= y1 < y2 <= height`. Detections are
/// immutable values; they are persisted only inside a [`Keyframe`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Detection {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
    pub label: ClassLabel,
    /// Classifier confidence in [0, 1]
    pub confidence: f64,
}

impl Detection {
    /// Check coordinate ordering against the frame bounds.
    pub fn is_within(&self, width: i32, height: i32) -> bool {
        0 <= self.x1 && self.x1 < self.x2 && self.x2 <= width
            && 0 <= self.y1 && self.y1 < self.y2 && self.y2 <= height
    }
}

/// An annotated evidence frame, created the instant a sampled frame contains
/// at least one abnormal detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Keyframe {
    /// Timestamp in seconds, rounded to 2 decimals
    pub time: f64,
    /// Always `abnormal`: only abnormal-triggering frames qualify
    pub status: ClassLabel,
    /// Public URL of the rendered image artifact
    pub frame_image_url: String,
    /// All detections in the frame, not only the abnormal ones
    pub detections: Vec<Detection>,
}

impl Keyframe {
    /// Build a keyframe for an abnormal-triggering frame.
    pub fn new(time_secs: f64, frame_image_url: impl Into<String>, detections: Vec<Detection>) -> Self {
        Self {
            time: round_to_centis(time_secs),
            status: ClassLabel::Abnormal,
            frame_image_url: frame_image_url.into(),
            detections,
        }
    }

    /// A keyframe must carry at least one abnormal detection.
    pub fn has_abnormal_detection(&self) -> bool {
        self.detections.iter().any(|d| d.label.is_abnormal())
    }
}

/// Round seconds to 2 decimal places for keyframe timestamps.
pub fn round_to_centis(secs: f64) -> f64 {
    (secs * 100.0).round() / 100.0
}

/// Aggregate detection counts for one run.
///
/// Invariant: `normal_count + abnormal_count == total_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Summary {
    pub total_count: u32,
    pub normal_count: u32,
    pub abnormal_count: u32,
}

impl Summary {
    /// Derive the summary from the running totals.
    pub fn from_counts(total_count: u32, abnormal_count: u32) -> Self {
        Self {
            total_count,
            normal_count: total_count.saturating_sub(abnormal_count),
            abnormal_count,
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.normal_count + self.abnormal_count == self.total_count
    }
}

/// The payload of the single terminal `done` write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisOutcome {
    #[serde(rename = "final")]
    pub final_label: Verdict,
    pub summary: Summary,
    pub keyframes: Vec<Keyframe>,
}

impl AnalysisOutcome {
    /// Build the outcome from running totals and collected keyframes.
    pub fn from_counts(total_count: u32, abnormal_count: u32, keyframes: Vec<Keyframe>) -> Self {
        Self {
            final_label: Verdict::from_abnormal_count(abnormal_count),
            summary: Summary::from_counts(total_count, abnormal_count),
            keyframes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(label: ClassLabel) -> Detection {
        Detection {
            x1: 10,
            y1: 10,
            x2: 50,
            y2: 50,
            label,
            confidence: 0.9,
        }
    }

    #[test]
    fn test_summary_invariant() {
        let s = Summary::from_counts(7, 3);
        assert_eq!(s.normal_count, 4);
        assert!(s.is_consistent());

        let empty = Summary::from_counts(0, 0);
        assert!(empty.is_consistent());
    }

    #[test]
    fn test_summary_never_negative() {
        // abnormal > total cannot go below zero
        let s = Summary::from_counts(2, 5);
        assert_eq!(s.normal_count, 0);
    }

    #[test]
    fn test_outcome_verdict() {
        let clean = AnalysisOutcome::from_counts(4, 0, vec![]);
        assert_eq!(clean.final_label, Verdict::Normal);

        let dirty = AnalysisOutcome::from_counts(4, 1, vec![]);
        assert_eq!(dirty.final_label, Verdict::Abnormal);
    }

    #[test]
    fn test_keyframe_rounds_time() {
        let kf = Keyframe::new(3.33333, "/static/keyframes/a_kf1_t3.jpg", vec![det(ClassLabel::Abnormal)]);
        assert_eq!(kf.time, 3.33);
        assert_eq!(kf.status, ClassLabel::Abnormal);
        assert!(kf.has_abnormal_detection());
    }

    #[test]
    fn test_keyframe_keeps_all_detections() {
        let kf = Keyframe::new(
            0.0,
            "/static/keyframes/a_kf1_t0.jpg",
            vec![det(ClassLabel::Abnormal), det(ClassLabel::Normal)],
        );
        assert_eq!(kf.detections.len(), 2);
    }

    #[test]
    fn test_detection_bounds_check() {
        let d = det(ClassLabel::Normal);
        assert!(d.is_within(640, 480));
        assert!(!d.is_within(40, 480));

        let degenerate = Detection { x2: 10, ..det(ClassLabel::Normal) };
        assert!(!degenerate.is_within(640, 480));
    }

    #[test]
    fn test_detection_wire_shape() {
        let json = serde_json::to_value(det(ClassLabel::Abnormal)).unwrap();
        assert_eq!(json["label"], "abnormal");
        assert_eq!(json["x1"], 10);
        assert_eq!(json["confidence"], 0.9);
    }
}
