//! Frozen analysis constants and artifact settings.
//!
//! The constants below form the configuration contract the models were fit
//! with. They are not runtime-tunable: changing any of them without
//! re-exporting the weights silently degrades both detector and classifier.

use std::path::PathBuf;

/// Wall-clock spacing between frames selected for analysis, in seconds.
pub const SAMPLING_PERIOD_SECS: f64 = 3.0;

/// Effective frame rate used when the container reports a rate <= 0.
pub const FALLBACK_FPS: f64 = 30.0;

/// Minimum detector confidence for a candidate box.
pub const DETECTOR_CONFIDENCE_THRESHOLD: f32 = 0.25;

/// Detector model input size (square).
pub const DETECTOR_INPUT_SIZE: u32 = 640;

/// IoU threshold for the detector's internal overlap suppression.
pub const DETECTOR_IOU_THRESHOLD: f32 = 0.45;

/// Classifier model input size (square).
pub const CLASSIFIER_INPUT_SIZE: u32 = 224;

/// Per-channel RGB normalization mean applied before classification.
pub const CLASSIFIER_NORM_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// Per-channel RGB normalization std applied before classification.
pub const CLASSIFIER_NORM_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Where rendered keyframe images are persisted and how they are addressed.
#[derive(Debug, Clone)]
pub struct KeyframeSettings {
    /// Directory keyframe JPEGs are written to.
    pub dir: PathBuf,
    /// Public URL prefix the upload layer serves that directory under.
    pub public_prefix: String,
}

impl Default for KeyframeSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("static/keyframes"),
            public_prefix: "/static/keyframes".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frozen_contract() {
        // These values must match what the models were trained with.
        assert_eq!(SAMPLING_PERIOD_SECS, 3.0);
        assert_eq!(DETECTOR_CONFIDENCE_THRESHOLD, 0.25);
        assert_eq!(CLASSIFIER_INPUT_SIZE, 224);
        assert_eq!(CLASSIFIER_NORM_MEAN[0], 0.485);
    }

    #[test]
    fn test_default_keyframe_settings() {
        let settings = KeyframeSettings::default();
        assert_eq!(settings.dir, PathBuf::from("static/keyframes"));
        assert_eq!(settings.public_prefix, "/static/keyframes");
    }
}
