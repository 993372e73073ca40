//! Worker configuration from environment variables.

use std::path::PathBuf;

use lscan_media::{ClassifierConfig, DetectorConfig, KeyframeSettings};

/// Environment-driven worker settings, read once at startup.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Path to the larva detector ONNX model
    pub detector_model_path: String,
    /// Path to the crop classifier ONNX model
    pub classifier_model_path: String,
    /// Logits output tensor name of the classifier model
    pub classifier_output_name: String,
    /// Directory keyframe JPEGs are written to
    pub keyframe_dir: PathBuf,
    /// Public URL prefix the keyframe directory is served under
    pub keyframe_public_prefix: String,
}

impl WorkerConfig {
    /// Load from environment variables, with defaults matching the repo layout.
    pub fn from_env() -> Self {
        let detector_default = DetectorConfig::default();
        let classifier_default = ClassifierConfig::default();
        let keyframe_default = KeyframeSettings::default();

        Self {
            detector_model_path: std::env::var("LSCAN_DETECTOR_MODEL")
                .unwrap_or(detector_default.model_path),
            classifier_model_path: std::env::var("LSCAN_CLASSIFIER_MODEL")
                .unwrap_or(classifier_default.model_path),
            classifier_output_name: std::env::var("LSCAN_CLASSIFIER_OUTPUT")
                .unwrap_or(classifier_default.output_name),
            keyframe_dir: std::env::var("LSCAN_KEYFRAME_DIR")
                .map(PathBuf::from)
                .unwrap_or(keyframe_default.dir),
            keyframe_public_prefix: std::env::var("LSCAN_KEYFRAME_PREFIX")
                .unwrap_or(keyframe_default.public_prefix),
        }
    }

    /// Detector configuration for this worker.
    pub fn detector(&self) -> DetectorConfig {
        DetectorConfig {
            model_path: self.detector_model_path.clone(),
        }
    }

    /// Classifier configuration for this worker.
    pub fn classifier(&self) -> ClassifierConfig {
        ClassifierConfig {
            model_path: self.classifier_model_path.clone(),
            output_name: self.classifier_output_name.clone(),
        }
    }

    /// Keyframe artifact settings for this worker.
    pub fn keyframes(&self) -> KeyframeSettings {
        KeyframeSettings {
            dir: self.keyframe_dir.clone(),
            public_prefix: self.keyframe_public_prefix.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_follow_repo_layout() {
        // Only meaningful when the env vars are unset, as in CI.
        std::env::remove_var("LSCAN_DETECTOR_MODEL");
        std::env::remove_var("LSCAN_KEYFRAME_DIR");
        let config = WorkerConfig::from_env();
        assert!(config.detector_model_path.ends_with(".onnx"));
        assert_eq!(config.keyframes().public_prefix, "/static/keyframes");
    }
}
