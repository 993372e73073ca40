//! Normal/abnormal classification of detected larva crops.
//!
//! Mirrors the preprocessing the classifier was fit with: 224x224 resize and
//! per-channel normalization with fixed ImageNet statistics. Inference is
//! deterministic; identical crop and weights always produce the identical
//! label and confidence.

use std::path::Path;
use std::sync::Mutex;

use image::DynamicImage;
use ort::session::Session;
use ort::value::{Tensor, Value};
use tracing::info;

use lscan_models::ClassLabel;

use crate::config::{CLASSIFIER_INPUT_SIZE, CLASSIFIER_NORM_MEAN, CLASSIFIER_NORM_STD};
use crate::error::{MediaError, MediaResult};
use crate::onnx::create_session;

/// Class order the model was fit with: index 0 = abnormal, index 1 = normal.
const CLASS_ORDER: [ClassLabel; 2] = [ClassLabel::Abnormal, ClassLabel::Normal];

/// Result of classifying one crop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub label: ClassLabel,
    /// Probability of the predicted class, in [0, 1]
    pub confidence: f64,
}

/// Capability: label one cropped sub-image normal or abnormal.
pub trait CropClassifier: Send + Sync {
    fn classify(&self, crop: &DynamicImage) -> MediaResult<Classification>;

    /// Classifier name for logging.
    fn name(&self) -> &'static str;
}

/// Configuration for the ONNX crop classifier.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Path to the ONNX model file
    pub model_path: String,
    /// Name of the logits output tensor
    pub output_name: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model_path: "models/classifier/larva_resnet50.onnx".to_string(),
            output_name: "output".to_string(),
        }
    }
}

/// Crop classifier backed by a two-class ResNet ONNX model.
pub struct OnnxCropClassifier {
    session: Mutex<Session>,
    config: ClassifierConfig,
}

impl OnnxCropClassifier {
    /// Load the classifier model.
    ///
    /// Fails at construction when the weights are missing or unreadable.
    pub fn new(config: ClassifierConfig) -> MediaResult<Self> {
        let model_path = Path::new(&config.model_path);
        if !model_path.exists() {
            return Err(MediaError::model_not_found(&config.model_path));
        }

        let session = Mutex::new(create_session(model_path)?);
        info!(
            model_path = %config.model_path,
            input_size = CLASSIFIER_INPUT_SIZE,
            "Crop classifier initialized"
        );

        Ok(Self { session, config })
    }

    /// Get the configuration.
    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    fn run_inference(&self, input: Value) -> MediaResult<Vec<f32>> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| MediaError::internal("Session lock poisoned"))?;

        let outputs = session.run(ort::inputs![input]).map_err(|e| {
            MediaError::classification_failed(format!("ONNX inference failed: {}", e))
        })?;

        let output = outputs.get(self.config.output_name.as_str()).ok_or_else(|| {
            MediaError::classification_failed(format!(
                "Missing {} tensor",
                self.config.output_name
            ))
        })?;

        let tensor = output.try_extract_tensor::<f32>().map_err(|e| {
            MediaError::classification_failed(format!("Failed to extract tensor: {}", e))
        })?;

        Ok(tensor.1.iter().copied().collect())
    }
}

impl CropClassifier for OnnxCropClassifier {
    fn classify(&self, crop: &DynamicImage) -> MediaResult<Classification> {
        let input = preprocess(crop)?;
        let logits = self.run_inference(input)?;
        decide(&logits)
    }

    fn name(&self) -> &'static str {
        "resnet-larva"
    }
}

/// Preprocess a crop exactly as at training time.
///
/// - Resize to 224x224
/// - Scale to [0, 1] then normalize per channel with the fixed statistics
/// - NCHW layout
fn preprocess(crop: &DynamicImage) -> MediaResult<Value> {
    let size = CLASSIFIER_INPUT_SIZE;
    let resized = crop.resize_exact(size, size, image::imageops::FilterType::Triangle);
    let rgb = resized.to_rgb8();
    let (w, h) = (size as usize, size as usize);

    let mut chw_data: Vec<f32> = Vec::with_capacity(3 * h * w);
    for c in 0..3 {
        for y in 0..h {
            for x in 0..w {
                let pixel = rgb.get_pixel(x as u32, y as u32);
                let scaled = pixel[c] as f32 / 255.0;
                chw_data.push((scaled - CLASSIFIER_NORM_MEAN[c]) / CLASSIFIER_NORM_STD[c]);
            }
        }
    }

    let shape = vec![1usize, 3, h, w];
    Tensor::from_array((shape, chw_data.into_boxed_slice()))
        .map(Value::from)
        .map_err(|e| MediaError::internal(format!("Failed to create tensor: {}", e)))
}

/// Arg-max over softmax probabilities of the two logits.
pub(crate) fn decide(logits: &[f32]) -> MediaResult<Classification> {
    if logits.len() != CLASS_ORDER.len() {
        return Err(MediaError::classification_failed(format!(
            "Expected {} logits, got {}",
            CLASS_ORDER.len(),
            logits.len()
        )));
    }

    let probs = softmax(logits);
    let (pred_idx, confidence) = probs
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
        .map(|(i, p)| (i, *p))
        .unwrap();

    Ok(Classification {
        label: CLASS_ORDER[pred_idx],
        confidence: confidence as f64,
    })
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.iter().map(|e| e / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decide_abnormal_wins_index_zero() {
        let c = decide(&[2.0, -1.0]).unwrap();
        assert_eq!(c.label, ClassLabel::Abnormal);
        assert!(c.confidence > 0.9);
    }

    #[test]
    fn test_decide_normal_wins_index_one() {
        let c = decide(&[-3.0, 1.0]).unwrap();
        assert_eq!(c.label, ClassLabel::Normal);
        assert!(c.confidence > 0.9);
    }

    #[test]
    fn test_confidence_is_probability() {
        let c = decide(&[0.0, 0.0]).unwrap();
        assert!((c.confidence - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_decide_is_deterministic() {
        let a = decide(&[0.3, 0.7]).unwrap();
        let b = decide(&[0.3, 0.7]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_decide_rejects_wrong_arity() {
        assert!(decide(&[1.0]).is_err());
        assert!(decide(&[1.0, 2.0, 3.0]).is_err());
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&[1.0, 2.0]);
        assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-6);
        assert!(probs[1] > probs[0]);
    }

    #[test]
    fn test_missing_model_is_startup_error() {
        let err = OnnxCropClassifier::new(ClassifierConfig {
            model_path: "definitely/not/here.onnx".to_string(),
            ..ClassifierConfig::default()
        })
        .err()
        .unwrap();
        assert!(matches!(err, MediaError::ModelNotFound(_)));
    }
}
