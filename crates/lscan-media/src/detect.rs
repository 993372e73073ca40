//! Larva detection using a YOLOv8-style ONNX model.
//!
//! The detector proposes candidate boxes only; normal/abnormal labeling is
//! the classifier's job. Candidate coordinates are returned in source-frame
//! pixels, unclipped. Geometric validation happens downstream in the crop
//! normalizer.

use std::path::Path;
use std::sync::Mutex;

use image::{DynamicImage, GenericImageView};
use ndarray::Array;
use ort::session::Session;
use ort::value::{Tensor, Value};
use tracing::{debug, info};

use crate::config::{DETECTOR_CONFIDENCE_THRESHOLD, DETECTOR_INPUT_SIZE, DETECTOR_IOU_THRESHOLD};
use crate::error::{MediaError, MediaResult};
use crate::onnx::create_session;

/// A candidate bounding box proposed by the detector.
///
/// Corner coordinates in source-frame pixels; may extend past the frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    /// Detector confidence in [0, 1]
    pub confidence: f32,
}

impl RawBox {
    /// Box area in square pixels (zero for degenerate boxes).
    pub fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }
}

/// Capability: propose candidate larva boxes in one frame.
pub trait LarvaDetector: Send + Sync {
    /// Detect larvae in a frame.
    ///
    /// Returns candidate boxes above the fixed confidence threshold; the
    /// result may be empty and carries no ordering guarantee.
    fn detect(&self, frame: &DynamicImage) -> MediaResult<Vec<RawBox>>;

    /// Detector name for logging.
    fn name(&self) -> &'static str;
}

/// Configuration for the ONNX larva detector.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Path to the ONNX model file
    pub model_path: String,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_path: "models/detector/larva_yolov8n.onnx".to_string(),
        }
    }
}

/// Number of values per candidate: 4 bbox (cx, cy, w, h) + 1 larva score.
const FEATURES_PER_CANDIDATE: usize = 5;

/// Larva detector backed by a single-class YOLOv8 ONNX model.
pub struct OnnxLarvaDetector {
    session: Mutex<Session>,
    config: DetectorConfig,
}

impl OnnxLarvaDetector {
    /// Load the detector model.
    ///
    /// Fails at construction when the weights are missing or unreadable;
    /// a constructed detector never fails to load mid-run.
    pub fn new(config: DetectorConfig) -> MediaResult<Self> {
        let model_path = Path::new(&config.model_path);
        if !model_path.exists() {
            return Err(MediaError::model_not_found(&config.model_path));
        }

        let session = Mutex::new(create_session(model_path)?);
        info!(
            model_path = %config.model_path,
            input_size = DETECTOR_INPUT_SIZE,
            "Larva detector initialized"
        );

        Ok(Self { session, config })
    }

    /// Get the configuration.
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Preprocess a frame for inference.
    ///
    /// - Resize to model input size (640x640)
    /// - Normalize pixel values to [0, 1]
    /// - Convert to NCHW format (batch, channels, height, width)
    fn preprocess(&self, img: &DynamicImage) -> MediaResult<Value> {
        let input_size = DETECTOR_INPUT_SIZE;

        let resized = img.resize_exact(
            input_size,
            input_size,
            image::imageops::FilterType::Triangle,
        );

        let rgb = resized.to_rgb8();
        let (w, h) = (input_size as usize, input_size as usize);

        // HWC -> CHW with normalization to [0, 1]
        let mut chw_data: Vec<f32> = Vec::with_capacity(3 * h * w);
        for c in 0..3 {
            for y in 0..h {
                for x in 0..w {
                    let pixel = rgb.get_pixel(x as u32, y as u32);
                    chw_data.push(pixel[c] as f32 / 255.0);
                }
            }
        }

        let shape = vec![1usize, 3, h, w];
        Tensor::from_array((shape, chw_data.into_boxed_slice()))
            .map(Value::from)
            .map_err(|e| MediaError::internal(format!("Failed to create tensor: {}", e)))
    }

    /// Run ONNX inference.
    fn run_inference(&self, input: Value) -> MediaResult<Vec<f32>> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| MediaError::internal("Session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| MediaError::detection_failed(format!("ONNX inference failed: {}", e)))?;

        let output = outputs
            .get("output0")
            .ok_or_else(|| MediaError::detection_failed("Missing output0 tensor"))?;

        let tensor = output
            .try_extract_tensor::<f32>()
            .map_err(|e| MediaError::detection_failed(format!("Failed to extract tensor: {}", e)))?;

        Ok(tensor.1.iter().copied().collect())
    }
}

impl LarvaDetector for OnnxLarvaDetector {
    fn detect(&self, frame: &DynamicImage) -> MediaResult<Vec<RawBox>> {
        let (width, height) = frame.dimensions();
        let input = self.preprocess(frame)?;
        let outputs = self.run_inference(input)?;
        let boxes = decode_output(&outputs, width, height)?;

        debug!(count = boxes.len(), "Larva detection completed");
        Ok(boxes)
    }

    fn name(&self) -> &'static str {
        "yolo-larva"
    }
}

/// Decode the raw model output.
///
/// YOLOv8 single-class output format: `[1, 5, N]` where 5 = 4 bbox values
/// (cx, cy, w, h) + 1 class score and N is the candidate count. Candidates
/// below the confidence threshold are dropped, the survivors are converted
/// to corner coordinates in source-frame pixels, then overlap-suppressed.
pub(crate) fn decode_output(
    outputs: &[f32],
    orig_width: u32,
    orig_height: u32,
) -> MediaResult<Vec<RawBox>> {
    if outputs.is_empty() || outputs.len() % FEATURES_PER_CANDIDATE != 0 {
        return Err(MediaError::detection_failed(format!(
            "Unexpected output size: {} not divisible by {}",
            outputs.len(),
            FEATURES_PER_CANDIDATE
        )));
    }
    let num_boxes = outputs.len() / FEATURES_PER_CANDIDATE;

    // Output is [5, N]; transpose to iterate per candidate.
    let output_array = Array::from_shape_vec((FEATURES_PER_CANDIDATE, num_boxes), outputs.to_vec())
        .map_err(|e| MediaError::detection_failed(format!("Failed to reshape output: {}", e)))?;
    let transposed = output_array.t();

    let input_size = DETECTOR_INPUT_SIZE as f32;
    let scale_w = orig_width as f32 / input_size;
    let scale_h = orig_height as f32 / input_size;

    let mut candidates: Vec<RawBox> = Vec::new();
    for i in 0..num_boxes {
        let score = transposed[[i, 4]];
        if score < DETECTOR_CONFIDENCE_THRESHOLD {
            continue;
        }

        let cx = transposed[[i, 0]];
        let cy = transposed[[i, 1]];
        let w = transposed[[i, 2]];
        let h = transposed[[i, 3]];

        // Center format -> corner format, scaled back to the source frame.
        // No clamping here: the crop normalizer owns bounds validation.
        candidates.push(RawBox {
            x1: (cx - w / 2.0) * scale_w,
            y1: (cy - h / 2.0) * scale_h,
            x2: (cx + w / 2.0) * scale_w,
            y2: (cy + h / 2.0) * scale_h,
            confidence: score,
        });
    }

    Ok(non_maximum_suppression(candidates))
}

/// Suppress overlapping candidates, keeping the most confident.
///
/// This is the detector's own internal suppression; nothing downstream
/// merges boxes again.
fn non_maximum_suppression(mut boxes: Vec<RawBox>) -> Vec<RawBox> {
    if boxes.is_empty() {
        return boxes;
    }

    boxes.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap());

    let mut keep = Vec::new();
    let mut suppressed = vec![false; boxes.len()];

    for i in 0..boxes.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(boxes[i]);

        for j in (i + 1)..boxes.len() {
            if !suppressed[j] && compute_iou(&boxes[i], &boxes[j]) > DETECTOR_IOU_THRESHOLD {
                suppressed[j] = true;
            }
        }
    }

    keep
}

/// Intersection over Union between two boxes.
fn compute_iou(a: &RawBox, b: &RawBox) -> f32 {
    let x1 = a.x1.max(b.x1);
    let y1 = a.y1.max(b.y1);
    let x2 = a.x2.min(b.x2);
    let y2 = a.y2.min(b.y2);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let union = a.area() + b.area() - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a [1, 5, N] output buffer from (cx, cy, w, h, score) rows.
    fn output_from_rows(rows: &[[f32; 5]]) -> Vec<f32> {
        let n = rows.len();
        let mut out = vec![0.0; 5 * n];
        for (i, row) in rows.iter().enumerate() {
            for (f, v) in row.iter().enumerate() {
                out[f * n + i] = *v;
            }
        }
        out
    }

    #[test]
    fn test_decode_scales_to_source_frame() {
        // One candidate centered at model coords (320, 320), 64x64 box,
        // frame is 1280x640 so scale is 2x horizontal, 1x vertical.
        let out = output_from_rows(&[[320.0, 320.0, 64.0, 64.0, 0.9]]);
        let boxes = decode_output(&out, 1280, 640).unwrap();

        assert_eq!(boxes.len(), 1);
        let b = boxes[0];
        assert_eq!(b.x1, (320.0 - 32.0) * 2.0);
        assert_eq!(b.x2, (320.0 + 32.0) * 2.0);
        assert_eq!(b.y1, 320.0 - 32.0);
        assert_eq!(b.y2, 320.0 + 32.0);
    }

    #[test]
    fn test_decode_applies_confidence_threshold() {
        let out = output_from_rows(&[
            [100.0, 100.0, 20.0, 20.0, 0.24],
            [300.0, 300.0, 20.0, 20.0, 0.26],
        ]);
        let boxes = decode_output(&out, 640, 640).unwrap();
        assert_eq!(boxes.len(), 1);
        assert!(boxes[0].confidence >= DETECTOR_CONFIDENCE_THRESHOLD);
    }

    #[test]
    fn test_decode_keeps_out_of_frame_corners() {
        // Candidate hanging past the left edge stays unclipped here.
        let out = output_from_rows(&[[10.0, 10.0, 40.0, 40.0, 0.8]]);
        let boxes = decode_output(&out, 640, 640).unwrap();
        assert!(boxes[0].x1 < 0.0);
    }

    #[test]
    fn test_decode_rejects_malformed_output() {
        assert!(decode_output(&[0.0; 7], 640, 640).is_err());
        assert!(decode_output(&[], 640, 640).is_err());
    }

    #[test]
    fn test_nms_suppresses_duplicates() {
        let out = output_from_rows(&[
            [100.0, 100.0, 40.0, 40.0, 0.9],
            [102.0, 101.0, 40.0, 40.0, 0.5],
            [400.0, 400.0, 40.0, 40.0, 0.7],
        ]);
        let boxes = decode_output(&out, 640, 640).unwrap();

        assert_eq!(boxes.len(), 2);
        // The highest-confidence duplicate wins.
        assert_eq!(boxes[0].confidence, 0.9);
    }

    #[test]
    fn test_iou_disjoint_is_zero() {
        let a = RawBox { x1: 0.0, y1: 0.0, x2: 10.0, y2: 10.0, confidence: 1.0 };
        let b = RawBox { x1: 20.0, y1: 20.0, x2: 30.0, y2: 30.0, confidence: 1.0 };
        assert_eq!(compute_iou(&a, &b), 0.0);
    }

    #[test]
    fn test_missing_model_is_startup_error() {
        let err = OnnxLarvaDetector::new(DetectorConfig {
            model_path: "definitely/not/here.onnx".to_string(),
        })
        .err()
        .unwrap();
        assert!(matches!(err, MediaError::ModelNotFound(_)));
    }
}
