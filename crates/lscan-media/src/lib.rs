#![deny(unreachable_patterns)]
//! Video analysis pipeline for larva welfare auditing.
//!
//! This crate provides:
//! - Forward-only video decode and fixed-cadence frame sampling
//! - ONNX larva detection and normal/abnormal crop classification
//! - Geometric validation of detector boxes
//! - Annotated keyframe rendering and persistence
//! - The per-run orchestrator and its status state machine
//!
//! Decode and rendering require OpenCV and sit behind the `opencv` feature
//! (enabled by default); detection and classification run on ONNX Runtime
//! and are always available.

pub mod classify;
pub mod config;
#[cfg(feature = "opencv")]
pub mod convert;
pub mod crop;
pub mod detect;
pub mod error;
mod onnx;
#[cfg(feature = "opencv")]
pub mod pipeline;
#[cfg(feature = "opencv")]
pub mod render;
pub mod sampler;
pub mod sink;
#[cfg(feature = "opencv")]
pub mod source;

pub use classify::{Classification, ClassifierConfig, CropClassifier, OnnxCropClassifier};
pub use config::KeyframeSettings;
pub use crop::{clip_box, extract_crop, PixelBox};
pub use detect::{DetectorConfig, LarvaDetector, OnnxLarvaDetector, RawBox};
pub use error::{MediaError, MediaResult};
pub use sampler::{effective_fps, is_sampled, sampling_interval};
pub use sink::ResultSink;

#[cfg(feature = "opencv")]
pub use pipeline::{AnalysisContext, AnalysisReport};
#[cfg(feature = "opencv")]
pub use render::{draw_detections, KeyframeWriter};
#[cfg(feature = "opencv")]
pub use source::{Frame, FrameStream, VideoFileSource};
