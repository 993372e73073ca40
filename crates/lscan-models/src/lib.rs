//! Shared data models for the Larvascan backend.
//!
//! This crate provides Serde-serializable types for:
//! - Video records and their processing status
//! - Per-frame detections and class labels
//! - Keyframes (annotated evidence images)
//! - Analysis summaries and outcomes

pub mod analysis;
pub mod video;

// Re-export common types
pub use analysis::{AnalysisOutcome, ClassLabel, Detection, Keyframe, Summary};
pub use video::{LabelParseError, Verdict, VideoId, VideoRecord, VideoStatus};
