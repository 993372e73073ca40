//! Video record models.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::analysis::{AnalysisOutcome, Keyframe, Summary};

/// Unique identifier for an uploaded video.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl VideoId {
    /// Generate a new random video ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for VideoId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for VideoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VideoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Video processing status.
///
/// Transitions are `uploaded -> processing -> {done, error}`; `done` and
/// `error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum VideoStatus {
    /// Uploaded, analysis not started yet
    #[default]
    Uploaded,
    /// Analysis in progress
    Processing,
    /// Analysis completed successfully
    Done,
    /// Analysis failed
    Error,
}

impl VideoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStatus::Uploaded => "uploaded",
            VideoStatus::Processing => "processing",
            VideoStatus::Done => "done",
            VideoStatus::Error => "error",
        }
    }

    /// Whether this status admits no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, VideoStatus::Done | VideoStatus::Error)
    }
}

impl fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when parsing a label string fails.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown label: {0}")]
pub struct LabelParseError(pub String);

/// Per-video verdict: abnormal if any abnormal specimen was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Normal,
    Abnormal,
}

impl Verdict {
    /// Verdict for a finished run given its abnormal detection count.
    pub fn from_abnormal_count(abnormal_count: u32) -> Self {
        if abnormal_count > 0 {
            Verdict::Abnormal
        } else {
            Verdict::Normal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Normal => "normal",
            Verdict::Abnormal => "abnormal",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Verdict {
    type Err = LabelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(Verdict::Normal),
            "abnormal" => Ok(Verdict::Abnormal),
            other => Err(LabelParseError(other.to_string())),
        }
    }
}

/// The durable video record, keyed by video id.
///
/// Created by the upload layer with `status=uploaded`; mutated exclusively by
/// one analysis run after that. The `status` field is the sole source of
/// truth for the run outcome.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VideoRecord {
    /// Unique video ID
    #[serde(rename = "_id")]
    pub video_id: VideoId,

    /// Rearing enclosure this footage came from
    pub farm_id: String,

    /// File name on disk (server-side, collision free)
    pub filename: String,

    /// File name as uploaded (user facing)
    pub original_filename: String,

    /// Absolute path of the stored video file
    pub path: String,

    /// Processing status
    #[serde(default)]
    pub status: VideoStatus,

    /// Upload timestamp
    pub created_at: DateTime<Utc>,

    /// Per-video verdict, set on the terminal `done` write
    #[serde(rename = "final", skip_serializing_if = "Option::is_none")]
    pub final_label: Option<Verdict>,

    /// Aggregate detection counts, set on the terminal `done` write
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<Summary>,

    /// Annotated evidence frames, set on the terminal `done` write
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keyframes: Vec<Keyframe>,

    /// Error message when `status=error`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_error: Option<String>,
}

impl VideoRecord {
    /// Create a fresh record at upload time.
    pub fn new(
        video_id: VideoId,
        farm_id: impl Into<String>,
        filename: impl Into<String>,
        original_filename: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            video_id,
            farm_id: farm_id.into(),
            filename: filename.into(),
            original_filename: original_filename.into(),
            path: path.into(),
            status: VideoStatus::Uploaded,
            created_at: Utc::now(),
            final_label: None,
            summary: None,
            keyframes: Vec::new(),
            analysis_error: None,
        }
    }

    /// Mark as done with the analysis outcome.
    pub fn complete(mut self, outcome: AnalysisOutcome) -> Self {
        self.status = VideoStatus::Done;
        self.final_label = Some(outcome.final_label);
        self.summary = Some(outcome.summary);
        self.keyframes = outcome.keyframes;
        self
    }

    /// Mark as failed.
    pub fn fail(mut self, error: impl Into<String>) -> Self {
        self.status = VideoStatus::Error;
        self.analysis_error = Some(error.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_id_generation() {
        let id1 = VideoId::new();
        let id2 = VideoId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_status_serde_names() {
        assert_eq!(
            serde_json::to_string(&VideoStatus::Processing).unwrap(),
            "\"processing\""
        );
        assert_eq!(
            serde_json::from_str::<VideoStatus>("\"done\"").unwrap(),
            VideoStatus::Done
        );
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!VideoStatus::Uploaded.is_terminal());
        assert!(!VideoStatus::Processing.is_terminal());
        assert!(VideoStatus::Done.is_terminal());
        assert!(VideoStatus::Error.is_terminal());
    }

    #[test]
    fn test_verdict_from_counts() {
        assert_eq!(Verdict::from_abnormal_count(0), Verdict::Normal);
        assert_eq!(Verdict::from_abnormal_count(1), Verdict::Abnormal);
        assert_eq!(Verdict::from_abnormal_count(42), Verdict::Abnormal);
    }

    #[test]
    fn test_verdict_parse() {
        assert_eq!("abnormal".parse::<Verdict>().unwrap(), Verdict::Abnormal);
        assert!("weird".parse::<Verdict>().is_err());
    }

    #[test]
    fn test_record_final_field_name() {
        let record = VideoRecord::new(
            VideoId::from("vid-1"),
            "farm-3",
            "vid-1.mp4",
            "cam_feed.mp4",
            "/data/uploads/vid-1.mp4",
        );
        let record = record.complete(crate::analysis::AnalysisOutcome::from_counts(3, 1, vec![]));

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["_id"], "vid-1");
        assert_eq!(json["status"], "done");
        assert_eq!(json["final"], "abnormal");
        assert_eq!(json["summary"]["total_count"], 3);
    }

    #[test]
    fn test_record_fail_writes_error_only() {
        let record = VideoRecord::new(
            VideoId::new(),
            "farm-1",
            "f.mp4",
            "f.mp4",
            "/data/uploads/f.mp4",
        )
        .fail("video file not found");

        assert_eq!(record.status, VideoStatus::Error);
        assert_eq!(record.analysis_error.as_deref(), Some("video file not found"));
        assert!(record.summary.is_none());
        assert!(record.final_label.is_none());
    }
}
