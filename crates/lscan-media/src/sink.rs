//! Result sink seam.
//!
//! The pipeline never reads the video record back; it only pushes partial
//! updates keyed by video id. The durable store behind this trait must
//! accept partial field-set updates with last-write-wins semantics per
//! field.

use async_trait::async_trait;

use lscan_models::{AnalysisOutcome, VideoId};

use crate::error::MediaResult;

/// Write-only access to the durable video record.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Record that analysis has started. Idempotent.
    async fn mark_processing(&self, video_id: &VideoId) -> MediaResult<()>;

    /// Record a failed run: status and error message only, nothing else.
    async fn mark_failed(&self, video_id: &VideoId, message: &str) -> MediaResult<()>;

    /// Record a finished run: status, verdict, summary, and keyframes in one
    /// combined terminal write.
    async fn complete(&self, video_id: &VideoId, outcome: &AnalysisOutcome) -> MediaResult<()>;
}
