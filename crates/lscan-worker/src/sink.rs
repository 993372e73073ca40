//! Firestore-backed implementation of the pipeline's result sink.

use async_trait::async_trait;

use lscan_firestore::VideoRepository;
use lscan_media::{MediaError, MediaResult, ResultSink};
use lscan_models::{AnalysisOutcome, VideoId};

/// Adapts [`VideoRepository`] to the pipeline's [`ResultSink`] seam.
pub struct FirestoreResultSink {
    repo: VideoRepository,
}

impl FirestoreResultSink {
    pub fn new(repo: VideoRepository) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl ResultSink for FirestoreResultSink {
    async fn mark_processing(&self, video_id: &VideoId) -> MediaResult<()> {
        self.repo
            .mark_processing(video_id)
            .await
            .map_err(|e| MediaError::sink_failed(e.to_string()))
    }

    async fn mark_failed(&self, video_id: &VideoId, message: &str) -> MediaResult<()> {
        self.repo
            .mark_failed(video_id, message)
            .await
            .map_err(|e| MediaError::sink_failed(e.to_string()))
    }

    async fn complete(&self, video_id: &VideoId, outcome: &AnalysisOutcome) -> MediaResult<()> {
        self.repo
            .complete(video_id, outcome)
            .await
            .map_err(|e| MediaError::sink_failed(e.to_string()))
    }
}
