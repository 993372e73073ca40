//! Typed repository for video record documents.

use std::collections::HashMap;

use tracing::info;

use lscan_models::{AnalysisOutcome, VideoId, VideoRecord, VideoStatus};

use crate::client::FirestoreClient;
use crate::error::FirestoreResult;
use crate::types::{ToFirestoreValue, Value};

/// Collection holding one document per uploaded video.
const COLLECTION: &str = "videos";

/// Repository for video record documents.
///
/// The analysis pipeline only ever issues the three partial writes below;
/// it never reads the record back.
#[derive(Clone)]
pub struct VideoRepository {
    client: FirestoreClient,
}

impl VideoRepository {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    /// Create the record at upload time.
    pub async fn create(&self, record: &VideoRecord) -> FirestoreResult<()> {
        self.client
            .create_document(COLLECTION, record.video_id.as_str(), record_fields(record))
            .await?;
        info!(video_id = %record.video_id, "created video record");
        Ok(())
    }

    /// Record that analysis has started.
    pub async fn mark_processing(&self, video_id: &VideoId) -> FirestoreResult<()> {
        let (fields, mask) = processing_fields();
        self.client
            .update_document(COLLECTION, video_id.as_str(), fields, Some(mask))
            .await?;
        Ok(())
    }

    /// Record a failed run. Writes status and the error message, nothing else.
    pub async fn mark_failed(&self, video_id: &VideoId, message: &str) -> FirestoreResult<()> {
        let (fields, mask) = failure_fields(message);
        self.client
            .update_document(COLLECTION, video_id.as_str(), fields, Some(mask))
            .await?;
        Ok(())
    }

    /// Record a finished run: status, verdict, summary, and keyframes in one
    /// combined update.
    pub async fn complete(
        &self,
        video_id: &VideoId,
        outcome: &AnalysisOutcome,
    ) -> FirestoreResult<()> {
        let (fields, mask) = completion_fields(outcome);
        self.client
            .update_document(COLLECTION, video_id.as_str(), fields, Some(mask))
            .await?;
        Ok(())
    }
}

fn record_fields(record: &VideoRecord) -> HashMap<String, Value> {
    let mut fields = HashMap::new();
    fields.insert("farm_id".to_string(), record.farm_id.to_firestore_value());
    fields.insert("filename".to_string(), record.filename.to_firestore_value());
    fields.insert(
        "original_filename".to_string(),
        record.original_filename.to_firestore_value(),
    );
    fields.insert("path".to_string(), record.path.to_firestore_value());
    fields.insert("status".to_string(), record.status.to_firestore_value());
    fields.insert("created_at".to_string(), record.created_at.to_firestore_value());
    fields
}

fn processing_fields() -> (HashMap<String, Value>, Vec<String>) {
    let mut fields = HashMap::new();
    fields.insert(
        "status".to_string(),
        VideoStatus::Processing.to_firestore_value(),
    );
    (fields, vec!["status".to_string()])
}

fn failure_fields(message: &str) -> (HashMap<String, Value>, Vec<String>) {
    let mut fields = HashMap::new();
    fields.insert("status".to_string(), VideoStatus::Error.to_firestore_value());
    fields.insert("analysis_error".to_string(), message.to_firestore_value());
    (
        fields,
        vec!["status".to_string(), "analysis_error".to_string()],
    )
}

fn completion_fields(outcome: &AnalysisOutcome) -> (HashMap<String, Value>, Vec<String>) {
    let mut fields = HashMap::new();
    fields.insert("status".to_string(), VideoStatus::Done.to_firestore_value());
    fields.insert("final".to_string(), outcome.final_label.to_firestore_value());
    fields.insert("summary".to_string(), outcome.summary.to_firestore_value());
    fields.insert("keyframes".to_string(), outcome.keyframes.to_firestore_value());
    (
        fields,
        vec![
            "status".to_string(),
            "final".to_string(),
            "summary".to_string(),
            "keyframes".to_string(),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use lscan_models::{ClassLabel, Detection, Keyframe};

    #[test]
    fn test_processing_mask_is_status_only() {
        let (fields, mask) = processing_fields();
        assert_eq!(mask, vec!["status"]);
        assert!(matches!(&fields["status"], Value::StringValue(s) if s == "processing"));
    }

    #[test]
    fn test_failure_writes_no_summary() {
        let (fields, mask) = failure_fields("cannot open video");
        assert_eq!(mask, vec!["status", "analysis_error"]);
        assert_eq!(fields.len(), 2);
        assert!(matches!(&fields["status"], Value::StringValue(s) if s == "error"));
        assert!(
            matches!(&fields["analysis_error"], Value::StringValue(s) if s == "cannot open video")
        );
    }

    #[test]
    fn test_completion_is_one_combined_write() {
        let outcome = AnalysisOutcome::from_counts(
            2,
            1,
            vec![Keyframe::new(
                3.0,
                "/static/keyframes/v_kf1_t3.jpg",
                vec![Detection {
                    x1: 10,
                    y1: 10,
                    x2: 50,
                    y2: 50,
                    label: ClassLabel::Abnormal,
                    confidence: 0.9,
                }],
            )],
        );

        let (fields, mask) = completion_fields(&outcome);
        assert_eq!(mask, vec!["status", "final", "summary", "keyframes"]);
        assert!(matches!(&fields["status"], Value::StringValue(s) if s == "done"));
        assert!(matches!(&fields["final"], Value::StringValue(s) if s == "abnormal"));
        assert!(matches!(&fields["summary"], Value::MapValue(_)));
        assert!(matches!(&fields["keyframes"], Value::ArrayValue(_)));
    }

    #[test]
    fn test_record_fields_cover_upload_shape() {
        let record = VideoRecord::new(
            VideoId::from("vid-1"),
            "farm-7",
            "vid-1.mp4",
            "pen7_morning.mp4",
            "/data/uploads/vid-1.mp4",
        );
        let fields = record_fields(&record);
        assert!(matches!(&fields["status"], Value::StringValue(s) if s == "uploaded"));
        assert!(matches!(&fields["farm_id"], Value::StringValue(s) if s == "farm-7"));
        assert!(matches!(&fields["created_at"], Value::TimestampValue(_)));
    }
}
