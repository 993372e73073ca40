//! Analysis orchestration and the run state machine.
//!
//! One call analyzes exactly one video, synchronously: decode -> sample ->
//! detect -> (per box) crop -> classify -> aggregate, frame by frame, then a
//! single terminal write to the result sink. Status transitions are
//! `uploaded -> processing -> {done, error}`; `done`/`error` are terminal.

use std::path::Path;
use std::sync::Arc;

use opencv::prelude::*;
use tracing::{debug, info, warn};

use lscan_models::{AnalysisOutcome, Detection, Keyframe, VideoId};

use crate::classify::CropClassifier;
use crate::config::KeyframeSettings;
use crate::convert::mat_to_rgb;
use crate::crop::{clip_box, extract_crop};
use crate::detect::LarvaDetector;
use crate::error::MediaResult;
use crate::render::{draw_detections, KeyframeWriter};
use crate::sampler::FrameSampler;
use crate::sink::ResultSink;
use crate::source::{Frame, FrameStream, VideoFileSource};

/// How a run ended, as recorded in the durable record.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisReport {
    /// Run reached stream exhaustion; outcome written with `status=done`.
    Done(AnalysisOutcome),
    /// Input or decode failure; recorded with `status=error`.
    Failed { reason: String },
}

/// Everything one pipeline run needs, constructed once at process start.
///
/// Holding the capabilities behind trait objects keeps the loaded models and
/// the store handle out of global state and lets tests substitute fakes.
pub struct AnalysisContext {
    detector: Arc<dyn LarvaDetector>,
    classifier: Arc<dyn CropClassifier>,
    sink: Arc<dyn ResultSink>,
    keyframes: KeyframeSettings,
}

/// What one successfully processed frame adds to the running totals.
struct FrameContribution {
    detections: u32,
    abnormal: u32,
    keyframe: Option<Keyframe>,
}

impl AnalysisContext {
    pub fn new(
        detector: Arc<dyn LarvaDetector>,
        classifier: Arc<dyn CropClassifier>,
        sink: Arc<dyn ResultSink>,
        keyframes: KeyframeSettings,
    ) -> Self {
        Self {
            detector,
            classifier,
            sink,
            keyframes,
        }
    }

    /// Analyze one uploaded video and record the outcome.
    ///
    /// Input and decode failures are recorded as `status=error` and returned
    /// as [`AnalysisReport::Failed`]; an `Err` from this function means a
    /// sink write failed and the record may not reflect the run.
    pub async fn run_analysis(
        &self,
        video_id: &VideoId,
        file_path: &Path,
    ) -> MediaResult<AnalysisReport> {
        info!(
            video_id = %video_id,
            path = %file_path.display(),
            detector = self.detector.name(),
            classifier = self.classifier.name(),
            "video analysis started"
        );

        self.sink.mark_processing(video_id).await?;

        if !file_path.exists() {
            warn!(video_id = %video_id, path = %file_path.display(), "video file not found");
            return self.fail(video_id, "video file not found").await;
        }

        let source = match VideoFileSource::open(file_path) {
            Ok(source) => source,
            Err(e) => {
                warn!(video_id = %video_id, error = %e, "cannot open video");
                return self.fail(video_id, "cannot open video").await;
            }
        };

        self.finish(video_id, source).await
    }

    async fn fail(&self, video_id: &VideoId, reason: &str) -> MediaResult<AnalysisReport> {
        self.sink.mark_failed(video_id, reason).await?;
        Ok(AnalysisReport::Failed {
            reason: reason.to_string(),
        })
    }

    /// Drain the stream, then perform the combined terminal write.
    pub(crate) async fn finish<S: FrameStream>(
        &self,
        video_id: &VideoId,
        stream: S,
    ) -> MediaResult<AnalysisReport> {
        let outcome = self.process_stream(video_id, stream);
        self.sink.complete(video_id, &outcome).await?;

        info!(
            video_id = %video_id,
            final_label = %outcome.final_label,
            total_count = outcome.summary.total_count,
            abnormal_count = outcome.summary.abnormal_count,
            keyframes = outcome.keyframes.len(),
            "video analysis done"
        );

        Ok(AnalysisReport::Done(outcome))
    }

    /// The per-frame loop. Always runs to stream exhaustion; zero detections
    /// is a valid outcome.
    fn process_stream<S: FrameStream>(&self, video_id: &VideoId, stream: S) -> AnalysisOutcome {
        let mut sampler = FrameSampler::new(stream);
        debug!(video_id = %video_id, interval = sampler.interval(), "sampling cadence");

        let mut writer = KeyframeWriter::new(self.keyframes.clone());
        let mut total_count = 0u32;
        let mut abnormal_count = 0u32;
        let mut keyframes: Vec<Keyframe> = Vec::new();

        loop {
            let frame = match sampler.next_sampled() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) => {
                    warn!(video_id = %video_id, error = %e, "frame stream ended abnormally");
                    break;
                }
            };

            // A failing frame is logged and skipped; its partial
            // contributions are discarded and the run continues.
            match self.process_frame(video_id, &frame, &mut writer) {
                Ok(Some(c)) => {
                    total_count += c.detections;
                    abnormal_count += c.abnormal;
                    if let Some(kf) = c.keyframe {
                        keyframes.push(kf);
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        video_id = %video_id,
                        frame_index = frame.index,
                        error = %e,
                        "frame processing failed, skipping frame"
                    );
                }
            }
        }

        AnalysisOutcome::from_counts(total_count, abnormal_count, keyframes)
    }

    /// Detect, crop, classify, and (when warranted) render one sampled frame.
    fn process_frame(
        &self,
        video_id: &VideoId,
        frame: &Frame,
        writer: &mut KeyframeWriter,
    ) -> MediaResult<Option<FrameContribution>> {
        let rgb = mat_to_rgb(&frame.mat)?;
        let raw_boxes = self.detector.detect(&rgb)?;
        if raw_boxes.is_empty() {
            return Ok(None);
        }

        let width = frame.mat.cols();
        let height = frame.mat.rows();

        let mut detections: Vec<Detection> = Vec::new();
        let mut abnormal_in_frame = 0u32;

        for raw in &raw_boxes {
            let Some(bx) = clip_box(raw, width, height) else {
                continue;
            };

            let crop = extract_crop(&rgb, &bx);
            let cls = self.classifier.classify(&crop)?;
            if cls.label.is_abnormal() {
                abnormal_in_frame += 1;
            }

            detections.push(Detection {
                x1: bx.x1,
                y1: bx.y1,
                x2: bx.x2,
                y2: bx.y2,
                label: cls.label,
                confidence: cls.confidence,
            });
        }

        if detections.is_empty() {
            return Ok(None);
        }

        let keyframe = if abnormal_in_frame > 0 {
            let annotated = draw_detections(&frame.mat, &detections)?;
            let url = writer.persist(video_id, frame.time, &annotated)?;
            Some(Keyframe::new(frame.time, url, detections.clone()))
        } else {
            None
        };

        debug!(
            video_id = %video_id,
            frame_index = frame.index,
            detections = detections.len(),
            abnormal = abnormal_in_frame,
            "frame processed"
        );

        Ok(Some(FrameContribution {
            detections: detections.len() as u32,
            abnormal: abnormal_in_frame,
            keyframe,
        }))
    }
}
