//! Keyframe rendering and persistence.
//!
//! A keyframe is rendered only for sampled frames that contain at least one
//! abnormal detection, but the overlay shows every detection in the frame so
//! the operator sees the full picture.

use opencv::{
    core::{Mat, Point, Rect, Scalar, Vector},
    imgcodecs, imgproc,
    prelude::*,
};
use tracing::debug;

use lscan_models::{ClassLabel, Detection, VideoId};

use crate::config::KeyframeSettings;
use crate::error::{MediaError, MediaResult};

const BOX_THICKNESS: i32 = 2;
const TEXT_SCALE: f64 = 0.4;

/// BGR overlay color per label: red for abnormal, green for normal.
fn label_color(label: ClassLabel) -> Scalar {
    match label {
        ClassLabel::Abnormal => Scalar::new(0.0, 0.0, 255.0, 0.0),
        ClassLabel::Normal => Scalar::new(0.0, 255.0, 0.0, 0.0),
    }
}

/// Draw all detections onto a copy of the original frame.
pub fn draw_detections(frame: &Mat, detections: &[Detection]) -> MediaResult<Mat> {
    let mut vis = frame
        .try_clone()
        .map_err(|e| MediaError::render_failed(format!("Frame copy: {}", e)))?;

    for det in detections {
        let color = label_color(det.label);
        let rect = Rect::new(det.x1, det.y1, det.x2 - det.x1, det.y2 - det.y1);

        imgproc::rectangle(&mut vis, rect, color, BOX_THICKNESS, imgproc::LINE_8, 0)
            .map_err(|e| MediaError::render_failed(format!("Box overlay: {}", e)))?;

        let text = format!("{} {:.2}", det.label, det.confidence);
        imgproc::put_text(
            &mut vis,
            &text,
            Point::new(det.x1, (det.y1 - 5).max(0)),
            imgproc::FONT_HERSHEY_SIMPLEX,
            TEXT_SCALE,
            color,
            1,
            imgproc::LINE_AA,
            false,
        )
        .map_err(|e| MediaError::render_failed(format!("Label overlay: {}", e)))?;
    }

    Ok(vis)
}

/// Persists rendered keyframes for one analysis run.
///
/// Ordinals start at 1 and increment once per created keyframe; an ordinal
/// is never reused. File names follow `{video_id}_kf{ordinal}_t{sec}.jpg`.
pub struct KeyframeWriter {
    settings: KeyframeSettings,
    next_ordinal: u32,
}

impl KeyframeWriter {
    pub fn new(settings: KeyframeSettings) -> Self {
        Self {
            settings,
            next_ordinal: 1,
        }
    }

    /// Number of keyframes created so far.
    pub fn created(&self) -> u32 {
        self.next_ordinal - 1
    }

    /// Write the annotated frame and return its public URL.
    pub fn persist(
        &mut self,
        video_id: &VideoId,
        time_secs: f64,
        annotated: &Mat,
    ) -> MediaResult<String> {
        // Safe under concurrent first-use across independent runs.
        std::fs::create_dir_all(&self.settings.dir)?;

        let filename = format!("{}_kf{}_t{}.jpg", video_id, self.next_ordinal, time_secs as i64);
        let path = self.settings.dir.join(&filename);
        let path_str = path.to_string_lossy();

        let written = imgcodecs::imwrite(&path_str, annotated, &Vector::<i32>::new())
            .map_err(|e| MediaError::render_failed(format!("Keyframe write: {}", e)))?;
        if !written {
            return Err(MediaError::render_failed(format!(
                "Keyframe write refused: {}",
                path_str
            )));
        }

        debug!(video_id = %video_id, ordinal = self.next_ordinal, path = %path_str, "keyframe persisted");
        self.next_ordinal += 1;

        Ok(format!("{}/{}", self.settings.public_prefix, filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::CV_8UC3;

    fn black_frame(width: i32, height: i32) -> Mat {
        Mat::new_rows_cols_with_default(height, width, CV_8UC3, Scalar::all(0.0)).unwrap()
    }

    fn det(label: ClassLabel) -> Detection {
        Detection {
            x1: 10,
            y1: 10,
            x2: 50,
            y2: 50,
            label,
            confidence: 0.87,
        }
    }

    #[test]
    fn test_draw_leaves_original_untouched() {
        let frame = black_frame(64, 64);
        let vis = draw_detections(&frame, &[det(ClassLabel::Abnormal)]).unwrap();

        // The annotated copy has red pixels on the box edge; the source stays black.
        let edge = vis.at_2d::<opencv::core::Vec3b>(10, 10).unwrap();
        assert_eq!(edge[2], 255);
        let orig = frame.at_2d::<opencv::core::Vec3b>(10, 10).unwrap();
        assert_eq!(orig[2], 0);
    }

    #[test]
    fn test_writer_ordinals_and_naming() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = KeyframeWriter::new(KeyframeSettings {
            dir: dir.path().to_path_buf(),
            public_prefix: "/static/keyframes".to_string(),
        });

        let frame = black_frame(32, 32);
        let id = VideoId::from("vid-9");

        let url1 = writer.persist(&id, 3.4, &frame).unwrap();
        let url2 = writer.persist(&id, 6.9, &frame).unwrap();

        assert_eq!(url1, "/static/keyframes/vid-9_kf1_t3.jpg");
        assert_eq!(url2, "/static/keyframes/vid-9_kf2_t6.jpg");
        assert_eq!(writer.created(), 2);
        assert!(dir.path().join("vid-9_kf1_t3.jpg").exists());
        assert!(dir.path().join("vid-9_kf2_t6.jpg").exists());
    }

    #[test]
    fn test_writer_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("static").join("keyframes");
        let mut writer = KeyframeWriter::new(KeyframeSettings {
            dir: nested.clone(),
            public_prefix: "/static/keyframes".to_string(),
        });

        writer.persist(&VideoId::from("v"), 0.0, &black_frame(16, 16)).unwrap();
        assert!(nested.exists());
    }
}
