//! Frame sources: forward-only decode of a video container.

use opencv::{
    core::Mat,
    prelude::*,
    videoio::{VideoCapture, CAP_ANY, CAP_PROP_FPS},
};
use tracing::{debug, warn};

use crate::config::FALLBACK_FPS;
use crate::error::{MediaError, MediaResult};

/// One decoded frame. Ephemeral: lives for a single loop iteration.
pub struct Frame {
    /// 0-based index within the source stream
    pub index: u64,
    /// Timestamp in seconds, `index / effective_fps`
    pub time: f64,
    /// BGR pixel buffer
    pub mat: Mat,
}

/// A forward-only, non-restartable sequence of decoded frames.
///
/// Implementations report their effective frame rate and yield raw BGR
/// buffers until the stream is exhausted. Exhaustion is a normal terminal
/// condition, not an error.
pub trait FrameStream {
    /// Frame rate used for timestamp derivation, already fallback-corrected.
    fn effective_fps(&self) -> f64;

    /// Pull the next frame, or `None` on stream exhaustion.
    fn next_frame(&mut self) -> MediaResult<Option<Mat>>;
}

/// Frame stream backed by an OpenCV `VideoCapture`.
///
/// The capture handle is released when the source is dropped, on every exit
/// path.
pub struct VideoFileSource {
    cap: VideoCapture,
    fps: f64,
}

impl VideoFileSource {
    /// Open a video container for decoding.
    pub fn open(path: &std::path::Path) -> MediaResult<Self> {
        let path_str = path.to_string_lossy();
        let cap = VideoCapture::from_file(&path_str, CAP_ANY)
            .map_err(|e| MediaError::decode_failed(format!("Failed to open video: {}", e)))?;

        if !cap.is_opened().unwrap_or(false) {
            return Err(MediaError::decode_failed(format!(
                "Failed to open video file: {}",
                path_str
            )));
        }

        let reported = cap.get(CAP_PROP_FPS).unwrap_or(0.0);
        let fps = crate::sampler::effective_fps(reported);
        if reported <= 0.0 {
            warn!(
                path = %path_str,
                fallback_fps = FALLBACK_FPS,
                "container reports no frame rate, using fallback"
            );
        }
        debug!(path = %path_str, fps, "opened video source");

        Ok(Self { cap, fps })
    }
}

impl FrameStream for VideoFileSource {
    fn effective_fps(&self) -> f64 {
        self.fps
    }

    fn next_frame(&mut self) -> MediaResult<Option<Mat>> {
        let mut mat = Mat::default();
        match self.cap.read(&mut mat) {
            Ok(true) if !mat.empty() => Ok(Some(mat)),
            Ok(_) => Ok(None),
            Err(e) => {
                // A failed read mid-stream is treated as exhaustion, matching
                // the decoder's end-of-stream signaling.
                warn!(error = %e, "frame read failed, treating as end of stream");
                Ok(None)
            }
        }
    }
}
