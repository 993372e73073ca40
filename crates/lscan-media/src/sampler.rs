//! Fixed-cadence frame sampling.

use crate::config::{FALLBACK_FPS, SAMPLING_PERIOD_SECS};

#[cfg(feature = "opencv")]
use crate::error::MediaResult;
#[cfg(feature = "opencv")]
use crate::source::{Frame, FrameStream};

/// Frame rate used for sampling and timestamps; falls back when the
/// container reports a nonsensical rate.
pub fn effective_fps(reported: f64) -> f64 {
    if reported > 0.0 {
        reported
    } else {
        FALLBACK_FPS
    }
}

/// Sampling interval in frames: `floor(fps * period)`.
pub fn sampling_interval(fps: f64) -> u64 {
    (fps * SAMPLING_PERIOD_SECS).floor() as u64
}

/// Whether the frame at `index` is selected for analysis.
///
/// Every frame is selected when the interval collapses to <= 1.
pub fn is_sampled(index: u64, interval: u64) -> bool {
    interval <= 1 || index % interval == 0
}

/// Pull-based sampler over a [`FrameStream`].
///
/// Yields only frames whose index falls on the sampling cadence, with the
/// derived timestamp attached. Lazy, finite, non-restartable; stream
/// exhaustion terminates the sequence normally.
#[cfg(feature = "opencv")]
pub struct FrameSampler<S: FrameStream> {
    stream: S,
    fps: f64,
    interval: u64,
    next_index: u64,
}

#[cfg(feature = "opencv")]
impl<S: FrameStream> FrameSampler<S> {
    pub fn new(stream: S) -> Self {
        let fps = stream.effective_fps();
        Self {
            stream,
            fps,
            interval: sampling_interval(fps),
            next_index: 0,
        }
    }

    /// Sampling interval in frames.
    pub fn interval(&self) -> u64 {
        self.interval
    }

    /// Pull the next sampled frame, or `None` once the stream is exhausted.
    pub fn next_sampled(&mut self) -> MediaResult<Option<Frame>> {
        while let Some(mat) = self.stream.next_frame()? {
            let index = self.next_index;
            self.next_index += 1;

            if !is_sampled(index, self.interval) {
                continue;
            }

            return Ok(Some(Frame {
                index,
                time: index as f64 / self.fps,
                mat,
            }));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_fps_fallback() {
        assert_eq!(effective_fps(0.0), 30.0);
        assert_eq!(effective_fps(-1.0), 30.0);
        assert_eq!(effective_fps(25.0), 25.0);
    }

    #[test]
    fn test_interval_at_30fps() {
        // 30 fps * 3 s = every 90th frame
        assert_eq!(sampling_interval(30.0), 90);
    }

    #[test]
    fn test_interval_from_unreported_fps() {
        assert_eq!(sampling_interval(effective_fps(0.0)), 90);
    }

    #[test]
    fn test_interval_floors() {
        assert_eq!(sampling_interval(29.97), 89);
    }

    #[test]
    fn test_sampled_indices() {
        assert!(is_sampled(0, 90));
        assert!(!is_sampled(1, 90));
        assert!(!is_sampled(89, 90));
        assert!(is_sampled(90, 90));
        assert!(is_sampled(180, 90));
    }

    #[test]
    fn test_degenerate_interval_selects_every_frame() {
        for idx in 0..5 {
            assert!(is_sampled(idx, 0));
            assert!(is_sampled(idx, 1));
        }
    }
}
