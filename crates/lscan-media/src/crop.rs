//! Geometric validation of raw detector boxes and crop extraction.

use image::DynamicImage;

use crate::detect::RawBox;

/// An integer pixel box, clipped to frame bounds with positive area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl PixelBox {
    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }
}

/// Clip a raw detector box to the frame.
///
/// Coordinates are truncated to integers, then clamped so that
/// `x1 in [0, w-1]`, `x2 in [0, w]`, `y1 in [0, h-1]`, `y2 in [0, h]`.
/// Returns `None` when the clipped region has zero area; such boxes are
/// dropped silently and do not count as detections.
pub fn clip_box(raw: &RawBox, frame_width: i32, frame_height: i32) -> Option<PixelBox> {
    if frame_width <= 0 || frame_height <= 0 {
        return None;
    }

    let x1 = (raw.x1 as i32).clamp(0, frame_width - 1);
    let x2 = (raw.x2 as i32).clamp(0, frame_width);
    let y1 = (raw.y1 as i32).clamp(0, frame_height - 1);
    let y2 = (raw.y2 as i32).clamp(0, frame_height);

    if x2 <= x1 || y2 <= y1 {
        return None;
    }

    Some(PixelBox { x1, y1, x2, y2 })
}

/// Extract the sub-image for a clipped box.
///
/// The box is assumed to come from [`clip_box`] against this frame's
/// dimensions, so the region is in bounds and non-empty.
pub fn extract_crop(frame: &DynamicImage, bx: &PixelBox) -> DynamicImage {
    frame.crop_imm(
        bx.x1 as u32,
        bx.y1 as u32,
        bx.width() as u32,
        bx.height() as u32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;

    fn raw(x1: f32, y1: f32, x2: f32, y2: f32) -> RawBox {
        RawBox {
            x1,
            y1,
            x2,
            y2,
            confidence: 0.5,
        }
    }

    #[test]
    fn test_in_bounds_box_unchanged() {
        let bx = clip_box(&raw(10.0, 10.0, 50.0, 50.0), 640, 480).unwrap();
        assert_eq!(bx, PixelBox { x1: 10, y1: 10, x2: 50, y2: 50 });
    }

    #[test]
    fn test_overhanging_box_is_clipped() {
        let bx = clip_box(&raw(-20.0, -5.0, 700.0, 500.0), 640, 480).unwrap();
        assert_eq!(bx, PixelBox { x1: 0, y1: 0, x2: 640, y2: 480 });
    }

    #[test]
    fn test_clipped_box_satisfies_bounds() {
        let bx = clip_box(&raw(600.0, 400.0, 900.0, 700.0), 640, 480).unwrap();
        assert!(0 <= bx.x1 && bx.x1 < bx.x2 && bx.x2 <= 640);
        assert!(0 <= bx.y1 && bx.y1 < bx.y2 && bx.y2 <= 480);
    }

    #[test]
    fn test_zero_area_discarded() {
        // degenerate on input
        assert!(clip_box(&raw(50.0, 50.0, 50.0, 60.0), 640, 480).is_none());
        // degenerate after clipping: fully outside the frame
        assert!(clip_box(&raw(640.0, 0.0, 800.0, 50.0), 640, 480).is_none());
        assert!(clip_box(&raw(-100.0, -100.0, -10.0, -10.0), 640, 480).is_none());
    }

    #[test]
    fn test_inverted_box_discarded() {
        assert!(clip_box(&raw(50.0, 50.0, 10.0, 80.0), 640, 480).is_none());
    }

    #[test]
    fn test_extract_crop_dimensions() {
        let frame = DynamicImage::new_rgb8(64, 48);
        let bx = clip_box(&raw(8.0, 4.0, 24.0, 20.0), 64, 48).unwrap();
        let crop = extract_crop(&frame, &bx);
        assert_eq!(crop.dimensions(), (16, 16));
    }
}
