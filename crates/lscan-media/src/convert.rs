//! BGR frame buffer to `image` crate conversion.

use image::{DynamicImage, ImageBuffer, Rgb};
use opencv::{core::Mat, imgproc, prelude::*};

use crate::error::{MediaError, MediaResult};

/// Convert a decoded BGR frame into an RGB [`DynamicImage`] for inference.
pub fn mat_to_rgb(mat: &Mat) -> MediaResult<DynamicImage> {
    if mat.empty() {
        return Err(MediaError::decode_failed("Empty frame"));
    }

    let mut rgb = Mat::default();
    imgproc::cvt_color_def(mat, &mut rgb, imgproc::COLOR_BGR2RGB)
        .map_err(|e| MediaError::decode_failed(format!("BGR to RGB conversion: {}", e)))?;

    let width = rgb.cols() as u32;
    let height = rgb.rows() as u32;
    let data = rgb
        .data_bytes()
        .map_err(|e| MediaError::decode_failed(format!("Frame buffer access: {}", e)))?
        .to_vec();

    let expected_len = (width * height * 3) as usize;
    if data.len() != expected_len {
        return Err(MediaError::internal(format!(
            "Invalid frame data length: expected {}, got {}",
            expected_len,
            data.len()
        )));
    }

    let buffer: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_raw(width, height, data)
        .ok_or_else(|| MediaError::internal("Failed to create image buffer"))?;

    Ok(DynamicImage::ImageRgb8(buffer))
}
