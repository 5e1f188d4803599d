//! Snapshot encoding — scale a frame onto the canvas, JPEG, base64.

use crate::frame::{Frame, FrameError};
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{ExtendedColorType, ImageEncoder};
use thiserror::Error;

pub const JPEG_DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("invalid canvas size {0}x{1}")]
    InvalidCanvas(u32, u32),
    #[error("invalid JPEG quality {0} (expected 1-100)")]
    InvalidQuality(u8),
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),
    #[error("JPEG encoding failed: {0}")]
    Jpeg(#[from] image::ImageError),
}

/// A JPEG still ready for upload.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Snapshot {
    /// Base64 of the JPEG bytes, without any data-URL prefix.
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.jpeg)
    }
}

/// Draws frames onto a fixed-size canvas and serializes them as JPEG.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotEncoder {
    canvas_width: u32,
    canvas_height: u32,
    quality: u8,
}

impl SnapshotEncoder {
    pub fn new(canvas_width: u32, canvas_height: u32, quality: u8) -> Result<Self, EncodeError> {
        if canvas_width == 0 || canvas_height == 0 {
            return Err(EncodeError::InvalidCanvas(canvas_width, canvas_height));
        }
        if !(1..=100).contains(&quality) {
            return Err(EncodeError::InvalidQuality(quality));
        }
        Ok(Self {
            canvas_width,
            canvas_height,
            quality,
        })
    }

    pub fn canvas_size(&self) -> (u32, u32) {
        (self.canvas_width, self.canvas_height)
    }

    /// Stretch `frame` to the canvas size and encode it as JPEG.
    pub fn encode(&self, frame: &Frame) -> Result<Snapshot, EncodeError> {
        let mut img = frame.to_rgb_image()?;
        if img.dimensions() != (self.canvas_width, self.canvas_height) {
            img = imageops::resize(&img, self.canvas_width, self.canvas_height, FilterType::Triangle);
        }

        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, self.quality).write_image(
            img.as_raw(),
            self.canvas_width,
            self.canvas_height,
            ExtendedColorType::Rgb8,
        )?;

        tracing::debug!(
            bytes = jpeg.len(),
            width = self.canvas_width,
            height = self.canvas_height,
            quality = self.quality,
            "encoded snapshot"
        );

        Ok(Snapshot {
            jpeg,
            width: self.canvas_width,
            height: self.canvas_height,
        })
    }
}

/// Remove a leading `data:image/jpeg;base64,` prefix if present.
pub fn strip_data_url_prefix(data: &str) -> &str {
    data.strip_prefix(JPEG_DATA_URL_PREFIX).unwrap_or(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_frame(width: u32, height: u32) -> Frame {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&[
                    (x * 255 / width.max(1)) as u8,
                    (y * 255 / height.max(1)) as u8,
                    128,
                ]);
            }
        }
        Frame::from_rgb(data, width, height, 0).unwrap()
    }

    #[test]
    fn test_encode_scales_to_canvas() {
        let encoder = SnapshotEncoder::new(64, 48, 85).unwrap();
        let snap = encoder.encode(&gradient_frame(160, 90)).unwrap();
        assert_eq!((snap.width, snap.height), (64, 48));

        let decoded = image::load_from_memory_with_format(&snap.jpeg, image::ImageFormat::Jpeg)
            .unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 48));
    }

    #[test]
    fn test_base64_has_no_prefix() {
        let encoder = SnapshotEncoder::new(16, 16, 80).unwrap();
        let snap = encoder.encode(&gradient_frame(16, 16)).unwrap();
        let b64 = snap.to_base64();
        assert!(!b64.starts_with("data:"));
        // JPEG SOI marker 0xFFD8 encodes to "/9j/".
        assert!(b64.starts_with("/9j/"));
    }

    #[test]
    fn test_invalid_settings() {
        assert!(SnapshotEncoder::new(0, 10, 80).is_err());
        assert!(SnapshotEncoder::new(10, 10, 0).is_err());
        assert!(SnapshotEncoder::new(10, 10, 101).is_err());
    }

    #[test]
    fn test_strip_data_url_prefix() {
        assert_eq!(strip_data_url_prefix("data:image/jpeg;base64,/9j/abc"), "/9j/abc");
        assert_eq!(strip_data_url_prefix("/9j/abc"), "/9j/abc");
    }
}
