//! JPEG encoding of captured frames.

use super::EncodedImage;
use crate::capture::{Frame, PixelFormat};
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder};
use thiserror::Error;

const JPEG_MIME: &str = "image/jpeg";

/// Errors that can occur while encoding a frame.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("frame has no pixels ({width}x{height})")]
    EmptyFrame { width: u32, height: u32 },
    #[error("frame buffer holds {actual} bytes, expected {expected}")]
    InvalidFrame { expected: usize, actual: usize },
    #[error("jpeg encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// Compresses frames into JPEG at a fixed quality.
#[derive(Debug, Clone, Copy)]
pub struct FrameEncoder {
    quality: u8,
}

impl FrameEncoder {
    /// Creates an encoder; quality is clamped to 1-100.
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Encodes a frame as a JPEG image.
    pub fn encode(&self, frame: &Frame) -> Result<EncodedImage, EncodeError> {
        if frame.is_empty() {
            return Err(EncodeError::EmptyFrame {
                width: frame.width(),
                height: frame.height(),
            });
        }
        if !frame.is_valid() {
            return Err(EncodeError::InvalidFrame {
                expected: frame.pixel_count() * frame.format().bytes_per_pixel(),
                actual: frame.pixels().len(),
            });
        }

        let color = match frame.format() {
            PixelFormat::Gray => ExtendedColorType::L8,
            PixelFormat::Rgb => ExtendedColorType::Rgb8,
        };

        let mut bytes = Vec::with_capacity(frame.pixels().len() / 8);
        JpegEncoder::new_with_quality(&mut bytes, self.quality).write_image(
            frame.pixels(),
            frame.width(),
            frame.height(),
            color,
        )?;

        tracing::trace!(
            sequence = frame.sequence(),
            raw_bytes = frame.pixels().len(),
            jpeg_bytes = bytes.len(),
            "Encoded frame"
        );

        Ok(EncodedImage::new(
            bytes,
            frame.width(),
            frame.height(),
            JPEG_MIME,
        ))
    }
}

impl Default for FrameEncoder {
    fn default() -> Self {
        Self::new(92)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::solid_frame;

    #[test]
    fn test_encodes_rgb_frame_as_jpeg() {
        let frame = solid_frame(32, 24, PixelFormat::Rgb, 128);
        let image = FrameEncoder::default().encode(&frame).unwrap();

        assert_eq!(image.mime(), "image/jpeg");
        assert_eq!((image.width(), image.height()), (32, 24));
        // SOI marker
        assert_eq!(&image.bytes()[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_encodes_gray_frame() {
        let frame = solid_frame(16, 16, PixelFormat::Gray, 40);
        let image = FrameEncoder::new(50).encode(&frame).unwrap();
        assert!(!image.is_empty());
    }

    #[test]
    fn test_empty_frame_rejected() {
        let frame = Frame::new(Vec::new(), 0, 0, PixelFormat::Rgb, 1);
        assert!(matches!(
            FrameEncoder::default().encode(&frame),
            Err(EncodeError::EmptyFrame { .. })
        ));
    }

    #[test]
    fn test_short_buffer_rejected() {
        let frame = Frame::new(vec![0u8; 10], 4, 4, PixelFormat::Rgb, 1);
        assert!(matches!(
            FrameEncoder::default().encode(&frame),
            Err(EncodeError::InvalidFrame {
                expected: 48,
                actual: 10
            })
        ));
    }

    #[test]
    fn test_quality_clamped() {
        assert_eq!(FrameEncoder::new(0).quality(), 1);
        assert_eq!(FrameEncoder::new(200).quality(), 100);
    }
}
