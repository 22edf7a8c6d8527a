//! Frame type representing a captured image with metadata.

use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Pixel layout of a captured frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// One byte per pixel, luminance only.
    Gray,
    /// Three bytes per pixel, interleaved R, G, B.
    #[default]
    Rgb,
}

impl PixelFormat {
    /// Number of bytes used by a single pixel.
    #[inline]
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Gray => 1,
            PixelFormat::Rgb => 3,
        }
    }
}

/// A single captured frame from the camera.
///
/// This is the off-screen raster a tick renders the live stream into
/// before it is encoded and submitted.
#[derive(Clone)]
pub struct Frame {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    format: PixelFormat,
    timestamp: Instant,
    /// Monotonic sequence number assigned by the camera.
    sequence: u64,
}

impl Frame {
    /// Creates a new frame with the given parameters.
    pub fn new(
        pixels: Vec<u8>,
        width: u32,
        height: u32,
        format: PixelFormat,
        sequence: u64,
    ) -> Self {
        Self {
            pixels,
            width,
            height,
            format,
            timestamp: Instant::now(),
            sequence,
        }
    }

    /// Returns a reference to the raw pixel data.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Returns the capture timestamp.
    #[inline]
    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }

    /// Returns the sequence number.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Returns the total number of pixels (width * height).
    #[inline]
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// True when the stream has not produced any picture yet.
    ///
    /// A freshly attached stream reports zero dimensions until the first
    /// frame is decoded.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Validates that the pixel buffer size matches dimensions and format.
    pub fn is_valid(&self) -> bool {
        !self.is_empty() && self.pixels.len() == self.pixel_count() * self.format.bytes_per_pixel()
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("sequence", &self.sequence)
            .field("pixel_bytes", &self.pixels.len())
            .finish()
    }
}
