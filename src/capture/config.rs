//! Camera capture configuration.

use super::PixelFormat;
use serde::{Deserialize, Serialize};

/// Largest width or height accepted for a capture.
pub const MAX_DIMENSION: u32 = 8192;

/// Configuration for camera capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Camera device index.
    pub device_id: u32,
    /// Requested frame width in pixels.
    pub width: u32,
    /// Requested frame height in pixels.
    pub height: u32,
    /// Requested frames per second.
    pub fps: u32,
    /// Pixel layout frames are delivered in.
    pub format: PixelFormat,
    /// JPEG quality used when a frame is encoded for upload (1-100).
    pub jpeg_quality: u8,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device_id: 0,
            width: 640,
            height: 480,
            fps: 30,
            format: PixelFormat::Rgb,
            jpeg_quality: 92, // browser default for image/jpeg blobs
        }
    }
}

impl CaptureConfig {
    /// Creates a new configuration with the specified dimensions.
    pub fn with_dimensions(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), CaptureConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(CaptureConfigError::InvalidDimensions);
        }
        if self.width > MAX_DIMENSION || self.height > MAX_DIMENSION {
            return Err(CaptureConfigError::DimensionsTooLarge {
                width: self.width,
                height: self.height,
            });
        }
        if self.fps == 0 || self.fps > 120 {
            return Err(CaptureConfigError::InvalidFrameRate);
        }
        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err(CaptureConfigError::InvalidQuality(self.jpeg_quality));
        }
        Ok(())
    }
}

/// Capture configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaptureConfigError {
    #[error("invalid frame dimensions")]
    InvalidDimensions,
    #[error("frame {width}x{height} exceeds the {MAX_DIMENSION} pixel limit")]
    DimensionsTooLarge { width: u32, height: u32 },
    #[error("invalid frame rate (must be 1-120 fps)")]
    InvalidFrameRate,
    #[error("invalid JPEG quality {0} (must be 1-100)")]
    InvalidQuality(u8),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = CaptureConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_dimensions_invalid() {
        let mut config = CaptureConfig::default();
        config.width = 0;
        assert!(matches!(
            config.validate(),
            Err(CaptureConfigError::InvalidDimensions)
        ));
    }

    #[test]
    fn test_oversized_dimensions_invalid() {
        let config = CaptureConfig::with_dimensions(70_000, 70_000);
        assert_eq!(
            config.validate(),
            Err(CaptureConfigError::DimensionsTooLarge {
                width: 70_000,
                height: 70_000
            })
        );
        assert!(CaptureConfig::with_dimensions(MAX_DIMENSION, MAX_DIMENSION)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_quality_out_of_range() {
        let config = CaptureConfig {
            jpeg_quality: 101,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(CaptureConfigError::InvalidQuality(101))
        );
    }
}
