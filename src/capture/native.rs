//! Webcam backend built on `nokhwa`.

use super::{Camera, CameraError, CaptureConfig, Frame, PixelFormat};
use nokhwa::pixel_format::{LumaFormat, RgbFormat};
use nokhwa::utils::{
    CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
};
use nokhwa::NokhwaError;

/// Whether a backend message reports an access refusal; nokhwa reports OS
/// errors as text inside its open and init variants.
fn is_access_refusal(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("permission denied")
        || message.contains("os error 13")
        || message.contains("not authorized")
        || message.contains("access denied")
}

/// Maps a nokhwa failure raised while opening a device onto `CameraError`.
fn open_error(device_id: u32, error: NokhwaError) -> CameraError {
    match error {
        NokhwaError::OpenDeviceError(_, ref message) if is_access_refusal(message) => {
            CameraError::PermissionDenied
        }
        NokhwaError::InitializeError { .. } if is_access_refusal(&error.to_string()) => {
            CameraError::PermissionDenied
        }
        NokhwaError::OpenDeviceError(device, message) => {
            CameraError::DeviceNotFound(format!("device {device_id} ({device}): {message}"))
        }
        NokhwaError::StructureError { .. }
        | NokhwaError::GetPropertyError { .. }
        | NokhwaError::SetPropertyError { .. } => CameraError::ConfigFailed(error.to_string()),
        NokhwaError::OpenStreamError(message) if is_access_refusal(&message) => {
            CameraError::PermissionDenied
        }
        other => CameraError::OpenFailed(other.to_string()),
    }
}

/// A physical camera opened through the platform's native capture API.
pub struct NativeCamera {
    inner: Option<nokhwa::Camera>,
    format: PixelFormat,
    sequence: u64,
}

impl NativeCamera {
    pub fn new() -> Self {
        Self {
            inner: None,
            format: PixelFormat::Rgb,
            sequence: 0,
        }
    }
}

impl Default for NativeCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl Camera for NativeCamera {
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CameraError> {
        config
            .validate()
            .map_err(|e| CameraError::ConfigFailed(e.to_string()))?;
        self.close();

        let closest = CameraFormat::new(
            Resolution::new(config.width, config.height),
            FrameFormat::MJPEG,
            config.fps,
        );
        let requested = match config.format {
            PixelFormat::Rgb => {
                RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(closest))
            }
            PixelFormat::Gray => {
                RequestedFormat::new::<LumaFormat>(RequestedFormatType::Closest(closest))
            }
        };

        let index = CameraIndex::Index(config.device_id);
        let mut camera = nokhwa::Camera::new(index, requested)
            .map_err(|e| open_error(config.device_id, e))?;
        camera
            .open_stream()
            .map_err(|e| open_error(config.device_id, e))?;

        let actual = camera.resolution();
        tracing::info!(
            device = config.device_id,
            width = actual.width(),
            height = actual.height(),
            "Camera stream opened"
        );

        self.inner = Some(camera);
        self.format = config.format;
        self.sequence = 0;
        Ok(())
    }

    fn capture(&mut self) -> Result<Frame, CameraError> {
        let camera = self.inner.as_mut().ok_or(CameraError::NotInitialized)?;
        let buffer = camera
            .frame()
            .map_err(|e| CameraError::CaptureFailed(e.to_string()))?;

        let (width, height, pixels) = match self.format {
            PixelFormat::Rgb => {
                let image = buffer
                    .decode_image::<RgbFormat>()
                    .map_err(|e| CameraError::CaptureFailed(e.to_string()))?;
                (image.width(), image.height(), image.into_raw())
            }
            PixelFormat::Gray => {
                let image = buffer
                    .decode_image::<LumaFormat>()
                    .map_err(|e| CameraError::CaptureFailed(e.to_string()))?;
                (image.width(), image.height(), image.into_raw())
            }
        };
        if width == 0 || height == 0 {
            return Err(CameraError::NoFrame);
        }

        self.sequence += 1;
        Ok(Frame::new(pixels, width, height, self.format, self.sequence))
    }

    fn is_open(&self) -> bool {
        self.inner.is_some()
    }

    fn close(&mut self) {
        if let Some(mut camera) = self.inner.take() {
            if let Err(e) = camera.stop_stream() {
                tracing::warn!(error = %e, "Failed to stop camera stream cleanly");
            }
            tracing::info!("Camera stream closed");
        }
    }
}

impl Drop for NativeCamera {
    fn drop(&mut self) {
        self.close();
    }
}
