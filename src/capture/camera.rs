//! Camera abstraction for frame capture.
//!
//! This module provides a trait-based abstraction over camera hardware,
//! allowing for both real camera input and mock implementations for testing.

use super::{CaptureConfig, Frame, PixelFormat};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during camera operations.
#[derive(Debug, Error)]
pub enum CameraError {
    #[error("camera device not found: {0}")]
    DeviceNotFound(String),
    #[error("camera permission denied")]
    PermissionDenied,
    #[error("failed to open camera: {0}")]
    OpenFailed(String),
    #[error("failed to configure camera: {0}")]
    ConfigFailed(String),
    #[error("failed to capture frame: {0}")]
    CaptureFailed(String),
    #[error("no frame available yet")]
    NoFrame,
    #[error("camera not initialized")]
    NotInitialized,
}

/// Trait for camera implementations.
///
/// A camera owns at most one live stream. `close` must release every
/// underlying track and must be safe to call more than once.
pub trait Camera {
    /// Opens the stream with the given configuration.
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CameraError>;

    /// Captures the current frame of the stream.
    fn capture(&mut self) -> Result<Frame, CameraError>;

    /// Checks if the camera is currently open.
    fn is_open(&self) -> bool;

    /// Closes the camera and releases resources.
    fn close(&mut self);
}

#[derive(Debug, Default)]
struct ProbeState {
    active_tracks: AtomicUsize,
    releases: AtomicUsize,
    captures: AtomicU64,
    withhold_frames: AtomicBool,
}

/// Shared view into a [`MockCamera`] that outlives moving the camera into a loop.
#[derive(Debug, Clone, Default)]
pub struct CameraProbe {
    state: Arc<ProbeState>,
}

impl CameraProbe {
    /// Number of tracks currently live (0 or 1).
    pub fn active_tracks(&self) -> usize {
        self.state.active_tracks.load(Ordering::SeqCst)
    }

    /// Number of times a live stream was released.
    pub fn releases(&self) -> usize {
        self.state.releases.load(Ordering::SeqCst)
    }

    /// Number of frames handed out.
    pub fn captures(&self) -> u64 {
        self.state.captures.load(Ordering::SeqCst)
    }

    /// While set, `capture` reports [`CameraError::NoFrame`].
    pub fn withhold_frames(&self, withhold: bool) {
        self.state.withhold_frames.store(withhold, Ordering::SeqCst);
    }
}

/// Mock camera for testing that generates synthetic frames.
#[derive(Debug, Default)]
pub struct MockCamera {
    config: Option<CaptureConfig>,
    sequence: u64,
    denied: bool,
    probe: CameraProbe,
}

impl MockCamera {
    pub fn new() -> Self {
        Self::default()
    }

    /// A camera whose `open` always fails as if the user refused access.
    pub fn denied() -> Self {
        Self {
            denied: true,
            ..Self::default()
        }
    }

    /// Returns a probe sharing this camera's track bookkeeping.
    pub fn probe(&self) -> CameraProbe {
        self.probe.clone()
    }
}

impl Camera for MockCamera {
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CameraError> {
        if self.denied {
            return Err(CameraError::PermissionDenied);
        }
        config
            .validate()
            .map_err(|e| CameraError::ConfigFailed(e.to_string()))?;
        if self.config.is_none() {
            self.probe.state.active_tracks.fetch_add(1, Ordering::SeqCst);
        }
        self.config = Some(config.clone());
        self.sequence = 0;
        tracing::info!(
            width = config.width,
            height = config.height,
            "MockCamera opened"
        );
        Ok(())
    }

    fn capture(&mut self) -> Result<Frame, CameraError> {
        let config = self.config.as_ref().ok_or(CameraError::NotInitialized)?;
        if self.probe.state.withhold_frames.load(Ordering::SeqCst) {
            return Err(CameraError::NoFrame);
        }

        let len = config.width as usize * config.height as usize * config.format.bytes_per_pixel();
        // Deterministic gradient shifted by sequence so consecutive frames differ
        let pixels: Vec<u8> = (0..len)
            .map(|i| ((i as u64 + self.sequence * 7) % 256) as u8)
            .collect();

        self.sequence += 1;
        self.probe.state.captures.fetch_add(1, Ordering::SeqCst);
        Ok(Frame::new(
            pixels,
            config.width,
            config.height,
            config.format,
            self.sequence,
        ))
    }

    fn is_open(&self) -> bool {
        self.config.is_some()
    }

    fn close(&mut self) {
        if self.config.take().is_some() {
            self.probe.state.active_tracks.fetch_sub(1, Ordering::SeqCst);
            self.probe.state.releases.fetch_add(1, Ordering::SeqCst);
            tracing::info!("MockCamera closed");
        }
    }
}

/// Builds a frame of the given size filled with one value; handy for tests.
pub fn solid_frame(width: u32, height: u32, format: PixelFormat, value: u8) -> Frame {
    let len = width as usize * height as usize * format.bytes_per_pixel();
    Frame::new(vec![value; len], width, height, format, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_camera_lifecycle() {
        let mut camera = MockCamera::new();
        let probe = camera.probe();
        let config = CaptureConfig::default();

        assert!(!camera.is_open());
        assert_eq!(probe.active_tracks(), 0);

        camera.open(&config).unwrap();
        assert!(camera.is_open());
        assert_eq!(probe.active_tracks(), 1);

        let frame = camera.capture().unwrap();
        assert!(frame.is_valid());
        assert_eq!(frame.sequence(), 1);

        let frame2 = camera.capture().unwrap();
        assert_eq!(frame2.sequence(), 2);

        camera.close();
        assert!(!camera.is_open());
        assert_eq!(probe.active_tracks(), 0);
        assert_eq!(probe.releases(), 1);
    }

    #[test]
    fn test_capture_without_open() {
        let mut camera = MockCamera::new();
        assert!(matches!(
            camera.capture(),
            Err(CameraError::NotInitialized)
        ));
    }

    #[test]
    fn test_denied_camera_never_opens() {
        let mut camera = MockCamera::denied();
        let probe = camera.probe();

        assert!(matches!(
            camera.open(&CaptureConfig::default()),
            Err(CameraError::PermissionDenied)
        ));
        assert!(!camera.is_open());
        assert_eq!(probe.active_tracks(), 0);
    }

    #[test]
    fn test_close_twice_releases_once() {
        let mut camera = MockCamera::new();
        let probe = camera.probe();
        camera.open(&CaptureConfig::default()).unwrap();

        camera.close();
        camera.close();

        assert_eq!(probe.releases(), 1);
    }

    #[test]
    fn test_withheld_frames() {
        let mut camera = MockCamera::new();
        let probe = camera.probe();
        camera.open(&CaptureConfig::with_dimensions(8, 8)).unwrap();

        probe.withhold_frames(true);
        assert!(matches!(camera.capture(), Err(CameraError::NoFrame)));

        probe.withhold_frames(false);
        assert!(camera.capture().is_ok());
        assert_eq!(probe.captures(), 1);
    }

    #[test]
    fn test_frame_length_computed_without_u32_overflow() {
        let frame = solid_frame(70_000, 1, PixelFormat::Gray, 0);
        assert_eq!(frame.pixels().len(), 70_000);
        assert!(frame.is_valid());
    }

    #[test]
    fn test_oversized_config_refused_before_capture() {
        let mut camera = MockCamera::new();
        let probe = camera.probe();

        assert!(matches!(
            camera.open(&CaptureConfig::with_dimensions(70_000, 70_000)),
            Err(CameraError::ConfigFailed(_))
        ));
        assert!(!camera.is_open());
        assert_eq!(probe.active_tracks(), 0);
    }
}
