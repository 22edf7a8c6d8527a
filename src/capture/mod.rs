//! Camera input and frame handling.
//!
//! This module provides abstractions for capturing frames from a camera
//! and managing camera configuration. The camera is an exclusively owned
//! resource: whoever holds it is responsible for closing it.

mod camera;
mod config;
mod frame;
#[cfg(feature = "camera")]
mod native;

pub use camera::{solid_frame, Camera, CameraError, CameraProbe, MockCamera};
pub use config::{CaptureConfig, CaptureConfigError, MAX_DIMENSION};
pub use frame::{Frame, PixelFormat};
#[cfg(feature = "camera")]
pub use native::NativeCamera;
