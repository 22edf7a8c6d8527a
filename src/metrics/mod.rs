//! Prometheus metrics for the attendance loop.
//!
//! # Metrics Exposed
//!
//! ## Loop State
//! - `face_attendance_busy` - 1 while a submission or settle period is pending
//! - `face_attendance_camera_open` - 1 while the camera stream is held
//!
//! ## Ticks
//! - `face_attendance_ticks_total` - Capture ticks seen
//! - `face_attendance_ticks_skipped_busy_total` - Ticks dropped while busy
//! - `face_attendance_ticks_skipped_hidden_total` - Ticks dropped while hidden
//! - `face_attendance_ticks_skipped_no_frame_total` - Ticks with no frame
//!
//! ## Submissions
//! - `face_attendance_submissions_total` - Frames sent
//! - `face_attendance_accepted_total` - Accepted by the service
//! - `face_attendance_rejected_total` - Rejected by the service
//! - `face_attendance_transport_failures_total` - No usable reply
//!
//! The HTTP exporter is behind the `metrics` feature.

mod collector;
#[cfg(feature = "metrics")]
mod server;

pub use collector::{MetricsError, MetricsRegistry, MetricsSnapshot};
#[cfg(feature = "metrics")]
pub use server::{MetricsServer, MetricsServerConfig, ServerError};
