//! Face Attendance Capture Library
//!
//! Camera-side client for a face-recognition attendance service. While a
//! session's capture view is open, a frame is grabbed on a fixed period,
//! encoded as JPEG and posted to the service; the verdict is shown for a
//! settle period before the loop returns to ready.
//!
//! # Architecture
//!
//! ```text
//! capture → encoding → transport
//!     ↑                    ↓
//!   scan (tick / settle state machine) → status
//!     ↓
//!  metrics
//! ```
//!
//! `enroll` reuses capture, encoding and transport to register a new
//! student's face from a short countdown-driven series of images.
//!
//! # Design Principles
//!
//! - **One submission at a time**: ticks that land while a request or its
//!   settle period is pending are dropped, never queued
//! - **Camera released on every exit path**: stop, drop and start failure
//! - **Stop is final**: late replies after stop are ignored
//!
//! # Example
//!
//! ```no_run
//! use face_attendance::{
//!     capture::{CaptureConfig, MockCamera},
//!     config::ScanConfig,
//!     scan::{AlwaysVisible, AttendanceLoop, ScanRunner},
//!     transport::{ScriptedReply, ScriptedTransport, ServerReply, SessionId},
//! };
//! use std::sync::Arc;
//! use tokio::sync::watch;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let scan = AttendanceLoop::new(
//!     SessionId::new("CS101-Morning")?,
//!     MockCamera::new(),
//!     AlwaysVisible,
//!     CaptureConfig::default(),
//!     ScanConfig::default(),
//! );
//! let transport = Arc::new(ScriptedTransport::new([ScriptedReply::Reply(
//!     ServerReply::success("Attendance marked for Jane Doe"),
//! )]));
//!
//! let (runner, mut status) = ScanRunner::new(scan, transport);
//! let (stop_tx, stop_rx) = watch::channel(false);
//! tokio::spawn(async move {
//!     while status.changed().await.is_ok() {
//!         println!("{}", *status.borrow());
//!     }
//! });
//!
//! tokio::spawn(async move {
//!     tokio::time::sleep(std::time::Duration::from_secs(10)).await;
//!     let _ = stop_tx.send(true);
//! });
//! let summary = runner.run(stop_rx).await;
//! println!("{} submissions", summary.stats.submissions);
//! # Ok(())
//! # }
//! ```

#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod capture;
pub mod config;
pub mod encoding;
pub mod enroll;
pub mod metrics;
pub mod scan;
pub mod transport;

// Re-export commonly used types at crate root
pub use capture::{Camera, CaptureConfig, Frame, MockCamera};
pub use config::FileConfig;
pub use encoding::{EncodedImage, FrameEncoder};
pub use enroll::{run_enrollment, EnrollmentSession};
pub use scan::{AttendanceLoop, CaptureStatus, ScanRunner};
pub use transport::{HttpTransport, SessionId, Transport};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
