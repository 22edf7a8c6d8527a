//! Periodic face capture for an attendance session.
//!
//! While a capture view is open, every tick grabs a frame, sends it to the
//! recognition service and shows the verdict for a settle period. Ticks
//! that arrive while a submission or its settle period is pending are
//! dropped, never queued; the next tick is the only retry.

mod attendance;
mod runner;
mod status;
mod visibility;

pub use attendance::{AttendanceLoop, LoopState, ScanError, ScanStats, SkipReason, TickOutcome};
pub use runner::{ScanRunner, ScanSummary};
pub use status::{
    CaptureStatus, CAMERA_UNAVAILABLE_TEXT, CONNECTION_FAILED_TEXT, INITIALIZING_TEXT, READY_TEXT,
};
pub use visibility::{AlwaysVisible, Visibility, VisibilityFlag};
