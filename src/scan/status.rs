//! Operator-facing status of a capture flow.

use serde::Serialize;
use std::fmt;

/// Shown before the camera has been acquired.
pub const INITIALIZING_TEXT: &str = "Initializing Camera...";
/// Shown whenever the loop is waiting for the next tick.
pub const READY_TEXT: &str = "Ready to scan for faces.";
/// Shown when the camera cannot be opened.
pub const CAMERA_UNAVAILABLE_TEXT: &str = "Could not access webcam.";
/// Shown when a submission got no usable reply.
pub const CONNECTION_FAILED_TEXT: &str = "Could not connect to server.";

/// The last known state of a capture flow, as the operator sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "text", rename_all = "lowercase")]
pub enum CaptureStatus {
    Info(String),
    Success(String),
    Error(String),
}

impl CaptureStatus {
    pub fn initializing() -> Self {
        CaptureStatus::Info(INITIALIZING_TEXT.to_string())
    }

    pub fn ready() -> Self {
        CaptureStatus::Info(READY_TEXT.to_string())
    }

    pub fn text(&self) -> &str {
        match self {
            CaptureStatus::Info(text) | CaptureStatus::Success(text) | CaptureStatus::Error(text) => {
                text
            }
        }
    }

    /// Short lowercase tag for the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            CaptureStatus::Info(_) => "info",
            CaptureStatus::Success(_) => "success",
            CaptureStatus::Error(_) => "error",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, CaptureStatus::Error(_))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CaptureStatus::Success(_))
    }
}

impl fmt::Display for CaptureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind(), self.text())
    }
}
