//! Talking to the face-recognition service.
//!
//! The service exposes two multipart endpoints: one that marks attendance
//! from a single frame and one that enrolls a student from several. The
//! [`Transport`] trait is the seam the capture loop and the enrollment flow
//! depend on, so both can run against [`ScriptedTransport`] in tests.

mod http;
mod reply;
mod request;
mod scripted;

pub use http::HttpTransport;
pub use reply::{ServerReply, SubmitOutcome};
pub use request::{EnrollRequest, IdentityError, SessionId, StudentIdentity, Submission};
pub use scripted::{RecordedCall, ScriptedReply, ScriptedTransport};

use std::future::Future;
use thiserror::Error;

/// Failures to obtain a usable reply from the service.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("service unavailable: {0}")]
    Unavailable(String),
    #[error("malformed reply (HTTP {http_status}): {reason}")]
    Malformed { http_status: u16, reason: String },
}

/// Client side of the recognition service.
///
/// Futures are `Send` so a submission can run as its own task and outlive
/// the loop that issued it.
pub trait Transport: Send + Sync + 'static {
    /// Submits one frame for the given session.
    fn mark_attendance(
        &self,
        submission: Submission,
    ) -> impl Future<Output = Result<ServerReply, TransportError>> + Send;

    /// Registers a student's face from a batch of images.
    fn register_face(
        &self,
        request: EnrollRequest,
    ) -> impl Future<Output = Result<ServerReply, TransportError>> + Send;
}
