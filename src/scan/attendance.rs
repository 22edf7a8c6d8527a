//! The attendance capture state machine.
//!
//! One [`AttendanceLoop`] exists per open capture view. It owns the camera
//! and reacts to three events: a timer tick, the result of a submission,
//! and the end of the settle period. It performs no I/O of its own beyond
//! the camera; the [`ScanRunner`](super::ScanRunner) feeds it events and
//! carries its submissions to the service.
//!
//! ```text
//!            tick (visible, frame ok)          result
//!   Idle ───────────────────────────▶ Capturing ──────▶ Settling
//!    ▲                                                     │
//!    └──────────────────── settle elapsed ─────────────────┘
//!
//!   any state ── stop ──▶ Stopped
//! ```

use super::status::{CaptureStatus, CAMERA_UNAVAILABLE_TEXT, CONNECTION_FAILED_TEXT};
use super::visibility::Visibility;
use crate::capture::{Camera, CameraError, CaptureConfig};
use crate::config::ScanConfig;
use crate::encoding::FrameEncoder;
use crate::transport::{ServerReply, SessionId, SubmitOutcome, Submission, TransportError};
use std::time::Duration;
use thiserror::Error;

/// Errors a capture loop can encounter.
///
/// Only `CameraUnavailable` and `Stopped` are ever returned to a caller;
/// the other two are surfaced through the status and retried by the next
/// tick.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("camera unavailable: {0}")]
    CameraUnavailable(#[source] CameraError),
    #[error("submission rejected ({reason}): {message}")]
    SubmissionRejected { reason: String, message: String },
    #[error("transport failure: {0}")]
    TransportFailure(#[source] TransportError),
    #[error("capture loop already stopped")]
    Stopped,
}

/// Where the loop is in its cycle. `Capturing` and `Settling` hold the busy flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    /// A submission is in flight.
    Capturing,
    /// A result is on display until the settle period ends.
    Settling,
    Stopped,
}

/// Why a tick did not produce a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotArmed,
    Busy,
    Hidden,
    NoFrame,
    Stopped,
}

/// Result of feeding a timer tick to the loop.
#[derive(Debug)]
pub enum TickOutcome {
    Submitted(Submission),
    Skipped(SkipReason),
}

/// Running counters for one loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub ticks: u64,
    pub skipped_busy: u64,
    pub skipped_hidden: u64,
    pub skipped_no_frame: u64,
    pub submissions: u64,
    pub accepted: u64,
    pub rejected: u64,
    pub transport_failures: u64,
    /// Results that arrived after the loop stopped.
    pub ignored_results: u64,
}

/// Capture-and-submit loop for one attendance session.
pub struct AttendanceLoop<C: Camera, V: Visibility> {
    session: SessionId,
    camera: C,
    visibility: V,
    capture: CaptureConfig,
    scan: ScanConfig,
    encoder: FrameEncoder,
    state: LoopState,
    armed: bool,
    status: CaptureStatus,
    last_error: Option<ScanError>,
    stats: ScanStats,
}

impl<C: Camera, V: Visibility> AttendanceLoop<C, V> {
    pub fn new(
        session: SessionId,
        camera: C,
        visibility: V,
        capture: CaptureConfig,
        scan: ScanConfig,
    ) -> Self {
        let encoder = FrameEncoder::new(capture.jpeg_quality);
        Self {
            session,
            camera,
            visibility,
            capture,
            scan,
            encoder,
            state: LoopState::Idle,
            armed: false,
            status: CaptureStatus::initializing(),
            last_error: None,
            stats: ScanStats::default(),
        }
    }

    /// Acquires the camera and arms the timer.
    ///
    /// On failure the status becomes an error, the loop stays idle and
    /// unarmed, and every later tick is skipped.
    pub fn start(&mut self) -> Result<(), ScanError> {
        match self.state {
            LoopState::Stopped => return Err(ScanError::Stopped),
            _ if self.armed => return Ok(()),
            _ => {}
        }

        if let Err(e) = self.camera.open(&self.capture) {
            tracing::warn!(session = %self.session, error = %e, "Could not access camera");
            self.status = CaptureStatus::Error(CAMERA_UNAVAILABLE_TEXT.to_string());
            return Err(ScanError::CameraUnavailable(e));
        }

        self.armed = true;
        self.status = CaptureStatus::ready();
        tracing::info!(
            session = %self.session,
            interval_ms = self.scan.tick_interval_ms,
            "Capture loop armed"
        );
        Ok(())
    }

    /// Handles one timer tick.
    pub fn on_tick(&mut self) -> TickOutcome {
        self.stats.ticks += 1;

        if self.state == LoopState::Stopped {
            return TickOutcome::Skipped(SkipReason::Stopped);
        }
        if !self.armed {
            return TickOutcome::Skipped(SkipReason::NotArmed);
        }
        if self.state != LoopState::Idle {
            self.stats.skipped_busy += 1;
            tracing::trace!(state = ?self.state, "Tick dropped, loop busy");
            return TickOutcome::Skipped(SkipReason::Busy);
        }
        if !self.visibility.is_visible() {
            self.stats.skipped_hidden += 1;
            tracing::trace!("Tick skipped, view hidden");
            return TickOutcome::Skipped(SkipReason::Hidden);
        }

        let frame = match self.camera.capture() {
            Ok(frame) => frame,
            Err(e) => {
                self.stats.skipped_no_frame += 1;
                tracing::debug!(error = %e, "No frame available");
                return TickOutcome::Skipped(SkipReason::NoFrame);
            }
        };
        let image = match self.encoder.encode(&frame) {
            Ok(image) => image,
            Err(e) => {
                self.stats.skipped_no_frame += 1;
                tracing::debug!(error = %e, sequence = frame.sequence(), "Frame not encodable");
                return TickOutcome::Skipped(SkipReason::NoFrame);
            }
        };

        self.state = LoopState::Capturing;
        self.stats.submissions += 1;
        tracing::debug!(
            session = %self.session,
            sequence = self.stats.submissions,
            bytes = image.len(),
            "Frame captured for submission"
        );

        TickOutcome::Submitted(Submission {
            session: self.session.clone(),
            image,
            sequence: self.stats.submissions,
        })
    }

    /// Applies the result of the in-flight submission.
    ///
    /// Returns how long the result should stay on display, or `None` when
    /// no submission was in flight (for instance after `stop`) and the
    /// result was ignored.
    pub fn on_submit_result(
        &mut self,
        result: Result<ServerReply, TransportError>,
    ) -> Option<Duration> {
        if self.state != LoopState::Capturing {
            self.stats.ignored_results += 1;
            tracing::debug!(state = ?self.state, "Ignoring submission result");
            return None;
        }

        match result.map(|reply| reply.outcome()) {
            Ok(SubmitOutcome::Accepted(message)) => {
                self.stats.accepted += 1;
                tracing::info!(session = %self.session, reply = %message, "Attendance marked");
                self.status = CaptureStatus::Success(message);
            }
            Ok(SubmitOutcome::Rejected { reason, message }) => {
                self.stats.rejected += 1;
                tracing::info!(session = %self.session, %reason, reply = %message, "Submission rejected");
                self.status = CaptureStatus::Error(message.clone());
                self.last_error = Some(ScanError::SubmissionRejected { reason, message });
            }
            Err(e) => {
                self.stats.transport_failures += 1;
                tracing::warn!(session = %self.session, error = %e, "Submission failed");
                self.status = CaptureStatus::Error(CONNECTION_FAILED_TEXT.to_string());
                self.last_error = Some(ScanError::TransportFailure(e));
            }
        }

        self.state = LoopState::Settling;
        Some(self.scan.settle())
    }

    /// Ends the settle period, returning the loop to ready.
    ///
    /// Returns false if the loop was not settling.
    pub fn on_settled(&mut self) -> bool {
        if self.state != LoopState::Settling {
            return false;
        }
        self.state = LoopState::Idle;
        self.status = CaptureStatus::ready();
        true
    }

    /// Disarms the timer and releases the camera. Safe to call repeatedly.
    ///
    /// Returns false if the loop was already stopped.
    pub fn stop(&mut self) -> bool {
        if self.state == LoopState::Stopped {
            return false;
        }
        let was = self.state;
        self.armed = false;
        self.state = LoopState::Stopped;
        self.camera.close();
        tracing::info!(session = %self.session, from = ?was, "Capture loop stopped");
        true
    }

    pub fn session(&self) -> &SessionId {
        &self.session
    }

    pub fn status(&self) -> &CaptureStatus {
        &self.status
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// The busy flag: true from submission until the settle period ends.
    pub fn is_busy(&self) -> bool {
        matches!(self.state, LoopState::Capturing | LoopState::Settling)
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn is_stopped(&self) -> bool {
        self.state == LoopState::Stopped
    }

    pub fn camera_open(&self) -> bool {
        self.camera.is_open()
    }

    pub fn stats(&self) -> &ScanStats {
        &self.stats
    }

    /// The most recent rejection or transport failure, if any.
    pub fn last_error(&self) -> Option<&ScanError> {
        self.last_error.as_ref()
    }

    pub fn scan_config(&self) -> &ScanConfig {
        &self.scan
    }
}

impl<C: Camera, V: Visibility> Drop for AttendanceLoop<C, V> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::MockCamera;
    use crate::scan::{AlwaysVisible, VisibilityFlag};
    use proptest::prelude::*;

    fn small_capture() -> CaptureConfig {
        CaptureConfig::with_dimensions(16, 12)
    }

    fn new_loop<V: Visibility>(camera: MockCamera, visibility: V) -> AttendanceLoop<MockCamera, V> {
        AttendanceLoop::new(
            SessionId::new("CS101-Mon-09").unwrap(),
            camera,
            visibility,
            small_capture(),
            ScanConfig::default(),
        )
    }

    fn submit(scan: &mut AttendanceLoop<MockCamera, impl Visibility>) -> Submission {
        match scan.on_tick() {
            TickOutcome::Submitted(submission) => submission,
            TickOutcome::Skipped(reason) => panic!("tick skipped: {reason:?}"),
        }
    }

    #[test]
    fn test_start_arms_and_reports_ready() {
        let mut scan = new_loop(MockCamera::new(), AlwaysVisible);
        assert_eq!(scan.status(), &CaptureStatus::initializing());

        scan.start().unwrap();

        assert!(scan.is_armed());
        assert!(scan.camera_open());
        assert_eq!(scan.status(), &CaptureStatus::ready());
    }

    #[test]
    fn test_camera_denied_leaves_loop_idle() {
        let mut scan = new_loop(MockCamera::denied(), AlwaysVisible);

        let err = scan.start().unwrap_err();

        assert!(matches!(err, ScanError::CameraUnavailable(CameraError::PermissionDenied)));
        assert_eq!(
            scan.status(),
            &CaptureStatus::Error("Could not access webcam.".into())
        );
        assert!(!scan.is_armed());
        assert_eq!(scan.state(), LoopState::Idle);
        assert!(matches!(
            scan.on_tick(),
            TickOutcome::Skipped(SkipReason::NotArmed)
        ));
    }

    #[test]
    fn test_tick_submits_jpeg_with_session() {
        let mut scan = new_loop(MockCamera::new(), AlwaysVisible);
        scan.start().unwrap();

        let submission = submit(&mut scan);

        assert_eq!(submission.session.as_str(), "CS101-Mon-09");
        assert_eq!(submission.sequence, 1);
        assert_eq!(submission.image.mime(), "image/jpeg");
        assert!(scan.is_busy());
        assert_eq!(scan.state(), LoopState::Capturing);
    }

    #[test]
    fn test_ticks_dropped_while_busy() {
        let mut scan = new_loop(MockCamera::new(), AlwaysVisible);
        scan.start().unwrap();
        submit(&mut scan);

        assert!(matches!(scan.on_tick(), TickOutcome::Skipped(SkipReason::Busy)));

        scan.on_submit_result(Ok(ServerReply::success("ok")));
        assert!(matches!(scan.on_tick(), TickOutcome::Skipped(SkipReason::Busy)));

        assert!(scan.on_settled());
        assert!(matches!(scan.on_tick(), TickOutcome::Submitted(_)));
        assert_eq!(scan.stats().skipped_busy, 2);
    }

    #[test]
    fn test_hidden_view_skips_without_status_change() {
        let flag = VisibilityFlag::new(false);
        let camera = MockCamera::new();
        let probe = camera.probe();
        let mut scan = new_loop(camera, flag.clone());
        scan.start().unwrap();

        assert!(matches!(scan.on_tick(), TickOutcome::Skipped(SkipReason::Hidden)));
        assert_eq!(scan.status(), &CaptureStatus::ready());
        assert!(!scan.is_busy());
        assert_eq!(probe.captures(), 0);

        flag.set_visible(true);
        assert!(matches!(scan.on_tick(), TickOutcome::Submitted(_)));
    }

    #[test]
    fn test_missing_frame_is_noop() {
        let camera = MockCamera::new();
        let probe = camera.probe();
        let mut scan = new_loop(camera, AlwaysVisible);
        scan.start().unwrap();
        probe.withhold_frames(true);

        assert!(matches!(scan.on_tick(), TickOutcome::Skipped(SkipReason::NoFrame)));
        assert!(!scan.is_busy());
        assert_eq!(scan.stats().skipped_no_frame, 1);
    }

    #[test]
    fn test_result_branches_then_reset() {
        let mut scan = new_loop(MockCamera::new(), AlwaysVisible);
        scan.start().unwrap();

        submit(&mut scan);
        let settle = scan.on_submit_result(Ok(ServerReply::success("Marked present: J. Doe")));
        assert_eq!(settle, Some(Duration::from_millis(3000)));
        assert_eq!(
            scan.status(),
            &CaptureStatus::Success("Marked present: J. Doe".into())
        );
        scan.on_settled();
        assert_eq!(scan.status(), &CaptureStatus::ready());

        submit(&mut scan);
        scan.on_submit_result(Ok(ServerReply::rejected(
            "not_recognized",
            "Face not recognized.",
        )));
        assert_eq!(
            scan.status(),
            &CaptureStatus::Error("Face not recognized.".into())
        );
        assert!(matches!(
            scan.last_error(),
            Some(ScanError::SubmissionRejected { reason, .. }) if reason == "not_recognized"
        ));
        scan.on_settled();

        submit(&mut scan);
        scan.on_submit_result(Err(TransportError::Unavailable("refused".into())));
        assert_eq!(
            scan.status(),
            &CaptureStatus::Error("Could not connect to server.".into())
        );
        assert!(scan.is_busy());
        scan.on_settled();
        assert_eq!(scan.status(), &CaptureStatus::ready());
        assert!(!scan.is_busy());

        let stats = scan.stats();
        assert_eq!((stats.accepted, stats.rejected, stats.transport_failures), (1, 1, 1));
    }

    #[test]
    fn test_result_after_stop_is_ignored() {
        let mut scan = new_loop(MockCamera::new(), AlwaysVisible);
        scan.start().unwrap();
        submit(&mut scan);
        scan.stop();

        assert_eq!(scan.on_submit_result(Ok(ServerReply::success("late"))), None);
        assert_eq!(scan.status(), &CaptureStatus::ready());
        assert_eq!(scan.stats().ignored_results, 1);
    }

    #[test]
    fn test_stop_is_idempotent_and_releases_once() {
        let camera = MockCamera::new();
        let probe = camera.probe();
        let mut scan = new_loop(camera, AlwaysVisible);
        scan.start().unwrap();
        submit(&mut scan);

        assert!(scan.stop());
        assert!(!scan.stop());

        assert_eq!(probe.active_tracks(), 0);
        assert_eq!(probe.releases(), 1);
        assert!(matches!(scan.start(), Err(ScanError::Stopped)));
        assert!(matches!(scan.on_tick(), TickOutcome::Skipped(SkipReason::Stopped)));
    }

    #[test]
    fn test_drop_releases_camera() {
        let camera = MockCamera::new();
        let probe = camera.probe();
        {
            let mut scan = new_loop(camera, AlwaysVisible);
            scan.start().unwrap();
            assert_eq!(probe.active_tracks(), 1);
        }
        assert_eq!(probe.active_tracks(), 0);
        assert_eq!(probe.releases(), 1);
    }

    proptest! {
        #[test]
        fn prop_at_most_one_submission_in_flight(events in prop::collection::vec(0u8..5, 1..200)) {
            let flag = VisibilityFlag::default();
            let mut scan = new_loop(MockCamera::new(), flag.clone());
            scan.start().unwrap();
            let mut outstanding = 0usize;

            for event in events {
                match event {
                    0 => {
                        if let TickOutcome::Submitted(_) = scan.on_tick() {
                            prop_assert_eq!(outstanding, 0);
                            outstanding += 1;
                        }
                    }
                    1 => {
                        let applied = scan.on_submit_result(Ok(ServerReply::success("ok")));
                        prop_assert_eq!(applied.is_some(), outstanding == 1);
                        outstanding = 0;
                    }
                    2 => {
                        let applied = scan.on_submit_result(Err(TransportError::Unavailable("x".into())));
                        prop_assert_eq!(applied.is_some(), outstanding == 1);
                        outstanding = 0;
                    }
                    3 => {
                        scan.on_settled();
                    }
                    _ => flag.set_visible(!flag.is_visible()),
                }
                prop_assert!(outstanding <= 1);
                prop_assert_eq!(outstanding == 1, scan.state() == LoopState::Capturing);
            }
        }
    }
}
