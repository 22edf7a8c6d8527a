//! Countdown-driven capture of enrollment images.

use crate::capture::{Camera, CameraError, CaptureConfig};
use crate::config::EnrollConfig;
use crate::encoding::{EncodeError, EncodedImage, FrameEncoder};
use crate::transport::{EnrollRequest, StudentIdentity};
use thiserror::Error;

/// Shown when the enrollment camera cannot be opened.
pub const ENROLL_CAMERA_UNAVAILABLE_TEXT: &str =
    "Could not access webcam. Please enable camera permissions.";

/// Errors raised while collecting enrollment images.
#[derive(Debug, Error)]
pub enum EnrollError {
    #[error("camera unavailable: {0}")]
    CameraUnavailable(#[source] CameraError),
    #[error("a countdown is already running")]
    CountdownRunning,
    #[error("no countdown is running")]
    NoCountdown,
    #[error("all {0} images already captured")]
    AlreadyComplete(usize),
    #[error("only {have} of {need} images captured")]
    Incomplete { have: usize, need: usize },
    #[error("capture failed: {0}")]
    Capture(#[source] CameraError),
    #[error("encoding failed: {0}")]
    Encode(#[from] EncodeError),
    #[error("gave up after {0} failed captures")]
    TooManyAttempts(usize),
    #[error("enrollment cancelled")]
    Cancelled,
}

/// What a countdown tick produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownStep {
    /// Seconds left before the capture.
    Remaining(u32),
    /// An image was taken; `count` images are now held.
    Captured { count: usize },
}

/// Images of one student being collected for enrollment.
///
/// Owns the camera for its whole lifetime; the stream is released when
/// the request is taken or the session is dropped.
pub struct EnrollmentSession<C: Camera> {
    camera: C,
    student: StudentIdentity,
    config: EnrollConfig,
    encoder: FrameEncoder,
    images: Vec<EncodedImage>,
    countdown: Option<u32>,
    failed_captures: usize,
}

impl<C: Camera> EnrollmentSession<C> {
    /// Opens the camera for a new enrollment.
    pub fn open(
        mut camera: C,
        capture: &CaptureConfig,
        config: EnrollConfig,
        student: StudentIdentity,
    ) -> Result<Self, EnrollError> {
        camera.open(capture).map_err(|e| {
            tracing::warn!(reg_no = student.reg_no(), error = %e, "Could not access camera");
            EnrollError::CameraUnavailable(e)
        })?;

        tracing::info!(
            reg_no = student.reg_no(),
            images_needed = config.images_needed,
            "Enrollment capture started"
        );
        Ok(Self {
            camera,
            student,
            images: Vec::with_capacity(config.images_needed),
            config,
            encoder: FrameEncoder::new(capture.jpeg_quality),
            countdown: None,
            failed_captures: 0,
        })
    }

    /// Starts the countdown to the next capture, returning its length.
    pub fn begin_countdown(&mut self) -> Result<u32, EnrollError> {
        if self.countdown.is_some() {
            return Err(EnrollError::CountdownRunning);
        }
        if self.is_complete() {
            return Err(EnrollError::AlreadyComplete(self.config.images_needed));
        }
        self.countdown = Some(self.config.countdown_secs);
        Ok(self.config.countdown_secs)
    }

    /// Advances the countdown by one second, capturing when it runs out.
    ///
    /// A failed capture ends the countdown; call `begin_countdown` again to
    /// retry. Only failures count against `max_capture_attempts`.
    pub fn on_countdown_tick(&mut self) -> Result<CountdownStep, EnrollError> {
        match self.countdown {
            None => Err(EnrollError::NoCountdown),
            Some(n) if n > 1 => {
                self.countdown = Some(n - 1);
                Ok(CountdownStep::Remaining(n - 1))
            }
            Some(_) => {
                self.countdown = None;
                let count = self.capture_one()?;
                Ok(CountdownStep::Captured { count })
            }
        }
    }

    fn capture_one(&mut self) -> Result<usize, EnrollError> {
        let image = self
            .camera
            .capture()
            .map_err(EnrollError::Capture)
            .and_then(|frame| self.encoder.encode(&frame).map_err(EnrollError::from));

        match image {
            Ok(image) => {
                self.images.push(image);
                tracing::debug!(count = self.images.len(), "Enrollment image captured");
                Ok(self.images.len())
            }
            Err(e) => {
                self.failed_captures += 1;
                if self.failed_captures >= self.config.max_capture_attempts {
                    tracing::warn!(
                        error = %e,
                        failed = self.failed_captures,
                        "Giving up on enrollment capture"
                    );
                    return Err(EnrollError::TooManyAttempts(self.failed_captures));
                }
                Err(e)
            }
        }
    }

    /// Discards the most recent image.
    pub fn retake(&mut self) -> Option<EncodedImage> {
        self.images.pop()
    }

    /// Builds the enrollment request and releases the camera.
    pub fn take_request(&mut self) -> Result<EnrollRequest, EnrollError> {
        if !self.is_complete() {
            return Err(EnrollError::Incomplete {
                have: self.images.len(),
                need: self.config.images_needed,
            });
        }
        self.camera.close();
        Ok(EnrollRequest {
            student: self.student.clone(),
            images: std::mem::take(&mut self.images),
        })
    }

    pub fn captured(&self) -> usize {
        self.images.len()
    }

    pub fn images_needed(&self) -> usize {
        self.config.images_needed
    }

    pub fn is_complete(&self) -> bool {
        self.images.len() >= self.config.images_needed
    }

    /// Seconds left on the running countdown, if any.
    pub fn countdown(&self) -> Option<u32> {
        self.countdown
    }

    pub fn student(&self) -> &StudentIdentity {
        &self.student
    }
}

impl<C: Camera> Drop for EnrollmentSession<C> {
    fn drop(&mut self) {
        self.camera.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::MockCamera;

    fn student() -> StudentIdentity {
        StudentIdentity::new("Jane Doe", "21BCE001").unwrap()
    }

    fn open(camera: MockCamera, images_needed: usize) -> EnrollmentSession<MockCamera> {
        let config = EnrollConfig {
            images_needed,
            countdown_secs: 3,
            max_capture_attempts: 4,
        };
        EnrollmentSession::open(camera, &CaptureConfig::with_dimensions(16, 12), config, student())
            .unwrap()
    }

    fn run_countdown(session: &mut EnrollmentSession<MockCamera>) -> Result<CountdownStep, EnrollError> {
        session.begin_countdown()?;
        loop {
            match session.on_countdown_tick()? {
                CountdownStep::Remaining(_) => continue,
                captured => return Ok(captured),
            }
        }
    }

    #[test]
    fn test_countdown_counts_three_two_one() {
        let mut session = open(MockCamera::new(), 2);

        assert_eq!(session.begin_countdown().unwrap(), 3);
        assert_eq!(session.on_countdown_tick().unwrap(), CountdownStep::Remaining(2));
        assert_eq!(session.on_countdown_tick().unwrap(), CountdownStep::Remaining(1));
        assert_eq!(
            session.on_countdown_tick().unwrap(),
            CountdownStep::Captured { count: 1 }
        );
        assert_eq!(session.countdown(), None);
    }

    #[test]
    fn test_second_countdown_refused_while_running() {
        let mut session = open(MockCamera::new(), 2);
        session.begin_countdown().unwrap();
        assert!(matches!(
            session.begin_countdown(),
            Err(EnrollError::CountdownRunning)
        ));
    }

    #[test]
    fn test_complete_session_yields_request_and_releases_camera() {
        let camera = MockCamera::new();
        let probe = camera.probe();
        let mut session = open(camera, 2);

        run_countdown(&mut session).unwrap();
        assert!(matches!(
            session.take_request(),
            Err(EnrollError::Incomplete { have: 1, need: 2 })
        ));
        run_countdown(&mut session).unwrap();
        assert!(matches!(
            session.begin_countdown(),
            Err(EnrollError::AlreadyComplete(2))
        ));

        let request = session.take_request().unwrap();
        assert_eq!(request.images.len(), 2);
        assert_eq!(request.student.reg_no(), "21BCE001");
        assert_eq!(probe.active_tracks(), 0);

        drop(session);
        assert_eq!(probe.releases(), 1);
    }

    #[test]
    fn test_retake_discards_last_image() {
        let mut session = open(MockCamera::new(), 3);
        run_countdown(&mut session).unwrap();
        run_countdown(&mut session).unwrap();

        assert!(session.retake().is_some());
        assert_eq!(session.captured(), 1);
    }

    #[test]
    fn test_capture_failures_exhaust_attempts() {
        let camera = MockCamera::new();
        let probe = camera.probe();
        let mut session = open(camera, 1);
        probe.withhold_frames(true);

        for _ in 0..3 {
            assert!(matches!(
                run_countdown(&mut session),
                Err(EnrollError::Capture(CameraError::NoFrame))
            ));
        }
        assert!(matches!(
            run_countdown(&mut session),
            Err(EnrollError::TooManyAttempts(4))
        ));
    }

    #[test]
    fn test_successes_do_not_spend_retry_budget() {
        let camera = MockCamera::new();
        let probe = camera.probe();
        let config = EnrollConfig {
            images_needed: 6,
            countdown_secs: 1,
            max_capture_attempts: 5,
        };
        let mut session = EnrollmentSession::open(
            camera,
            &CaptureConfig::with_dimensions(16, 12),
            config,
            student(),
        )
        .unwrap();

        for _ in 0..5 {
            run_countdown(&mut session).unwrap();
        }
        probe.withhold_frames(true);
        assert!(matches!(
            run_countdown(&mut session),
            Err(EnrollError::Capture(CameraError::NoFrame))
        ));

        probe.withhold_frames(false);
        assert_eq!(
            run_countdown(&mut session).unwrap(),
            CountdownStep::Captured { count: 6 }
        );
        assert!(session.is_complete());
    }

    #[test]
    fn test_denied_camera() {
        let result = EnrollmentSession::open(
            MockCamera::denied(),
            &CaptureConfig::default(),
            EnrollConfig::default(),
            student(),
        );
        assert!(matches!(
            result,
            Err(EnrollError::CameraUnavailable(CameraError::PermissionDenied))
        ));
    }

    #[test]
    fn test_drop_releases_camera() {
        let camera = MockCamera::new();
        let probe = camera.probe();
        let session = open(camera, 5);
        assert_eq!(probe.active_tracks(), 1);

        drop(session);
        assert_eq!(probe.active_tracks(), 0);
    }
}
