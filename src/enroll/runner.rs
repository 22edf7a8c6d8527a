//! Async driver for an enrollment capture.

use super::session::{CountdownStep, EnrollError, EnrollmentSession};
use crate::capture::Camera;
use crate::scan::{CaptureStatus, CONNECTION_FAILED_TEXT};
use crate::transport::{StudentIdentity, Transport};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time;
use tracing::{info, warn};

const COUNTDOWN_STEP: Duration = Duration::from_secs(1);

/// How an enrollment ended.
#[derive(Debug, Clone)]
pub struct EnrollmentReport {
    pub student: StudentIdentity,
    pub status: CaptureStatus,
    /// Images sent to the service; zero if nothing was submitted.
    pub images_submitted: usize,
}

/// Sleeps one countdown step, returning true if shutdown was requested.
async fn wait_or_cancel(shutdown: &mut watch::Receiver<bool>, step: Duration) -> bool {
    if *shutdown.borrow_and_update() {
        return true;
    }
    tokio::select! {
        _ = time::sleep(step) => false,
        changed = shutdown.changed() => changed.is_err() || *shutdown.borrow(),
    }
}

async fn collect_images<C: Camera>(
    session: &mut EnrollmentSession<C>,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<(), EnrollError> {
    while !session.is_complete() {
        let secs = session.begin_countdown()?;
        info!(
            image = session.captured() + 1,
            of = session.images_needed(),
            "Capturing in {secs}..."
        );

        loop {
            if wait_or_cancel(shutdown, COUNTDOWN_STEP).await {
                return Err(EnrollError::Cancelled);
            }
            match session.on_countdown_tick() {
                Ok(CountdownStep::Remaining(n)) => info!("{n}..."),
                Ok(CountdownStep::Captured { count }) => {
                    info!(count, of = session.images_needed(), "Image captured");
                    break;
                }
                Err(e @ (EnrollError::Capture(_) | EnrollError::Encode(_))) => {
                    warn!(error = %e, "Capture failed, retrying");
                    break;
                }
                Err(e) => return Err(e),
            }
        }
    }
    Ok(())
}

/// Captures the configured number of images and registers them.
///
/// The camera is released before the request is sent and on every
/// failure path.
pub async fn run_enrollment<C: Camera, T: Transport>(
    mut session: EnrollmentSession<C>,
    transport: &T,
    mut shutdown: watch::Receiver<bool>,
) -> EnrollmentReport {
    let student = session.student().clone();

    let request = match collect_images(&mut session, &mut shutdown)
        .await
        .and_then(|()| session.take_request())
    {
        Ok(request) => request,
        Err(e) => {
            warn!(reg_no = student.reg_no(), error = %e, "Enrollment aborted");
            let text = match e {
                EnrollError::Cancelled => "Enrollment cancelled.".to_string(),
                other => format!("Enrollment failed: {other}"),
            };
            return EnrollmentReport {
                student,
                status: CaptureStatus::Error(text),
                images_submitted: 0,
            };
        }
    };
    drop(session);

    let images_submitted = request.images.len();
    let status = match transport.register_face(request).await {
        Ok(reply) if reply.is_http_success() => {
            info!(reg_no = student.reg_no(), reply = reply.message(), "Face registered");
            CaptureStatus::Success(reply.message().to_string())
        }
        Ok(reply) => {
            warn!(
                reg_no = student.reg_no(),
                http_status = reply.http_status(),
                reply = reply.message(),
                "Enrollment rejected"
            );
            CaptureStatus::Error(reply.message().to_string())
        }
        Err(e) => {
            warn!(reg_no = student.reg_no(), error = %e, "Enrollment submission failed");
            CaptureStatus::Error(CONNECTION_FAILED_TEXT.to_string())
        }
    };

    EnrollmentReport {
        student,
        status,
        images_submitted,
    }
}
