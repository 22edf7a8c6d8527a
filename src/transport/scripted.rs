//! In-process transport replaying canned replies.
//!
//! Used by the test suite and by the CLI's `--dry-run` mode, where frames
//! are captured and encoded but never leave the machine.

use super::{EnrollRequest, ServerReply, Submission, Transport, TransportError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// One canned answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedReply {
    Reply(ServerReply),
    /// Simulates a connection failure with the given description.
    Fail(String),
}

impl ScriptedReply {
    fn into_result(self) -> Result<ServerReply, TransportError> {
        match self {
            ScriptedReply::Reply(reply) => Ok(reply),
            ScriptedReply::Fail(reason) => Err(TransportError::Unavailable(reason)),
        }
    }
}

/// A call the transport received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    Attendance { session: String, sequence: u64 },
    Enrollment { reg_no: String, images: usize },
}

/// Transport answering from a queue, falling back to a fixed reply once empty.
#[derive(Debug)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<ScriptedReply>>,
    fallback: ScriptedReply,
    latency: Duration,
    calls: Mutex<Vec<RecordedCall>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ScriptedTransport {
    pub fn new(script: impl IntoIterator<Item = ScriptedReply>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            fallback: ScriptedReply::Fail("script exhausted".to_string()),
            latency: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Reply used once the script runs out.
    pub fn with_fallback(mut self, fallback: ScriptedReply) -> Self {
        self.fallback = fallback;
        self
    }

    /// Delay applied to every call before it answers.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Calls received so far, in arrival order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Highest number of calls that were unanswered at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    async fn answer(&self, call: RecordedCall) -> Result<ServerReply, TransportError> {
        lock(&self.calls).push(call);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let next = lock(&self.script).pop_front();
        next.unwrap_or_else(|| self.fallback.clone()).into_result()
    }
}

impl Transport for ScriptedTransport {
    async fn mark_attendance(&self, submission: Submission) -> Result<ServerReply, TransportError> {
        self.answer(RecordedCall::Attendance {
            session: submission.session.as_str().to_string(),
            sequence: submission.sequence,
        })
        .await
    }

    async fn register_face(&self, request: EnrollRequest) -> Result<ServerReply, TransportError> {
        self.answer(RecordedCall::Enrollment {
            reg_no: request.student.reg_no().to_string(),
            images: request.images.len(),
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::EncodedImage;
    use crate::transport::SessionId;

    fn submission(sequence: u64) -> Submission {
        Submission {
            session: SessionId::new("CS101").unwrap(),
            image: EncodedImage::new(vec![1, 2, 3], 1, 1, "image/jpeg"),
            sequence,
        }
    }

    #[tokio::test]
    async fn test_replays_script_then_fallback() {
        let transport = ScriptedTransport::new([
            ScriptedReply::Reply(ServerReply::success("ok")),
            ScriptedReply::Fail("refused".to_string()),
        ]);

        assert_eq!(
            transport.mark_attendance(submission(1)).await.unwrap(),
            ServerReply::success("ok")
        );
        assert!(matches!(
            transport.mark_attendance(submission(2)).await,
            Err(TransportError::Unavailable(reason)) if reason == "refused"
        ));
        assert!(matches!(
            transport.mark_attendance(submission(3)).await,
            Err(TransportError::Unavailable(_))
        ));

        assert_eq!(transport.call_count(), 3);
        assert_eq!(transport.peak_in_flight(), 1);
    }
}
