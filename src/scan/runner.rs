//! Async driver for an [`AttendanceLoop`].
//!
//! All loop state is touched from a single task. A `select!` loop
//! multiplexes four event sources: the shutdown signal, submission
//! results, the settle deadline, and the capture timer. Submissions run
//! as their own tasks so that stopping the loop never cancels a request
//! that is already on the wire; its result simply finds nobody listening.

use super::attendance::{AttendanceLoop, ScanStats, SkipReason, TickOutcome};
use super::status::CaptureStatus;
use super::visibility::Visibility;
use crate::capture::Camera;
use crate::metrics::{MetricsRegistry, MetricsSnapshot};
use crate::transport::{ServerReply, SessionId, Submission, Transport, TransportError};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

type SubmitResult = Result<ServerReply, TransportError>;

/// What a finished loop reports back.
#[derive(Debug, Clone)]
pub struct ScanSummary {
    pub session: SessionId,
    /// False when the camera could not be opened and nothing ran.
    pub camera_available: bool,
    pub final_status: CaptureStatus,
    pub stats: ScanStats,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

/// Runs an attendance loop until told to stop.
pub struct ScanRunner<C: Camera, V: Visibility, T: Transport> {
    scan: AttendanceLoop<C, V>,
    transport: Arc<T>,
    status_tx: watch::Sender<CaptureStatus>,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl<C: Camera, V: Visibility, T: Transport> ScanRunner<C, V, T> {
    /// Wraps a loop; the receiver observes every status change.
    pub fn new(
        scan: AttendanceLoop<C, V>,
        transport: Arc<T>,
    ) -> (Self, watch::Receiver<CaptureStatus>) {
        let (status_tx, status_rx) = watch::channel(scan.status().clone());
        let runner = Self {
            scan,
            transport,
            status_tx,
            metrics: None,
        };
        (runner, status_rx)
    }

    /// Mirrors loop counters into a metrics registry.
    pub fn with_metrics(mut self, registry: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(registry);
        self
    }

    /// Starts the loop and drives it until `shutdown` becomes true or its
    /// sender is dropped. The camera is released before this returns.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> ScanSummary {
        let started_at = Utc::now();

        if let Err(e) = self.scan.start() {
            warn!(session = %self.scan.session(), error = %e, "Capture loop did not start");
            self.publish();
            return self.finish(started_at, false);
        }
        self.publish();

        let period = self.scan.scan_config().tick_interval();
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let (result_tx, mut result_rx) = mpsc::unbounded_channel::<SubmitResult>();
        let mut settle_at: Option<Instant> = None;
        let mut running = !*shutdown.borrow_and_update();

        while running {
            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    running = changed.is_ok() && !*shutdown.borrow_and_update();
                }
                Some(result) = result_rx.recv() => {
                    if let Some(settle) = self.scan.on_submit_result(result) {
                        settle_at = Some(Instant::now() + settle);
                    }
                }
                _ = time::sleep_until(settle_at.unwrap_or_else(Instant::now)), if settle_at.is_some() => {
                    settle_at = None;
                    self.scan.on_settled();
                }
                _ = ticker.tick() => {
                    match self.scan.on_tick() {
                        TickOutcome::Submitted(submission) => {
                            self.spawn_submission(submission, result_tx.clone());
                        }
                        TickOutcome::Skipped(SkipReason::Busy) => {
                            debug!(session = %self.scan.session(), "Tick dropped while busy");
                        }
                        TickOutcome::Skipped(_) => {}
                    }
                }
            }
            self.publish();
        }

        self.scan.stop();
        self.publish();
        self.finish(started_at, true)
    }

    fn spawn_submission(&self, submission: Submission, results: mpsc::UnboundedSender<SubmitResult>) {
        let transport = Arc::clone(&self.transport);
        tokio::spawn(async move {
            let sequence = submission.sequence;
            let result = transport.mark_attendance(submission).await;
            if results.send(result).is_err() {
                debug!(sequence, "Loop stopped before reply arrived; result dropped");
            }
        });
    }

    fn publish(&self) {
        let status = self.scan.status();
        self.status_tx.send_if_modified(|current| {
            if current == status {
                return false;
            }
            *current = status.clone();
            true
        });

        if let Some(registry) = &self.metrics {
            registry.update(&MetricsSnapshot::from_loop(&self.scan));
        }
    }

    fn finish(self, started_at: DateTime<Utc>, camera_available: bool) -> ScanSummary {
        let summary = ScanSummary {
            session: self.scan.session().clone(),
            camera_available,
            final_status: self.scan.status().clone(),
            stats: self.scan.stats().clone(),
            started_at,
            ended_at: Utc::now(),
        };
        info!(
            session = %summary.session,
            submissions = summary.stats.submissions,
            accepted = summary.stats.accepted,
            "Capture loop finished"
        );
        summary
    }
}
