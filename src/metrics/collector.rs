//! Metrics collection and registry.

use crate::capture::Camera;
use crate::scan::{AttendanceLoop, Visibility};
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// A snapshot of loop state for metrics update.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    /// Whether a submission or settle period is pending.
    pub busy: bool,
    /// Whether the camera stream is held.
    pub camera_open: bool,
    pub ticks: u64,
    pub skipped_busy: u64,
    pub skipped_hidden: u64,
    pub skipped_no_frame: u64,
    pub submissions: u64,
    pub accepted: u64,
    pub rejected: u64,
    pub transport_failures: u64,
}

/// Prometheus metrics registry for the attendance loop.
pub struct MetricsRegistry {
    registry: Registry,

    busy: IntGauge,
    camera_open: IntGauge,

    ticks_total: IntCounter,
    skipped_busy_total: IntCounter,
    skipped_hidden_total: IntCounter,
    skipped_no_frame_total: IntCounter,

    submissions_total: IntCounter,
    accepted_total: IntCounter,
    rejected_total: IntCounter,
    transport_failures_total: IntCounter,
}

/// Raises a counter to `target`; counters never move backwards.
fn advance(counter: &IntCounter, target: u64) {
    let current = counter.get();
    if target > current {
        counter.inc_by(target - current);
    }
}

impl MetricsRegistry {
    /// Creates a new registry with all loop metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let busy = IntGauge::new(
            "face_attendance_busy",
            "Whether a submission or settle period is pending (1=busy)",
        )?;
        let camera_open = IntGauge::new(
            "face_attendance_camera_open",
            "Whether the camera stream is held (1=open)",
        )?;

        let ticks_total = IntCounter::new("face_attendance_ticks_total", "Total capture ticks")?;
        let skipped_busy_total = IntCounter::new(
            "face_attendance_ticks_skipped_busy_total",
            "Ticks dropped while a submission was pending",
        )?;
        let skipped_hidden_total = IntCounter::new(
            "face_attendance_ticks_skipped_hidden_total",
            "Ticks dropped while the capture view was hidden",
        )?;
        let skipped_no_frame_total = IntCounter::new(
            "face_attendance_ticks_skipped_no_frame_total",
            "Ticks dropped because no frame was available",
        )?;

        let submissions_total = IntCounter::new(
            "face_attendance_submissions_total",
            "Frames sent to the recognition service",
        )?;
        let accepted_total = IntCounter::new(
            "face_attendance_accepted_total",
            "Submissions the service accepted",
        )?;
        let rejected_total = IntCounter::new(
            "face_attendance_rejected_total",
            "Submissions the service rejected",
        )?;
        let transport_failures_total = IntCounter::new(
            "face_attendance_transport_failures_total",
            "Submissions that never got a usable reply",
        )?;

        registry.register(Box::new(busy.clone()))?;
        registry.register(Box::new(camera_open.clone()))?;
        registry.register(Box::new(ticks_total.clone()))?;
        registry.register(Box::new(skipped_busy_total.clone()))?;
        registry.register(Box::new(skipped_hidden_total.clone()))?;
        registry.register(Box::new(skipped_no_frame_total.clone()))?;
        registry.register(Box::new(submissions_total.clone()))?;
        registry.register(Box::new(accepted_total.clone()))?;
        registry.register(Box::new(rejected_total.clone()))?;
        registry.register(Box::new(transport_failures_total.clone()))?;

        Ok(Self {
            registry,
            busy,
            camera_open,
            ticks_total,
            skipped_busy_total,
            skipped_hidden_total,
            skipped_no_frame_total,
            submissions_total,
            accepted_total,
            rejected_total,
            transport_failures_total,
        })
    }

    /// Updates all metrics from a snapshot of loop state.
    pub fn update(&self, snapshot: &MetricsSnapshot) {
        self.busy.set(i64::from(snapshot.busy));
        self.camera_open.set(i64::from(snapshot.camera_open));

        advance(&self.ticks_total, snapshot.ticks);
        advance(&self.skipped_busy_total, snapshot.skipped_busy);
        advance(&self.skipped_hidden_total, snapshot.skipped_hidden);
        advance(&self.skipped_no_frame_total, snapshot.skipped_no_frame);

        advance(&self.submissions_total, snapshot.submissions);
        advance(&self.accepted_total, snapshot.accepted);
        advance(&self.rejected_total, snapshot.rejected);
        advance(&self.transport_failures_total, snapshot.transport_failures);
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

impl MetricsSnapshot {
    /// Creates a snapshot from the current state of an attendance loop.
    pub fn from_loop<C: Camera, V: Visibility>(scan: &AttendanceLoop<C, V>) -> Self {
        let stats = scan.stats();
        Self {
            busy: scan.is_busy(),
            camera_open: scan.camera_open(),
            ticks: stats.ticks,
            skipped_busy: stats.skipped_busy,
            skipped_hidden: stats.skipped_hidden,
            skipped_no_frame: stats.skipped_no_frame,
            submissions: stats.submissions,
            accepted: stats.accepted,
            rejected: stats.rejected,
            transport_failures: stats.transport_failures,
        }
    }
}
