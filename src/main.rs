//! Face Attendance CLI
//!
//! Runs the periodic attendance capture for a session, or enrolls a new
//! student's face, against a face-recognition service.

use chrono::Local;
use clap::{Parser, Subcommand};
use face_attendance::{
    capture::{Camera, CameraError, CaptureConfig, Frame, MockCamera},
    config::FileConfig,
    enroll::{run_enrollment, EnrollmentSession, ENROLL_CAMERA_UNAVAILABLE_TEXT},
    metrics::MetricsRegistry,
    scan::{AlwaysVisible, AttendanceLoop, CaptureStatus, ScanRunner},
    transport::{
        EnrollRequest, HttpTransport, ScriptedReply, ScriptedTransport, ServerReply, SessionId,
        StudentIdentity, Submission, Transport, TransportError,
    },
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "face-attendance", version, about)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Base URL of the recognition service, overriding the config file
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Use a synthetic camera instead of a capture device
    #[arg(long, global = true)]
    mock_camera: bool,

    /// Answer every submission locally instead of calling the service
    #[arg(long, global = true)]
    dry_run: bool,

    /// Log level (RUST_LOG takes precedence)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Capture and submit frames for an attendance session until Ctrl-C
    Scan {
        /// Session name the service records attendance under
        #[arg(long)]
        session: String,
    },
    /// Capture a series of face images and register them for a student
    Enroll {
        #[arg(long)]
        name: String,
        #[arg(long)]
        reg_no: String,
    },
}

/// The capture device chosen on the command line.
enum DeviceCamera {
    Mock(MockCamera),
    #[cfg(feature = "camera")]
    Native(face_attendance::capture::NativeCamera),
}

impl DeviceCamera {
    fn select(mock: bool) -> Self {
        #[cfg(feature = "camera")]
        if !mock {
            return Self::Native(face_attendance::capture::NativeCamera::new());
        }
        #[cfg(not(feature = "camera"))]
        if !mock {
            warn!("Built without the `camera` feature; using the mock camera");
        }
        Self::Mock(MockCamera::new())
    }
}

impl Camera for DeviceCamera {
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CameraError> {
        match self {
            Self::Mock(camera) => camera.open(config),
            #[cfg(feature = "camera")]
            Self::Native(camera) => camera.open(config),
        }
    }

    fn capture(&mut self) -> Result<Frame, CameraError> {
        match self {
            Self::Mock(camera) => camera.capture(),
            #[cfg(feature = "camera")]
            Self::Native(camera) => camera.capture(),
        }
    }

    fn is_open(&self) -> bool {
        match self {
            Self::Mock(camera) => camera.is_open(),
            #[cfg(feature = "camera")]
            Self::Native(camera) => camera.is_open(),
        }
    }

    fn close(&mut self) {
        match self {
            Self::Mock(camera) => camera.close(),
            #[cfg(feature = "camera")]
            Self::Native(camera) => camera.close(),
        }
    }
}

/// Where submissions go.
enum Backend {
    Http(HttpTransport),
    DryRun(ScriptedTransport),
}

impl Backend {
    fn select(config: &FileConfig, dry_run: bool) -> Result<Self, TransportError> {
        if dry_run {
            let transport = ScriptedTransport::new([])
                .with_fallback(ScriptedReply::Reply(ServerReply::success(
                    "Dry run: nothing was sent.",
                )))
                .with_latency(Duration::from_millis(250));
            return Ok(Self::DryRun(transport));
        }
        HttpTransport::new(&config.endpoint).map(Self::Http)
    }
}

impl Transport for Backend {
    async fn mark_attendance(&self, submission: Submission) -> Result<ServerReply, TransportError> {
        match self {
            Self::Http(transport) => transport.mark_attendance(submission).await,
            Self::DryRun(transport) => transport.mark_attendance(submission).await,
        }
    }

    async fn register_face(&self, request: EnrollRequest) -> Result<ServerReply, TransportError> {
        match self {
            Self::Http(transport) => transport.register_face(request).await,
            Self::DryRun(transport) => transport.register_face(request).await,
        }
    }
}

fn load_config(cli: &Cli) -> Result<FileConfig, String> {
    let mut config = match &cli.config {
        Some(path) => FileConfig::from_file(path).map_err(|e| e.to_string())?,
        None => FileConfig::default(),
    };
    if let Some(endpoint) = &cli.endpoint {
        config.endpoint.base_url = endpoint.clone();
    }
    if let Some(level) = &cli.log_level {
        config.output.log_level = level.clone();
    }
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn print_status(status: &CaptureStatus) {
    println!("{} {}", Local::now().format("%H:%M:%S"), status);
}

#[cfg(feature = "metrics")]
fn start_metrics(port: u16, shutdown: &watch::Receiver<bool>) -> Option<Arc<MetricsRegistry>> {
    use face_attendance::metrics::{MetricsServer, MetricsServerConfig};

    if port == 0 {
        return None;
    }
    let registry = match MetricsRegistry::new() {
        Ok(registry) => Arc::new(registry),
        Err(e) => {
            warn!(error = %e, "Metrics disabled");
            return None;
        }
    };
    let server = MetricsServer::new(MetricsServerConfig::with_port(port), Arc::clone(&registry));
    let shutdown = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = server.run(shutdown).await {
            warn!(error = %e, "Metrics server failed");
        }
    });
    Some(registry)
}

#[cfg(not(feature = "metrics"))]
fn start_metrics(_port: u16, _shutdown: &watch::Receiver<bool>) -> Option<Arc<MetricsRegistry>> {
    None
}

async fn scan(
    config: &FileConfig,
    session: SessionId,
    camera: DeviceCamera,
    transport: Backend,
    shutdown: watch::Receiver<bool>,
) -> ExitCode {
    let scan = AttendanceLoop::new(
        session,
        camera,
        AlwaysVisible,
        config.capture.clone(),
        config.scan.clone(),
    );
    let (mut runner, mut status_rx) = ScanRunner::new(scan, Arc::new(transport));
    if let Some(registry) = start_metrics(config.output.metrics_port, &shutdown) {
        runner = runner.with_metrics(registry);
    }

    print_status(&status_rx.borrow_and_update());
    let printer = tokio::spawn(async move {
        while status_rx.changed().await.is_ok() {
            print_status(&status_rx.borrow_and_update());
        }
    });

    let summary = runner.run(shutdown).await;
    let _ = printer.await;

    info!(
        session = %summary.session,
        ticks = summary.stats.ticks,
        submissions = summary.stats.submissions,
        accepted = summary.stats.accepted,
        rejected = summary.stats.rejected,
        transport_failures = summary.stats.transport_failures,
        duration_secs = (summary.ended_at - summary.started_at).num_seconds(),
        "Capture stopped"
    );

    if summary.camera_available {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

async fn enroll(
    config: &FileConfig,
    student: StudentIdentity,
    camera: DeviceCamera,
    transport: Backend,
    shutdown: watch::Receiver<bool>,
) -> ExitCode {
    let session = match EnrollmentSession::open(
        camera,
        &config.capture,
        config.enroll.clone(),
        student,
    ) {
        Ok(session) => session,
        Err(e) => {
            warn!(error = %e, "Enrollment did not start");
            print_status(&CaptureStatus::Error(ENROLL_CAMERA_UNAVAILABLE_TEXT.to_string()));
            return ExitCode::FAILURE;
        }
    };

    println!(
        "Enrolling {} ({}): hold still for {} images",
        session.student().name(),
        session.student().reg_no(),
        session.images_needed()
    );
    let report = run_enrollment(session, &transport, shutdown).await;
    print_status(&report.status);

    if report.status.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config.output.log_level);

    info!("Face Attendance v{}", face_attendance::VERSION);
    info!(endpoint = %config.endpoint.base_url, dry_run = cli.dry_run, "Starting");

    let (stop_tx, stop_rx) = watch::channel(false);
    if let Err(e) = ctrlc::set_handler(move || {
        let _ = stop_tx.send(true);
    }) {
        warn!(error = %e, "Could not install Ctrl-C handler");
    }

    let transport = match Backend::select(&config, cli.dry_run) {
        Ok(transport) => transport,
        Err(e) => {
            eprintln!("Failed to create HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let camera = DeviceCamera::select(cli.mock_camera);

    match cli.command {
        Command::Scan { session } => match SessionId::new(session) {
            Ok(session) => scan(&config, session, camera, transport, stop_rx).await,
            Err(e) => {
                eprintln!("Invalid session: {}", e);
                ExitCode::FAILURE
            }
        },
        Command::Enroll { name, reg_no } => match StudentIdentity::new(name, reg_no) {
            Ok(student) => enroll(&config, student, camera, transport, stop_rx).await,
            Err(e) => {
                eprintln!("Invalid student: {}", e);
                ExitCode::FAILURE
            }
        },
    }
}
