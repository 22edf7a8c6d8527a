//! Configuration file format.
//!
//! Every section is optional; a missing file section falls back to the
//! values the web client used (3 s ticks, 3 s settle, five enrollment
//! images, backend on `localhost:5000`).

use crate::capture::{CaptureConfig, CaptureConfigError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Capture(#[from] CaptureConfigError),
    #[error("tick interval must be greater than zero")]
    InvalidTickInterval,
    #[error("endpoint base URL must start with http:// or https://: {0}")]
    InvalidBaseUrl(String),
    #[error("enrollment needs at least one image")]
    InvalidImageCount,
    #[error("countdown must last at least one second")]
    InvalidCountdown,
    #[error("enrollment must allow at least one failed capture")]
    InvalidCaptureAttempts,
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FileConfig {
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub endpoint: EndpointConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub enroll: EnrollConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Where the recognition service lives.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EndpointConfig {
    pub base_url: String,
    pub attendance_path: String,
    pub enroll_path: String,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            attendance_path: "/api/mark-attendance-session".to_string(),
            enroll_path: "/api/register-face".to_string(),
            connect_timeout_ms: 5_000,
            request_timeout_ms: 30_000,
        }
    }
}

impl EndpointConfig {
    fn join(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Full URL of the mark-attendance endpoint.
    pub fn attendance_url(&self) -> String {
        self.join(&self.attendance_path)
    }

    /// Full URL of the face registration endpoint.
    pub fn enroll_url(&self) -> String {
        self.join(&self.enroll_path)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidBaseUrl(self.base_url.clone()));
        }
        Ok(())
    }
}

/// Timing of the attendance capture loop.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScanConfig {
    /// Period of the capture timer.
    pub tick_interval_ms: u64,
    /// How long a result stays on screen before the loop is ready again.
    pub settle_ms: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 3_000,
            settle_ms: 3_000,
        }
    }
}

impl ScanConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::InvalidTickInterval);
        }
        Ok(())
    }
}

/// Face enrollment capture settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EnrollConfig {
    /// Images collected before the enrollment is submitted.
    pub images_needed: usize,
    /// Seconds counted down before each capture.
    pub countdown_secs: u32,
    /// Failed captures tolerated before the enrollment gives up.
    pub max_capture_attempts: usize,
}

impl Default for EnrollConfig {
    fn default() -> Self {
        Self {
            images_needed: 5,
            countdown_secs: 3,
            max_capture_attempts: 15,
        }
    }
}

impl EnrollConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.images_needed == 0 {
            return Err(ConfigError::InvalidImageCount);
        }
        if self.countdown_secs == 0 {
            return Err(ConfigError::InvalidCountdown);
        }
        if self.max_capture_attempts == 0 {
            return Err(ConfigError::InvalidCaptureAttempts);
        }
        Ok(())
    }
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// Metrics server port (0 to disable).
    pub metrics_port: u16,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_port: 9090,
        }
    }
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.capture.validate()?;
        self.endpoint.validate()?;
        self.scan.validate()?;
        self.enroll.validate()?;
        Ok(())
    }
}
