//! Error types for configuration and context startup

use std::path::PathBuf;

use resilink_reporter::ReportError;
use resilink_stream::StreamError;
use resilink_telemetry::TelemetryError;
use thiserror::Error;

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// Unsupported file format
    #[error("Unsupported configuration file format. Use .toml, .yaml, .yml, or .json")]
    UnsupportedFormat,

    /// Sources could not be merged or deserialized
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] config::ConfigError),

    /// A value is out of range
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Errors raised while starting or stopping a [`ClientContext`](crate::ClientContext)
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Configuration could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The stream client could not be created
    #[error(transparent)]
    Stream(#[from] StreamError),

    /// The reporter could not be created or flushed
    #[error(transparent)]
    Report(#[from] ReportError),

    /// Logging could not be installed
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
}

/// Result type for the facade crate
pub type Result<T> = std::result::Result<T, Error>;
