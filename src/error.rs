//! Error types for the environment and its collaborators.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the environment state machine and data adapter.
#[derive(Debug, Error)]
pub enum EnvError {
    /// Caller passed a value outside the documented domain (e.g. action 7).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation called in the wrong lifecycle phase (e.g. step before reset).
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Read past the end of the attached data source.
    #[error("Time index {index} out of range for {records} records")]
    IndexOutOfRange { index: usize, records: usize },

    #[error("Data source error: {0}")]
    Source(#[from] SourceError),
}

/// Errors from loading or generating tool wear datasets.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("No valid records in {0}")]
    Empty(String),

    #[error("Invalid synthetic profile: {0}")]
    InvalidProfile(String),
}

/// Errors from telemetry sinks.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type EnvResult<T> = Result<T, EnvError>;
