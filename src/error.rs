//! Error types for the monitoring pipeline.
//!
//! Configuration problems and missing required inputs abort a run. Missing
//! monthly delinquency files and degenerate PSI bins are not errors: they are
//! recovered where they occur and reported through logging.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while computing monitoring statistics.
#[derive(Debug, Error)]
pub enum MonitoringError {
    /// Unknown segment, malformed label, or a snapshot that does not match its schema.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A required input file does not exist.
    #[error("Input not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// A required cell could not be interpreted.
    #[error("Invalid value in column '{column}' at row {row}: '{value}'")]
    InvalidValue {
        column: String,
        row: usize,
        value: String,
    },

    /// The input does not support the requested statistic.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MonitoringError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        MonitoringError::Configuration(msg.into())
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MonitoringError>;
