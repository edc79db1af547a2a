use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

/// Rejected configuration. Raised before generation starts, or when the
/// output location cannot be written.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("record count must be positive")]
    InvalidRecordCount,
    #[error("{0} pool must contain at least one entry")]
    EmptyPool(&'static str),
    #[error("date range end {end} precedes start {start}")]
    InvertedDateRange { start: NaiveDate, end: NaiveDate },
    #[error("invalid {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    #[error("output path {} is not writable: {source}", .path.display())]
    UnwritableOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("row {row} violates the telemetry schema: {reason}")]
    SchemaViolation { row: usize, reason: String },
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
