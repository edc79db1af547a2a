use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{ConfigError, TelemetryError};
use crate::models::InteractionRecord;

/// Writes `records` to `path` in one pass. The file only appears once every
/// row has been flushed, so a failed run never leaves a partial CSV behind.
pub fn write_records(path: &Path, records: &[InteractionRecord]) -> Result<(), TelemetryError> {
    let unwritable = |source: std::io::Error| ConfigError::UnwritableOutput {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(unwritable)?;
    let staging = NamedTempFile::new_in(dir).map_err(unwritable)?;

    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(staging);
    for record in records {
        writer.serialize(record)?;
    }
    let mut staging = writer
        .into_inner()
        .map_err(|err| TelemetryError::Io(err.into_error()))?;
    staging.flush()?;

    staging.persist(path).map_err(|err| unwritable(err.error))?;
    Ok(())
}

/// Loads a telemetry file the way the dashboard does, rejecting rows that
/// break the value domains. Row numbers count data rows from 1.
pub fn read_records(path: &Path) -> Result<Vec<InteractionRecord>, TelemetryError> {
    let mut reader = csv::Reader::from_path(path)?;

    let headers = reader.headers()?.clone();
    let missing: Vec<&str> = InteractionRecord::COLUMNS
        .iter()
        .copied()
        .filter(|column| !headers.iter().any(|header| header == *column))
        .collect();
    if !missing.is_empty() {
        return Err(TelemetryError::SchemaViolation {
            row: 0,
            reason: format!("missing columns: {}", missing.join(", ")),
        });
    }

    let mut records = Vec::new();
    for (index, result) in reader.deserialize::<InteractionRecord>().enumerate() {
        let row = index + 1;
        let record = result.map_err(|err| {
            if matches!(err.kind(), csv::ErrorKind::Deserialize { .. }) {
                TelemetryError::SchemaViolation {
                    row,
                    reason: err.to_string(),
                }
            } else {
                TelemetryError::Csv(err)
            }
        })?;
        record
            .validate()
            .map_err(|reason| TelemetryError::SchemaViolation { row, reason })?;
        records.push(record);
    }

    Ok(records)
}
