// logvigil - core/export.rs
//
// CSV and JSON export of record sequences (typically a filtered view).
// Core layer: writes to any Write trait object; the caller owns the sink.

use crate::core::model::LogRecord;
use crate::util::constants;
use crate::util::error::ExportError;
use std::io::Write;
use std::path::Path;

/// Export records to CSV format.
///
/// Columns: timestamp, level, message, source, user, ip, action, status,
/// duration. Optional fields render as empty cells. `export_path` is used
/// for error context only; the actual sink is `writer`.
pub fn export_csv<W: Write>(
    records: &[LogRecord],
    writer: W,
    export_path: &Path,
) -> Result<usize, ExportError> {
    check_entry_limit(records.len())?;

    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer
        .write_record([
            "timestamp", "level", "message", "source", "user", "ip", "action", "status",
            "duration",
        ])
        .map_err(|e| ExportError::Csv {
            path: export_path.to_path_buf(),
            source: e,
        })?;

    let mut count = 0;
    for record in records {
        let timestamp = record.timestamp.to_rfc3339();
        let duration = record
            .duration
            .map(|d| d.to_string())
            .unwrap_or_default();

        csv_writer
            .write_record([
                timestamp.as_str(),
                record.level.label(),
                record.message.as_str(),
                record.source.as_deref().unwrap_or(""),
                record.user.as_deref().unwrap_or(""),
                record.ip.as_deref().unwrap_or(""),
                record.action.as_deref().unwrap_or(""),
                record.status.map(|s| s.label()).unwrap_or(""),
                duration.as_str(),
            ])
            .map_err(|e| ExportError::Csv {
                path: export_path.to_path_buf(),
                source: e,
            })?;
        count += 1;
    }

    csv_writer.flush().map_err(|e| ExportError::Io {
        path: export_path.to_path_buf(),
        source: e,
    })?;

    Ok(count)
}

/// Export records to JSON format (pretty-printed array of objects).
pub fn export_json<W: Write>(
    records: &[LogRecord],
    writer: W,
    export_path: &Path,
) -> Result<usize, ExportError> {
    check_entry_limit(records.len())?;

    serde_json::to_writer_pretty(writer, records).map_err(|e| ExportError::Json {
        path: export_path.to_path_buf(),
        source: e,
    })?;
    Ok(records.len())
}

fn check_entry_limit(count: usize) -> Result<(), ExportError> {
    if count > constants::MAX_EXPORT_ENTRIES {
        return Err(ExportError::TooManyEntries {
            count,
            max: constants::MAX_EXPORT_ENTRIES,
        });
    }
    Ok(())
}
