// logvigil - core/normalize.rs
//
// Record normalisation: turns raw bulk text or a single raw event into
// canonical LogRecord values via a three-tier fallback strategy.
// Core layer: accepts text content only, never touches the filesystem.
//
// The normaliser is total — no input is ever rejected. When structured
// parsing fails at every tier, a record is synthesised from the line text,
// so the output count always equals the number of non-empty input lines
// (unless the whole input was a single structured array).

use crate::core::model::{Level, LogRecord};
use chrono::Utc;
use rayon::prelude::*;

/// Minimum number of lines before the bulk pass parses them in parallel.
/// Below this the rayon fork/join overhead outweighs the per-line work.
const PARALLEL_THRESHOLD_LINES: usize = 256;

/// Normalise raw bulk text into an ordered sequence of canonical records.
///
/// Strategy, in priority order:
/// 1. Parse the entire input as a single JSON array; if every element
///    already carries the canonical shape (timestamp, level, message),
///    use it directly.
/// 2. Otherwise split into non-empty lines and parse each line
///    independently as one structured record.
/// 3. Lines that are not structured are synthesised: timestamp = now
///    (a bare line carries no reliable timestamp), level inferred from the
///    line text, message = trimmed line, source = "unknown".
///
/// Input order is preserved in the output.
pub fn normalize_bulk(content: &str) -> Vec<LogRecord> {
    if let Ok(records) = serde_json::from_str::<Vec<LogRecord>>(content) {
        tracing::debug!(records = records.len(), "Bulk input parsed as JSON array");
        return records.into_iter().map(LogRecord::sanitized).collect();
    }

    let lines: Vec<&str> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let records: Vec<LogRecord> = if lines.len() >= PARALLEL_THRESHOLD_LINES {
        lines.par_iter().map(|line| normalize_line(line)).collect()
    } else {
        lines.iter().map(|line| normalize_line(line)).collect()
    };

    tracing::debug!(
        lines = lines.len(),
        records = records.len(),
        "Bulk input normalised line by line"
    );

    records
}

/// Normalise a single raw line (tiers 2 and 3 of the bulk strategy).
///
/// Also the entry point for live sources that deliver raw text instead of
/// canonical records: structured events pass through unchanged, anything
/// else is synthesised.
pub fn normalize_line(line: &str) -> LogRecord {
    let line = line.trim();
    match serde_json::from_str::<LogRecord>(line) {
        Ok(record) => record.sanitized(),
        Err(_) => synthesize(line),
    }
}

/// Build a low-confidence record from an unstructured line.
fn synthesize(line: &str) -> LogRecord {
    LogRecord {
        timestamp: Utc::now(),
        level: classify_level(line),
        message: line.to_string(),
        source: Some("unknown".to_string()),
        user: None,
        ip: None,
        action: None,
        status: None,
        duration: None,
        metadata: None,
    }
}

// =============================================================================
// Level classification
// =============================================================================

/// Infer a severity level from free text.
///
/// Case-insensitive substring match in fixed priority order; the first
/// match wins, so a line containing several keywords classifies as the
/// most severe one. Unclassifiable text defaults to Info.
pub fn classify_level(text: &str) -> Level {
    let lower = text.to_lowercase();
    if lower.contains("error") {
        Level::Error
    } else if lower.contains("warn") {
        Level::Warn
    } else if lower.contains("debug") {
        Level::Debug
    } else {
        Level::Info
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::Status;

    // -------------------------------------------------------------------------
    // Classifier priority
    // -------------------------------------------------------------------------

    #[test]
    fn test_classify_error_wins_over_warn() {
        assert_eq!(classify_level("ERROR and warn"), Level::Error);
    }

    #[test]
    fn test_classify_warn() {
        assert_eq!(classify_level("just a warn"), Level::Warn);
    }

    #[test]
    fn test_classify_debug() {
        assert_eq!(classify_level("DEBUG cache hit"), Level::Debug);
    }

    #[test]
    fn test_classify_default_info() {
        assert_eq!(classify_level("nothing special"), Level::Info);
    }

    #[test]
    fn test_classify_is_case_insensitive() {
        assert_eq!(classify_level("Connection ErRoR detected"), Level::Error);
    }

    // -------------------------------------------------------------------------
    // Tier 1: whole-input JSON array
    // -------------------------------------------------------------------------

    #[test]
    fn test_bulk_json_array_used_directly() {
        let content = r#"[
            {"timestamp":"2024-01-15T14:30:22Z","level":"error","message":"db down","user":"admin"},
            {"timestamp":"2024-01-15T14:30:23Z","level":"info","message":"retry ok","duration":42.0}
        ]"#;
        let records = normalize_bulk(content);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].level, Level::Error);
        assert_eq!(records[0].user.as_deref(), Some("admin"));
        assert_eq!(records[1].duration, Some(42.0));
    }

    #[test]
    fn test_bulk_array_with_non_canonical_element_falls_back_to_lines() {
        // Second element lacks a level, so the array is not canonical and
        // the input is re-read line by line. The JSON syntax lines then
        // become synthesised records.
        let content = "[\n{\"timestamp\":\"2024-01-15T14:30:22Z\",\"level\":\"info\",\"message\":\"ok\"},\n{\"message\":\"no level\"}\n]";
        let records = normalize_bulk(content);
        // Four non-empty lines: "[", two element lines, "]".
        assert_eq!(records.len(), 4);
        assert!(records.iter().all(|r| r.timestamp.timestamp() > 0));
    }

    // -------------------------------------------------------------------------
    // Tier 2: per-line structured records
    // -------------------------------------------------------------------------

    #[test]
    fn test_bulk_ndjson_lines() {
        let content = "\
{\"timestamp\":\"2024-01-15T14:30:22Z\",\"level\":\"warn\",\"message\":\"slow query\",\"status\":\"success\"}\n\
{\"timestamp\":\"2024-01-15T14:30:23Z\",\"level\":\"error\",\"message\":\"Failed login attempt\",\"ip\":\"10.0.0.5\"}\n";
        let records = normalize_bulk(content);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].status, Some(Status::Success));
        assert_eq!(records[1].ip.as_deref(), Some("10.0.0.5"));
    }

    // -------------------------------------------------------------------------
    // Tier 3: synthesis + totality
    // -------------------------------------------------------------------------

    #[test]
    fn test_bulk_totality_one_record_per_non_empty_line() {
        let content = "ERROR disk failure\n\n   \nplain text line\nWARN low memory\n";
        let records = normalize_bulk(content);
        assert_eq!(records.len(), 3, "blank lines must not produce records");
        assert_eq!(records[0].level, Level::Error);
        assert_eq!(records[1].level, Level::Info);
        assert_eq!(records[2].level, Level::Warn);
    }

    #[test]
    fn test_synthesised_record_shape() {
        let records = normalize_bulk("  something odd happened  ");
        assert_eq!(records.len(), 1);
        let rec = &records[0];
        assert_eq!(rec.message, "something odd happened");
        assert_eq!(rec.source.as_deref(), Some("unknown"));
        assert_eq!(rec.level, Level::Info);
        assert!(rec.user.is_none() && rec.ip.is_none() && rec.duration.is_none());
    }

    #[test]
    fn test_mixed_structured_and_plain_lines() {
        let content = "\
{\"timestamp\":\"2024-01-15T14:30:22Z\",\"level\":\"debug\",\"message\":\"cache stats\"}\n\
not json at all but mentions error\n";
        let records = normalize_bulk(content);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].level, Level::Debug);
        assert_eq!(records[1].level, Level::Error);
        assert_eq!(records[1].source.as_deref(), Some("unknown"));
    }

    #[test]
    fn test_empty_input_yields_no_records() {
        assert!(normalize_bulk("").is_empty());
        assert!(normalize_bulk("\n\n  \n").is_empty());
    }

    #[test]
    fn test_structured_line_with_bad_duration_is_sanitised() {
        let content =
            "{\"timestamp\":\"2024-01-15T14:30:22Z\",\"level\":\"info\",\"message\":\"m\",\"duration\":-1.0}";
        let records = normalize_bulk(content);
        assert_eq!(records[0].duration, None);
    }

    #[test]
    fn test_large_input_parallel_path_preserves_order() {
        let mut content = String::new();
        for i in 0..PARALLEL_THRESHOLD_LINES + 10 {
            content.push_str(&format!("line number {i}\n"));
        }
        let records = normalize_bulk(&content);
        assert_eq!(records.len(), PARALLEL_THRESHOLD_LINES + 10);
        assert_eq!(records[0].message, "line number 0");
        assert_eq!(
            records.last().unwrap().message,
            format!("line number {}", PARALLEL_THRESHOLD_LINES + 9)
        );
    }
}
