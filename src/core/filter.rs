// logvigil - core/filter.rs
//
// Composable filter criteria for log records.
// All specified criteria are AND-combined; unspecified criteria pass
// vacuously. Core layer: pure logic, no I/O.

use crate::core::model::{Level, LogRecord, Status};
use crate::core::store::BoundedStore;
use chrono::{DateTime, Utc};

/// Complete filter state. All specified fields are AND-combined when
/// applied; `None` (and an empty search string) means "no constraint".
#[derive(Debug, Clone, Default)]
pub struct FilterCriteria {
    /// Exact severity level.
    pub level: Option<Level>,

    /// Case-insensitive substring search on the message.
    pub search: Option<String>,

    /// Start of time range (inclusive).
    pub start: Option<DateTime<Utc>>,

    /// End of time range (inclusive).
    pub end: Option<DateTime<Utc>>,

    /// Exact source match.
    pub source: Option<String>,

    /// Exact user match.
    pub user: Option<String>,

    /// Exact IP match.
    pub ip: Option<String>,

    /// Exact status match.
    pub status: Option<Status>,
}

impl FilterCriteria {
    /// Returns true if no criteria are active (matches everything).
    pub fn is_empty(&self) -> bool {
        self.level.is_none()
            && self.search.as_deref().map_or(true, str::is_empty)
            && self.start.is_none()
            && self.end.is_none()
            && self.source.is_none()
            && self.user.is_none()
            && self.ip.is_none()
            && self.status.is_none()
    }

    /// Check whether a single record satisfies every specified criterion.
    pub fn matches(&self, record: &LogRecord) -> bool {
        if let Some(level) = self.level {
            if record.level != level {
                return false;
            }
        }

        if let Some(search) = &self.search {
            if !search.is_empty()
                && !record
                    .message
                    .to_lowercase()
                    .contains(&search.to_lowercase())
            {
                return false;
            }
        }

        // Time range is inclusive on both bounds and compares instants,
        // never string representations.
        if let Some(start) = self.start {
            if record.timestamp < start {
                return false;
            }
        }
        if let Some(end) = self.end {
            if record.timestamp > end {
                return false;
            }
        }

        if let Some(source) = &self.source {
            if record.source.as_deref() != Some(source.as_str()) {
                return false;
            }
        }
        if let Some(user) = &self.user {
            if record.user.as_deref() != Some(user.as_str()) {
                return false;
            }
        }
        if let Some(ip) = &self.ip {
            if record.ip.as_deref() != Some(ip.as_str()) {
                return false;
            }
        }
        if let Some(status) = self.status {
            if record.status != Some(status) {
                return false;
            }
        }

        true
    }
}

/// Apply criteria over the store, returning matching records as a new
/// sequence in the store's arrival order. The store is never mutated.
pub fn filter_view(store: &BoundedStore, criteria: &FilterCriteria) -> Vec<LogRecord> {
    store
        .iter()
        .filter(|record| criteria.matches(record))
        .cloned()
        .collect()
}
