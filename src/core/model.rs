// logvigil - core/model.rs
//
// Core data model types. Pure data definitions with no I/O
// (Core depends on std + serde/chrono only).
//
// These types are the shared vocabulary across all layers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// =============================================================================
// Log Record (normalised output of ingestion)
// =============================================================================

/// A single canonical log record, normalised across all input shapes.
///
/// This is the unit that flows through the store, aggregation, filtering,
/// and export. Immutable once created: every "update" downstream operates
/// on copies, never in place.
///
/// Structured inputs (tier 1/2 of the normaliser) deserialise directly into
/// this type; `timestamp`, `level`, and `message` are the canonical shape,
/// everything else is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Event instant in UTC. Source of truth for ordering and windowing.
    pub timestamp: DateTime<Utc>,

    /// Normalised severity level.
    pub level: Level,

    /// Message text. May be empty.
    pub message: String,

    /// Emitting component or subsystem.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Account name associated with the event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// Remote address associated with the event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,

    /// Action identifier (e.g. "login", "system_event").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    /// Outcome of the action, when the source reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,

    /// Operation duration in milliseconds. `None` means "not measured",
    /// which is distinct from `Some(0.0)`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,

    /// Free-form scalar annotations (e.g. rule names).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

impl LogRecord {
    /// Enforce field invariants that serde alone cannot express.
    ///
    /// A negative or non-finite duration is meaningless and is dropped to
    /// "not measured" rather than rejecting the whole record.
    pub fn sanitized(mut self) -> Self {
        if let Some(d) = self.duration {
            if !d.is_finite() || d < 0.0 {
                self.duration = None;
            }
        }
        self
    }
}

// =============================================================================
// Level
// =============================================================================

/// Normalised severity levels, ordered from most to least severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
}

impl Level {
    /// Human-readable label for display.
    pub fn label(&self) -> &'static str {
        match self {
            Level::Error => "error",
            Level::Warn => "warn",
            Level::Info => "info",
            Level::Debug => "debug",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Level::Error),
            "warn" | "warning" => Ok(Level::Warn),
            "info" => Ok(Level::Info),
            "debug" => Ok(Level::Debug),
            other => Err(format!(
                "unknown level '{other}' (expected error, warn, info, or debug)"
            )),
        }
    }
}

// =============================================================================
// Status
// =============================================================================

/// Outcome of an action, when the source reports one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Failure,
}

impl Status {
    pub fn label(&self) -> &'static str {
        match self {
            Status::Success => "success",
            Status::Failure => "failure",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "success" => Ok(Status::Success),
            "failure" => Ok(Status::Failure),
            other => Err(format!(
                "unknown status '{other}' (expected success or failure)"
            )),
        }
    }
}

// =============================================================================
// Feed status
// =============================================================================

/// Connection state of the live feed, as observed by status subscribers.
///
/// Transitions follow the lifecycle in `app::feed`; this enum is defined in
/// the core vocabulary because the presentation layer consumes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedStatus {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

impl FeedStatus {
    pub fn label(&self) -> &'static str {
        match self {
            FeedStatus::Disconnected => "disconnected",
            FeedStatus::Connecting => "connecting",
            FeedStatus::Connected => "connected",
            FeedStatus::Reconnecting => "reconnecting",
        }
    }
}

impl std::fmt::Display for FeedStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
