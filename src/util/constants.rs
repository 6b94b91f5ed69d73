// logvigil - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "logvigil";

/// Current application version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Store limits
// =============================================================================

/// Default retention capacity of the bounded store (records).
pub const DEFAULT_CAPACITY: usize = 1_000;

/// Minimum sensible retention capacity.
pub const MIN_CAPACITY: usize = 1;

/// Hard upper bound on retention capacity (prevents configuration mistakes).
pub const ABSOLUTE_MAX_CAPACITY: usize = 1_000_000;

// =============================================================================
// Aggregation
// =============================================================================

/// Default width of the top-users / top-IPs rankings.
pub const DEFAULT_TOP_N: usize = 5;

/// Minimum configurable top-N width.
pub const MIN_TOP_N: usize = 1;

/// Maximum configurable top-N width.
pub const MAX_TOP_N: usize = 100;

/// Case-insensitive needle identifying a failed authentication attempt.
pub const FAILED_LOGIN_NEEDLE: &str = "failed login";

/// Number of trailing one-hour buckets in the event histogram.
pub const HISTOGRAM_HOURS: usize = 12;

// =============================================================================
// Security alerts
// =============================================================================

/// Maximum number of alerts surfaced at once (newest first).
pub const MAX_ALERTS: usize = 5;

/// Message keywords that flag a record as a security alert regardless of level.
/// Matched case-insensitively as substrings.
pub const ALERT_KEYWORDS: &[&str] = &[
    "failed login",
    "suspicious",
    "unauthorized",
    "attack",
    "breach",
    "malware",
];

/// Label used when no rule name can be extracted from a rule-related record.
pub const UNKNOWN_RULE_LABEL: &str = "Unknown Rule";

// =============================================================================
// Live feed limits
// =============================================================================

/// Initial delay before the first reconnect attempt after a transient loss (ms).
pub const FEED_RECONNECT_BASE_DELAY_MS: u64 = 500;

/// Upper bound on the exponential reconnect backoff (ms).
pub const FEED_RECONNECT_MAX_DELAY_MS: u64 = 30_000;

/// How often the terminate flag is checked within feed sleeps and source
/// receive calls (ms). Bounds how long terminate() can block on the worker.
pub const FEED_CANCEL_CHECK_INTERVAL_MS: u64 = 100;

/// Minimum configurable reconnect base delay (ms).
pub const MIN_FEED_RECONNECT_DELAY_MS: u64 = 10;

/// Maximum configurable reconnect backoff ceiling (ms).
pub const MAX_FEED_RECONNECT_DELAY_MS: u64 = 300_000; // 5 min

// =============================================================================
// Demo source
// =============================================================================

/// Minimum interval between demo source records (ms).
pub const DEMO_MIN_INTERVAL_MS: u64 = 2_000;

/// Maximum interval between demo source records (ms).
pub const DEMO_MAX_INTERVAL_MS: u64 = 5_000;

// =============================================================================
// Export
// =============================================================================

/// Maximum number of records that can be exported in a single operation.
pub const MAX_EXPORT_ENTRIES: usize = 5_000_000;

// =============================================================================
// Logging
// =============================================================================

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

// =============================================================================
// Configuration
// =============================================================================

/// Configuration file name looked up next to the working directory when no
/// explicit --config path is given.
pub const CONFIG_FILE_NAME: &str = "logvigil.toml";

// =============================================================================
// CLI output
// =============================================================================

/// Maximum number of records printed to stdout for a filtered view.
pub const MAX_PRINTED_RECORDS: usize = 50;
