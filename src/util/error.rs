// logvigil - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// No string-based error propagation; all errors preserve the causal chain
// for diagnostic logging.
//
// Note the deliberate absence of a parse error: the record normaliser is
// total (every non-empty input line yields a record via the fallback tiers),
// so malformed bulk input is a recovered condition, never an error.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Top-level error type for all logvigil operations.
/// Errors are categorised by the subsystem that produced them.
#[derive(Debug)]
pub enum LogVigilError {
    /// Live feed transport failure.
    Feed(FeedError),

    /// Export operation failed.
    Export(ExportError),

    /// I/O error with path context.
    Io {
        path: PathBuf,
        operation: &'static str,
        source: io::Error,
    },
}

impl fmt::Display for LogVigilError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Feed(e) => write!(f, "Feed error: {e}"),
            Self::Export(e) => write!(f, "Export error: {e}"),
            Self::Io {
                path,
                operation,
                source,
            } => write!(
                f,
                "I/O error during {operation} on '{}': {source}",
                path.display()
            ),
        }
    }
}

impl std::error::Error for LogVigilError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Feed(e) => Some(e),
            Self::Export(e) => Some(e),
            Self::Io { source, .. } => Some(source),
        }
    }
}

// ---------------------------------------------------------------------------
// Feed errors
// ---------------------------------------------------------------------------

/// Errors reported by a push-source transport.
///
/// These never escape the feed worker to engine callers: a failed open is
/// retried with backoff and surfaced as a status transition instead.
#[derive(Debug)]
pub enum FeedError {
    /// The transport could not be established.
    ConnectFailed { reason: String },

    /// The transport was closed by the remote end and cannot be reopened.
    SourceClosed,
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectFailed { reason } => write!(f, "Connect failed: {reason}"),
            Self::SourceClosed => write!(f, "Source closed"),
        }
    }
}

impl std::error::Error for FeedError {}

impl From<FeedError> for LogVigilError {
    fn from(e: FeedError) -> Self {
        Self::Feed(e)
    }
}

// ---------------------------------------------------------------------------
// Export errors
// ---------------------------------------------------------------------------

/// Errors related to export operations.
#[derive(Debug)]
pub enum ExportError {
    /// I/O error writing the export output.
    Io { path: PathBuf, source: io::Error },

    /// CSV serialisation error.
    Csv { path: PathBuf, source: csv::Error },

    /// JSON serialisation error.
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Export would exceed maximum entry count.
    TooManyEntries { count: usize, max: usize },
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "Export I/O error '{}': {source}", path.display())
            }
            Self::Csv { path, source } => {
                write!(f, "CSV export error '{}': {source}", path.display())
            }
            Self::Json { path, source } => {
                write!(f, "JSON export error '{}': {source}", path.display())
            }
            Self::TooManyEntries { count, max } => write!(
                f,
                "Export of {count} records exceeds maximum of {max}. \
                 Apply filters to reduce the result set."
            ),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Csv { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ExportError> for LogVigilError {
    fn from(e: ExportError) -> Self {
        Self::Export(e)
    }
}

/// Convenience type alias for logvigil results.
pub type Result<T> = std::result::Result<T, LogVigilError>;
