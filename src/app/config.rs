// logvigil - app/config.rs
//
// Engine configuration: TOML loading with startup validation.
// Invalid values produce actionable warnings and fall back to defaults;
// a broken config file never prevents the engine from starting.

use crate::util::constants;
use serde::Deserialize;
use std::path::Path;

/// Raw deserialisable shape of the config file.
///
/// Unknown keys are silently ignored for forward compatibility — a newer
/// config file can be used with an older binary without crashing.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// `[store]` section.
    pub store: StoreSection,
    /// `[stats]` section.
    pub stats: StatsSection,
    /// `[feed]` section.
    pub feed: FeedSection,
    /// `[logging]` section.
    pub logging: LoggingSection,
}

/// `[store]` config section.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// Retention capacity in records.
    pub capacity: Option<usize>,
}

/// `[stats]` config section.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StatsSection {
    /// Width of the top-users / top-IPs rankings.
    pub top_n: Option<usize>,
}

/// `[feed]` config section.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FeedSection {
    /// Initial reconnect delay in ms.
    pub reconnect_base_ms: Option<u64>,
    /// Reconnect backoff ceiling in ms.
    pub reconnect_max_ms: Option<u64>,
}

/// `[logging]` config section.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
}

/// Validated engine configuration.
///
/// All values are validated against named constants at load time.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Retention capacity of the bounded store.
    pub capacity: usize,

    /// Width of the top-users / top-IPs rankings.
    pub top_n: usize,

    /// Initial reconnect delay after a transient feed loss.
    pub reconnect_base_ms: u64,

    /// Reconnect backoff ceiling.
    pub reconnect_max_ms: u64,

    /// Logging level string (consumed before tracing is initialised).
    pub log_level: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            capacity: constants::DEFAULT_CAPACITY,
            top_n: constants::DEFAULT_TOP_N,
            reconnect_base_ms: constants::FEED_RECONNECT_BASE_DELAY_MS,
            reconnect_max_ms: constants::FEED_RECONNECT_MAX_DELAY_MS,
            log_level: None,
        }
    }
}

/// Load and validate a config file.
///
/// Returns the validated config plus a list of non-fatal warnings.
/// A missing file yields defaults with no warnings (first run); an
/// unreadable or unparseable file yields defaults with a warning.
pub fn load_config(config_path: &Path) -> (EngineConfig, Vec<String>) {
    let mut warnings: Vec<String> = Vec::new();

    if !config_path.exists() {
        tracing::debug!(path = %config_path.display(), "No config file found; using defaults");
        return (EngineConfig::default(), warnings);
    }

    let content = match std::fs::read_to_string(config_path) {
        Ok(c) => c,
        Err(e) => {
            let msg = format!(
                "Could not read config file '{}': {e}. Using defaults.",
                config_path.display()
            );
            tracing::warn!("{}", msg);
            warnings.push(msg);
            return (EngineConfig::default(), warnings);
        }
    };

    let raw: RawConfig = match toml::from_str(&content) {
        Ok(r) => r,
        Err(e) => {
            let msg = format!(
                "Failed to parse config file '{}': {e}. Using defaults.",
                config_path.display()
            );
            tracing::warn!("{}", msg);
            warnings.push(msg);
            return (EngineConfig::default(), warnings);
        }
    };

    tracing::info!(path = %config_path.display(), "Loaded config file");

    (validate(raw, &mut warnings), warnings)
}

/// Validate each field against named constants, accumulating warnings.
fn validate(raw: RawConfig, warnings: &mut Vec<String>) -> EngineConfig {
    let mut config = EngineConfig::default();

    if let Some(capacity) = raw.store.capacity {
        if (constants::MIN_CAPACITY..=constants::ABSOLUTE_MAX_CAPACITY).contains(&capacity) {
            config.capacity = capacity;
        } else {
            warnings.push(format!(
                "[store] capacity = {capacity} is out of range ({}-{}). Using default ({}).",
                constants::MIN_CAPACITY,
                constants::ABSOLUTE_MAX_CAPACITY,
                constants::DEFAULT_CAPACITY,
            ));
        }
    }

    if let Some(top_n) = raw.stats.top_n {
        if (constants::MIN_TOP_N..=constants::MAX_TOP_N).contains(&top_n) {
            config.top_n = top_n;
        } else {
            warnings.push(format!(
                "[stats] top_n = {top_n} is out of range ({}-{}). Using default ({}).",
                constants::MIN_TOP_N,
                constants::MAX_TOP_N,
                constants::DEFAULT_TOP_N,
            ));
        }
    }

    if let Some(base) = raw.feed.reconnect_base_ms {
        if (constants::MIN_FEED_RECONNECT_DELAY_MS..=constants::MAX_FEED_RECONNECT_DELAY_MS)
            .contains(&base)
        {
            config.reconnect_base_ms = base;
        } else {
            warnings.push(format!(
                "[feed] reconnect_base_ms = {base} is out of range ({}-{}). Using default ({}).",
                constants::MIN_FEED_RECONNECT_DELAY_MS,
                constants::MAX_FEED_RECONNECT_DELAY_MS,
                constants::FEED_RECONNECT_BASE_DELAY_MS,
            ));
        }
    }

    if let Some(max) = raw.feed.reconnect_max_ms {
        if (constants::MIN_FEED_RECONNECT_DELAY_MS..=constants::MAX_FEED_RECONNECT_DELAY_MS)
            .contains(&max)
        {
            config.reconnect_max_ms = max;
        } else {
            warnings.push(format!(
                "[feed] reconnect_max_ms = {max} is out of range ({}-{}). Using default ({}).",
                constants::MIN_FEED_RECONNECT_DELAY_MS,
                constants::MAX_FEED_RECONNECT_DELAY_MS,
                constants::FEED_RECONNECT_MAX_DELAY_MS,
            ));
        }
    }

    if config.reconnect_max_ms < config.reconnect_base_ms {
        warnings.push(format!(
            "[feed] reconnect_max_ms ({}) is below reconnect_base_ms ({}). Raising to match.",
            config.reconnect_max_ms, config.reconnect_base_ms,
        ));
        config.reconnect_max_ms = config.reconnect_base_ms;
    }

    if let Some(level) = raw.logging.level {
        match level.to_lowercase().as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => {
                config.log_level = Some(level);
            }
            other => {
                warnings.push(format!(
                    "[logging] level = \"{other}\" is not recognised. \
                     Expected error, warn, info, debug, or trace. Using default.",
                ));
            }
        }
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate_str(toml_str: &str) -> (EngineConfig, Vec<String>) {
        let raw: RawConfig = toml::from_str(toml_str).unwrap();
        let mut warnings = Vec::new();
        let config = validate(raw, &mut warnings);
        (config, warnings)
    }

    #[test]
    fn test_empty_config_yields_defaults() {
        let (config, warnings) = validate_str("");
        assert!(warnings.is_empty());
        assert_eq!(config.capacity, constants::DEFAULT_CAPACITY);
        assert_eq!(config.top_n, constants::DEFAULT_TOP_N);
    }

    #[test]
    fn test_valid_values_are_applied() {
        let (config, warnings) = validate_str(
            "[store]\ncapacity = 500\n\n[stats]\ntop_n = 10\n\n[logging]\nlevel = \"debug\"\n",
        );
        assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
        assert_eq!(config.capacity, 500);
        assert_eq!(config.top_n, 10);
        assert_eq!(config.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_out_of_range_capacity_warns_and_defaults() {
        let (config, warnings) = validate_str("[store]\ncapacity = 0\n");
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("capacity"));
        assert_eq!(config.capacity, constants::DEFAULT_CAPACITY);
    }

    #[test]
    fn test_inverted_backoff_bounds_are_reconciled() {
        let (config, warnings) =
            validate_str("[feed]\nreconnect_base_ms = 1000\nreconnect_max_ms = 100\n");
        assert_eq!(warnings.len(), 1);
        assert_eq!(config.reconnect_max_ms, config.reconnect_base_ms);
    }

    #[test]
    fn test_unknown_log_level_warns() {
        let (config, warnings) = validate_str("[logging]\nlevel = \"verbose\"\n");
        assert_eq!(warnings.len(), 1);
        assert!(config.log_level.is_none());
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let (_, warnings) = validate_str("[store]\nfuture_knob = true\n");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let (config, warnings) =
            load_config(Path::new("/nonexistent/logvigil-test/logvigil.toml"));
        assert!(warnings.is_empty());
        assert_eq!(config.capacity, constants::DEFAULT_CAPACITY);
    }
}
