// logvigil - app/demo.rs
//
// Randomised in-process push source for demos and manual feed exercises.
// Produces records with the shape of a small security estate: a handful of
// sources, users, and addresses, per-level message pools, mostly-successful
// outcomes, and sub-second durations.

use crate::app::feed::{PushSource, SourcePoll};
use crate::core::model::{Level, LogRecord, Status};
use crate::util::constants;
use crate::util::error::FeedError;
use chrono::Utc;
use rand::Rng;
use std::time::{Duration, Instant};

const SOURCES: &[&str] = &["system", "auth", "network", "database", "application"];
const USERS: &[&str] = &["admin", "john.doe", "jane.smith", "guest"];
const IPS: &[&str] = &["192.168.1.100", "10.0.0.50", "172.16.0.25", "192.168.0.10"];

const INFO_MESSAGES: &[&str] = &[
    "User logged in successfully",
    "Configuration updated",
    "Backup completed",
    "Service started",
];
const WARN_MESSAGES: &[&str] = &[
    "High memory usage detected",
    "Slow query performance",
    "Rate limit approaching",
    "Certificate expiring soon",
];
const ERROR_MESSAGES: &[&str] = &[
    "Failed login attempt",
    "Database connection lost",
    "API request failed",
    "Permission denied",
];
const DEBUG_MESSAGES: &[&str] = &[
    "Cache hit ratio: 85%",
    "Request processing time: 150ms",
    "Connection pool status: 5/10",
    "Memory usage: 75%",
];

/// Push source emitting a random record every few seconds.
pub struct DemoSource {
    min_interval: Duration,
    max_interval: Duration,
    next_due: Instant,
}

impl DemoSource {
    pub fn new() -> Self {
        Self::with_interval(
            Duration::from_millis(constants::DEMO_MIN_INTERVAL_MS),
            Duration::from_millis(constants::DEMO_MAX_INTERVAL_MS),
        )
    }

    /// Emit interval bounds; each gap is drawn uniformly from the range.
    pub fn with_interval(min_interval: Duration, max_interval: Duration) -> Self {
        let max_interval = max_interval.max(min_interval);
        Self {
            min_interval,
            max_interval,
            next_due: Instant::now(),
        }
    }

    fn schedule_next(&mut self) {
        let span = (self.max_interval - self.min_interval).as_millis() as u64;
        let jitter = if span == 0 {
            0
        } else {
            rand::rng().random_range(0..=span)
        };
        self.next_due = Instant::now() + self.min_interval + Duration::from_millis(jitter);
    }
}

impl Default for DemoSource {
    fn default() -> Self {
        Self::new()
    }
}

impl PushSource for DemoSource {
    fn open(&mut self) -> Result<(), FeedError> {
        self.schedule_next();
        Ok(())
    }

    fn recv(&mut self, timeout: Duration) -> SourcePoll {
        let now = Instant::now();
        if now < self.next_due {
            std::thread::sleep(timeout.min(self.next_due - now));
            return SourcePoll::Idle;
        }
        self.schedule_next();
        SourcePoll::Record(generate_record())
    }
}

/// Build one randomised record.
fn generate_record() -> LogRecord {
    let mut rng = rand::rng();

    let level = match rng.random_range(0..4) {
        0 => Level::Info,
        1 => Level::Warn,
        2 => Level::Error,
        _ => Level::Debug,
    };
    let pool = match level {
        Level::Info => INFO_MESSAGES,
        Level::Warn => WARN_MESSAGES,
        Level::Error => ERROR_MESSAGES,
        Level::Debug => DEBUG_MESSAGES,
    };

    LogRecord {
        timestamp: Utc::now(),
        level,
        message: pool[rng.random_range(0..pool.len())].to_string(),
        source: Some(SOURCES[rng.random_range(0..SOURCES.len())].to_string()),
        user: Some(USERS[rng.random_range(0..USERS.len())].to_string()),
        ip: Some(IPS[rng.random_range(0..IPS.len())].to_string()),
        action: Some("system_event".to_string()),
        status: Some(if rng.random_bool(0.8) {
            Status::Success
        } else {
            Status::Failure
        }),
        duration: Some(rng.random_range(0..1000) as f64),
        metadata: None,
    }
}
