// logvigil - core/stats.rs
//
// Derived aggregate statistics over the record stream.
//
// The full-recompute path (bulk load) and the incremental path (live push)
// are both generated from ONE fold step, `observe`: recompute is a fold of
// `observe` from the empty value, and an increment is a single `observe`
// call. Equivalence between the two paths is therefore structural — there
// is no second hand-written implementation to drift.

use crate::core::model::{Level, LogRecord};
use crate::util::constants;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::HashMap;

// =============================================================================
// Entity ranking
// =============================================================================

/// One ranked entity (user, IP, rule name) with its occurrence count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityCount {
    pub name: String,
    pub count: u64,
}

#[derive(Debug, Clone, Copy)]
struct EntityEntry {
    count: u64,
    /// Monotonic sequence assigned on first observation; ties in count are
    /// broken in favour of the entity seen first.
    first_seen: u64,
}

/// Occurrence counter with a bounded top-N ranking.
///
/// Keeps the full entity -> count map plus a small sorted leader list that
/// is updated in place on every observation. Counts only ever grow by one,
/// so only the observed entity's rank can improve — maintaining the leader
/// list costs O(N log N) with N = top width, independent of how many
/// distinct entities exist.
#[derive(Debug, Clone)]
pub(crate) struct RankedCounter {
    counts: HashMap<String, EntityEntry>,
    top: Vec<String>,
    top_n: usize,
    next_seen: u64,
}

impl RankedCounter {
    pub(crate) fn new(top_n: usize) -> Self {
        Self {
            counts: HashMap::new(),
            top: Vec::with_capacity(top_n),
            top_n,
            next_seen: 0,
        }
    }

    pub(crate) fn observe(&mut self, name: &str) {
        let entry = match self.counts.get_mut(name) {
            Some(e) => {
                e.count += 1;
                *e
            }
            None => {
                let e = EntityEntry {
                    count: 1,
                    first_seen: self.next_seen,
                };
                self.next_seen += 1;
                self.counts.insert(name.to_owned(), e);
                e
            }
        };
        self.promote(name, entry);
    }

    /// Re-establish the leader list after `name` gained a count.
    fn promote(&mut self, name: &str, entry: EntityEntry) {
        if self.top_n == 0 {
            return;
        }
        if self.top.iter().any(|t| t == name) {
            self.resort();
            return;
        }
        if self.top.len() < self.top_n {
            self.top.push(name.to_owned());
            self.resort();
            return;
        }
        // The leader list is sorted, so the weakest member is last.
        let weakest = &self.top[self.top.len() - 1];
        let w = self.counts[weakest];
        if entry.count > w.count || (entry.count == w.count && entry.first_seen < w.first_seen) {
            let last = self.top.len() - 1;
            self.top[last] = name.to_owned();
            self.resort();
        }
    }

    fn resort(&mut self) {
        let counts = &self.counts;
        self.top
            .sort_by_key(|name| (Reverse(counts[name].count), counts[name].first_seen));
    }

    /// Current leaders: count descending, first-seen order among ties.
    pub(crate) fn leaders(&self) -> Vec<EntityCount> {
        self.top
            .iter()
            .map(|name| EntityCount {
                name: name.clone(),
                count: self.counts[name].count,
            })
            .collect()
    }
}

// =============================================================================
// Aggregate statistics
// =============================================================================

/// Aggregate statistics over a record sequence.
///
/// Derived, never independently authoritative: at any time the value must
/// equal a fresh `recompute` over the records it has observed.
#[derive(Debug, Clone)]
pub struct LogStats {
    total_entries: u64,
    error_count: u64,
    warn_count: u64,
    info_count: u64,
    debug_count: u64,
    failed_logins: u64,
    duration_sum: f64,
    duration_count: u64,
    users: RankedCounter,
    ips: RankedCounter,
}

impl LogStats {
    /// The empty value of the fold.
    pub fn empty(top_n: usize) -> Self {
        Self {
            total_entries: 0,
            error_count: 0,
            warn_count: 0,
            info_count: 0,
            debug_count: 0,
            failed_logins: 0,
            duration_sum: 0.0,
            duration_count: 0,
            users: RankedCounter::new(top_n),
            ips: RankedCounter::new(top_n),
        }
    }

    /// The single fold step. Every aggregation path goes through here.
    pub fn observe(&mut self, record: &LogRecord) {
        self.total_entries += 1;
        match record.level {
            Level::Error => self.error_count += 1,
            Level::Warn => self.warn_count += 1,
            Level::Info => self.info_count += 1,
            Level::Debug => self.debug_count += 1,
        }
        if record
            .message
            .to_lowercase()
            .contains(constants::FAILED_LOGIN_NEEDLE)
        {
            self.failed_logins += 1;
        }
        if let Some(d) = record.duration {
            self.duration_sum += d;
            self.duration_count += 1;
        }
        if let Some(user) = &record.user {
            self.users.observe(user);
        }
        if let Some(ip) = &record.ip {
            self.ips.observe(ip);
        }
    }

    /// O(n) full pass: fold `observe` over the records from the empty value.
    pub fn recompute<'a, I>(records: I, top_n: usize) -> Self
    where
        I: IntoIterator<Item = &'a LogRecord>,
    {
        let mut stats = Self::empty(top_n);
        for record in records {
            stats.observe(record);
        }
        stats
    }

    /// O(1) update reflecting one additional record. Identical to a single
    /// fold step by construction.
    pub fn apply_increment(&mut self, record: &LogRecord) {
        self.observe(record);
    }

    pub fn total_entries(&self) -> u64 {
        self.total_entries
    }

    /// Mean duration over records that carried one; 0 when none did.
    pub fn avg_response_time(&self) -> f64 {
        if self.duration_count == 0 {
            0.0
        } else {
            self.duration_sum / self.duration_count as f64
        }
    }

    pub fn top_users(&self) -> Vec<EntityCount> {
        self.users.leaders()
    }

    pub fn top_ips(&self) -> Vec<EntityCount> {
        self.ips.leaders()
    }

    /// Value snapshot for presentation and serialisation.
    pub fn summary(&self) -> StatsSummary {
        StatsSummary {
            total_entries: self.total_entries,
            error_count: self.error_count,
            warn_count: self.warn_count,
            info_count: self.info_count,
            debug_count: self.debug_count,
            failed_logins: self.failed_logins,
            avg_response_time: self.avg_response_time(),
            top_users: self.top_users(),
            top_ips: self.top_ips(),
        }
    }
}

impl Default for LogStats {
    fn default() -> Self {
        Self::empty(constants::DEFAULT_TOP_N)
    }
}

/// Serialisable point-in-time view of [`LogStats`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSummary {
    pub total_entries: u64,
    pub error_count: u64,
    pub warn_count: u64,
    pub info_count: u64,
    pub debug_count: u64,
    pub failed_logins: u64,
    pub avg_response_time: f64,
    pub top_users: Vec<EntityCount>,
    pub top_ips: Vec<EntityCount>,
}

// =============================================================================
// Hourly histogram
// =============================================================================

/// Event counts over the trailing `HISTOGRAM_HOURS` one-hour windows ending
/// at `now`, oldest bucket first. Buckets are true instant ranges, so runs
/// spanning midnight attribute events to the correct window.
pub fn hourly_counts(records: &[LogRecord], now: DateTime<Utc>) -> Vec<u64> {
    let mut buckets = vec![0u64; constants::HISTOGRAM_HOURS];
    let window = Duration::hours(constants::HISTOGRAM_HOURS as i64);
    for record in records {
        if record.timestamp > now || record.timestamp <= now - window {
            continue;
        }
        let age_secs = (now - record.timestamp).num_seconds();
        let hours_back = (age_secs / 3600) as usize;
        let idx = constants::HISTOGRAM_HOURS - 1 - hours_back;
        buckets[idx] += 1;
    }
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::LogRecord;
    use chrono::TimeZone;

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap()
    }

    fn record(level: Level, message: &str) -> LogRecord {
        LogRecord {
            timestamp: base_time(),
            level,
            message: message.to_string(),
            source: None,
            user: None,
            ip: None,
            action: None,
            status: None,
            duration: None,
            metadata: None,
        }
    }

    fn with_user(mut r: LogRecord, user: &str) -> LogRecord {
        r.user = Some(user.to_string());
        r
    }

    fn with_ip(mut r: LogRecord, ip: &str) -> LogRecord {
        r.ip = Some(ip.to_string());
        r
    }

    fn with_duration(mut r: LogRecord, d: f64) -> LogRecord {
        r.duration = Some(d);
        r
    }

    // -------------------------------------------------------------------------
    // Concrete scenario from the dashboard behaviour
    // -------------------------------------------------------------------------

    #[test]
    fn test_counts_and_average_duration() {
        let records = vec![
            with_duration(record(Level::Error, "a"), 100.0),
            with_duration(record(Level::Info, "b"), 200.0),
            record(Level::Error, "c"),
        ];
        let stats = LogStats::recompute(&records, 5);
        let s = stats.summary();
        assert_eq!(s.error_count, 2);
        assert_eq!(s.info_count, 1);
        assert_eq!(s.total_entries, 3);
        assert_eq!(s.avg_response_time, 150.0);
    }

    #[test]
    fn test_zero_duration_counts_toward_average() {
        // Some(0.0) is a measurement; only None is excluded.
        let records = vec![
            with_duration(record(Level::Info, "a"), 0.0),
            with_duration(record(Level::Info, "b"), 100.0),
        ];
        assert_eq!(LogStats::recompute(&records, 5).avg_response_time(), 50.0);
    }

    #[test]
    fn test_avg_is_zero_with_no_measured_durations() {
        let records = vec![record(Level::Info, "a")];
        assert_eq!(LogStats::recompute(&records, 5).avg_response_time(), 0.0);
    }

    #[test]
    fn test_failed_logins_case_insensitive_substring() {
        let records = vec![
            record(Level::Error, "FAILED LOGIN for admin"),
            record(Level::Warn, "three Failed Login attempts"),
            record(Level::Info, "login ok"),
        ];
        assert_eq!(LogStats::recompute(&records, 5).summary().failed_logins, 2);
    }

    // -------------------------------------------------------------------------
    // Recompute / incremental equivalence
    // -------------------------------------------------------------------------

    /// Build a varied sequence and check that folding apply_increment from
    /// the empty value matches recompute on every field, including top-N
    /// rankings and the average.
    #[test]
    fn test_incremental_fold_equals_recompute() {
        let mut records = Vec::new();
        let levels = [Level::Error, Level::Warn, Level::Info, Level::Debug];
        let users = ["admin", "john.doe", "jane.smith", "guest", "root", "svc"];
        let ips = ["10.0.0.1", "10.0.0.2", "192.168.1.5"];
        for i in 0..200usize {
            let mut r = record(levels[i % 4], if i % 7 == 0 { "failed login" } else { "ok" });
            if i % 3 != 0 {
                r = with_user(r, users[i % users.len()]);
            }
            if i % 2 == 0 {
                r = with_ip(r, ips[i % ips.len()]);
            }
            if i % 5 != 4 {
                r = with_duration(r, (i % 13) as f64 * 10.0);
            }
            records.push(r);
        }

        let full = LogStats::recompute(&records, 5);
        let mut folded = LogStats::empty(5);
        for r in &records {
            folded.apply_increment(r);
        }
        assert_eq!(full.summary(), folded.summary());
    }

    // -------------------------------------------------------------------------
    // Top-N ranking
    // -------------------------------------------------------------------------

    #[test]
    fn test_top_users_ranked_by_count() {
        let mut stats = LogStats::empty(2);
        for user in ["a", "b", "b", "c", "c", "c"] {
            stats.observe(&with_user(record(Level::Info, "m"), user));
        }
        let top = stats.top_users();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0], EntityCount { name: "c".into(), count: 3 });
        assert_eq!(top[1], EntityCount { name: "b".into(), count: 2 });
    }

    #[test]
    fn test_top_n_tie_broken_by_first_seen() {
        let mut stats = LogStats::empty(2);
        // Three entities, all with count 1: the two seen first win.
        for ip in ["1.1.1.1", "2.2.2.2", "3.3.3.3"] {
            stats.observe(&with_ip(record(Level::Info, "m"), ip));
        }
        let top = stats.top_ips();
        let names: Vec<_> = top.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["1.1.1.1", "2.2.2.2"]);
    }

    #[test]
    fn test_late_entity_displaces_weakest_leader() {
        let mut stats = LogStats::empty(2);
        for user in ["a", "b", "c", "c"] {
            stats.observe(&with_user(record(Level::Info, "m"), user));
        }
        // c (count 2) must displace b; a (first seen, count 1) stays.
        let names: Vec<_> = stats.top_users().iter().map(|e| e.name.clone()).collect();
        assert_eq!(names, vec!["c", "a"]);
    }

    #[test]
    fn test_records_without_entities_do_not_rank() {
        let stats = LogStats::recompute(&[record(Level::Info, "m")], 5);
        assert!(stats.top_users().is_empty());
        assert!(stats.top_ips().is_empty());
    }

    // -------------------------------------------------------------------------
    // Hourly histogram
    // -------------------------------------------------------------------------

    #[test]
    fn test_hourly_counts_buckets_by_instant_range() {
        let now = base_time();
        let mut records = Vec::new();
        // 30 minutes ago -> newest bucket.
        let mut r = record(Level::Info, "recent");
        r.timestamp = now - Duration::minutes(30);
        records.push(r);
        // 11.5 hours ago -> oldest bucket.
        let mut r = record(Level::Info, "old");
        r.timestamp = now - Duration::minutes(11 * 60 + 30);
        records.push(r);
        // 13 hours ago -> outside the window.
        let mut r = record(Level::Info, "too old");
        r.timestamp = now - Duration::hours(13);
        records.push(r);

        let buckets = hourly_counts(&records, now);
        assert_eq!(buckets.len(), constants::HISTOGRAM_HOURS);
        assert_eq!(buckets[constants::HISTOGRAM_HOURS - 1], 1);
        assert_eq!(buckets[0], 1);
        assert_eq!(buckets.iter().sum::<u64>(), 2);
    }

    #[test]
    fn test_hourly_counts_spanning_midnight() {
        // 02:00 "now" with an event at 23:30 the previous day: 2.5 h back,
        // which lands three buckets from the end — not conflated with a
        // same-hour event from the current day.
        let now = Utc.with_ymd_and_hms(2024, 1, 16, 2, 0, 0).unwrap();
        let mut r = record(Level::Info, "late night");
        r.timestamp = Utc.with_ymd_and_hms(2024, 1, 15, 23, 30, 0).unwrap();
        let buckets = hourly_counts(&[r], now);
        assert_eq!(buckets[constants::HISTOGRAM_HOURS - 3], 1);
        assert_eq!(buckets.iter().sum::<u64>(), 1);
    }

    #[test]
    fn test_event_exactly_at_now_is_counted() {
        let now = base_time();
        let r = record(Level::Info, "now");
        let buckets = hourly_counts(&[r], now);
        assert_eq!(buckets[constants::HISTOGRAM_HOURS - 1], 1);
    }
}
