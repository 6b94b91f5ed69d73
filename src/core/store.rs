// logvigil - core/store.rs
//
// Bounded log store: ordered, capacity-limited collection of canonical
// records. Single source of truth for the current visible history.
//
// Retention is a sliding window over arrival order — FIFO eviction, not an
// LRU cache, since recency of arrival is the only signal. Records are never
// edited after insertion; the only deletion path is capacity pressure.

use crate::core::model::LogRecord;
use crate::util::constants;
use std::collections::VecDeque;

/// Ordered, capacity-limited record collection.
///
/// Arrival order runs front (oldest) to back (newest); `push` and eviction
/// are both O(1). A capacity change takes effect on the next mutating
/// operation rather than retroactively, so concurrent readers never observe
/// a store shrinking mid-read.
#[derive(Debug, Clone)]
pub struct BoundedStore {
    records: VecDeque<LogRecord>,
    capacity: usize,
}

impl BoundedStore {
    /// Create an empty store with the given capacity (clamped to at least
    /// `MIN_CAPACITY`).
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::new(),
            capacity: capacity.max(constants::MIN_CAPACITY),
        }
    }

    /// Current configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Change the retention capacity. Enforced on the next mutating call.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(constants::MIN_CAPACITY);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate records in arrival order (oldest first).
    pub fn iter(&self) -> impl Iterator<Item = &LogRecord> {
        self.records.iter()
    }

    /// Replace store contents with the given sequence, keeping the first
    /// `capacity` records in the given order.
    pub fn load_bulk(&mut self, records: Vec<LogRecord>) {
        self.records = records.into_iter().take(self.capacity).collect();
    }

    /// Insert a record as newest. Returns the evicted oldest record when
    /// the store was at capacity. O(1) amortised.
    pub fn push(&mut self, record: LogRecord) -> Option<LogRecord> {
        self.records.push_back(record);
        let mut evicted = None;
        while self.records.len() > self.capacity {
            evicted = self.records.pop_front();
        }
        evicted
    }

    /// Owned copy of the current contents in arrival order. Internal state
    /// is never exposed by reference, so callers cannot mutate the store.
    pub fn snapshot(&self) -> Vec<LogRecord> {
        self.records.iter().cloned().collect()
    }
}

impl Default for BoundedStore {
    fn default() -> Self {
        Self::new(constants::DEFAULT_CAPACITY)
    }
}
