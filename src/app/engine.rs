// logvigil - app/engine.rs
//
// Engine orchestration: owns the bounded store and its aggregate stats
// behind one mutex, giving the single-writer discipline the data model
// requires — a bulk load and a pending live push can never interleave
// mid-mutation, and readers always observe a consistent point-in-time view.

use crate::app::config::EngineConfig;
use crate::app::feed::FeedConnection;
use crate::core::filter::{self, FilterCriteria};
use crate::core::model::LogRecord;
use crate::core::normalize;
use crate::core::stats::{LogStats, StatsSummary};
use crate::core::store::BoundedStore;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

/// Result of a bulk load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkLoadSummary {
    /// Records produced by the normaliser.
    pub parsed: usize,
    /// Records retained after capacity truncation.
    pub retained: usize,
}

struct EngineInner {
    store: BoundedStore,
    stats: LogStats,
    top_n: usize,
}

/// The ingestion and aggregation engine.
///
/// Mutations (bulk load, live push) and reads (snapshot, stats, filtered
/// views) all go through one internal lock; reads return owned values, so
/// no internal reference ever escapes.
pub struct Engine {
    inner: Mutex<EngineInner>,
}

impl Engine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            inner: Mutex::new(EngineInner {
                store: BoundedStore::new(config.capacity),
                stats: LogStats::empty(config.top_n),
                top_n: config.top_n,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, EngineInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Ingest raw bulk text: normalise, replace the store contents (first
    /// `capacity` records retained), and recompute stats from scratch.
    pub fn load_bulk(&self, content: &str) -> BulkLoadSummary {
        let records = normalize::normalize_bulk(content);
        let parsed = records.len();

        let mut inner = self.lock();
        inner.store.load_bulk(records);
        let recomputed = LogStats::recompute(inner.store.iter(), inner.top_n);
        inner.stats = recomputed;
        let retained = inner.store.len();
        drop(inner);

        tracing::info!(parsed, retained, "Bulk load complete");
        BulkLoadSummary { parsed, retained }
    }

    /// Ingest one live record: push into the store and update stats.
    ///
    /// While under capacity this is a pure O(1) increment. Once a push
    /// evicts the oldest record the stats are recomputed from the surviving
    /// window, keeping them equal to a from-scratch recompute over the
    /// current store contents at all times.
    pub fn push(&self, record: LogRecord) {
        let mut inner = self.lock();
        inner.stats.apply_increment(&record);
        let evicted = inner.store.push(record);
        if evicted.is_some() {
            let recomputed = LogStats::recompute(inner.store.iter(), inner.top_n);
            inner.stats = recomputed;
        }
    }

    /// Change the retention capacity; takes effect on the next mutation.
    pub fn set_capacity(&self, capacity: usize) {
        self.lock().store.set_capacity(capacity);
    }

    /// Owned copy of the current store contents in arrival order.
    pub fn snapshot(&self) -> Vec<LogRecord> {
        self.lock().store.snapshot()
    }

    /// Point-in-time aggregate statistics.
    pub fn stats(&self) -> StatsSummary {
        self.lock().stats.summary()
    }

    /// Records matching the criteria, in arrival order.
    pub fn filtered(&self, criteria: &FilterCriteria) -> Vec<LogRecord> {
        let inner = self.lock();
        filter::filter_view(&inner.store, criteria)
    }

    /// Subscribe this engine to a feed connection: every delivered record
    /// is pushed through [`push`](Self::push). The subscription holds only
    /// a weak handle, so dropping the engine stops ingestion without
    /// keeping it alive through the feed.
    pub fn attach(self: &Arc<Self>, feed: &FeedConnection) {
        let engine: Weak<Engine> = Arc::downgrade(self);
        feed.subscribe_records(move |record| {
            if let Some(engine) = engine.upgrade() {
                engine.push(record.clone());
            }
        });
    }
}
