// logvigil - app/feed.rs
//
// Live feed connection: a state machine over an abstract push source with
// observer registries for records and status transitions.
//
// Architecture:
//   - `FeedConnection` lives with its owner; `run_worker` runs on a
//     background thread driving the transport.
//   - An `AtomicBool` cancel flag plus a terminated marker under the
//     delivery lock let `terminate()` stop the worker idempotently.
//   - ALL observer callbacks (record delivery and status notification) run
//     under one delivery mutex, so no two callbacks ever execute
//     concurrently and arrival order is preserved exactly once per record.
//   - Reconnect backoff sleeps in small sub-intervals so cancellation is
//     observed within FEED_CANCEL_CHECK_INTERVAL_MS.
//
// Lifecycle: Disconnected -> Connecting -> Connected, with
// Connected -> Reconnecting -> Connected on transient loss, and any state
// -> Disconnected on terminate() or source close. Transitions are the only
// way status changes; a transition to the current state is a no-op and
// notifies nobody.

use crate::app::config::EngineConfig;
use crate::core::model::{FeedStatus, LogRecord};
use crate::util::constants;
use crate::util::error::FeedError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration;

// =============================================================================
// Transport abstraction
// =============================================================================

/// One poll result from a push-source transport.
pub enum SourcePoll {
    /// A record arrived.
    Record(LogRecord),
    /// Nothing arrived within the poll timeout.
    Idle,
    /// The transport dropped and should be reopened (transient loss).
    Lost(String),
    /// The transport ended and cannot be reopened.
    Closed,
}

/// Abstract push-source transport driven by the feed worker.
///
/// Implementations must honour the `recv` timeout: the worker checks for
/// termination between polls, so an implementation that blocks far beyond
/// the timeout delays `terminate()` by the same amount.
pub trait PushSource: Send + 'static {
    /// Establish (or re-establish) the transport.
    fn open(&mut self) -> Result<(), FeedError>;

    /// Wait up to `timeout` for the next transport event.
    fn recv(&mut self, timeout: Duration) -> SourcePoll;
}

// =============================================================================
// Observer registry (shared between owner and worker)
// =============================================================================

type RecordObserver = Box<dyn FnMut(&LogRecord) + Send>;
type StatusObserver = Box<dyn FnMut(FeedStatus) + Send>;

struct DeliveryState {
    status: FeedStatus,
    terminated: bool,
    record_observers: Vec<RecordObserver>,
    status_observers: Vec<StatusObserver>,
}

struct FeedShared {
    delivery: Mutex<DeliveryState>,
    cancel: AtomicBool,
}

impl FeedShared {
    fn lock(&self) -> MutexGuard<'_, DeliveryState> {
        // A panicking observer must not wedge the feed for every later call.
        self.delivery.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Move to `next`, synchronously notifying every status observer in
    /// registration order. No-op when terminated or already in `next`.
    fn transition(&self, next: FeedStatus) {
        let mut state = self.lock();
        if state.terminated || state.status == next {
            return;
        }
        tracing::debug!(from = %state.status, to = %next, "Feed status transition");
        state.status = next;
        for observer in state.status_observers.iter_mut() {
            observer(next);
        }
    }

    /// Deliver one record to every record observer in registration order.
    /// Dropped silently after termination.
    fn deliver(&self, record: &LogRecord) {
        let mut state = self.lock();
        if state.terminated {
            return;
        }
        for observer in state.record_observers.iter_mut() {
            observer(record);
        }
    }

    /// Interruptible sleep: wakes every FEED_CANCEL_CHECK_INTERVAL_MS to
    /// check the cancel flag. Returns false when cancelled.
    fn sleep_cancellable(&self, total_ms: u64) -> bool {
        let slice = constants::FEED_CANCEL_CHECK_INTERVAL_MS;
        let mut remaining = total_ms;
        while remaining > 0 {
            if self.cancelled() {
                return false;
            }
            let step = remaining.min(slice);
            std::thread::sleep(Duration::from_millis(step));
            remaining -= step;
        }
        !self.cancelled()
    }
}

// =============================================================================
// FeedConnection
// =============================================================================

/// Manages a live feed over an abstract push source.
///
/// Construction does not start anything: register observers first, then
/// call [`connect`](Self::connect). The initial state is `Disconnected`.
///
/// Observers must not call back into the connection (`terminate`,
/// `subscribe_*`) — delivery runs under the connection's own lock.
pub struct FeedConnection {
    shared: Arc<FeedShared>,
    source: Mutex<Option<Box<dyn PushSource>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    reconnect_base_ms: u64,
    reconnect_max_ms: u64,
}

impl FeedConnection {
    pub fn new(source: impl PushSource, config: &EngineConfig) -> Self {
        Self {
            shared: Arc::new(FeedShared {
                delivery: Mutex::new(DeliveryState {
                    status: FeedStatus::Disconnected,
                    terminated: false,
                    record_observers: Vec::new(),
                    status_observers: Vec::new(),
                }),
                cancel: AtomicBool::new(false),
            }),
            source: Mutex::new(Some(Box::new(source))),
            worker: Mutex::new(None),
            reconnect_base_ms: config.reconnect_base_ms,
            reconnect_max_ms: config.reconnect_max_ms,
        }
    }

    /// Register a record observer. Called exactly once per record, in
    /// arrival order, while the connection is live.
    pub fn subscribe_records(&self, observer: impl FnMut(&LogRecord) + Send + 'static) {
        self.shared.lock().record_observers.push(Box::new(observer));
    }

    /// Register a status observer. Called synchronously on every transition.
    pub fn subscribe_status(&self, observer: impl FnMut(FeedStatus) + Send + 'static) {
        self.shared.lock().status_observers.push(Box::new(observer));
    }

    /// Current connection status.
    pub fn status(&self) -> FeedStatus {
        self.shared.lock().status
    }

    /// Start the feed worker. Only the first call has any effect; the
    /// worker drives Connecting -> Connected and keeps polling until the
    /// source closes or the connection is terminated.
    pub fn connect(&self) {
        let source = match self.source.lock().unwrap_or_else(|e| e.into_inner()).take() {
            Some(s) => s,
            None => {
                tracing::warn!("Feed connect called twice or after terminate; ignoring");
                return;
            }
        };

        let shared = Arc::clone(&self.shared);
        let base = self.reconnect_base_ms;
        let max = self.reconnect_max_ms;
        let handle = std::thread::spawn(move || {
            run_worker(source, shared, base, max);
        });
        *self.worker.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
        tracing::info!("Feed connection starting");
    }

    /// Terminate the connection, idempotently.
    ///
    /// Performs at most one transition to `Disconnected` (none if already
    /// there), stops the worker and its timers, and joins the worker
    /// thread. After this returns no observer callback will ever fire.
    pub fn terminate(&self) {
        {
            let mut state = self.shared.lock();
            if !state.terminated {
                if state.status != FeedStatus::Disconnected {
                    tracing::debug!(from = %state.status, "Feed terminate: final transition");
                    state.status = FeedStatus::Disconnected;
                    for observer in state.status_observers.iter_mut() {
                        observer(FeedStatus::Disconnected);
                    }
                }
                state.terminated = true;
            }
        }
        self.shared.cancel.store(true, Ordering::SeqCst);
        // Drop the unstarted source, if connect() was never called.
        self.source.lock().unwrap_or_else(|e| e.into_inner()).take();
        let handle = self.worker.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = handle {
            let _ = handle.join();
            tracing::info!("Feed connection terminated");
        }
    }
}

impl Drop for FeedConnection {
    fn drop(&mut self) {
        self.terminate();
    }
}

// =============================================================================
// Background worker
// =============================================================================

fn run_worker(mut source: Box<dyn PushSource>, shared: Arc<FeedShared>, base_ms: u64, max_ms: u64) {
    let recv_timeout = Duration::from_millis(constants::FEED_CANCEL_CHECK_INTERVAL_MS);

    shared.transition(FeedStatus::Connecting);
    if !open_with_backoff(source.as_mut(), &shared, base_ms, max_ms) {
        return;
    }
    shared.transition(FeedStatus::Connected);

    loop {
        if shared.cancelled() {
            return;
        }
        match source.recv(recv_timeout) {
            SourcePoll::Record(record) => shared.deliver(&record),
            SourcePoll::Idle => {}
            SourcePoll::Lost(reason) => {
                tracing::warn!(reason = %reason, "Feed connection lost");
                shared.transition(FeedStatus::Reconnecting);
                if !open_with_backoff(source.as_mut(), &shared, base_ms, max_ms) {
                    return;
                }
                shared.transition(FeedStatus::Connected);
            }
            SourcePoll::Closed => {
                tracing::info!("Feed source closed");
                shared.transition(FeedStatus::Disconnected);
                return;
            }
        }
    }
}

/// Attempt to open the source, retrying with exponential backoff until it
/// succeeds or the connection is cancelled. Returns false when cancelled.
fn open_with_backoff(
    source: &mut dyn PushSource,
    shared: &FeedShared,
    base_ms: u64,
    max_ms: u64,
) -> bool {
    let mut delay = base_ms;
    loop {
        if shared.cancelled() {
            return false;
        }
        match source.open() {
            Ok(()) => return true,
            Err(e) => {
                tracing::warn!(error = %e, retry_in_ms = delay, "Feed open failed; backing off");
                if !shared.sleep_cancellable(delay) {
                    return false;
                }
                delay = delay.saturating_mul(2).min(max_ms);
            }
        }
    }
}

// =============================================================================
// Channel-backed source
// =============================================================================

/// Control messages accepted by a [`ChannelSource`].
enum SourceCommand {
    Push(LogRecord),
    Interrupt(String),
    Close,
}

/// Injection handle paired with a [`ChannelSource`]. Cloneable; usable from
/// any thread.
#[derive(Clone)]
pub struct ChannelSourceHandle {
    tx: mpsc::Sender<SourceCommand>,
}

impl ChannelSourceHandle {
    /// Inject one record. Returns false when the source is gone.
    pub fn push(&self, record: LogRecord) -> bool {
        self.tx.send(SourceCommand::Push(record)).is_ok()
    }

    /// Simulate a transient transport loss.
    pub fn interrupt(&self, reason: &str) -> bool {
        self.tx
            .send(SourceCommand::Interrupt(reason.to_string()))
            .is_ok()
    }

    /// End the source permanently.
    pub fn close(&self) -> bool {
        self.tx.send(SourceCommand::Close).is_ok()
    }
}

/// A [`PushSource`] fed through an in-process channel.
///
/// The generic bridge between any event producer and the feed worker: a
/// real transport pushes decoded records through the handle from its own
/// thread. Also the workhorse of the lifecycle tests.
pub struct ChannelSource {
    rx: mpsc::Receiver<SourceCommand>,
}

/// Create a connected handle/source pair.
pub fn channel_source() -> (ChannelSourceHandle, ChannelSource) {
    let (tx, rx) = mpsc::channel();
    (ChannelSourceHandle { tx }, ChannelSource { rx })
}

impl PushSource for ChannelSource {
    fn open(&mut self) -> Result<(), FeedError> {
        Ok(())
    }

    fn recv(&mut self, timeout: Duration) -> SourcePoll {
        match self.rx.recv_timeout(timeout) {
            Ok(SourceCommand::Push(record)) => SourcePoll::Record(record),
            Ok(SourceCommand::Interrupt(reason)) => SourcePoll::Lost(reason),
            Ok(SourceCommand::Close) => SourcePoll::Closed,
            Err(mpsc::RecvTimeoutError::Timeout) => SourcePoll::Idle,
            Err(mpsc::RecvTimeoutError::Disconnected) => SourcePoll::Closed,
        }
    }
}
