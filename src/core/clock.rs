//! Shared hardware frame clock abstraction.
//!
//! The rotator manager multiplexes all animations onto a single clock
//! subscription. [`ThreadClock`] is the production implementation: one named
//! worker thread per subscription, firing at a fixed cadence. [`ManualClock`]
//! is a deterministic clock for tests and headless operation, driven by
//! explicit [`ManualClock::fire`] calls.
//!
//! Unsubscribing is synchronous: once `unsubscribe` returns, no further
//! callback invocation is in flight, so subscribers may safely free state
//! the callback captured.

use crate::core::ScheduleError;
use log::{debug, warn};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

static MONOTONIC_BASE: Lazy<Instant> = Lazy::new(Instant::now);

/// Monotonic timestamp since process start, the time domain of all tick
/// callbacks.
pub fn monotonic_time() -> Duration {
    MONOTONIC_BASE.elapsed()
}

/// Callback invoked once per clock tick with a monotonic timestamp.
pub type TickCallback = Box<dyn Fn(Duration) + Send + 'static>;

/// Handle to an active clock subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// A shared periodic clock source.
pub trait FrameClock: Send + Sync {
    /// Subscribe a callback fired once per tick. Creating the underlying
    /// timer resource can fail (platform resource exhaustion); callers
    /// degrade to unanimated and may retry later.
    fn subscribe(&self, callback: TickCallback) -> Result<SubscriptionId, ScheduleError>;

    /// Tear down a subscription. Blocks until any in-flight callback has
    /// completed; after this returns the callback will never run again.
    fn unsubscribe(&self, id: SubscriptionId);

    /// Current time in the clock's tick timestamp domain. Subscribers use
    /// this to baseline elapsed-time tracking when they start listening.
    fn now(&self) -> Duration;
}

struct ClockWorker {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Production clock: a worker thread per subscription ticking at a fixed
/// interval.
pub struct ThreadClock {
    interval: Duration,
    next_id: AtomicU64,
    workers: Mutex<HashMap<SubscriptionId, ClockWorker>>,
}

impl ThreadClock {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_id: AtomicU64::new(0),
            workers: Mutex::new(HashMap::new()),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl FrameClock for ThreadClock {
    fn subscribe(&self, callback: TickCallback) -> Result<SubscriptionId, ScheduleError> {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();
        let interval = self.interval;

        let handle = std::thread::Builder::new()
            .name(format!("rotabar-clock-{}", id.0))
            .spawn(move || {
                let mut next = Instant::now() + interval;
                loop {
                    let now = Instant::now();
                    if next > now {
                        std::thread::sleep(next - now);
                    }
                    next += interval;
                    if stop_flag.load(Ordering::Acquire) {
                        break;
                    }
                    callback(monotonic_time());
                }
                debug!("clock worker {} exiting", id.0);
            })
            .map_err(|e| ScheduleError::ClockUnavailable(e.to_string()))?;

        let mut workers = match self.workers.lock() {
            Ok(workers) => workers,
            Err(_) => {
                // Do not leak the just-spawned worker.
                stop.store(true, Ordering::Release);
                let _ = handle.join();
                return Err(ScheduleError::ClockUnavailable(
                    "clock registry poisoned".into(),
                ));
            }
        };
        workers.insert(id, ClockWorker { stop, handle });
        debug!("clock subscription {} created ({:?} interval)", id.0, interval);
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        let worker = match self.workers.lock() {
            Ok(mut workers) => workers.remove(&id),
            Err(_) => None,
        };
        if let Some(worker) = worker {
            worker.stop.store(true, Ordering::Release);
            if worker.handle.join().is_err() {
                warn!("clock worker {} panicked during teardown", id.0);
            }
            debug!("clock subscription {} torn down", id.0);
        }
    }

    fn now(&self) -> Duration {
        monotonic_time()
    }
}

/// Deterministic clock for tests and headless operation. Ticks are driven
/// by [`ManualClock::fire`], which invokes every subscriber inline while
/// holding the subscriber table lock, giving the same "no callback after
/// unsubscribe returns" guarantee as the threaded clock.
#[derive(Default)]
pub struct ManualClock {
    next_id: AtomicU64,
    subscribers: Mutex<HashMap<SubscriptionId, TickCallback>>,
    total_subscriptions: AtomicU64,
    fail_next: AtomicBool,
    now: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drive one tick through every subscriber, advancing the clock's
    /// current time to `timestamp`.
    pub fn fire(&self, timestamp: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now = timestamp;
        }
        if let Ok(subscribers) = self.subscribers.lock() {
            for callback in subscribers.values() {
                callback(timestamp);
            }
        }
    }

    /// Move the clock's current time without firing a tick.
    pub fn set_now(&self, timestamp: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now = timestamp;
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().map(|s| s.len()).unwrap_or(0)
    }

    /// Total subscriptions ever created, for asserting that subscription
    /// transitions happen exactly once.
    pub fn total_subscriptions(&self) -> u64 {
        self.total_subscriptions.load(Ordering::Relaxed)
    }

    /// Make the next `subscribe` call fail, simulating platform resource
    /// exhaustion.
    pub fn fail_next_subscribe(&self) {
        self.fail_next.store(true, Ordering::Release);
    }
}

impl FrameClock for ManualClock {
    fn subscribe(&self, callback: TickCallback) -> Result<SubscriptionId, ScheduleError> {
        if self.fail_next.swap(false, Ordering::AcqRel) {
            return Err(ScheduleError::ClockUnavailable(
                "simulated resource exhaustion".into(),
            ));
        }
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.insert(id, callback);
        }
        self.total_subscriptions.fetch_add(1, Ordering::Relaxed);
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.remove(&id);
        }
    }

    fn now(&self) -> Duration {
        self.now.lock().map(|now| *now).unwrap_or(Duration::ZERO)
    }
}
