//! Rotator registry driven by a single shared frame clock.
//!
//! A rotator is one periodic animation task: an angle, a rate and an update
//! function, bound to the [`ItemId`] of the bar item that owns it. The
//! [`RotatorManager`] owns the whole collection plus the one clock
//! subscription that drives it, creating the subscription when the first
//! rotator is enabled and tearing it down when the last one is disabled.
//!
//! Ticks cross threads as messages: the clock callback posts a [`TickEvent`]
//! into a bounded queue with a non-blocking send and the bar's own loop
//! drains the queue and calls [`RotatorManager::on_tick`]. The clock thread
//! therefore never waits on rotator state. A dropped tick (full queue) or a
//! skipped rotator (contended lock) self-heals on the next tick.

use crate::core::clock::{FrameClock, SubscriptionId};
use crate::core::constants::{ANGLE_EPSILON, TICK_QUEUE_CAPACITY};
use crate::core::ScheduleError;
use crossbeam::channel::{bounded, Receiver, Sender};
use log::{debug, info, trace, warn};
use rotabar_types::{ItemId, RotatorId};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Wrap an angle in degrees into [0, 360).
pub fn wrap_angle(angle: f64) -> f64 {
    let wrapped = angle % 360.0;
    if wrapped < 0.0 {
        wrapped + 360.0
    } else {
        wrapped
    }
}

/// One tick of the shared clock, as queued for the drain loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickEvent {
    pub timestamp: Duration,
}

/// Mutable per-rotator state, guarded by the rotator's mutex.
pub struct RotatorState {
    /// Current angle in degrees, always in [0, 360).
    pub angle: f64,
    /// Rotation rate in degrees per second; 0 means parked.
    pub rate: f64,
    last_tick: Duration,
}

impl RotatorState {
    /// Elapsed time since the previous tick, derived from consecutive
    /// timestamps rather than an assumed fixed cadence. Out-of-order
    /// timestamps yield a zero delta.
    fn elapsed_since_last(&mut self, timestamp: Duration) -> Duration {
        let previous = std::mem::replace(&mut self.last_tick, timestamp);
        timestamp.saturating_sub(previous)
    }
}

/// Per-tick update function. Runs under the rotator's lock with the elapsed
/// time since the previous tick; returns whether a visual change occurred.
pub type UpdateFn = Box<dyn FnMut(&mut RotatorState, Duration) -> bool + Send>;

/// The stock update function: advance the angle by `rate * dt`, wrap into
/// [0, 360) and report whether the visible angle moved more than
/// [`ANGLE_EPSILON`].
pub fn spin(state: &mut RotatorState, dt: Duration) -> bool {
    let before = state.angle;
    state.angle = wrap_angle(state.angle + state.rate * dt.as_secs_f64());
    (state.angle - before).abs() > ANGLE_EPSILON
}

struct RotatorInner {
    state: RotatorState,
    update_fn: UpdateFn,
}

/// A single periodic animation task bound to a target item.
pub struct Rotator {
    target: ItemId,
    enabled: bool,
    inner: Mutex<RotatorInner>,
}

impl Rotator {
    pub fn new(target: ItemId, init_angle: f64, rate: f64, update_fn: UpdateFn) -> Self {
        Self {
            target,
            enabled: false,
            inner: Mutex::new(RotatorInner {
                state: RotatorState {
                    angle: wrap_angle(init_angle),
                    rate,
                    last_tick: Duration::ZERO,
                },
                update_fn,
            }),
        }
    }

    /// A rotator with the stock [`spin`] update function.
    pub fn spinning(target: ItemId, rate: f64) -> Self {
        Self::new(target, 0.0, rate, Box::new(spin))
    }

    pub fn target(&self) -> ItemId {
        self.target
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// Point-in-time view of a rotator for diagnostic dumps.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RotatorSnapshot {
    pub angle: f64,
    pub rate: f64,
    pub enabled: bool,
}

/// Result of driving one clock tick through every enabled rotator.
#[derive(Debug, Default, Clone)]
pub struct TickOutcome {
    /// Whether any rotator reported a visual change (logical OR across all).
    pub changed: bool,
    /// Targets of the rotators that changed this tick.
    pub changed_items: Vec<ItemId>,
}

/// Owns the rotator collection and the single shared clock subscription.
///
/// Explicitly constructed and explicitly owned; independent instances (each
/// with their own clock) can coexist, which the tests rely on. All mutating
/// operations happen on the configuration side; the clock thread only ever
/// posts tick events.
pub struct RotatorManager {
    clock: Arc<dyn FrameClock>,
    rotators: HashMap<RotatorId, Rotator>,
    enabled_count: usize,
    subscription: Option<SubscriptionId>,
    tick_tx: Sender<TickEvent>,
    tick_rx: Receiver<TickEvent>,
    tick_count: AtomicU64,
}

impl RotatorManager {
    pub fn new(clock: Arc<dyn FrameClock>) -> Self {
        let (tick_tx, tick_rx) = bounded(TICK_QUEUE_CAPACITY);
        Self {
            clock,
            rotators: HashMap::new(),
            enabled_count: 0,
            subscription: None,
            tick_tx,
            tick_rx,
            tick_count: AtomicU64::new(0),
        }
    }

    /// Receiver end of the tick queue. The bar's loop drains this and feeds
    /// each event to [`RotatorManager::on_tick`].
    pub fn tick_events(&self) -> Receiver<TickEvent> {
        self.tick_rx.clone()
    }

    /// Add a rotator to the set. Rotators start disabled, so registration by
    /// itself never creates the clock subscription.
    pub fn register(&mut self, rotator: Rotator) -> RotatorId {
        let id = RotatorId::new();
        debug!("registering rotator {id} for item {}", rotator.target);
        self.rotators.insert(id, rotator);
        self.recount();
        id
    }

    /// Stop and remove a rotator. Tears down the subscription if this was
    /// the last enabled one.
    pub fn unregister(&mut self, id: RotatorId) {
        if self.rotators.remove(&id).is_some() {
            debug!("unregistered rotator {id}");
            self.recount();
            if self.enabled_count == 0 {
                self.teardown_subscription();
            }
        }
    }

    /// Mark a rotator as driven by the clock. On the 0 -> 1 enabled
    /// transition this creates the shared subscription; a subscription
    /// failure leaves the rotator registered but untick'd, and the next
    /// `enable` retries.
    pub fn enable(&mut self, id: RotatorId) -> Result<(), ScheduleError> {
        let now = self.clock.now();
        let rotator = self
            .rotators
            .get_mut(&id)
            .ok_or(ScheduleError::UnknownRotator(id))?;
        if !rotator.enabled {
            // Re-baseline elapsed-time tracking so the first tick after
            // enabling advances from now, not across the disabled window.
            if let Ok(mut inner) = rotator.inner.lock() {
                inner.state.last_tick = now;
            }
        }
        rotator.enabled = true;
        self.recount();
        if self.subscription.is_none() {
            self.renew_subscription()?;
        }
        Ok(())
    }

    /// Stop ticking a rotator, keeping it registered. On the 1 -> 0 enabled
    /// transition the shared subscription is torn down.
    pub fn disable(&mut self, id: RotatorId) {
        if let Some(rotator) = self.rotators.get_mut(&id) {
            rotator.enabled = false;
        }
        self.recount();
        if self.enabled_count == 0 {
            self.teardown_subscription();
        }
    }

    fn recount(&mut self) {
        self.enabled_count = self.rotators.values().filter(|r| r.enabled).count();
    }

    fn renew_subscription(&mut self) -> Result<(), ScheduleError> {
        self.teardown_subscription();
        let tx = self.tick_tx.clone();
        let id = self.clock.subscribe(Box::new(move |timestamp| {
            // Never block the clock thread; a full queue drops the tick and
            // the next tick carries a fresher timestamp.
            if tx.try_send(TickEvent { timestamp }).is_err() {
                trace!("tick queue full, dropping tick at {timestamp:?}");
            }
        }))?;
        self.subscription = Some(id);
        Ok(())
    }

    fn teardown_subscription(&mut self) {
        if let Some(id) = self.subscription.take() {
            // Synchronous with respect to the clock thread: after this no
            // callback can post into our queue.
            self.clock.unsubscribe(id);
        }
    }

    /// Drive every enabled rotator for one tick. Runs on the drain loop, not
    /// on the clock thread. Contended rotators are skipped rather than
    /// waited on; the miss is retried on the next tick.
    pub fn on_tick(&self, timestamp: Duration) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        for (id, rotator) in &self.rotators {
            if !rotator.enabled {
                continue;
            }
            let Ok(mut inner) = rotator.inner.try_lock() else {
                trace!("rotator {id} busy, skipping this tick");
                continue;
            };
            let dt = inner.state.elapsed_since_last(timestamp);
            let RotatorInner { state, update_fn } = &mut *inner;
            if update_fn(state, dt) {
                outcome.changed = true;
                outcome.changed_items.push(rotator.target);
            }
        }

        let count = self.tick_count.fetch_add(1, Ordering::Relaxed);
        if count > 0 && count % 600 == 0 {
            info!(
                "rotator manager: {} registered, {} enabled",
                self.rotators.len(),
                self.enabled_count
            );
        }

        outcome
    }

    /// Number of ticks this manager has processed.
    pub fn ticks_processed(&self) -> u64 {
        self.tick_count.load(Ordering::Relaxed)
    }

    /// Current angle of a rotator, read under the same lock the tick path
    /// writes through, so a render never observes a torn value.
    pub fn rotation_of(&self, id: RotatorId) -> Result<f64, ScheduleError> {
        let rotator = self
            .rotators
            .get(&id)
            .ok_or(ScheduleError::UnknownRotator(id))?;
        match rotator.inner.lock() {
            Ok(inner) => Ok(inner.state.angle),
            Err(_) => {
                warn!("rotator {id} lock poisoned, reporting angle 0");
                Ok(0.0)
            }
        }
    }

    /// Update a rotator's rate under its lock.
    pub fn set_rate(&self, id: RotatorId, rate: f64) -> Result<(), ScheduleError> {
        let rotator = self
            .rotators
            .get(&id)
            .ok_or(ScheduleError::UnknownRotator(id))?;
        if let Ok(mut inner) = rotator.inner.lock() {
            inner.state.rate = rate;
        }
        Ok(())
    }

    /// Set an explicit angle (wrapped into [0, 360)) under the rotator's
    /// lock and return the wrapped value.
    pub fn set_angle(&self, id: RotatorId, degrees: f64) -> Result<f64, ScheduleError> {
        let rotator = self
            .rotators
            .get(&id)
            .ok_or(ScheduleError::UnknownRotator(id))?;
        let wrapped = wrap_angle(degrees);
        if let Ok(mut inner) = rotator.inner.lock() {
            inner.state.angle = wrapped;
        }
        Ok(wrapped)
    }

    pub fn snapshot_of(&self, id: RotatorId) -> Option<RotatorSnapshot> {
        let rotator = self.rotators.get(&id)?;
        let inner = rotator.inner.lock().ok()?;
        Some(RotatorSnapshot {
            angle: inner.state.angle,
            rate: inner.state.rate,
            enabled: rotator.enabled,
        })
    }

    pub fn is_registered(&self, id: RotatorId) -> bool {
        self.rotators.contains_key(&id)
    }

    pub fn is_enabled(&self, id: RotatorId) -> bool {
        self.rotators.get(&id).is_some_and(|r| r.enabled)
    }

    pub fn len(&self) -> usize {
        self.rotators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rotators.is_empty()
    }

    pub fn enabled_count(&self) -> usize {
        self.enabled_count
    }

    pub fn has_subscription(&self) -> bool {
        self.subscription.is_some()
    }

    /// Tear everything down. After this returns, no clock callback can
    /// reference rotator state.
    pub fn shutdown(&mut self) {
        debug!("rotator manager shutdown: dropping {} rotators", self.rotators.len());
        self.teardown_subscription();
        self.rotators.clear();
        self.enabled_count = 0;
    }
}

impl Drop for RotatorManager {
    fn drop(&mut self) {
        self.teardown_subscription();
    }
}
