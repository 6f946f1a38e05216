//! Core scheduling subsystem: the shared frame clock, the rotator registry
//! it drives, and the slower polling scheduler for script-backed items.

pub mod clock;
pub mod constants;
pub mod rotator;
pub mod update_manager;

use rotabar_types::{ItemId, RotatorId};
use thiserror::Error;

/// Errors from the scheduling layer.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// The frame clock could not create a subscription. Rotators stay
    /// registered but do not animate until a later enable retries.
    #[error("frame clock unavailable: {0}")]
    ClockUnavailable(String),

    /// An operation named a rotator id that is not registered.
    #[error("unknown rotator {0}")]
    UnknownRotator(RotatorId),

    /// A rotator's target item was removed out from under it.
    #[error("rotator target {0} no longer exists")]
    StaleTarget(ItemId),
}

pub use clock::{monotonic_time, FrameClock, ManualClock, SubscriptionId, ThreadClock, TickCallback};
pub use constants::{ANGLE_EPSILON, FRAME_INTERVAL, TICK_QUEUE_CAPACITY, UPDATE_POLL_INTERVAL};
pub use rotator::{
    spin, wrap_angle, Rotator, RotatorManager, RotatorSnapshot, RotatorState, TickEvent,
    TickOutcome, UpdateFn,
};
pub use update_manager::UpdateScheduler;
