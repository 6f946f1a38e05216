//! Shared constants for the scheduling core.

use std::time::Duration;

/// Default frame interval for the shared hardware clock (16ms ~ 60fps).
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Default interval of the bar item poll loop; one loop iteration is one
/// external tick for every item.
pub const UPDATE_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Minimum visible angle change, in degrees. Updates below this are not
/// reported as changes, so sub-epsilon drift never dirties the bar.
pub const ANGLE_EPSILON: f64 = 1e-4;

/// Capacity of the clock-to-loop tick queue. When full, new ticks are
/// dropped; the next tick carries a fresher timestamp.
pub const TICK_QUEUE_CAPACITY: usize = 2;
