//! Time update system.
//!
//! Writes the frame driver's clock into the shared
//! [`WorldTime`](crate::resources::worldtime::WorldTime) resource once per
//! frame, before the schedule runs.
use bevy_ecs::prelude::*;

use crate::resources::worldtime::WorldTime;

/// Set elapsed and delta on the `WorldTime` resource and count the frame.
///
/// Negative deltas are clamped to zero; the frame driver promises
/// monotonically increasing time.
pub fn update_world_time(world: &mut World, elapsed: f32, delta: f32) {
    let mut wt = world.resource_mut::<WorldTime>();
    wt.elapsed = elapsed;
    wt.delta = delta.max(0.0);
    wt.frame_count += 1;
}
