//! Vertical speed of a floating entity.
//!
//! Assigned once at spawn time from the producer's speed range and never
//! changed afterwards. Consumed by the [`motion_system`].
//!
//! [`motion_system`]: crate::systems::motion::motion_system

use bevy_ecs::prelude::Component;

/// Scalar speed in world units per frame-driver time unit.
#[derive(Component, Clone, Copy, Debug, PartialEq)]
pub struct Velocity {
    pub speed: f32,
}

impl Velocity {
    pub fn new(speed: f32) -> Self {
        Velocity { speed }
    }
}
