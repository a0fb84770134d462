//! Float entities upwards.
//!
//! Every entity carrying both a [`Velocity`] and a [`VisualHandle`] has the
//! vertical component of its node position advanced by `speed * delta`.
//! Entities missing either component are not matched.

use bevy_ecs::prelude::*;

use crate::components::velocity::Velocity;
use crate::components::visualhandle::VisualHandle;
use crate::resources::worldtime::WorldTime;

pub fn motion_system(time: Res<WorldTime>, mut query: Query<(&Velocity, &mut VisualHandle)>) {
    let dt = time.delta;
    if dt == 0.0 {
        return;
    }
    for (velocity, mut handle) in query.iter_mut() {
        let mut position = handle.position();
        position.y += velocity.speed * dt;
        handle.set_position(position);
    }
}
