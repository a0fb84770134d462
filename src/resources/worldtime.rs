use bevy_ecs::prelude::Resource;

/// Frame-driver clock as seen by systems.
///
/// `elapsed` is the cumulative time passed to the scheduler and `delta` the
/// time since the previous tick, both in the frame driver's units.
#[derive(Resource, Clone, Copy, Debug, Default, PartialEq)]
pub struct WorldTime {
    pub elapsed: f32,
    pub delta: f32,
    pub frame_count: u64,
}
