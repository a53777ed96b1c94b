//! Shared simulation clock.
//!
//! [`WorldTime`] is the single timing source of the ECS world. The host loop
//! writes one unscaled frame delta per pulse through
//! [`update_world_time`](crate::systems::time::update_world_time); every
//! system that needs time reads it from here.

use bevy_ecs::prelude::Resource;

#[derive(Resource, Debug, Clone, Copy)]
pub struct WorldTime {
    /// Scaled seconds since the world started.
    pub elapsed: f32,
    /// Scaled seconds since the previous pulse.
    pub delta: f32,
    pub time_scale: f32,
    /// Number of pulses seen so far.
    pub frame_count: u64,
}

impl Default for WorldTime {
    fn default() -> Self {
        WorldTime {
            elapsed: 0.0,
            delta: 0.0,
            time_scale: 1.0,
            frame_count: 0,
        }
    }
}

impl WorldTime {
    pub fn with_time_scale(mut self, time_scale: f32) -> Self {
        self.time_scale = time_scale;
        self
    }

    /// Delta of the current pulse in milliseconds.
    pub fn delta_ms(&self) -> f64 {
        self.delta as f64 * 1000.0
    }
}
