//! Time update system.
//!
//! Updates the shared [`WorldTime`](crate::resources::worldtime::WorldTime)
//! resource once per frame, applying `time_scale` to the provided delta.
use bevy_ecs::prelude::*;

use crate::resources::worldtime::WorldTime;

/// Update elapsed, delta and the millisecond clock on `WorldTime`.
///
/// `dt` is the unscaled frame delta in seconds and `ticks_ms` the render
/// context's clock reading. Only `dt` is scaled; the clock is wall time.
pub fn update_world_time(world: &mut World, dt: f32, ticks_ms: u64) {
    let mut wt = world.resource_mut::<WorldTime>();
    let scaled_dt = dt * wt.time_scale;
    wt.elapsed += scaled_dt;
    wt.delta = scaled_dt;
    wt.ticks_ms = ticks_ms;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_time_scale_to_delta_only() {
        let mut world = World::new();
        world.insert_resource(WorldTime::default().with_time_scale(0.5));
        update_world_time(&mut world, 0.2, 1_000);
        update_world_time(&mut world, 0.2, 1_200);
        let wt = world.resource::<WorldTime>();
        assert!((wt.delta - 0.1).abs() < 1e-6);
        assert!((wt.elapsed - 0.2).abs() < 1e-6);
        assert_eq!(wt.ticks_ms, 1_200);
    }
}
