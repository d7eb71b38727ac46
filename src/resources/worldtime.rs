use bevy_ecs::prelude::Resource;

/// Frame timing shared by every system.
///
/// `delta` and `elapsed` are scaled seconds. `ticks_ms` is the render
/// context's millisecond clock at the start of the frame; sprite animations
/// time their frames against it.
#[derive(Resource, Clone, Copy, Debug, PartialEq)]
pub struct WorldTime {
    pub elapsed: f32,
    pub delta: f32,
    pub time_scale: f32,
    pub ticks_ms: u64,
}

impl Default for WorldTime {
    fn default() -> Self {
        WorldTime {
            elapsed: 0.0,
            delta: 0.0,
            time_scale: 1.0,
            ticks_ms: 0,
        }
    }
}

impl WorldTime {
    pub fn with_time_scale(mut self, time_scale: f32) -> Self {
        self.time_scale = time_scale;
        self
    }

    /// A frame at the given clock reading with no elapsed delta.
    pub fn at_ticks(ticks_ms: u64) -> Self {
        WorldTime {
            ticks_ms,
            ..Default::default()
        }
    }
}
