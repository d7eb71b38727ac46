//! Systems run by the frame driver.
//!
//! - [`scene`] – tile texture realization, scene update and scene render
//! - [`time`] – per-frame [`WorldTime`](crate::resources::worldtime::WorldTime) update
pub mod scene;
pub mod time;
