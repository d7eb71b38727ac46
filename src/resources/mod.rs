//! Long-lived data shared by the frame loop.
//!
//! Overview
//! - `gameconfig` – INI-backed window, map and color-key settings
//! - `leveldata` – JSON level descriptions building tile maps and actors
//! - `scene` – entities and tile map driven each frame (non-send)
//! - `texturestore` – load-once texture cache and background texture handles
//! - `tilemap` – grid of tile entities stamped from prototypes
//! - `worldtime` – simulation time, delta and millisecond clock
pub mod gameconfig;
pub mod leveldata;
pub mod scene;
pub mod texturestore;
pub mod tilemap;
pub mod worldtime;
