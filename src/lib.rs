//! spritegrid library.
//!
//! A small 2D entity framework: entities composed of swappable components
//! (transform, collision box, texture, animations), a tile map built from
//! entities, and a shared texture cache that loads images in the background.
//! The frame loop runs on bevy_ecs resources and systems; drawing goes
//! through the [`render::RenderContext`] trait.

pub mod components;
pub mod entity;
pub mod error;
pub mod render;
pub mod resources;
pub mod systems;
