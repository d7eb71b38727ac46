//! Drawing abstraction consumed by components.
//!
//! Components never talk to a graphics library directly. They draw through a
//! [`RenderContext`], which the frame driver supplies. The optional
//! [`raylib_backend`] implements it on top of raylib; tests implement it with
//! recording doubles.

#[cfg(feature = "raylib")]
pub mod raylib_backend;

use crate::components::geometry::Rect;
use crate::resources::texturestore::TextureHandle;

/// 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const GREEN: Color = Color::rgb(0, 255, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// Outline color used when an entity has nothing to draw yet.
pub const PLACEHOLDER_COLOR: Color = Color::WHITE;

/// Per-frame drawing surface and clock.
pub trait RenderContext {
    /// Draw `src` (the whole texture when `None`) of `texture` into `dest`.
    /// `rotation` is in degrees around the destination's top-left corner.
    fn draw_texture(
        &mut self,
        texture: &TextureHandle,
        src: Option<Rect>,
        dest: Rect,
        rotation: f32,
        flip_h: bool,
    );

    /// Draw an outlined or filled rectangle.
    fn draw_rect(&mut self, rect: Rect, color: Color, filled: bool);

    /// Milliseconds since the context was created.
    fn ticks_ms(&self) -> u64;
}
