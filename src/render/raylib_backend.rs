//! raylib implementation of [`RenderContext`].
//!
//! Decoded textures live in CPU memory inside the shared cache. They are
//! uploaded to the GPU the first time they are drawn and released once no
//! component holds a [`TextureHandle`] to them anymore, leaving only the
//! cache entry (see [`GpuTextures::collect_garbage`]). A released texture is
//! uploaded again if something draws it later.
//!
//! Everything here must run on the thread that owns the raylib window.

use std::ffi::c_void;
use std::sync::{Arc, Weak};

use log::{debug, warn};
use raylib::prelude::*;
use rustc_hash::FxHashMap;

use crate::components::geometry::Rect;
use crate::render::{Color as RgbaColor, RenderContext};
use crate::resources::texturestore::{ImageData, Texture, TextureHandle, TextureId, in_use};

/// GPU copies of cached textures, keyed by texture id.
///
/// Non-send: holds raylib textures. Insert with `insert_non_send_resource` or
/// keep it on the main loop's stack.
#[derive(Default)]
pub struct GpuTextures {
    uploaded: FxHashMap<TextureId, (Weak<Texture>, Texture2D)>,
    failed: FxHashMap<TextureId, Weak<Texture>>,
}

impl GpuTextures {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the GPU texture for `texture`, uploading it on first use.
    pub fn get_or_upload(
        &mut self,
        _thread: &RaylibThread,
        texture: &TextureHandle,
    ) -> Option<&Texture2D> {
        let id = texture.id();
        if self.failed.contains_key(&id) {
            return None;
        }
        if !self.uploaded.contains_key(&id) {
            match upload(texture) {
                Some(gpu) => {
                    debug!(
                        "Uploaded texture '{}' ({}x{})",
                        texture.path(),
                        texture.width(),
                        texture.height()
                    );
                    self.uploaded.insert(id, (Arc::downgrade(texture), gpu));
                }
                None => {
                    warn!("GPU upload failed for texture '{}'", texture.path());
                    self.failed.insert(id, Arc::downgrade(texture));
                    return None;
                }
            }
        }
        self.uploaded.get(&id).map(|(_, gpu)| gpu)
    }

    /// Drop GPU copies of textures only the cache still references.
    pub fn collect_garbage(&mut self) -> usize {
        let before = self.uploaded.len();
        self.uploaded.retain(|_, (source, _)| in_use(source));
        self.failed.retain(|_, source| in_use(source));
        let released = before - self.uploaded.len();
        if released > 0 {
            debug!("Released {} GPU textures", released);
        }
        released
    }

    pub fn len(&self) -> usize {
        self.uploaded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uploaded.is_empty()
    }
}

fn upload(texture: &Texture) -> Option<Texture2D> {
    let image = texture.image();
    let expected = ImageData::byte_len(image.width, image.height);
    if image.width == 0 || image.height == 0 || image.pixels.len() != expected {
        return None;
    }
    // LoadTextureFromImage only reads the pixel buffer; ownership stays with
    // the cache.
    let raw = unsafe {
        ffi::LoadTextureFromImage(ffi::Image {
            data: image.pixels.as_ptr() as *mut c_void,
            width: image.width as i32,
            height: image.height as i32,
            mipmaps: 1,
            format: ffi::PixelFormat::PIXELFORMAT_UNCOMPRESSED_R8G8B8A8 as i32,
        })
    };
    if raw.id == 0 {
        return None;
    }
    Some(unsafe { Texture2D::from_raw(raw) })
}

fn to_rectangle(rect: Rect) -> Rectangle {
    Rectangle {
        x: rect.x,
        y: rect.y,
        width: rect.width,
        height: rect.height,
    }
}

fn to_color(color: RgbaColor) -> Color {
    Color::new(color.r, color.g, color.b, color.a)
}

/// Draws through an open raylib drawing scope.
pub struct RaylibRenderer<'a, D: RaylibDraw> {
    draw: &'a mut D,
    thread: &'a RaylibThread,
    gpu: &'a mut GpuTextures,
    ticks_ms: u64,
}

impl<'a, D: RaylibDraw> RaylibRenderer<'a, D> {
    pub fn new(
        draw: &'a mut D,
        thread: &'a RaylibThread,
        gpu: &'a mut GpuTextures,
        ticks_ms: u64,
    ) -> Self {
        Self {
            draw,
            thread,
            gpu,
            ticks_ms,
        }
    }
}

impl<D: RaylibDraw> RenderContext for RaylibRenderer<'_, D> {
    fn draw_texture(
        &mut self,
        texture: &TextureHandle,
        src: Option<Rect>,
        dest: Rect,
        rotation: f32,
        flip_h: bool,
    ) {
        let Some(gpu) = self.gpu.get_or_upload(self.thread, texture) else {
            self.draw
                .draw_rectangle_lines_ex(to_rectangle(dest), 1.0, Color::WHITE);
            return;
        };
        let mut src = to_rectangle(src.unwrap_or_else(|| {
            Rect::new(0.0, 0.0, texture.width() as f32, texture.height() as f32)
        }));
        // negative source width mirrors horizontally
        if flip_h {
            src.width = -src.width;
        }
        self.draw.draw_texture_pro(
            gpu,
            src,
            to_rectangle(dest),
            Vector2::zero(),
            rotation,
            Color::WHITE,
        );
    }

    fn draw_rect(&mut self, rect: Rect, color: RgbaColor, filled: bool) {
        if filled {
            self.draw.draw_rectangle_rec(to_rectangle(rect), to_color(color));
        } else {
            self.draw
                .draw_rectangle_lines_ex(to_rectangle(rect), 1.0, to_color(color));
        }
    }

    fn ticks_ms(&self) -> u64 {
        self.ticks_ms
    }
}
