//! Sprite-sheet animations.
//!
//! A [`SingleAnimation`] is one horizontal strip of frames in a sprite sheet.
//! An [`AnimationSet`] holds one strip per entity state (`"idle"`, `"run"`,
//! ...) and plays the strip matching the owner's current state.
//!
//! Frame timing is wall-clock based: a strip advances when at least
//! `frame_duration_ms` have passed since its last advance, measured against
//! [`WorldTime::ticks_ms`].

use log::{debug, error};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::components::Owner;
use crate::components::geometry::Rect;
use crate::entity::EntityId;
use crate::render::{PLACEHOLDER_COLOR, RenderContext};
use crate::resources::texturestore::{LazyTexture, TextureCache, TextureHandle};
use crate::resources::worldtime::WorldTime;

/// Static layout and timing of a frame strip.
///
/// Field names on disk follow the level file format (`first_x`,
/// `frame_width`, `max_frame`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameConfig {
    /// Left edge of the first frame in the sheet.
    #[serde(rename = "first_x")]
    pub x: f32,
    /// Top edge of every frame in the sheet.
    #[serde(rename = "first_y")]
    pub y: f32,
    #[serde(rename = "frame_width")]
    pub width: f32,
    /// Gap between two consecutive frames.
    #[serde(rename = "frame_offset_x", default)]
    pub width_offset: f32,
    #[serde(rename = "frame_height")]
    pub height: f32,
    #[serde(rename = "max_frame")]
    pub frame_count: usize,
    #[serde(rename = "millisecond_duration")]
    pub frame_duration_ms: u64,
    #[serde(default)]
    pub repeat: bool,
}

/// One named animation strip.
///
/// `current_frame` is `None` until the strip first advances and again after
/// every [`reset_frame`](Self::reset_frame).
#[derive(Debug, Default)]
pub struct SingleAnimation {
    texture: LazyTexture,
    frames: FrameConfig,
    src: Rect,
    current: Option<usize>,
    last_advance: Option<u64>,
}

impl SingleAnimation {
    /// Strip without a texture. Renders as an outline until
    /// [`load_texture`](Self::load_texture) is called.
    pub fn new() -> Self {
        Self::default()
    }

    /// Strip whose sheet starts loading from `path` right away.
    pub fn with_texture(cache: &TextureCache, path: impl Into<String>) -> Self {
        let mut anim = Self::new();
        anim.load_texture(cache, path);
        anim
    }

    /// Start loading the sprite sheet in the background. Independent of the
    /// frame configuration.
    pub fn load_texture(&mut self, cache: &TextureCache, path: impl Into<String>) {
        self.texture = LazyTexture::start(cache, path);
    }

    pub fn with_frames(mut self, frames: FrameConfig) -> Self {
        self.set_frame_config(frames);
        self
    }

    pub fn set_frame_config(&mut self, frames: FrameConfig) {
        self.frames = frames;
        self.src = Rect::new(frames.x, frames.y, frames.width, frames.height);
    }

    pub fn frame_config(&self) -> &FrameConfig {
        &self.frames
    }

    pub fn frame_width(&self) -> f32 {
        self.frames.width
    }

    pub fn frame_height(&self) -> f32 {
        self.frames.height
    }

    pub fn frame_duration_ms(&self) -> u64 {
        self.frames.frame_duration_ms
    }

    pub fn frame_count(&self) -> usize {
        self.frames.frame_count
    }

    pub fn is_repeating(&self) -> bool {
        self.frames.repeat
    }

    pub fn current_frame(&self) -> Option<usize> {
        self.current
    }

    /// Region of the sheet drawn for the current frame.
    pub fn source_rect(&self) -> Rect {
        self.src
    }

    pub fn texture(&self) -> Option<&TextureHandle> {
        self.texture.texture()
    }

    /// Block until the sheet has loaded.
    pub fn ensure_ready(&mut self) -> Option<&TextureHandle> {
        self.texture.resolve()
    }

    /// Back to "not started" with the source rect on the first frame.
    pub fn reset_frame(&mut self) {
        self.current = None;
        self.src.x = self.frames.x;
    }

    /// Advance the strip if its frame duration has elapsed at `now_ms`.
    ///
    /// The very first call only records the clock, so the first frame gets a
    /// full duration. Past the last frame the strip wraps to 0 when
    /// repeating and otherwise holds the last frame.
    pub fn update_frame(&mut self, now_ms: u64) {
        if let Some(started) = self.last_advance {
            if now_ms.saturating_sub(started) < self.frames.frame_duration_ms {
                return;
            }
            let count = self.frames.frame_count;
            if count > 0 {
                let next = self.current.map_or(0, |i| i + 1);
                let index = if next < count {
                    next
                } else if self.frames.repeat {
                    0
                } else {
                    count - 1
                };
                self.current = Some(index);
                let stride = self.frames.width + self.frames.width_offset;
                self.src.x = self.frames.x + stride * index as f32;
            }
        }
        self.last_advance = Some(now_ms);
    }

    /// Draw the current frame over the owner's transform, mirrored when the
    /// owner is flipped. Blocks on the first call if the sheet is still
    /// loading.
    pub fn render_frame(&mut self, owner: &Owner<'_>, ctx: &mut dyn RenderContext) {
        let Some(dest) = owner.transform else {
            debug!("Entity {:?} has animations but no transform", owner.id);
            return;
        };
        match self.texture.resolve() {
            Some(texture) => ctx.draw_texture(texture, Some(self.src), dest, 0.0, owner.flip),
            None => ctx.draw_rect(dest, PLACEHOLDER_COLOR, false),
        }
    }
}

/// Animations of one entity keyed by state name.
#[derive(Debug, Default)]
pub struct AnimationSet {
    animations: FxHashMap<String, SingleAnimation>,
    active: Option<String>,
    owner: Option<EntityId>,
}

impl AnimationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the strip for `state`.
    pub fn add_animation(&mut self, state: impl Into<String>, anim: SingleAnimation) {
        self.animations.insert(state.into(), anim);
    }

    pub fn get_animation(&self, state: &str) -> Option<&SingleAnimation> {
        self.animations.get(state)
    }

    pub fn get_animation_mut(&mut self, state: &str) -> Option<&mut SingleAnimation> {
        self.animations.get_mut(state)
    }

    /// State of the strip currently playing, if any has been selected.
    pub fn active_state(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn len(&self) -> usize {
        self.animations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.animations.is_empty()
    }

    pub fn owner(&self) -> Option<EntityId> {
        self.owner
    }

    pub(crate) fn set_owner(&mut self, owner: EntityId) {
        self.owner = Some(owner);
    }

    pub fn update(&mut self, owner: &Owner<'_>, time: &WorldTime) {
        self.play(owner.state, time.ticks_ms);
    }

    /// Select the strip for `state` and advance it.
    ///
    /// Switching away from another strip resets that strip first. An unknown
    /// state is logged and leaves everything as it was. Returns whether a
    /// strip was advanced.
    pub fn play(&mut self, state: &str, now_ms: u64) -> bool {
        if !self.animations.contains_key(state) {
            error!(
                "Animation state '{}' does not exist on entity {:?}",
                state, self.owner
            );
            return false;
        }

        if let Some(previous) = self.active.as_deref().filter(|prev| *prev != state) {
            if let Some(anim) = self.animations.get_mut(previous) {
                anim.reset_frame();
            }
        }
        if self.active.as_deref() != Some(state) {
            self.active = Some(state.to_string());
        }

        if let Some(anim) = self.animations.get_mut(state) {
            anim.update_frame(now_ms);
        }
        true
    }

    pub fn render(&mut self, owner: &Owner<'_>, ctx: &mut dyn RenderContext) {
        let Some(active) = &self.active else {
            return;
        };
        if let Some(anim) = self.animations.get_mut(active) {
            anim.render_frame(owner, ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::Color;

    fn strip(count: usize, duration: u64, repeat: bool) -> SingleAnimation {
        SingleAnimation::new().with_frames(FrameConfig {
            x: 10.0,
            y: 20.0,
            width: 16.0,
            width_offset: 2.0,
            height: 24.0,
            frame_count: count,
            frame_duration_ms: duration,
            repeat,
        })
    }

    #[derive(Default)]
    struct Recorder {
        textures: Vec<(Option<Rect>, Rect, bool)>,
        outlines: Vec<Rect>,
    }

    impl RenderContext for Recorder {
        fn draw_texture(
            &mut self,
            _texture: &TextureHandle,
            src: Option<Rect>,
            dest: Rect,
            _rotation: f32,
            flip_h: bool,
        ) {
            self.textures.push((src, dest, flip_h));
        }

        fn draw_rect(&mut self, rect: Rect, _color: Color, filled: bool) {
            assert!(!filled);
            self.outlines.push(rect);
        }

        fn ticks_ms(&self) -> u64 {
            0
        }
    }

    #[test]
    fn first_update_only_stamps_the_clock() {
        let mut anim = strip(3, 100, true);
        anim.update_frame(5_000);
        assert_eq!(anim.current_frame(), None);
        anim.update_frame(5_050);
        assert_eq!(anim.current_frame(), None);
        anim.update_frame(5_100);
        assert_eq!(anim.current_frame(), Some(0));
    }

    #[test]
    fn updates_within_duration_do_not_advance() {
        let mut anim = strip(4, 100, true);
        anim.update_frame(0);
        anim.update_frame(100);
        assert_eq!(anim.current_frame(), Some(0));
        for t in [101, 150, 199] {
            anim.update_frame(t);
            assert_eq!(anim.current_frame(), Some(0));
        }
        anim.update_frame(200);
        assert_eq!(anim.current_frame(), Some(1));
    }

    #[test]
    fn repeating_strip_wraps_to_first_frame() {
        let mut anim = strip(3, 10, true);
        let mut seen = Vec::new();
        for step in 0..=5 {
            anim.update_frame(step * 10);
            seen.push(anim.current_frame());
        }
        assert_eq!(
            seen,
            vec![None, Some(0), Some(1), Some(2), Some(0), Some(1)]
        );
    }

    #[test]
    fn non_repeating_strip_freezes_on_last_frame() {
        let mut anim = strip(3, 10, false);
        for step in 0..10 {
            anim.update_frame(step * 10);
        }
        assert_eq!(anim.current_frame(), Some(2));
        assert_eq!(anim.source_rect().x, 10.0 + 18.0 * 2.0);
    }

    #[test]
    fn source_rect_follows_frame_index() {
        let mut anim = strip(4, 10, true);
        anim.update_frame(0);
        anim.update_frame(10);
        anim.update_frame(20);
        assert_eq!(anim.current_frame(), Some(1));
        assert_eq!(anim.source_rect(), Rect::new(28.0, 20.0, 16.0, 24.0));
    }

    #[test]
    fn reset_restores_initial_x() {
        let mut anim = strip(4, 10, true);
        for step in 0..4 {
            anim.update_frame(step * 10);
        }
        assert_eq!(anim.current_frame(), Some(2));
        anim.reset_frame();
        assert_eq!(anim.current_frame(), None);
        assert_eq!(anim.source_rect().x, 10.0);
    }

    #[test]
    fn empty_strip_never_selects_a_frame() {
        let mut anim = strip(0, 10, true);
        for step in 0..4 {
            anim.update_frame(step * 10);
        }
        assert_eq!(anim.current_frame(), None);
    }

    #[test]
    fn set_switching_state_resets_previous_strip() {
        let mut set = AnimationSet::new();
        set.add_animation("idle", strip(4, 10, true));
        set.add_animation("run", strip(4, 10, true));

        for step in 0..3 {
            assert!(set.play("idle", step * 10));
        }
        assert_eq!(set.get_animation("idle").unwrap().current_frame(), Some(1));

        set.play("run", 30);
        assert_eq!(set.active_state(), Some("run"));
        assert_eq!(set.get_animation("idle").unwrap().current_frame(), None);
        assert_eq!(set.get_animation("idle").unwrap().source_rect().x, 10.0);
    }

    #[test]
    fn set_unknown_state_keeps_current_frame() {
        let mut set = AnimationSet::new();
        set.add_animation("idle", strip(4, 10, true));
        set.play("idle", 0);
        set.play("idle", 10);
        assert!(!set.play("jump", 20));
        assert_eq!(set.active_state(), Some("idle"));
        assert_eq!(set.get_animation("idle").unwrap().current_frame(), Some(0));
    }

    #[test]
    fn set_renders_nothing_before_first_state() {
        let mut set = AnimationSet::new();
        set.add_animation("idle", strip(4, 10, true));
        let owner = Owner {
            id: EntityId::from_raw(1),
            state: "idle",
            flip: false,
            transform: Some(Rect::new(0.0, 0.0, 16.0, 24.0)),
        };
        let mut ctx = Recorder::default();
        set.render(&owner, &mut ctx);
        assert!(ctx.outlines.is_empty());
        assert!(ctx.textures.is_empty());

        set.play("idle", 0);
        set.render(&owner, &mut ctx);
        assert_eq!(ctx.outlines, vec![Rect::new(0.0, 0.0, 16.0, 24.0)]);
    }
}
