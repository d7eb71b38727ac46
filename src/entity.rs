//! Game entities: identity plus a bag of components.
//!
//! A [`GameEntity`] owns at most one component per [`ComponentKind`]; adding
//! a second component of a kind replaces the first. Components get a
//! non-owning back-reference (the [`EntityId`]) when attached and receive a
//! read-only [`Owner`] view of the entity while being updated or rendered.
//!
//! Entities are shared through [`EntityRef`] because tile-map cells and
//! gameplay lists may hold the same entity. All entity mutation happens on the
//! main loop thread.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use log::debug;
use rustc_hash::FxHashMap;

use crate::components::animation::{AnimationSet, SingleAnimation};
use crate::components::geometry::Geometry;
use crate::components::texture::TextureComponent;
use crate::components::{Component, ComponentKind, Owner};
use crate::error::EntityError;
use crate::render::RenderContext;
use crate::resources::texturestore::TextureCache;
use crate::resources::worldtime::WorldTime;

/// Process-unique entity identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u64);

impl EntityId {
    pub const fn from_raw(raw: u64) -> Self {
        EntityId(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

static NEXT_ENTITY_ID: AtomicU64 = AtomicU64::new(1);

/// Shared, single-threaded handle to an entity.
pub type EntityRef = Rc<RefCell<GameEntity>>;

#[derive(Debug)]
pub struct GameEntity {
    id: EntityId,
    name: String,
    state: String,
    flip: bool,
    components: FxHashMap<ComponentKind, Component>,
}

impl Default for GameEntity {
    fn default() -> Self {
        Self::new()
    }
}

impl GameEntity {
    /// Empty entity with a fresh id.
    pub fn new() -> Self {
        Self {
            id: EntityId(NEXT_ENTITY_ID.fetch_add(1, Ordering::Relaxed)),
            name: String::new(),
            state: String::new(),
            flip: false,
            components: FxHashMap::default(),
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        let mut entity = Self::new();
        entity.name = name.into();
        entity
    }

    /// Wrap into a shared handle.
    pub fn shared(self) -> EntityRef {
        Rc::new(RefCell::new(self))
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// State string selecting the active animation.
    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn set_state(&mut self, state: impl Into<String>) {
        self.state = state.into();
    }

    /// Whether rendering is mirrored horizontally.
    pub fn flip(&self) -> bool {
        self.flip
    }

    pub fn set_flip(&mut self, flip: bool) {
        self.flip = flip;
    }

    // --- component storage ---

    /// Store `component` under its own kind and back-link it to this entity.
    /// Returns the component it replaced, if any.
    pub fn attach(&mut self, component: impl Into<Component>) -> Option<Component> {
        let mut component = component.into();
        component.set_owner(self.id);
        self.components.insert(component.kind(), component)
    }

    pub fn detach(&mut self, kind: ComponentKind) -> Option<Component> {
        self.components.remove(&kind)
    }

    pub fn component(&self, kind: ComponentKind) -> Option<&Component> {
        self.components.get(&kind)
    }

    pub fn has(&self, kind: ComponentKind) -> bool {
        self.components.contains_key(&kind)
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    pub fn add_transform(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.attach(Component::Transform(Geometry::new(x, y, width, height)));
    }

    pub fn add_collision(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.attach(Component::Collision(Geometry::new(x, y, width, height)));
    }

    /// Attach a texture whose image starts loading in the background now.
    pub fn add_texture(&mut self, cache: &TextureCache, path: impl Into<String>) {
        self.attach(TextureComponent::new(cache, path));
    }

    /// Register `anim` for `state`, creating the animation set on first use.
    pub fn add_animation(&mut self, state: impl Into<String>, anim: SingleAnimation) {
        if !self.has(ComponentKind::Animation) {
            debug!("Adding animation set to entity {:?}", self.id);
            self.attach(AnimationSet::new());
        }
        if let Some(set) = self.animations_mut() {
            set.add_animation(state, anim);
        }
    }

    pub fn transform(&self) -> Option<&Geometry> {
        match self.components.get(&ComponentKind::Transform) {
            Some(Component::Transform(g)) => Some(g),
            _ => None,
        }
    }

    pub fn transform_mut(&mut self) -> Option<&mut Geometry> {
        match self.components.get_mut(&ComponentKind::Transform) {
            Some(Component::Transform(g)) => Some(g),
            _ => None,
        }
    }

    pub fn collision(&self) -> Option<&Geometry> {
        match self.components.get(&ComponentKind::Collision) {
            Some(Component::Collision(g)) => Some(g),
            _ => None,
        }
    }

    pub fn collision_mut(&mut self) -> Option<&mut Geometry> {
        match self.components.get_mut(&ComponentKind::Collision) {
            Some(Component::Collision(g)) => Some(g),
            _ => None,
        }
    }

    pub fn texture(&self) -> Option<&TextureComponent> {
        match self.components.get(&ComponentKind::Texture) {
            Some(Component::Texture(t)) => Some(t),
            _ => None,
        }
    }

    pub fn texture_mut(&mut self) -> Option<&mut TextureComponent> {
        match self.components.get_mut(&ComponentKind::Texture) {
            Some(Component::Texture(t)) => Some(t),
            _ => None,
        }
    }

    pub fn animations(&self) -> Option<&AnimationSet> {
        match self.components.get(&ComponentKind::Animation) {
            Some(Component::Animation(a)) => Some(a),
            _ => None,
        }
    }

    pub fn animations_mut(&mut self) -> Option<&mut AnimationSet> {
        match self.components.get_mut(&ComponentKind::Animation) {
            Some(Component::Animation(a)) => Some(a),
            _ => None,
        }
    }

    // --- collision ---

    pub fn is_collidable(&self) -> bool {
        self.has(ComponentKind::Collision)
    }

    /// AABB overlap of the two collision boxes. False if either entity has no
    /// collision box.
    pub fn is_colliding_with(&self, other: &GameEntity) -> bool {
        match (self.collision(), other.collision()) {
            (Some(ours), Some(theirs)) => ours.overlaps(theirs),
            _ => false,
        }
    }

    // --- movement ---

    /// Move transform and collision box together. Fails without touching
    /// either if one of them is missing.
    pub fn move_by(&mut self, dx: f32, dy: f32) -> Result<(), EntityError> {
        for kind in [ComponentKind::Transform, ComponentKind::Collision] {
            if !self.has(kind) {
                return Err(EntityError::MissingComponent(kind));
            }
        }
        if let Some(transform) = self.transform_mut() {
            transform.translate(dx, dy);
        }
        if let Some(collision) = self.collision_mut() {
            collision.translate(dx, dy);
        }
        Ok(())
    }

    pub fn move_x(&mut self, dx: f32) -> Result<(), EntityError> {
        self.move_by(dx, 0.0)
    }

    pub fn move_y(&mut self, dy: f32) -> Result<(), EntityError> {
        self.move_by(0.0, dy)
    }

    // --- per-frame fan-out ---

    pub fn input(&mut self, dt: f32) {
        for component in self.components.values_mut() {
            component.input(dt);
        }
    }

    /// Update every attached component. Order between components is not
    /// specified.
    pub fn update(&mut self, time: &WorldTime) {
        let transform = self.transform().map(Geometry::rect);
        let owner = Owner {
            id: self.id,
            state: &self.state,
            flip: self.flip,
            transform,
        };
        for component in self.components.values_mut() {
            component.update(&owner, time);
        }
    }

    /// Render every attached component. Draw order between components is not
    /// specified; layer with separate entities if it matters.
    pub fn render(&mut self, ctx: &mut dyn RenderContext) {
        let transform = self.transform().map(Geometry::rect);
        let owner = Owner {
            id: self.id,
            state: &self.state,
            flip: self.flip,
            transform,
        };
        for component in self.components.values_mut() {
            component.render(&owner, ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::animation::FrameConfig;
    use crate::components::geometry::Rect;
    use crate::render::Color;
    use crate::resources::texturestore::{LazyTexture, TextureHandle};

    fn boxed(x: f32, y: f32, w: f32, h: f32) -> GameEntity {
        let mut e = GameEntity::new();
        e.add_transform(x, y, w, h);
        e.add_collision(x, y, w, h);
        e
    }

    #[derive(Default)]
    struct Recorder {
        draws: Vec<(Option<Rect>, Rect, bool)>,
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
            self.draws.push((src, dest, flip_h));
        }

        fn draw_rect(&mut self, rect: Rect, _color: Color, _filled: bool) {
            self.outlines.push(rect);
        }

        fn ticks_ms(&self) -> u64 {
            0
        }
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(GameEntity::new().id(), GameEntity::new().id());
    }

    #[test]
    fn attaching_same_kind_twice_keeps_one() {
        let mut e = GameEntity::new();
        e.add_transform(0.0, 0.0, 1.0, 1.0);
        e.add_transform(5.0, 5.0, 2.0, 2.0);
        assert_eq!(e.component_count(), 1);
        assert_eq!(
            e.transform().unwrap().rect(),
            Rect::new(5.0, 5.0, 2.0, 2.0)
        );
    }

    #[test]
    fn attach_returns_replaced_component() {
        let mut e = GameEntity::new();
        assert!(
            e.attach(Component::Collision(Geometry::new(0.0, 0.0, 1.0, 1.0)))
                .is_none()
        );
        let old = e.attach(Component::Collision(Geometry::new(1.0, 1.0, 1.0, 1.0)));
        assert!(matches!(old, Some(Component::Collision(_))));
    }

    #[test]
    fn attach_back_links_owner() {
        let mut e = GameEntity::new();
        e.add_collision(0.0, 0.0, 1.0, 1.0);
        e.add_animation("idle", SingleAnimation::new());
        assert_eq!(e.collision().unwrap().owner(), Some(e.id()));
        assert_eq!(e.animations().unwrap().owner(), Some(e.id()));
        assert_eq!(
            e.component(ComponentKind::Collision).unwrap().owner(),
            Some(e.id())
        );
    }

    #[test]
    fn accessors_report_absence() {
        let e = GameEntity::new();
        assert!(e.transform().is_none());
        assert!(e.collision().is_none());
        assert!(e.texture().is_none());
        assert!(e.animations().is_none());
        assert!(!e.is_collidable());
    }

    #[test]
    fn transform_and_collision_are_independent() {
        let mut e = GameEntity::new();
        e.add_transform(0.0, 0.0, 10.0, 10.0);
        e.add_collision(2.0, 2.0, 6.0, 6.0);
        e.collision_mut().unwrap().set_x(4.0);
        assert_eq!(e.transform().unwrap().x(), 0.0);
        assert_eq!(e.collision().unwrap().x(), 4.0);
    }

    #[test]
    fn collision_is_symmetric() {
        let a = boxed(0.0, 0.0, 10.0, 10.0);
        let b = boxed(5.0, 5.0, 10.0, 10.0);
        let c = boxed(20.0, 20.0, 10.0, 10.0);
        assert!(a.is_colliding_with(&b));
        assert_eq!(a.is_colliding_with(&b), b.is_colliding_with(&a));
        assert!(!a.is_colliding_with(&c));
        assert_eq!(a.is_colliding_with(&c), c.is_colliding_with(&a));
    }

    #[test]
    fn touching_entities_do_not_collide() {
        let a = boxed(0.0, 0.0, 10.0, 10.0);
        let b = boxed(10.0, 0.0, 10.0, 10.0);
        assert!(!a.is_colliding_with(&b));
    }

    #[test]
    fn no_collision_without_collision_box() {
        let a = boxed(0.0, 0.0, 10.0, 10.0);
        let mut b = GameEntity::new();
        b.add_transform(0.0, 0.0, 10.0, 10.0);
        assert!(!a.is_colliding_with(&b));
        assert!(!b.is_colliding_with(&a));
    }

    #[test]
    fn move_shifts_transform_and_collision() {
        let mut e = GameEntity::new();
        e.add_transform(0.0, 0.0, 10.0, 10.0);
        e.add_collision(2.0, 3.0, 6.0, 6.0);
        e.move_x(5.0).unwrap();
        e.move_y(-1.0).unwrap();
        assert_eq!(e.transform().unwrap().rect(), Rect::new(5.0, -1.0, 10.0, 10.0));
        assert_eq!(e.collision().unwrap().rect(), Rect::new(7.0, 2.0, 6.0, 6.0));
    }

    #[test]
    fn move_without_collision_fails_untouched() {
        let mut e = GameEntity::new();
        e.add_transform(0.0, 0.0, 10.0, 10.0);
        assert_eq!(
            e.move_x(5.0),
            Err(EntityError::MissingComponent(ComponentKind::Collision))
        );
        assert_eq!(e.transform().unwrap().x(), 0.0);

        let mut bare = GameEntity::new();
        assert_eq!(
            bare.move_y(1.0),
            Err(EntityError::MissingComponent(ComponentKind::Transform))
        );
    }

    #[test]
    fn update_plays_animation_for_state() {
        let frames = FrameConfig {
            x: 0.0,
            y: 0.0,
            width: 8.0,
            width_offset: 0.0,
            height: 8.0,
            frame_count: 2,
            frame_duration_ms: 50,
            repeat: true,
        };
        let mut e = GameEntity::new();
        e.add_transform(0.0, 0.0, 8.0, 8.0);
        e.add_animation("idle", SingleAnimation::new().with_frames(frames));
        e.add_animation("walk", SingleAnimation::new().with_frames(frames));
        e.set_state("walk");

        e.update(&WorldTime::at_ticks(0));
        e.update(&WorldTime::at_ticks(50));
        let set = e.animations().unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.active_state(), Some("walk"));
        assert_eq!(set.get_animation("walk").unwrap().current_frame(), Some(0));
        assert_eq!(set.get_animation("idle").unwrap().current_frame(), None);
    }

    #[test]
    fn render_without_texture_draws_outline() {
        let mut e = GameEntity::new();
        e.add_transform(4.0, 4.0, 16.0, 16.0);
        e.attach(TextureComponent::from_lazy(LazyTexture::unstarted()));
        let mut ctx = Recorder::default();
        e.render(&mut ctx);
        assert_eq!(ctx.outlines, vec![Rect::new(4.0, 4.0, 16.0, 16.0)]);
        assert!(ctx.draws.is_empty());
    }

    #[test]
    fn shared_entity_outlives_other_owner() {
        let shared = GameEntity::named("hero").shared();
        let alias = Rc::clone(&shared);
        drop(shared);
        assert_eq!(alias.borrow().name(), "hero");
    }
}
