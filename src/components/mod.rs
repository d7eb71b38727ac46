//! Components that can be attached to a [`GameEntity`](crate::entity::GameEntity).
//!
//! An entity holds at most one component of each [`ComponentKind`]. The set
//! of kinds is closed, so components are a plain enum rather than trait
//! objects; the entity fans `input`, `update` and `render` out to whatever it
//! has attached.
//!
//! Submodules overview:
//! - [`animation`] – sprite-sheet strips and the per-state animation set
//! - [`geometry`] – rectangles used as transform and collision box
//! - [`texture`] – whole-image sprite drawn over the transform

pub mod animation;
pub mod geometry;
pub mod texture;

use crate::components::animation::AnimationSet;
use crate::components::geometry::{Geometry, Rect};
use crate::components::texture::TextureComponent;
use crate::entity::EntityId;
use crate::render::RenderContext;
use crate::resources::worldtime::WorldTime;

/// Slot a component occupies on its entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ComponentKind {
    Transform,
    Collision,
    Texture,
    Animation,
}

/// Read-only view of the owning entity handed to components during fan-out.
#[derive(Debug, Clone, Copy)]
pub struct Owner<'a> {
    pub id: EntityId,
    pub state: &'a str,
    pub flip: bool,
    /// The entity's transform rectangle, if it has one.
    pub transform: Option<Rect>,
}

#[derive(Debug)]
pub enum Component {
    Transform(Geometry),
    Collision(Geometry),
    Texture(TextureComponent),
    Animation(AnimationSet),
}

impl Component {
    pub fn kind(&self) -> ComponentKind {
        match self {
            Component::Transform(_) => ComponentKind::Transform,
            Component::Collision(_) => ComponentKind::Collision,
            Component::Texture(_) => ComponentKind::Texture,
            Component::Animation(_) => ComponentKind::Animation,
        }
    }

    /// Entity this component was last attached to.
    pub fn owner(&self) -> Option<EntityId> {
        match self {
            Component::Transform(g) | Component::Collision(g) => g.owner(),
            Component::Texture(t) => t.owner(),
            Component::Animation(a) => a.owner(),
        }
    }

    pub(crate) fn set_owner(&mut self, owner: EntityId) {
        match self {
            Component::Transform(g) | Component::Collision(g) => g.set_owner(owner),
            Component::Texture(t) => t.set_owner(owner),
            Component::Animation(a) => a.set_owner(owner),
        }
    }

    /// Per-frame input hook. None of the built-in components read input.
    pub fn input(&mut self, _dt: f32) {}

    pub fn update(&mut self, owner: &Owner<'_>, time: &WorldTime) {
        if let Component::Animation(set) = self {
            set.update(owner, time);
        }
    }

    pub fn render(&mut self, owner: &Owner<'_>, ctx: &mut dyn RenderContext) {
        match self {
            Component::Texture(texture) => texture.render(owner, ctx),
            Component::Animation(set) => set.render(owner, ctx),
            Component::Transform(_) | Component::Collision(_) => {}
        }
    }
}

impl From<TextureComponent> for Component {
    fn from(texture: TextureComponent) -> Self {
        Component::Texture(texture)
    }
}

impl From<AnimationSet> for Component {
    fn from(set: AnimationSet) -> Self {
        Component::Animation(set)
    }
}
