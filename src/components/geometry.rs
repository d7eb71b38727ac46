use serde::{Deserialize, Serialize};

use crate::entity::EntityId;

/// Axis-aligned rectangle in pixels. `x`/`y` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// AABB overlap with half-open edges: rectangles that only touch do not
    /// intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        !(self.right() <= other.x
            || other.right() <= self.x
            || self.bottom() <= other.y
            || other.bottom() <= self.y)
    }

    /// Point containment, inclusive of the top-left edges only.
    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    pub fn translated(&self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }
}

/// Position and size of an entity.
///
/// The same type serves two roles on an entity: the transform (where the
/// entity is drawn) and the collision box. The two instances are independent;
/// moving one does not move the other unless the entity moves both.
#[derive(Debug, Clone, Default)]
pub struct Geometry {
    rect: Rect,
    owner: Option<EntityId>,
}

impl Geometry {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self::from_rect(Rect::new(x, y, width, height))
    }

    pub fn from_rect(rect: Rect) -> Self {
        Self { rect, owner: None }
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn x(&self) -> f32 {
        self.rect.x
    }

    pub fn y(&self) -> f32 {
        self.rect.y
    }

    pub fn width(&self) -> f32 {
        self.rect.width
    }

    pub fn height(&self) -> f32 {
        self.rect.height
    }

    pub fn set_x(&mut self, x: f32) {
        self.rect.x = x;
    }

    pub fn set_y(&mut self, y: f32) {
        self.rect.y = y;
    }

    pub fn set_xy(&mut self, x: f32, y: f32) {
        self.rect.x = x;
        self.rect.y = y;
    }

    pub fn set_width(&mut self, width: f32) {
        self.rect.width = width;
    }

    pub fn set_height(&mut self, height: f32) {
        self.rect.height = height;
    }

    pub fn set_wh(&mut self, width: f32, height: f32) {
        self.rect.width = width;
        self.rect.height = height;
    }

    /// Shift the rectangle by a delta.
    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.rect = self.rect.translated(dx, dy);
    }

    pub fn overlaps(&self, other: &Geometry) -> bool {
        self.rect.intersects(&other.rect)
    }

    pub fn owner(&self) -> Option<EntityId> {
        self.owner
    }

    pub(crate) fn set_owner(&mut self, owner: EntityId) {
        self.owner = Some(owner);
    }
}
