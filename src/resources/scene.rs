//! Scene resource: the entities driven by the frame loop.
//!
//! Non-send resource (entities are `Rc`-shared and live on the main thread);
//! insert with `insert_non_send_resource` and access via `NonSend`/`NonSendMut`.

use std::rc::Rc;

use crate::entity::{EntityId, EntityRef, GameEntity};
use crate::resources::tilemap::TileMap;

#[derive(Debug, Default)]
pub struct Scene {
    /// Free entities, updated and drawn in insertion order after the map.
    pub entities: Vec<EntityRef>,
    pub tilemap: Option<TileMap>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tilemap(tilemap: TileMap) -> Self {
        Self {
            entities: Vec::new(),
            tilemap: Some(tilemap),
        }
    }

    /// Add an entity and return a shared handle to it.
    pub fn spawn(&mut self, entity: GameEntity) -> EntityRef {
        let shared = entity.shared();
        self.entities.push(Rc::clone(&shared));
        shared
    }

    /// Remove an entity from the scene. Other holders keep it alive.
    ///
    /// Entities mutably borrowed elsewhere at the time are skipped, so the
    /// one being removed must not be borrowed by the caller.
    pub fn despawn(&mut self, id: EntityId) -> Option<EntityRef> {
        let index = self.entities.iter().position(|entity| {
            entity
                .try_borrow()
                .is_ok_and(|entity| entity.id() == id)
        })?;
        Some(self.entities.remove(index))
    }

    /// First entity called `name`. Entities mutably borrowed elsewhere are
    /// skipped.
    pub fn find(&self, name: &str) -> Option<&EntityRef> {
        self.entities.iter().find(|entity| {
            entity
                .try_borrow()
                .is_ok_and(|entity| entity.name() == name)
        })
    }

    /// Whether `entity` overlaps a collidable tile. False without a map.
    pub fn collides_with_map(&self, entity: &GameEntity) -> bool {
        self.tilemap
            .as_ref()
            .is_some_and(|map| map.has_collision_with(entity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_and_despawn_by_name_and_id() {
        let mut scene = Scene::new();
        let hero = scene.spawn(GameEntity::named("hero"));
        scene.spawn(GameEntity::named("slime"));

        assert!(Rc::ptr_eq(scene.find("hero").unwrap(), &hero));
        assert!(scene.find("ghost").is_none());

        let id = hero.borrow().id();
        let removed = scene.despawn(id).unwrap();
        assert!(Rc::ptr_eq(&removed, &hero));
        assert!(scene.find("hero").is_none());
        assert!(scene.despawn(id).is_none());
    }

    #[test]
    fn lookups_skip_entities_borrowed_elsewhere() {
        let mut scene = Scene::new();
        let hero = scene.spawn(GameEntity::named("hero"));
        let slime = scene.spawn(GameEntity::named("slime"));
        let slime_id = slime.borrow().id();

        let busy = hero.borrow_mut();
        assert!(Rc::ptr_eq(scene.find("slime").unwrap(), &slime));
        assert!(scene.find("hero").is_none());
        assert!(scene.despawn(slime_id).is_some());
        drop(busy);

        assert_eq!(scene.entities.len(), 1);
        assert!(scene.find("hero").is_some());
    }

    #[test]
    fn no_map_means_no_map_collision() {
        let mut entity = GameEntity::named("hero");
        entity.add_collision(0.0, 0.0, 8.0, 8.0);
        assert!(!Scene::new().collides_with_map(&entity));
    }
}
