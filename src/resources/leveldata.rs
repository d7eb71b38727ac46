//! Level descriptions loaded from JSON.
//!
//! A level file lists the tile prototypes, a grid layout referencing them by
//! 1-based index (0 means an empty cell), and the actors placed on the map
//! with their animation strips. Edited maps and moved actors can be captured
//! back into the description and saved.
//!
//! ```json
//! {
//!   "map_width": 64, "map_height": 64, "rows": 2, "columns": 2,
//!   "tile_types": [
//!     { "tile_name": "grass", "filepath": "assets/grass.bmp", "collidable": false },
//!     { "tile_name": "wall",  "filepath": "assets/wall.bmp",  "collidable": true }
//!   ],
//!   "map_layout": [[2, 1], [1, 0]],
//!   "actors": []
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::components::animation::{FrameConfig, SingleAnimation};
use crate::components::geometry::Rect;
use crate::entity::GameEntity;
use crate::error::{LevelError, TileMapError};
use crate::resources::scene::Scene;
use crate::resources::texturestore::TextureCache;
use crate::resources::tilemap::TileMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileTypeDesc {
    pub tile_name: String,
    pub filepath: String,
    #[serde(default)]
    pub collidable: bool,
}

/// One animation strip of an actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationDesc {
    pub filepath: String,
    #[serde(flatten)]
    pub frames: FrameConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorDesc {
    pub name: String,
    /// Initial state, selecting the first animation played.
    #[serde(default)]
    pub state: String,
    pub transform: Rect,
    #[serde(default)]
    pub collider: Option<Rect>,
    #[serde(default)]
    pub animations: BTreeMap<String, AnimationDesc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelDescription {
    pub map_width: u32,
    pub map_height: u32,
    pub rows: usize,
    pub columns: usize,
    pub tile_types: Vec<TileTypeDesc>,
    /// `map_layout[row][column]`: 0 for empty, `n` for `tile_types[n - 1]`.
    pub map_layout: Vec<Vec<usize>>,
    #[serde(default)]
    pub actors: Vec<ActorDesc>,
}

impl LevelDescription {
    pub fn from_json_str(json: &str) -> Result<Self, LevelError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, LevelError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| LevelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let level = Self::from_json_str(&json)?;
        info!(
            "Loaded level {:?}: {}x{} tiles, {} actors",
            path,
            level.rows,
            level.columns,
            level.actors.len()
        );
        Ok(level)
    }

    /// Write the description as pretty-printed JSON, replacing `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), LevelError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|source| LevelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Saved level to {:?}", path);
        Ok(())
    }

    /// Rewrite the grid fields and `map_layout` from an edited map.
    ///
    /// Cells hold the 1-based index of their tile type in `tile_types`.
    /// Tiles whose type is not listed there are logged and saved as empty.
    pub fn capture_layout(&mut self, map: &TileMap) {
        self.map_width = map.map_width();
        self.map_height = map.map_height();
        self.rows = map.rows();
        self.columns = map.columns();
        self.map_layout = (0..map.rows())
            .map(|row| {
                (0..map.columns())
                    .map(|column| {
                        let Some(name) = map.tile_type_at(row, column) else {
                            return 0;
                        };
                        match self.tile_types.iter().position(|t| t.tile_name == name) {
                            Some(index) => index + 1,
                            None => {
                                warn!(
                                    "Tile type '{}' at ({}, {}) is not in the level, saving as empty",
                                    name, row, column
                                );
                                0
                            }
                        }
                    })
                    .collect()
            })
            .collect();
    }

    /// Copy an actor's current transform and collider back into the actor
    /// description of the same name. Returns false if there is none.
    pub fn capture_actor(&mut self, entity: &GameEntity) -> bool {
        let Some(actor) = self.actors.iter_mut().find(|a| a.name == entity.name()) else {
            warn!("Actor '{}' is not in the level", entity.name());
            return false;
        };
        if let Some(transform) = entity.transform() {
            actor.transform = transform.rect();
        }
        actor.collider = entity.collision().map(|c| c.rect());
        true
    }

    /// Build the tile map: register every tile type and place the layout.
    ///
    /// Layout entries pointing past the tile type list, or cells outside the
    /// grid, are logged and skipped. Textures are not attached; call
    /// [`TileMap::load_to_game`] afterwards.
    pub fn build_tilemap(&self) -> Result<TileMap, TileMapError> {
        let mut map = TileMap::new(self.map_width, self.map_height, self.rows, self.columns)?;
        for tile in &self.tile_types {
            map.add_tile_type(tile.tile_name.clone(), tile.filepath.clone(), tile.collidable);
        }

        for (row, cells) in self.map_layout.iter().enumerate() {
            for (column, &index) in cells.iter().enumerate() {
                if index == 0 {
                    continue;
                }
                let Some(tile) = self.tile_types.get(index - 1) else {
                    warn!(
                        "Layout cell ({}, {}) refers to unknown tile index {}",
                        row, column, index
                    );
                    continue;
                };
                // already logged by the map
                let _ = map.place_tile_at(&tile.tile_name, row, column);
            }
        }
        Ok(map)
    }

    /// Build an actor entity: transform, optional collider and animation
    /// strips whose sheets start loading immediately.
    pub fn build_actor(actor: &ActorDesc, cache: &TextureCache) -> GameEntity {
        let mut entity = GameEntity::named(actor.name.clone());
        entity.set_state(actor.state.clone());
        let t = actor.transform;
        entity.add_transform(t.x, t.y, t.width, t.height);
        if let Some(c) = actor.collider {
            entity.add_collision(c.x, c.y, c.width, c.height);
        }
        for (state, desc) in &actor.animations {
            let anim = SingleAnimation::with_texture(cache, desc.filepath.clone())
                .with_frames(desc.frames);
            entity.add_animation(state.clone(), anim);
        }
        entity
    }

    pub fn build_actors(&self, cache: &TextureCache) -> Vec<GameEntity> {
        self.actors
            .iter()
            .map(|actor| Self::build_actor(actor, cache))
            .collect()
    }

    /// Tile map plus every actor, ready to insert as the scene resource.
    pub fn build_scene(&self, cache: &TextureCache) -> Result<Scene, LevelError> {
        let mut scene = Scene::with_tilemap(self.build_tilemap()?);
        for actor in self.build_actors(cache) {
            scene.spawn(actor);
        }
        Ok(scene)
    }
}
