//! Grid of tile entities.
//!
//! A [`TileMap`] divides a pixel area into `rows x columns` equal cells
//! (integer division; any remainder is dropped) and stores at most one entity
//! per cell. Tiles are stamped from named [`TileRecord`] prototypes.
//!
//! Placing a tile only gives it geometry. Textures are attached later in one
//! go by [`TileMap::load_to_game`], so the image loads of every tile run in
//! the background at the same time.

use log::warn;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::components::geometry::Rect;
use crate::entity::{EntityRef, GameEntity};
use crate::error::TileMapError;
use crate::render::RenderContext;
use crate::resources::texturestore::TextureCache;
use crate::resources::worldtime::WorldTime;

/// Prototype for a kind of tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileRecord {
    /// Image drawn for the tile. Placed tiles carry it as their name.
    pub filepath: String,
    /// Whether placed tiles get a collision box.
    pub collidable: bool,
}

/// A cell's occupant and the prototype it was stamped from.
#[derive(Debug)]
struct PlacedTile {
    tile_type: String,
    entity: EntityRef,
}

#[derive(Debug)]
pub struct TileMap {
    map_width: u32,
    map_height: u32,
    rows: usize,
    columns: usize,
    tile_width: u32,
    tile_height: u32,
    tile_types: FxHashMap<String, TileRecord>,
    cells: Vec<Vec<Option<PlacedTile>>>,
}

impl TileMap {
    /// Empty map of `rows x columns` cells covering `map_width x map_height`
    /// pixels.
    pub fn new(
        map_width: u32,
        map_height: u32,
        rows: usize,
        columns: usize,
    ) -> Result<Self, TileMapError> {
        if rows == 0 || columns == 0 {
            return Err(TileMapError::InvalidDimensions { rows, columns });
        }
        Ok(Self {
            map_width,
            map_height,
            rows,
            columns,
            tile_width: map_width / columns as u32,
            tile_height: map_height / rows as u32,
            tile_types: FxHashMap::default(),
            cells: (0..rows)
                .map(|_| (0..columns).map(|_| None).collect())
                .collect(),
        })
    }

    pub fn map_width(&self) -> u32 {
        self.map_width
    }

    pub fn map_height(&self) -> u32 {
        self.map_height
    }

    pub fn tile_width(&self) -> u32 {
        self.tile_width
    }

    pub fn tile_height(&self) -> u32 {
        self.tile_height
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Register or replace the prototype called `name`.
    pub fn add_tile_type(
        &mut self,
        name: impl Into<String>,
        filepath: impl Into<String>,
        collidable: bool,
    ) {
        self.tile_types.insert(
            name.into(),
            TileRecord {
                filepath: filepath.into(),
                collidable,
            },
        );
    }

    pub fn tile_type(&self, name: &str) -> Option<&TileRecord> {
        self.tile_types.get(name)
    }

    fn check_bounds(&self, row: usize, column: usize) -> Result<(), TileMapError> {
        if row >= self.rows || column >= self.columns {
            let err = TileMapError::OutOfBounds {
                row,
                column,
                rows: self.rows,
                columns: self.columns,
            };
            warn!("Invalid tile position: {}", err);
            return Err(err);
        }
        Ok(())
    }

    /// Pixel rectangle covered by a cell.
    pub fn cell_rect(&self, row: usize, column: usize) -> Rect {
        Rect::new(
            (column as u32 * self.tile_width) as f32,
            (row as u32 * self.tile_height) as f32,
            self.tile_width as f32,
            self.tile_height as f32,
        )
    }

    /// Cell under a pixel position, if inside the grid.
    pub fn cell_at(&self, x: f32, y: f32) -> Option<(usize, usize)> {
        if x < 0.0 || y < 0.0 || self.tile_width == 0 || self.tile_height == 0 {
            return None;
        }
        let column = (x / self.tile_width as f32) as usize;
        let row = (y / self.tile_height as f32) as usize;
        (row < self.rows && column < self.columns).then_some((row, column))
    }

    /// Stamp a new tile entity from prototype `name` into a cell, replacing
    /// the previous occupant.
    ///
    /// On invalid coordinates or an unknown name the map is left unchanged.
    pub fn place_tile_at(
        &mut self,
        name: &str,
        row: usize,
        column: usize,
    ) -> Result<(), TileMapError> {
        self.check_bounds(row, column)?;
        let Some(record) = self.tile_types.get(name) else {
            warn!("Tile type '{}' not found", name);
            return Err(TileMapError::UnknownTileType(name.to_string()));
        };

        let rect = self.cell_rect(row, column);
        let mut tile = GameEntity::named(record.filepath.clone());
        tile.add_transform(rect.x, rect.y, rect.width, rect.height);
        if record.collidable {
            tile.add_collision(rect.x, rect.y, rect.width, rect.height);
        }
        self.cells[row][column] = Some(PlacedTile {
            tile_type: name.to_string(),
            entity: tile.shared(),
        });
        Ok(())
    }

    /// Clear a cell and hand back whatever occupied it.
    pub fn erase_tile_at(
        &mut self,
        row: usize,
        column: usize,
    ) -> Result<Option<EntityRef>, TileMapError> {
        self.check_bounds(row, column)?;
        Ok(self.cells[row][column].take().map(|placed| placed.entity))
    }

    /// Place `tile_type` (or clear the cell when `None`) at the cell under a
    /// pixel position. Returns the cell that was edited.
    pub fn paint_at(
        &mut self,
        tile_type: Option<&str>,
        x: f32,
        y: f32,
    ) -> Result<(usize, usize), TileMapError> {
        let Some((row, column)) = self.cell_at(x, y) else {
            let err = TileMapError::OutsideMap { x, y };
            warn!("Invalid tile position: {}", err);
            return Err(err);
        };
        match tile_type {
            Some(name) => self.place_tile_at(name, row, column)?,
            None => {
                self.erase_tile_at(row, column)?;
            }
        }
        Ok((row, column))
    }

    pub fn tile_at(&self, row: usize, column: usize) -> Option<&EntityRef> {
        self.placed(row, column).map(|placed| &placed.entity)
    }

    /// Name of the prototype the tile in a cell was stamped from.
    pub fn tile_type_at(&self, row: usize, column: usize) -> Option<&str> {
        self.placed(row, column).map(|placed| placed.tile_type.as_str())
    }

    fn placed(&self, row: usize, column: usize) -> Option<&PlacedTile> {
        self.cells.get(row)?.get(column)?.as_ref()
    }

    /// Occupied cells as `(row, column, entity)`.
    pub fn occupied(&self) -> impl Iterator<Item = (usize, usize, &EntityRef)> {
        self.cells.iter().enumerate().flat_map(|(row, cells)| {
            cells
                .iter()
                .enumerate()
                .filter_map(move |(column, cell)| {
                    cell.as_ref().map(|placed| (row, column, &placed.entity))
                })
        })
    }

    pub fn occupied_count(&self) -> usize {
        self.occupied().count()
    }

    /// Attach a texture to every placed tile that has none yet, using the
    /// tile's name as the image path. Returns how many loads were started.
    pub fn load_to_game(&self, cache: &TextureCache) -> usize {
        let mut started = 0;
        for (_, _, tile) in self.occupied() {
            let mut tile = tile.borrow_mut();
            if tile.texture().is_none() {
                let path = tile.name().to_string();
                tile.add_texture(cache, path);
                started += 1;
            }
        }
        started
    }

    /// Whether any collidable tile overlaps `target`'s collision box.
    pub fn has_collision_with(&self, target: &GameEntity) -> bool {
        self.occupied().any(|(_, _, tile)| {
            let tile = tile.borrow();
            tile.is_collidable() && target.is_colliding_with(&tile)
        })
    }

    pub fn update(&self, time: &WorldTime) {
        for (_, _, tile) in self.occupied() {
            let mut tile = tile.borrow_mut();
            tile.input(time.delta);
            tile.update(time);
        }
    }

    /// Draw every placed tile. No particular order.
    pub fn render(&self, ctx: &mut dyn RenderContext) {
        for (_, _, tile) in self.occupied() {
            tile.borrow_mut().render(ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TextureError;
    use crate::render::Color;
    use crate::resources::texturestore::{ImageData, ImageLoader};
    use std::rc::Rc;
    use std::sync::Arc;

    struct SolidLoader;

    impl ImageLoader for SolidLoader {
        fn load(&self, _path: &str, _key: Color) -> Result<ImageData, TextureError> {
            Ok(ImageData::filled(1, 1, Color::GREEN))
        }
    }

    fn two_by_two() -> TileMap {
        let mut map = TileMap::new(64, 64, 2, 2).unwrap();
        map.add_tile_type("grass", "grass.bmp", false);
        map.add_tile_type("wall", "wall.bmp", true);
        map
    }

    fn boxed_entity(x: f32, y: f32, size: f32) -> GameEntity {
        let mut e = GameEntity::new();
        e.add_transform(x, y, size, size);
        e.add_collision(x, y, size, size);
        e
    }

    #[test]
    fn zero_rows_or_columns_is_rejected() {
        assert_eq!(
            TileMap::new(64, 64, 0, 2).unwrap_err(),
            TileMapError::InvalidDimensions {
                rows: 0,
                columns: 2
            }
        );
        assert!(TileMap::new(64, 64, 2, 0).is_err());
    }

    #[test]
    fn tile_size_truncates() {
        let map = TileMap::new(100, 50, 3, 3).unwrap();
        assert_eq!(map.tile_width(), 33);
        assert_eq!(map.tile_height(), 16);
        assert_eq!(map.cell_rect(2, 2), Rect::new(66.0, 32.0, 33.0, 16.0));
    }

    #[test]
    fn placed_tile_gets_geometry_and_name() {
        let mut map = two_by_two();
        map.place_tile_at("wall", 1, 0).unwrap();
        let tile = map.tile_at(1, 0).unwrap().borrow();
        assert_eq!(tile.name(), "wall.bmp");
        assert_eq!(tile.transform().unwrap().rect(), Rect::new(0.0, 32.0, 32.0, 32.0));
        assert_eq!(tile.collision().unwrap().rect(), Rect::new(0.0, 32.0, 32.0, 32.0));
        assert!(tile.texture().is_none());
    }

    #[test]
    fn non_collidable_tile_has_no_collision_box() {
        let mut map = two_by_two();
        map.place_tile_at("grass", 0, 1).unwrap();
        assert!(!map.tile_at(0, 1).unwrap().borrow().is_collidable());
    }

    #[test]
    fn out_of_range_placement_changes_nothing() {
        let mut map = two_by_two();
        assert!(matches!(
            map.place_tile_at("wall", 2, 0),
            Err(TileMapError::OutOfBounds { .. })
        ));
        assert!(map.place_tile_at("wall", 0, 5).is_err());
        assert_eq!(map.occupied_count(), 0);
    }

    #[test]
    fn unknown_tile_type_changes_nothing() {
        let mut map = two_by_two();
        assert_eq!(
            map.place_tile_at("lava", 0, 0),
            Err(TileMapError::UnknownTileType("lava".to_string()))
        );
        assert!(map.tile_at(0, 0).is_none());
    }

    #[test]
    fn placing_replaces_and_drops_previous_tile() {
        let mut map = two_by_two();
        map.place_tile_at("grass", 0, 0).unwrap();
        let old = Rc::downgrade(map.tile_at(0, 0).unwrap());
        map.place_tile_at("wall", 0, 0).unwrap();
        assert!(old.upgrade().is_none());
        assert_eq!(map.tile_at(0, 0).unwrap().borrow().name(), "wall.bmp");
    }

    #[test]
    fn erase_clears_cell_but_outside_holders_keep_entity() {
        let mut map = two_by_two();
        map.place_tile_at("wall", 1, 1).unwrap();
        let held = Rc::clone(map.tile_at(1, 1).unwrap());
        let removed = map.erase_tile_at(1, 1).unwrap();
        assert!(removed.is_some());
        assert!(map.tile_at(1, 1).is_none());
        assert_eq!(held.borrow().name(), "wall.bmp");
        assert!(map.erase_tile_at(3, 3).is_err());
    }

    #[test]
    fn cell_at_maps_pixels_to_cells() {
        let map = two_by_two();
        assert_eq!(map.cell_at(0.0, 0.0), Some((0, 0)));
        assert_eq!(map.cell_at(40.0, 10.0), Some((0, 1)));
        assert_eq!(map.cell_at(63.9, 63.9), Some((1, 1)));
        assert_eq!(map.cell_at(64.0, 0.0), None);
        assert_eq!(map.cell_at(-1.0, 0.0), None);
    }

    #[test]
    fn tile_type_at_follows_place_and_erase() {
        let mut map = two_by_two();
        map.place_tile_at("wall", 0, 1).unwrap();
        assert_eq!(map.tile_type_at(0, 1), Some("wall"));
        map.place_tile_at("grass", 0, 1).unwrap();
        assert_eq!(map.tile_type_at(0, 1), Some("grass"));
        map.erase_tile_at(0, 1).unwrap();
        assert_eq!(map.tile_type_at(0, 1), None);
        assert_eq!(map.tile_type_at(9, 9), None);
    }

    #[test]
    fn paint_at_edits_the_cell_under_the_cursor() {
        let mut map = two_by_two();
        assert_eq!(map.paint_at(Some("wall"), 40.0, 10.0), Ok((0, 1)));
        assert_eq!(map.tile_type_at(0, 1), Some("wall"));
        assert_eq!(map.paint_at(None, 33.0, 31.0), Ok((0, 1)));
        assert!(map.tile_at(0, 1).is_none());

        assert_eq!(
            map.paint_at(Some("wall"), 70.0, 10.0),
            Err(TileMapError::OutsideMap { x: 70.0, y: 10.0 })
        );
        assert_eq!(
            map.paint_at(Some("lava"), 1.0, 1.0),
            Err(TileMapError::UnknownTileType("lava".to_string()))
        );
        assert_eq!(map.occupied_count(), 0);
    }

    #[test]
    fn empty_or_walkable_map_never_collides() {
        let mut map = two_by_two();
        let target = boxed_entity(0.0, 0.0, 64.0);
        assert!(!map.has_collision_with(&target));
        map.place_tile_at("grass", 0, 0).unwrap();
        map.place_tile_at("grass", 1, 1).unwrap();
        assert!(!map.has_collision_with(&target));
    }

    #[test]
    fn wall_and_grass_scenario() {
        let mut map = two_by_two();
        map.place_tile_at("wall", 0, 0).unwrap();
        map.place_tile_at("grass", 0, 1).unwrap();
        map.place_tile_at("grass", 1, 0).unwrap();
        map.place_tile_at("grass", 1, 1).unwrap();

        let mut hero = boxed_entity(0.0, 0.0, 16.0);
        assert!(map.has_collision_with(&hero));
        hero.move_by(48.0, 48.0).unwrap();
        assert!(!map.has_collision_with(&hero));
    }

    #[test]
    fn load_to_game_attaches_shared_textures_once() {
        let mut map = two_by_two();
        map.place_tile_at("wall", 0, 0).unwrap();
        map.place_tile_at("wall", 0, 1).unwrap();
        map.place_tile_at("grass", 1, 1).unwrap();
        let cache = TextureCache::with_loader(SolidLoader, Color::BLACK);

        assert_eq!(map.load_to_game(&cache), 3);
        assert_eq!(map.load_to_game(&cache), 0);

        let first = Arc::clone(
            map.tile_at(0, 0)
                .unwrap()
                .borrow_mut()
                .texture_mut()
                .unwrap()
                .ensure_ready()
                .unwrap(),
        );
        let second = Arc::clone(
            map.tile_at(0, 1)
                .unwrap()
                .borrow_mut()
                .texture_mut()
                .unwrap()
                .ensure_ready()
                .unwrap(),
        );
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.path(), "wall.bmp");
        assert_eq!(cache.len(), 2);
    }
}
