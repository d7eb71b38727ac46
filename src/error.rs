//! Error types shared across the engine.
//!
//! Every failure path in the engine is "log and continue": the operation is
//! skipped and the error is returned so callers may inspect it or ignore it.
//! Nothing here is used for control flow inside the frame loop.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::components::ComponentKind;

/// Failures while loading or sharing a texture.
#[derive(Debug, Error)]
pub enum TextureError {
    #[error("failed to decode image '{path}': {source}")]
    Decode {
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to spawn loader thread for '{path}': {source}")]
    WorkerSpawn {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("loader thread for '{path}' exited without a result")]
    WorkerLost { path: String },
    #[error("texture cache lock is poisoned")]
    CachePoisoned,
}

/// Failures of entity operations that need a specific component.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EntityError {
    #[error("entity has no {0:?} component")]
    MissingComponent(ComponentKind),
}

/// Failures of tile map grid operations.
#[derive(Debug, Error, PartialEq)]
pub enum TileMapError {
    #[error("tile map needs at least one row and one column (got {rows}x{columns})")]
    InvalidDimensions { rows: usize, columns: usize },
    #[error("cell ({row}, {column}) is outside the {rows}x{columns} grid")]
    OutOfBounds {
        row: usize,
        column: usize,
        rows: usize,
        columns: usize,
    },
    #[error("pixel ({x}, {y}) is outside the map")]
    OutsideMap { x: f32, y: f32 },
    #[error("unknown tile type '{0}'")]
    UnknownTileType(String),
}

/// Failures while reading a level description.
#[derive(Debug, Error)]
pub enum LevelError {
    #[error("failed to read level file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid level description: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    TileMap(#[from] TileMapError),
}
