//! Game configuration resource.
//!
//! Settings loaded from an INI configuration file, with defaults for a safe
//! startup and methods to load/save the file.
//!
//! # Configuration File Format
//!
//! ```ini
//! [window]
//! width = 640
//! height = 640
//! target_fps = 60
//! title = spritegrid
//!
//! [map]
//! rows = 20
//! columns = 20
//!
//! [textures]
//! color_key_r = 0
//! color_key_g = 0
//! color_key_b = 0
//! ```

use bevy_ecs::prelude::*;
use configparser::ini::Ini;
use log::info;
use std::path::PathBuf;

use crate::render::Color;

/// Default safe values for startup
const DEFAULT_WINDOW_WIDTH: u32 = 640;
const DEFAULT_WINDOW_HEIGHT: u32 = 640;
const DEFAULT_TARGET_FPS: u32 = 60;
const DEFAULT_TITLE: &str = "spritegrid";
const DEFAULT_MAP_ROWS: usize = 20;
const DEFAULT_MAP_COLUMNS: usize = 20;
const DEFAULT_COLOR_KEY: Color = Color::BLACK;
const DEFAULT_CONFIG_PATH: &str = "./config.ini";

/// Game configuration resource.
#[derive(Resource, Debug, Clone)]
pub struct GameConfig {
    /// Window width in pixels. Also the default tile map width.
    pub window_width: u32,
    /// Window height in pixels. Also the default tile map height.
    pub window_height: u32,
    /// Target frames per second.
    pub target_fps: u32,
    pub title: String,
    /// Default tile map row count.
    pub map_rows: usize,
    /// Default tile map column count.
    pub map_columns: usize,
    /// Color made transparent when images are loaded.
    pub color_key: Color,
    /// Path to the configuration file.
    pub config_path: PathBuf,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl GameConfig {
    /// Create a new configuration with safe default values.
    pub fn new() -> Self {
        Self {
            window_width: DEFAULT_WINDOW_WIDTH,
            window_height: DEFAULT_WINDOW_HEIGHT,
            target_fps: DEFAULT_TARGET_FPS,
            title: DEFAULT_TITLE.to_string(),
            map_rows: DEFAULT_MAP_ROWS,
            map_columns: DEFAULT_MAP_COLUMNS,
            color_key: DEFAULT_COLOR_KEY,
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
        }
    }

    /// Create a new configuration with a custom config file path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            ..Self::new()
        }
    }

    /// Load configuration from the INI file.
    ///
    /// Missing values retain their current (default) values.
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(&mut self) -> Result<(), String> {
        let mut config = Ini::new();
        config
            .load(&self.config_path)
            .map_err(|e| format!("Failed to load config file: {}", e))?;

        // [window] section
        if let Some(width) = config.getuint("window", "width").ok().flatten() {
            self.window_width = width as u32;
        }
        if let Some(height) = config.getuint("window", "height").ok().flatten() {
            self.window_height = height as u32;
        }
        if let Some(fps) = config.getuint("window", "target_fps").ok().flatten() {
            self.target_fps = fps as u32;
        }
        if let Some(title) = config.get("window", "title") {
            self.title = title;
        }

        // [map] section
        if let Some(rows) = config.getuint("map", "rows").ok().flatten() {
            self.map_rows = rows as usize;
        }
        if let Some(columns) = config.getuint("map", "columns").ok().flatten() {
            self.map_columns = columns as usize;
        }

        // [textures] section
        let channel = |key: &str, current: u8| {
            config
                .getuint("textures", key)
                .ok()
                .flatten()
                .map_or(current, |v| v.min(255) as u8)
        };
        self.color_key = Color::rgb(
            channel("color_key_r", self.color_key.r),
            channel("color_key_g", self.color_key.g),
            channel("color_key_b", self.color_key.b),
        );

        info!(
            "Loaded config: {}x{} window '{}', fps={}, map {}x{}, color key {:?}",
            self.window_width,
            self.window_height,
            self.title,
            self.target_fps,
            self.map_rows,
            self.map_columns,
            self.color_key
        );

        Ok(())
    }

    /// Save configuration to the INI file.
    ///
    /// Creates the file if it doesn't exist.
    pub fn save_to_file(&self) -> Result<(), String> {
        let mut config = Ini::new();

        // [window] section
        config.set("window", "width", Some(self.window_width.to_string()));
        config.set("window", "height", Some(self.window_height.to_string()));
        config.set("window", "target_fps", Some(self.target_fps.to_string()));
        config.set("window", "title", Some(self.title.clone()));

        // [map] section
        config.set("map", "rows", Some(self.map_rows.to_string()));
        config.set("map", "columns", Some(self.map_columns.to_string()));

        // [textures] section
        config.set("textures", "color_key_r", Some(self.color_key.r.to_string()));
        config.set("textures", "color_key_g", Some(self.color_key.g.to_string()));
        config.set("textures", "color_key_b", Some(self.color_key.b.to_string()));

        config
            .write(&self.config_path)
            .map_err(|e| format!("Failed to save config file: {}", e))?;

        info!("Saved config to {:?}", self.config_path);

        Ok(())
    }

    /// Set window size.
    pub fn set_window_size(&mut self, width: u32, height: u32) {
        self.window_width = width;
        self.window_height = height;
    }

    /// Get the window size.
    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }

    pub fn color_key(&self) -> Color {
        self.color_key
    }
}
