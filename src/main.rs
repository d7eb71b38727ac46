//! spritegrid demo entry point.
//!
//! Opens a raylib window, loads a level description (tile map plus actors)
//! and runs the frame loop:
//!
//! 1. Advance [`WorldTime`] from raylib's frame time and clock
//! 2. Move the first actor with the arrow keys, undoing moves that hit a
//!    collidable tile
//! 3. With a level loaded, edit it: keys `1`-`9` pick a tile type, the left
//!    mouse button paints it, the right one erases, `S` saves the level file
//! 4. Run the update schedule (tile textures, scene update)
//! 5. Draw the scene through [`RaylibRenderer`] and release unused GPU textures
//!
//! # Running
//!
//! ```sh
//! cargo run --release --features raylib -- --level assets/level01.json
//! ```

// Do not create console on Windows
#![cfg_attr(target_os = "windows", windows_subsystem = "windows")]

use std::path::PathBuf;
use std::process;

use bevy_ecs::prelude::*;
use clap::Parser;
use raylib::ffi::{KeyboardKey, MouseButton};
use raylib::prelude::*;

use spritegrid::entity::EntityRef;
use spritegrid::render::raylib_backend::{GpuTextures, RaylibRenderer};
use spritegrid::resources::gameconfig::GameConfig;
use spritegrid::resources::leveldata::LevelDescription;
use spritegrid::resources::scene::Scene;
use spritegrid::resources::texturestore::TextureCache;
use spritegrid::resources::tilemap::TileMap;
use spritegrid::resources::worldtime::WorldTime;
use spritegrid::systems::scene::{render_scene, tile_texture_system, update_scene};
use spritegrid::systems::time::update_world_time;

/// Pixels per second for the controlled actor.
const PLAYER_SPEED: f32 = 120.0;

/// spritegrid 2D demo
#[derive(Parser)]
#[command(version, about = "Tile map and sprite animation demo")]
struct Cli {
    /// INI configuration file.
    #[arg(long, value_name = "PATH", default_value = "./config.ini")]
    config: PathBuf,

    /// JSON level description. An empty map from the config is used if absent.
    #[arg(long, value_name = "PATH")]
    level: Option<PathBuf>,
}

/// Level being edited and the file it is saved back to.
struct Editor {
    level: LevelDescription,
    path: PathBuf,
    brush: usize,
}

const BRUSH_KEYS: [KeyboardKey; 9] = [
    KeyboardKey::KEY_ONE,
    KeyboardKey::KEY_TWO,
    KeyboardKey::KEY_THREE,
    KeyboardKey::KEY_FOUR,
    KeyboardKey::KEY_FIVE,
    KeyboardKey::KEY_SIX,
    KeyboardKey::KEY_SEVEN,
    KeyboardKey::KEY_EIGHT,
    KeyboardKey::KEY_NINE,
];

impl Editor {
    fn handle_input(&mut self, rl: &RaylibHandle, scene: &mut Scene) {
        for (index, key) in BRUSH_KEYS.iter().enumerate() {
            if rl.is_key_pressed(*key) && index < self.level.tile_types.len() {
                self.brush = index;
                log::info!("Brush: '{}'", self.level.tile_types[index].tile_name);
            }
        }

        let mouse = rl.get_mouse_position();
        if let Some(map) = scene.tilemap.as_mut() {
            if rl.is_mouse_button_down(MouseButton::MOUSE_BUTTON_LEFT) {
                let brush = self.level.tile_types.get(self.brush).map(|t| t.tile_name.as_str());
                if let Some(name) = brush {
                    let _ = map.paint_at(Some(name), mouse.x, mouse.y);
                }
            } else if rl.is_mouse_button_down(MouseButton::MOUSE_BUTTON_RIGHT) {
                let _ = map.paint_at(None, mouse.x, mouse.y);
            }
        }

        if rl.is_key_pressed(KeyboardKey::KEY_S) {
            self.save(scene);
        }
    }

    fn save(&mut self, scene: &Scene) {
        if let Some(map) = &scene.tilemap {
            self.level.capture_layout(map);
        }
        for entity in &scene.entities {
            if let Ok(entity) = entity.try_borrow() {
                self.level.capture_actor(&entity);
            }
        }
        if let Err(e) = self.level.save(&self.path) {
            log::error!("Failed to save level: {}", e);
        }
    }
}

fn build_scene(cli: &Cli, config: &GameConfig, cache: &TextureCache) -> (Scene, Option<Editor>) {
    let empty_map = || {
        TileMap::new(
            config.window_width,
            config.window_height,
            config.map_rows,
            config.map_columns,
        )
        .ok()
    };

    let Some(level_path) = &cli.level else {
        let scene = Scene {
            entities: Vec::new(),
            tilemap: empty_map(),
        };
        return (scene, None);
    };

    let level = match LevelDescription::load(level_path) {
        Ok(level) => level,
        Err(e) => {
            log::error!("Failed to load level: {}", e);
            let scene = Scene {
                entities: Vec::new(),
                tilemap: empty_map(),
            };
            return (scene, None);
        }
    };

    match level.build_scene(cache) {
        Ok(scene) => {
            let editor = Editor {
                level,
                path: level_path.clone(),
                brush: 0,
            };
            (scene, Some(editor))
        }
        Err(e) => {
            log::error!("Invalid level: {}", e);
            (Scene::new(), None)
        }
    }
}

/// Arrow-key movement for `player`. A move that lands on a collidable tile
/// is undone, one axis at a time so the actor can slide along walls.
fn drive_player(rl: &RaylibHandle, scene: &Scene, player: &EntityRef, dt: f32) {
    let step = PLAYER_SPEED * dt;
    let mut dx = 0.0;
    let mut dy = 0.0;
    if rl.is_key_down(KeyboardKey::KEY_LEFT) {
        dx -= step;
    }
    if rl.is_key_down(KeyboardKey::KEY_RIGHT) {
        dx += step;
    }
    if rl.is_key_down(KeyboardKey::KEY_UP) {
        dy -= step;
    }
    if rl.is_key_down(KeyboardKey::KEY_DOWN) {
        dy += step;
    }

    let mut entity = player.borrow_mut();
    for (mx, my) in [(dx, 0.0), (0.0, dy)] {
        if mx == 0.0 && my == 0.0 {
            continue;
        }
        if let Err(e) = entity.move_by(mx, my) {
            log::warn!("Cannot move '{}': {}", entity.name(), e);
            return;
        }
        if scene.collides_with_map(&entity) {
            // both components were present a moment ago
            let _ = entity.move_by(-mx, -my);
        }
    }

    if dx < 0.0 {
        entity.set_flip(true);
    } else if dx > 0.0 {
        entity.set_flip(false);
    }

    let moving = dx != 0.0 || dy != 0.0;
    let wanted = if moving { "walk" } else { "idle" };
    let has_strip = entity
        .animations()
        .is_some_and(|set| set.get_animation(wanted).is_some());
    if has_strip && entity.state() != wanted {
        entity.set_state(wanted);
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = GameConfig::with_path(&cli.config);
    if let Err(e) = config.load_from_file() {
        log::warn!("{}; using defaults", e);
    }

    let (mut rl, thread) = raylib::init()
        .size(config.window_width as i32, config.window_height as i32)
        .title(&config.title)
        .build();
    rl.set_target_fps(config.target_fps);

    // --------------- ECS world + resources ---------------
    let cache = TextureCache::new(config.color_key());
    let (scene, mut editor) = build_scene(&cli, &config, &cache);
    let player = scene.entities.first().cloned();
    if scene.tilemap.is_none() {
        log::error!("No tile map to show");
        process::exit(1);
    }

    let mut world = World::new();
    world.insert_resource(WorldTime::default().with_time_scale(1.0));
    world.insert_resource(config);
    world.insert_resource(cache);
    world.insert_non_send_resource(scene);

    let mut update = Schedule::default();
    update.add_systems(tile_texture_system);
    update.add_systems(update_scene.after(tile_texture_system));
    if let Err(e) = update.initialize(&mut world) {
        log::error!("Failed to initialize schedule: {}", e);
        process::exit(1);
    }

    let mut gpu = GpuTextures::new();

    // --------------- Main loop ---------------
    while !rl.window_should_close() {
        let dt = rl.get_frame_time();
        let ticks_ms = (rl.get_time() * 1000.0) as u64;
        update_world_time(&mut world, dt, ticks_ms);

        if let Some(player) = &player {
            let scene = world.non_send_resource::<Scene>();
            drive_player(&rl, scene, player, world.resource::<WorldTime>().delta);
        }
        if let Some(editor) = editor.as_mut() {
            let mut scene = world.non_send_resource_mut::<Scene>();
            editor.handle_input(&rl, &mut scene);
        }

        update.run(&mut world);

        {
            let mut d = rl.begin_drawing(&thread);
            d.clear_background(Color::BLACK);
            let mut renderer = RaylibRenderer::new(&mut d, &thread, &mut gpu, ticks_ms);
            render_scene(&world, &mut renderer);
        }
        gpu.collect_garbage();
    }
    log::info!(
        "Window closed, {} textures still cached",
        world.resource::<TextureCache>().len()
    );
}
