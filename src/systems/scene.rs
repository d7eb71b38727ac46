//! Scene update and render.
//!
//! - [`tile_texture_system`] attaches textures to tiles that have none yet, so
//!   tiles placed at runtime start loading on the next frame.
//! - [`update_scene`] fans input and update out to the map and every entity.
//! - [`render_scene`] draws the map, then the entities in insertion order.

use bevy_ecs::prelude::*;

use crate::render::RenderContext;
use crate::resources::scene::Scene;
use crate::resources::texturestore::TextureCache;
use crate::resources::worldtime::WorldTime;

pub fn tile_texture_system(scene: NonSend<Scene>, cache: Res<TextureCache>) {
    if let Some(map) = &scene.tilemap {
        let started = map.load_to_game(&cache);
        if started > 0 {
            log::debug!("Started {} tile texture loads", started);
        }
    }
}

pub fn update_scene(scene: NonSend<Scene>, time: Res<WorldTime>) {
    if let Some(map) = &scene.tilemap {
        map.update(&time);
    }
    for entity in &scene.entities {
        let mut entity = entity.borrow_mut();
        entity.input(time.delta);
        entity.update(&time);
    }
}

/// Draw the scene into `ctx`. Called by the driver inside its drawing scope.
pub fn render_scene(world: &World, ctx: &mut dyn RenderContext) {
    let Some(scene) = world.get_non_send_resource::<Scene>() else {
        return;
    };
    if let Some(map) = &scene.tilemap {
        map.render(ctx);
    }
    for entity in &scene.entities {
        entity.borrow_mut().render(ctx);
    }
}
