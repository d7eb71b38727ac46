use log::debug;

use crate::components::Owner;
use crate::entity::EntityId;
use crate::render::{PLACEHOLDER_COLOR, RenderContext};
use crate::resources::texturestore::{LazyTexture, TextureCache, TextureHandle};

/// Draws one whole image stretched over the entity's transform.
///
/// The image load starts when the component is created and is waited for on
/// the first render. Without a texture (never started or failed) only the
/// outline of the transform is drawn.
#[derive(Debug, Default)]
pub struct TextureComponent {
    texture: LazyTexture,
    owner: Option<EntityId>,
}

impl TextureComponent {
    /// Start loading `path` through `cache` in the background.
    pub fn new(cache: &TextureCache, path: impl Into<String>) -> Self {
        Self::from_lazy(LazyTexture::start(cache, path))
    }

    pub fn from_lazy(texture: LazyTexture) -> Self {
        Self {
            texture,
            owner: None,
        }
    }

    pub fn path(&self) -> &str {
        self.texture.path()
    }

    /// The texture if already resolved.
    pub fn texture(&self) -> Option<&TextureHandle> {
        self.texture.texture()
    }

    /// Block until the background load is done.
    pub fn ensure_ready(&mut self) -> Option<&TextureHandle> {
        self.texture.resolve()
    }

    pub fn owner(&self) -> Option<EntityId> {
        self.owner
    }

    pub(crate) fn set_owner(&mut self, owner: EntityId) {
        self.owner = Some(owner);
    }

    pub fn render(&mut self, owner: &Owner<'_>, ctx: &mut dyn RenderContext) {
        let Some(dest) = owner.transform else {
            debug!("Entity {:?} has a texture but no transform", owner.id);
            return;
        };
        match self.texture.resolve() {
            Some(texture) => ctx.draw_texture(texture, None, dest, 0.0, false),
            None => ctx.draw_rect(dest, PLACEHOLDER_COLOR, false),
        }
    }
}
