//! Shared texture cache and asynchronous texture handles.
//!
//! [`TextureCache`] decodes every distinct image path once and hands out
//! reference-counted [`TextureHandle`]s afterwards. Clones of the cache share
//! the same store, so it can be inserted into the ECS world as a resource and
//! handed to loader threads at the same time.
//!
//! [`LazyTexture`] is the per-component future: the load starts on a worker
//! thread as soon as a texture or animation component is created and is only
//! waited for when the component first needs to draw.
//!
//! Decoding happens here (CPU side). Uploading to the GPU is the render
//! backend's job and happens on the main thread the first time a texture is
//! drawn.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::thread;

use bevy_ecs::prelude::Resource;
use crossbeam_channel::{Receiver, bounded};
use log::{debug, error, info};
use rustc_hash::FxHashMap;

use crate::error::TextureError;
use crate::render::Color;

/// Decoded RGBA8 pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    /// Row-major RGBA bytes, `width * height * 4` long.
    pub pixels: Vec<u8>,
}

impl ImageData {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Bytes needed for `width x height` RGBA pixels.
    pub fn byte_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * 4
    }

    /// Single-color image, handy for placeholders and tests.
    pub fn filled(width: u32, height: u32, color: Color) -> Self {
        let pixels = [color.r, color.g, color.b, color.a]
            .iter()
            .copied()
            .cycle()
            .take(Self::byte_len(width, height))
            .collect();
        Self::new(width, height, pixels)
    }

    /// Make every pixel whose RGB equals `key` fully transparent.
    pub fn apply_color_key(&mut self, key: Color) {
        for px in self.pixels.chunks_exact_mut(4) {
            if px[0] == key.r && px[1] == key.g && px[2] == key.b {
                px[3] = 0;
            }
        }
    }
}

/// Turns an image path into pixels with the color key already cut out.
pub trait ImageLoader: Send + Sync {
    fn load(&self, path: &str, color_key: Color) -> Result<ImageData, TextureError>;
}

/// Reads BMP or PNG files from disk with the `image` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileImageLoader;

impl ImageLoader for FileImageLoader {
    fn load(&self, path: &str, color_key: Color) -> Result<ImageData, TextureError> {
        let img = image::open(path).map_err(|source| TextureError::Decode {
            path: path.to_string(),
            source,
        })?;
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        let mut data = ImageData::new(width, height, rgba.into_raw());
        data.apply_color_key(color_key);
        Ok(data)
    }
}

/// Process-unique texture identifier, used by render backends to key their
/// GPU-side copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(u64);

static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

/// A decoded texture, shared between every component that draws it.
#[derive(Debug)]
pub struct Texture {
    id: TextureId,
    path: String,
    image: ImageData,
}

impl Texture {
    pub fn new(path: impl Into<String>, image: ImageData) -> Self {
        Self {
            id: TextureId(NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed)),
            path: path.into(),
            image,
        }
    }

    pub fn id(&self) -> TextureId {
        self.id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn image(&self) -> &ImageData {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width
    }

    pub fn height(&self) -> u32 {
        self.image.height
    }
}

pub type TextureHandle = Arc<Texture>;

/// Whether anything besides its [`TextureCache`] entry still holds the
/// texture behind `texture`.
///
/// Cache entries are never evicted, so the cache's own reference is ignored.
/// Render backends use this to free GPU copies nothing draws anymore.
pub fn in_use(texture: &Weak<Texture>) -> bool {
    texture.strong_count() > 1
}

/// Load-once store of textures keyed by file path.
///
/// A single mutex guards the whole check-decode-insert sequence, so two
/// threads asking for the same path never decode it twice. Entries are never
/// evicted. Failed loads are not remembered and will be retried on the next
/// request.
#[derive(Resource, Clone)]
pub struct TextureCache {
    textures: Arc<Mutex<FxHashMap<String, TextureHandle>>>,
    loader: Arc<dyn ImageLoader>,
    color_key: Color,
}

impl fmt::Debug for TextureCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextureCache")
            .field("len", &self.len())
            .field("color_key", &self.color_key)
            .finish()
    }
}

impl TextureCache {
    /// Cache reading files from disk.
    pub fn new(color_key: Color) -> Self {
        Self::with_loader(FileImageLoader, color_key)
    }

    pub fn with_loader(loader: impl ImageLoader + 'static, color_key: Color) -> Self {
        Self {
            textures: Arc::new(Mutex::new(FxHashMap::default())),
            loader: Arc::new(loader),
            color_key,
        }
    }

    pub fn color_key(&self) -> Color {
        self.color_key
    }

    /// Return the shared texture for `path`, decoding it on first request.
    pub fn load_texture(&self, path: &str) -> Result<TextureHandle, TextureError> {
        let mut textures = self
            .textures
            .lock()
            .map_err(|_| TextureError::CachePoisoned)?;

        if let Some(texture) = textures.get(path) {
            debug!("Reused texture resource {}", path);
            return Ok(Arc::clone(texture));
        }

        let image = self.loader.load(path, self.color_key).inspect_err(|e| {
            error!("Failed to load texture: {}", e);
        })?;
        let texture = Arc::new(Texture::new(path, image));
        textures.insert(path.to_string(), Arc::clone(&texture));
        info!("Created new texture resource {}", path);
        Ok(texture)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.textures
            .lock()
            .map(|textures| textures.contains_key(path))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.textures
            .lock()
            .map(|textures| textures.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

type LoadResult = Result<TextureHandle, TextureError>;

enum LoadState {
    Unstarted,
    Loading(Receiver<LoadResult>),
    Ready(TextureHandle),
    Failed,
}

/// A texture that is being loaded in the background.
///
/// Created with [`LazyTexture::start`], which dispatches the load to a worker
/// thread and returns immediately. [`LazyTexture::resolve`] blocks until that
/// load finishes the first time it is called and remembers the outcome.
///
/// There is no cancellation and no timeout. Dropping a `LazyTexture` before it
/// resolves leaves the worker running; its result is discarded.
pub struct LazyTexture {
    path: String,
    state: LoadState,
}

impl fmt::Debug for LazyTexture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.state {
            LoadState::Unstarted => "unstarted",
            LoadState::Loading(_) => "loading",
            LoadState::Ready(_) => "ready",
            LoadState::Failed => "failed",
        };
        f.debug_struct("LazyTexture")
            .field("path", &self.path)
            .field("state", &state)
            .finish()
    }
}

impl Default for LazyTexture {
    fn default() -> Self {
        Self::unstarted()
    }
}

impl LazyTexture {
    /// A handle with no load behind it. Resolves to nothing.
    pub fn unstarted() -> Self {
        Self {
            path: String::new(),
            state: LoadState::Unstarted,
        }
    }

    /// Begin loading `path` through `cache` on a worker thread.
    pub fn start(cache: &TextureCache, path: impl Into<String>) -> Self {
        let path = path.into();
        let (tx, rx) = bounded::<LoadResult>(1);
        let worker_cache = cache.clone();
        let worker_path = path.clone();

        let spawned = thread::Builder::new()
            .name(format!("texture-load:{}", path))
            .spawn(move || {
                // The receiver may already be gone; nobody is waiting then.
                let _ = tx.send(worker_cache.load_texture(&worker_path));
            });

        let state = match spawned {
            Ok(_) => LoadState::Loading(rx),
            Err(source) => {
                let err = TextureError::WorkerSpawn {
                    path: path.clone(),
                    source,
                };
                error!("{}", err);
                LoadState::Failed
            }
        };
        Self { path, state }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// True once a load has been dispatched, whatever its outcome.
    pub fn is_started(&self) -> bool {
        !matches!(self.state, LoadState::Unstarted)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state, LoadState::Failed)
    }

    /// The texture if it has already been resolved. Never blocks.
    pub fn texture(&self) -> Option<&TextureHandle> {
        match &self.state {
            LoadState::Ready(texture) => Some(texture),
            _ => None,
        }
    }

    /// Wait for the load to finish (first call only) and return the texture.
    ///
    /// Returns `None` when no load was started or the load failed; the
    /// failure is sticky.
    pub fn resolve(&mut self) -> Option<&TextureHandle> {
        if let LoadState::Loading(rx) = &self.state {
            let outcome = rx.recv();
            self.state = match outcome {
                Ok(Ok(texture)) => LoadState::Ready(texture),
                Ok(Err(e)) => {
                    debug!("Texture '{}' resolved as failed: {}", self.path, e);
                    LoadState::Failed
                }
                Err(_) => {
                    let err = TextureError::WorkerLost {
                        path: self.path.clone(),
                    };
                    error!("{}", err);
                    LoadState::Failed
                }
            };
        }
        self.texture()
    }
}
