//! Texture storage: handle → decoded pixels plus sampling metadata.
//!
//! Every image entering storage is re-encoded into the engine pixel layout
//! (see [`crate::raster::format`]). Unknown handles are silent no-ops.

use std::collections::HashMap;
use std::path::Path;

use crate::foundation::core::Color;
use crate::foundation::error::{SoftCanvasError, SoftCanvasResult};
use crate::foundation::handle::{HandleAllocator, Rid};
use crate::raster::format::{enforce_engine_format, pack_color};
use crate::raster::pixel_buffer::PixelBuffer;
use crate::raster::sampler::{TextureFilter, TextureRepeat, TextureView};

#[derive(Clone, Debug, Default)]
pub struct Texture {
    image: Option<PixelBuffer>,
    pub filter: TextureFilter,
    pub repeat: TextureRepeat,
    proxy_to: Option<Rid>,
    path: String,
}

impl Texture {
    pub fn image(&self) -> Option<&PixelBuffer> {
        self.image.as_ref()
    }

    pub fn size(&self) -> (u32, u32) {
        self.image.as_ref().map_or((0, 0), PixelBuffer::size)
    }

    /// Whether this texture forwards sampling to another one.
    pub fn is_proxy(&self) -> bool {
        self.proxy_to.is_some()
    }

    pub fn proxy_to(&self) -> Option<Rid> {
        self.proxy_to
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

#[derive(Debug)]
pub struct TextureStorage {
    handles: HandleAllocator,
    textures: HashMap<Rid, Texture>,
    default_texture: Option<Rid>,
}

impl TextureStorage {
    pub fn new(handles: HandleAllocator) -> Self {
        Self {
            handles,
            textures: HashMap::new(),
            default_texture: None,
        }
    }

    pub fn owns(&self, rid: Rid) -> bool {
        self.textures.contains_key(&rid)
    }

    pub fn get(&self, rid: Rid) -> Option<&Texture> {
        self.textures.get(&rid)
    }

    pub fn texture_allocate(&mut self) -> Rid {
        let rid = self.handles.allocate();
        self.textures.insert(rid, Texture::default());
        rid
    }

    /// Store `image`, re-encoded into the engine pixel layout.
    pub fn texture_2d_initialize(&mut self, texture: Rid, image: &image::DynamicImage) {
        self.texture_set_buffer(texture, enforce_engine_format(image));
    }

    pub fn texture_set_image(&mut self, texture: Rid, image: &image::DynamicImage) {
        self.texture_2d_initialize(texture, image);
    }

    /// Store a buffer that is already in the engine layout.
    pub fn texture_set_buffer(&mut self, texture: Rid, buffer: PixelBuffer) {
        match self.textures.get_mut(&texture) {
            Some(tex) => tex.image = Some(buffer),
            None => tracing::warn!(%texture, "texture_set_buffer: unknown texture"),
        }
    }

    /// Copy `src` into the texture's backing buffer, reusing its allocation.
    pub fn texture_copy_from(&mut self, texture: Rid, src: &PixelBuffer) {
        let Some(tex) = self.textures.get_mut(&texture) else {
            tracing::debug!(%texture, "texture_copy_from: unknown texture");
            return;
        };
        match tex.image.as_mut() {
            Some(img) => img.copy_from(src),
            None => tex.image = Some(src.clone()),
        }
    }

    /// `(0, 0)` for unknown or uninitialized textures.
    pub fn texture_get_size(&self, texture: Rid) -> (u32, u32) {
        self.textures.get(&texture).map_or((0, 0), Texture::size)
    }

    pub fn texture_get_native_handle(&self, texture: Rid) -> Option<&PixelBuffer> {
        self.textures.get(&texture)?.image()
    }

    pub fn texture_set_path(&mut self, texture: Rid, path: impl Into<String>) {
        if let Some(tex) = self.textures.get_mut(&texture) {
            tex.path = path.into();
        }
    }

    pub fn texture_get_path(&self, texture: Rid) -> &str {
        self.textures.get(&texture).map_or("", Texture::path)
    }

    /// Decode an image file into a new texture.
    pub fn texture_load_from_path(&mut self, path: &Path) -> SoftCanvasResult<Rid> {
        let image = image::open(path).map_err(|e| {
            SoftCanvasError::texture(format!("decode '{}': {e}", path.display()))
        })?;
        let rid = self.texture_allocate();
        self.texture_2d_initialize(rid, &image);
        self.texture_set_path(rid, path.display().to_string());
        tracing::debug!(
            %rid,
            path = %path.display(),
            size = ?(image.width(), image.height()),
            "texture loaded"
        );
        Ok(rid)
    }

    /// Decode encoded image bytes (PNG, JPEG, ...) into a new texture.
    pub fn texture_load_from_memory(&mut self, bytes: &[u8]) -> SoftCanvasResult<Rid> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| SoftCanvasError::texture(format!("decode image from memory: {e}")))?;
        let rid = self.texture_allocate();
        self.texture_2d_initialize(rid, &image);
        Ok(rid)
    }

    pub fn canvas_texture_allocate(&mut self) -> Rid {
        self.texture_allocate()
    }

    /// Channel 0 (diffuse) makes `canvas_texture` a proxy for `texture`. Other channels are
    /// accepted and ignored.
    pub fn canvas_texture_set_channel(&mut self, canvas_texture: Rid, channel: u32, texture: Rid) {
        if channel != 0 || !self.owns(texture) {
            return;
        }
        if let Some(tex) = self.textures.get_mut(&canvas_texture) {
            tex.proxy_to = Some(texture);
        }
    }

    pub fn canvas_texture_set_texture_filter(
        &mut self,
        canvas_texture: Rid,
        filter: TextureFilter,
    ) {
        if let Some(tex) = self.textures.get_mut(&canvas_texture) {
            tex.filter = filter;
        }
    }

    pub fn canvas_texture_set_texture_repeat(
        &mut self,
        canvas_texture: Rid,
        repeat: TextureRepeat,
    ) {
        if let Some(tex) = self.textures.get_mut(&canvas_texture) {
            tex.repeat = repeat;
        }
    }

    /// 1×1 opaque white, created on first use.
    pub fn get_default_texture(&mut self) -> Rid {
        if let Some(rid) = self.default_texture {
            return rid;
        }
        let rid = self.texture_allocate();
        let mut white = PixelBuffer::new(1, 1);
        white.clear(pack_color(Color::WHITE));
        self.texture_set_buffer(rid, white);
        self.default_texture = Some(rid);
        rid
    }

    /// Resolve `texture` for sampling, following a proxy link once.
    ///
    /// Sampling settings come from `texture` itself; pixels from the proxy target when set.
    /// `None` when nothing resolves to pixel data.
    pub fn resolve(&self, texture: Rid) -> Option<TextureView<'_>> {
        let tex = self.textures.get(&texture)?;
        let source = match tex.proxy_to {
            Some(target) => self.textures.get(&target)?,
            None => tex,
        };
        let image = source.image()?;
        Some(TextureView::new(image, tex.filter, tex.repeat))
    }

    pub fn free(&mut self, rid: Rid) -> bool {
        if self.default_texture == Some(rid) {
            self.default_texture = None;
        }
        self.textures.remove(&rid).is_some()
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }
}

#[cfg(test)]
#[path = "../tests/unit/storage/texture_storage.rs"]
mod tests;
