use crate::foundation::core::Rect;
use crate::foundation::handle::Rid;
use crate::raster::clip::RasterVertex;
use crate::raster::pixel_buffer::BlendMode;
use crate::raster::sampler::{TextureFilter, TextureRepeat};

/// State that must match for geometry to share a batch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BatchKey {
    pub texture: Option<Rid>,
    pub blend: BlendMode,
    pub clip: Option<Rect>,
    pub filter: TextureFilter,
    pub repeat: TextureRepeat,
}

impl BatchKey {
    /// Key for untextured geometry; sampling settings are irrelevant and normalized.
    pub fn solid(blend: BlendMode, clip: Option<Rect>) -> Self {
        Self {
            texture: None,
            blend,
            clip,
            filter: TextureFilter::default(),
            repeat: TextureRepeat::default(),
        }
    }
}

/// Accumulated indexed triangles sharing one [`BatchKey`].
#[derive(Clone, Debug, PartialEq)]
pub struct BatchData {
    pub key: BatchKey,
    pub vertices: Vec<RasterVertex>,
    pub indices: Vec<u32>,
}

impl BatchData {
    pub fn new(key: BatchKey) -> Self {
        Self {
            key,
            vertices: Vec::new(),
            indices: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn can_batch_with(&self, key: &BatchKey) -> bool {
        self.key == *key
    }

    /// Whether `extra` more vertices would exceed `max_vertices`.
    pub fn would_overflow(&self, extra: usize, max_vertices: usize) -> bool {
        self.vertices.len() + extra > max_vertices
    }

    /// Append geometry, rebasing `indices` onto the existing vertices.
    pub fn push(&mut self, vertices: &[RasterVertex], indices: &[u32]) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(vertices);
        self.indices.extend(indices.iter().map(|i| i + base));
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
    }
}
