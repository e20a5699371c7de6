use serde::{Deserialize, Serialize};

use crate::foundation::error::{SoftCanvasError, SoftCanvasResult};
use crate::raster::format::{pack_argb, unpack_argb};

/// How a source pixel is combined with the destination.
///
/// All modes work on straight (non-premultiplied) alpha except `PremultAlpha`, which treats
/// the source color as already multiplied by its alpha.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    #[default]
    Mix,
    Add,
    Sub,
    Mul,
    PremultAlpha,
    /// Overwrite, alpha included.
    Disabled,
}

/// A 2D surface of packed `0xAARRGGBB` pixels, row-major.
///
/// Direct pixel writes go through [`PixelBuffer::lock`], which hands out a scoped
/// [`PixelLock`]. The lock is released when the guard drops, on every exit path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
    locked: bool,
    lock_count: u64,
}

impl PixelBuffer {
    /// A fully transparent buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self::from_parts(width, height, vec![0; width as usize * height as usize])
    }

    /// Wrap existing pixels; `pixels.len()` must be `width * height`.
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<u32>) -> SoftCanvasResult<Self> {
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(SoftCanvasError::validation(format!(
                "pixel buffer expects {expected} pixels for {width}x{height}, got {}",
                pixels.len()
            )));
        }
        Ok(Self::from_parts(width, height, pixels))
    }

    pub(crate) fn from_parts(width: u32, height: u32, pixels: Vec<u32>) -> Self {
        debug_assert_eq!(pixels.len(), width as usize * height as usize);
        Self {
            width,
            height,
            pixels,
            locked: false,
            lock_count: 0,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[y as usize * self.width as usize + x as usize])
    }

    /// Map an RGBA tuple to this surface's packed integer format.
    pub fn map_color(&self, r: u8, g: u8, b: u8, a: u8) -> u32 {
        pack_argb(r, g, b, a)
    }

    pub fn clear(&mut self, color: u32) {
        self.pixels.fill(color);
    }

    /// Acquire direct read/write access. Released when the returned guard drops.
    pub fn lock(&mut self) -> PixelLock<'_> {
        debug_assert!(!self.locked, "pixel buffer locked twice");
        self.locked = true;
        self.lock_count = self.lock_count.saturating_add(1);
        PixelLock { buffer: self }
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Number of times the buffer has been locked since creation.
    pub fn lock_count(&self) -> u64 {
        self.lock_count
    }

    /// Copy `src` into this buffer, reallocating when the sizes differ.
    pub fn copy_from(&mut self, src: &PixelBuffer) {
        if self.size() != src.size() {
            self.width = src.width;
            self.height = src.height;
        }
        self.pixels.clear();
        self.pixels.extend_from_slice(&src.pixels);
    }

    /// Export as tightly packed straight-alpha RGBA8 bytes.
    pub fn to_rgba8_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixels.len() * 4);
        for &px in &self.pixels {
            out.extend_from_slice(&unpack_argb(px));
        }
        out
    }
}

/// Scoped write access to a [`PixelBuffer`]. Coordinates outside the surface are ignored.
pub struct PixelLock<'a> {
    buffer: &'a mut PixelBuffer,
}

impl Drop for PixelLock<'_> {
    fn drop(&mut self) {
        self.buffer.locked = false;
    }
}

impl PixelLock<'_> {
    pub fn width(&self) -> u32 {
        self.buffer.width
    }

    pub fn height(&self) -> u32 {
        self.buffer.height
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as u32 >= self.buffer.width || y as u32 >= self.buffer.height {
            return None;
        }
        Some(y as usize * self.buffer.width as usize + x as usize)
    }

    pub fn get(&self, x: i32, y: i32) -> Option<u32> {
        self.index(x, y).map(|i| self.buffer.pixels[i])
    }

    pub fn put(&mut self, x: i32, y: i32, px: u32) {
        if let Some(i) = self.index(x, y) {
            self.buffer.pixels[i] = px;
        }
    }

    pub fn blend(&mut self, x: i32, y: i32, src: u32, mode: BlendMode) {
        if let Some(i) = self.index(x, y) {
            let dst = self.buffer.pixels[i];
            self.buffer.pixels[i] = blend_argb(dst, src, mode);
        }
    }

    /// Blend `src` over the half-open span `[x0, x1)` of row `y`, clamped to the surface.
    pub fn blend_span(&mut self, y: i32, x0: i32, x1: i32, src: u32, mode: BlendMode) {
        if y < 0 || y as u32 >= self.buffer.height {
            return;
        }
        let x0 = x0.max(0);
        let x1 = x1.min(self.buffer.width as i32);
        if x0 >= x1 {
            return;
        }
        let row = y as usize * self.buffer.width as usize;
        let span = &mut self.buffer.pixels[row + x0 as usize..row + x1 as usize];
        for px in span {
            *px = blend_argb(*px, src, mode);
        }
    }
}

/// Combine one source pixel with one destination pixel.
pub fn blend_argb(dst: u32, src: u32, mode: BlendMode) -> u32 {
    let [sr, sg, sb, sa] = unpack_argb(src);
    if mode == BlendMode::Disabled {
        return src;
    }
    if sa == 0 && mode != BlendMode::PremultAlpha {
        return dst;
    }
    if sa == 255 && mode == BlendMode::Mix {
        return src;
    }

    let [dr, dg, db, da] = unpack_argb(dst);
    let sa_f = f32::from(sa) / 255.0;
    let da_f = f32::from(da) / 255.0;
    let inv = 1.0 - sa_f;
    let out_a = sa_f + da_f * inv;

    let channel = |s: u8, d: u8| -> u8 {
        let s = f32::from(s);
        let d = f32::from(d);
        let v = match mode {
            BlendMode::Mix => {
                if out_a <= 0.0 {
                    0.0
                } else {
                    (s * sa_f + d * da_f * inv) / out_a
                }
            }
            BlendMode::Add => d + s * sa_f,
            BlendMode::Sub => d - s * sa_f,
            BlendMode::Mul => d * (inv + (s / 255.0) * sa_f),
            BlendMode::PremultAlpha => s + d * inv,
            BlendMode::Disabled => s,
        };
        v.round().clamp(0.0, 255.0) as u8
    };

    let a = match mode {
        BlendMode::Add | BlendMode::Sub | BlendMode::Mul => da,
        _ => (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    };
    pack_argb(channel(sr, dr), channel(sg, dg), channel(sb, db), a)
}

#[cfg(test)]
#[path = "../../tests/unit/raster/pixel_buffer.rs"]
mod tests;
