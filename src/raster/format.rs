//! The engine's single internal pixel format.
//!
//! Every surface the rasterizer touches is 32 bits per pixel, 8 bits per channel, packed as
//! `0xAARRGGBB`. Textures, render targets and offscreen buffers are all normalized to this
//! layout on entry; sampling and color quantization assume it.

use crate::foundation::core::Color;
use crate::raster::pixel_buffer::PixelBuffer;

/// Channel masks `(R, G, B, A)` of the internal format.
pub const PIXEL_MASKS: (u32, u32, u32, u32) = (0x00FF_0000, 0x0000_FF00, 0x0000_00FF, 0xFF00_0000);

const R_SHIFT: u32 = 16;
const G_SHIFT: u32 = 8;
const B_SHIFT: u32 = 0;
const A_SHIFT: u32 = 24;

/// Pack straight-alpha RGBA8 into the internal layout.
pub const fn pack_argb(r: u8, g: u8, b: u8, a: u8) -> u32 {
    ((a as u32) << A_SHIFT)
        | ((r as u32) << R_SHIFT)
        | ((g as u32) << G_SHIFT)
        | ((b as u32) << B_SHIFT)
}

/// Unpack an internal pixel into `[r, g, b, a]`.
pub const fn unpack_argb(px: u32) -> [u8; 4] {
    [
        ((px & PIXEL_MASKS.0) >> R_SHIFT) as u8,
        ((px & PIXEL_MASKS.1) >> G_SHIFT) as u8,
        ((px & PIXEL_MASKS.2) >> B_SHIFT) as u8,
        ((px & PIXEL_MASKS.3) >> A_SHIFT) as u8,
    ]
}

/// Quantize a color into the internal layout.
pub fn pack_color(color: Color) -> u32 {
    let [r, g, b, a] = color.to_rgba8();
    pack_argb(r, g, b, a)
}

/// Re-encode a decoded image into the internal format.
///
/// Whatever the source layout (RGB, luma, 16-bit, float), the result is straight-alpha
/// `0xAARRGGBB`.
pub fn enforce_engine_format(image: &image::DynamicImage) -> PixelBuffer {
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    let pixels = rgba
        .pixels()
        .map(|p| pack_argb(p[0], p[1], p[2], p[3]))
        .collect();
    PixelBuffer::from_parts(width, height, pixels)
}

pub fn log_format_details() {
    tracing::info!(
        "pixel masks (R,G,B,A): {:#010x}, {:#010x}, {:#010x}, {:#010x}",
        PIXEL_MASKS.0,
        PIXEL_MASKS.1,
        PIXEL_MASKS.2,
        PIXEL_MASKS.3
    );
}
