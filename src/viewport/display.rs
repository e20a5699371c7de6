//! The presentation seam: whatever surface the host hands over as "the screen".

use crate::raster::pixel_buffer::PixelBuffer;

/// A display target in the engine pixel layout (`0xAARRGGBB`, row-major).
pub trait DisplaySurface {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    /// Displays without an alpha channel receive every pixel as opaque.
    fn supports_alpha(&self) -> bool;
    fn pixels(&self) -> &[u32];
    fn pixels_mut(&mut self) -> &mut [u32];
}

/// Display backed by a plain pixel vector. Used by the CLI and in tests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemoryDisplay {
    width: u32,
    height: u32,
    alpha: bool,
    pixels: Vec<u32>,
}

impl MemoryDisplay {
    pub fn new(width: u32, height: u32, alpha: bool) -> Self {
        Self {
            width,
            height,
            alpha,
            pixels: vec![0; width as usize * height as usize],
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }
}

impl DisplaySurface for MemoryDisplay {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn supports_alpha(&self) -> bool {
        self.alpha
    }

    fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    fn pixels_mut(&mut self) -> &mut [u32] {
        &mut self.pixels
    }
}

/// Copy `src` onto `display` with its top-left corner at `origin`, clipped to the display.
///
/// Returns the number of pixels written.
pub fn present(src: &PixelBuffer, display: &mut dyn DisplaySurface, origin: (i64, i64)) -> usize {
    let (dw, dh) = (i64::from(display.width()), i64::from(display.height()));
    let (sw, sh) = (i64::from(src.width()), i64::from(src.height()));
    let alpha_mask = if display.supports_alpha() {
        0
    } else {
        0xFF00_0000
    };

    let x0 = origin.0.max(0);
    let x1 = (origin.0 + sw).min(dw);
    let y0 = origin.1.max(0);
    let y1 = (origin.1 + sh).min(dh);
    if x0 >= x1 || y0 >= y1 {
        tracing::debug!(?origin, "presentation falls outside the display");
        return 0;
    }

    let src_px = src.pixels();
    let dst_px = display.pixels_mut();
    let len = (x1 - x0) as usize;
    for y in y0..y1 {
        let s = ((y - origin.1) * sw + (x0 - origin.0)) as usize;
        let d = (y * dw + x0) as usize;
        for (dst, &p) in dst_px[d..d + len].iter_mut().zip(&src_px[s..s + len]) {
            *dst = p | alpha_mask;
        }
    }
    len * (y1 - y0) as usize
}
