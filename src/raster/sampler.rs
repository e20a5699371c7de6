use serde::{Deserialize, Serialize};

use crate::foundation::core::{Color, Point};
use crate::raster::format::unpack_argb;
use crate::raster::pixel_buffer::PixelBuffer;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureFilter {
    #[default]
    Nearest,
    /// Bilinear between the four nearest texels.
    Linear,
}

/// What happens to texture coordinates outside `0..1`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureRepeat {
    /// Clamp to the edge texel.
    #[default]
    Disabled,
    Enabled,
    Mirror,
}

/// A texture bound for sampling during one draw call.
#[derive(Clone, Copy, Debug)]
pub struct TextureView<'a> {
    pub image: &'a PixelBuffer,
    pub filter: TextureFilter,
    pub repeat: TextureRepeat,
}

impl<'a> TextureView<'a> {
    pub fn new(image: &'a PixelBuffer, filter: TextureFilter, repeat: TextureRepeat) -> Self {
        Self {
            image,
            filter,
            repeat,
        }
    }

    /// Sample at normalized coordinates; an empty image samples as magenta.
    pub fn sample(&self, uv: Point) -> Color {
        let w = i64::from(self.image.width());
        let h = i64::from(self.image.height());
        if w == 0 || h == 0 {
            return Color::MAGENTA;
        }
        let x = uv.x * w as f64;
        let y = uv.y * h as f64;

        match self.filter {
            TextureFilter::Nearest => self.texel(x.floor() as i64, y.floor() as i64),
            TextureFilter::Linear => {
                let fx = x - 0.5;
                let fy = y - 0.5;
                let x0 = fx.floor();
                let y0 = fy.floor();
                let tx = (fx - x0) as f32;
                let ty = (fy - y0) as f32;
                let (x0, y0) = (x0 as i64, y0 as i64);

                let top = self.texel(x0, y0).lerp(self.texel(x0 + 1, y0), tx);
                let bottom = self.texel(x0, y0 + 1).lerp(self.texel(x0 + 1, y0 + 1), tx);
                top.lerp(bottom, ty)
            }
        }
    }

    fn texel(&self, x: i64, y: i64) -> Color {
        let w = i64::from(self.image.width());
        let h = i64::from(self.image.height());
        let x = wrap(x, w, self.repeat);
        let y = wrap(y, h, self.repeat);
        match self.image.pixel(x as u32, y as u32) {
            Some(px) => {
                let [r, g, b, a] = unpack_argb(px);
                Color::from_rgba8(r, g, b, a)
            }
            None => Color::MAGENTA,
        }
    }
}

fn wrap(i: i64, n: i64, repeat: TextureRepeat) -> i64 {
    match repeat {
        TextureRepeat::Disabled => i.clamp(0, n - 1),
        TextureRepeat::Enabled => i.rem_euclid(n),
        TextureRepeat::Mirror => {
            let m = i.rem_euclid(2 * n);
            if m >= n { 2 * n - 1 - m } else { m }
        }
    }
}
