//! Pixel-level primitives over a [`PixelBuffer`].
//!
//! Coordinates are continuous: pixel `(x, y)` covers `[x, x + 1) × [y, y + 1)` and is filled
//! when its center lies inside the shape. Every entry point locks the target for the
//! duration of the call; the [`PixelLock`] guard releases it on all exit paths.

use std::f64::consts::{PI, TAU};

use crate::foundation::core::{Color, Point, Rect, Vec2};
use crate::raster::clip::{RasterVertex, clip_line, clip_polygon};
use crate::raster::format::pack_color;
use crate::raster::pixel_buffer::{BlendMode, PixelBuffer, PixelLock};
use crate::raster::sampler::TextureView;

/// Half-open integer pixel range derived from a clip rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PixelBounds {
    x0: i32,
    y0: i32,
    x1: i32,
    y1: i32,
}

impl PixelBounds {
    fn from_rect(r: Rect) -> Self {
        Self {
            x0: (r.x0 - 0.5).ceil() as i32,
            y0: (r.y0 - 0.5).ceil() as i32,
            x1: (r.x1 - 0.5).ceil() as i32,
            y1: (r.y1 - 0.5).ceil() as i32,
        }
    }

    fn is_empty(self) -> bool {
        self.x0 >= self.x1 || self.y0 >= self.y1
    }

    fn contains(self, x: i32, y: i32) -> bool {
        x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
    }
}

/// Immediate-mode rasterizer bound to one target for one frame.
pub struct SoftwareRasterizer<'a> {
    target: &'a mut PixelBuffer,
    clip: Rect,
    blend: BlendMode,
}

impl<'a> SoftwareRasterizer<'a> {
    pub fn new(target: &'a mut PixelBuffer) -> Self {
        let clip = Rect::new(
            0.0,
            0.0,
            f64::from(target.width()),
            f64::from(target.height()),
        );
        Self {
            target,
            clip,
            blend: BlendMode::Mix,
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(
            0.0,
            0.0,
            f64::from(self.target.width()),
            f64::from(self.target.height()),
        )
    }

    /// Restrict drawing to `rect` (intersected with the target); `None` lifts the clip.
    pub fn set_clip_rect(&mut self, rect: Option<Rect>) {
        let bounds = self.bounds();
        self.clip = match rect {
            Some(r) => r.abs().intersect(bounds),
            None => bounds,
        };
    }

    pub fn clip_rect(&self) -> Rect {
        self.clip
    }

    pub fn set_blend_mode(&mut self, mode: BlendMode) {
        self.blend = mode;
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.blend
    }

    pub fn target(&self) -> &PixelBuffer {
        &*self.target
    }

    /// Overwrite the whole target, ignoring clip and blend mode.
    pub fn clear(&mut self, color: Color) {
        self.target.clear(pack_color(color));
    }

    fn painter(&mut self) -> Painter<'_> {
        Painter {
            bounds: PixelBounds::from_rect(self.clip),
            blend: self.blend,
            px: self.target.lock(),
        }
    }

    pub fn draw_point(&mut self, p: Point, color: Color) {
        self.draw_points(&[p], color);
    }

    pub fn draw_points(&mut self, points: &[Point], color: Color) {
        let src = pack_color(color);
        let mut painter = self.painter();
        for p in points {
            painter.plot(p.x.floor() as i32, p.y.floor() as i32, src);
        }
    }

    /// One-pixel Bresenham line. Zero-length segments draw nothing.
    pub fn draw_line(&mut self, a: Point, b: Point, color: Color) {
        if a == b {
            return;
        }
        let mut painter = self.painter();
        painter.line(a, b, pack_color(color));
    }

    /// Polyline of the given width. Widths up to 1 draw plain lines; wider ones expand each
    /// segment into a quad with round joints and caps.
    pub fn draw_polyline(&mut self, points: &[Point], color: Color, width: f64) {
        if points.len() < 2 {
            return;
        }
        if width <= 1.0 {
            let src = pack_color(color);
            let mut painter = self.painter();
            for seg in points.windows(2) {
                if seg[0] != seg[1] {
                    painter.line(seg[0], seg[1], src);
                }
            }
            return;
        }

        let half = width / 2.0;
        for seg in points.windows(2) {
            let (a, b) = (seg[0], seg[1]);
            let dir = b - a;
            let len = dir.hypot();
            if len <= f64::EPSILON {
                continue;
            }
            let n = Vec2::new(-dir.y / len, dir.x / len) * half;
            let quad = [a + n, b + n, b - n, a - n].map(|p| RasterVertex::solid(p, color));
            self.fill_polygon(&quad, None);
        }

        let last = points.len() - 1;
        for (i, &p) in points.iter().enumerate() {
            let is_cap = i == 0 || i == last;
            let is_joint = !is_cap && points[i - 1] != p;
            if is_cap || is_joint {
                self.draw_circle(p, half, color, true);
            }
        }
    }

    /// Filled rect, or an outline `thickness` pixels wide drawn inside `rect`.
    pub fn draw_rect(&mut self, rect: Rect, color: Color, filled: bool, thickness: f64) {
        let rect = rect.abs();
        let t = thickness.max(1.0);
        let mut painter = self.painter();
        let src = pack_color(color);
        if filled || t * 2.0 >= rect.width() || t * 2.0 >= rect.height() {
            painter.fill_rect(rect, src);
            return;
        }
        painter.fill_rect(Rect::new(rect.x0, rect.y0, rect.x1, rect.y0 + t), src);
        painter.fill_rect(Rect::new(rect.x0, rect.y1 - t, rect.x1, rect.y1), src);
        painter.fill_rect(Rect::new(rect.x0, rect.y0 + t, rect.x0 + t, rect.y1 - t), src);
        painter.fill_rect(Rect::new(rect.x1 - t, rect.y0 + t, rect.x1, rect.y1 - t), src);
    }

    /// Midpoint circle, filled or one pixel outline. Radii `<= 0` or non-finite draw nothing.
    ///
    /// Circles larger than the clip rect are drawn as a clipped polygon instead, so the
    /// work stays bounded by the clip.
    pub fn draw_circle(&mut self, center: Point, radius: f64, color: Color, filled: bool) {
        if !radius.is_finite() || radius <= 0.0 || !center.x.is_finite() || !center.y.is_finite() {
            return;
        }
        let clip = self.clip;
        // Covers the rounding of center and radius below.
        let reach = radius + 2.0;
        if center.x + reach < clip.x0
            || center.x - reach > clip.x1
            || center.y + reach < clip.y0
            || center.y - reach > clip.y1
        {
            return;
        }
        if radius > clip.width().max(clip.height()) {
            let radii = Vec2::new(radius, radius);
            let points = ellipse_points(center, radii, large_circle_segments(radius));
            self.draw_polygon(&points, color, filled);
            return;
        }

        let mut painter = self.painter();
        let src = pack_color(color);
        let cx = center.x.floor() as i32;
        let cy = center.y.floor() as i32;
        let r = radius.round() as i32;
        if r == 0 {
            painter.plot(cx, cy, src);
            return;
        }

        let octants = midpoint_octant(r);
        if filled {
            // Widest extent per row offset, so each row is blended exactly once.
            let mut half = vec![0i32; r as usize + 1];
            for &(x, y) in &octants {
                half[y as usize] = half[y as usize].max(x);
                half[x as usize] = half[x as usize].max(y);
            }
            for (dy, &h) in half.iter().enumerate() {
                let dy = dy as i32;
                painter.span(cy + dy, cx - h, cx + h + 1, src);
                if dy != 0 {
                    painter.span(cy - dy, cx - h, cx + h + 1, src);
                }
            }
        } else {
            let mut ring: Vec<(i32, i32)> = octants
                .iter()
                .flat_map(|&(x, y)| {
                    [
                        (x, y),
                        (y, x),
                        (-y, x),
                        (-x, y),
                        (-x, -y),
                        (-y, -x),
                        (y, -x),
                        (x, -y),
                    ]
                })
                .collect();
            ring.sort_unstable();
            ring.dedup();
            for (dx, dy) in ring {
                painter.plot(cx + dx, cy + dy, src);
            }
        }
    }

    /// Single-color polygon, filled (even-odd) or outlined with one-pixel lines.
    pub fn draw_polygon(&mut self, points: &[Point], color: Color, filled: bool) {
        if points.len() < 3 {
            return;
        }
        if filled {
            let verts: Vec<RasterVertex> = points
                .iter()
                .map(|&p| RasterVertex::solid(p, color))
                .collect();
            self.fill_polygon(&verts, None);
            return;
        }
        let src = pack_color(color);
        let mut painter = self.painter();
        let mut prev = points[points.len() - 1];
        for &p in points {
            if p != prev {
                painter.line(prev, p, src);
            }
            prev = p;
        }
    }

    pub fn draw_triangle(&mut self, a: Point, b: Point, c: Point, color: Color) {
        self.fill_polygon(
            &[
                RasterVertex::solid(a, color),
                RasterVertex::solid(b, color),
                RasterVertex::solid(c, color),
            ],
            None,
        );
    }

    pub fn draw_textured_triangle(&mut self, verts: [RasterVertex; 3], texture: &TextureView<'_>) {
        self.fill_polygon(&verts, Some(texture));
    }

    /// Clip `verts` to the active clip rect and scan-fill it, interpolating UV and color.
    ///
    /// With a texture, each pixel is the sampled texel modulated by the interpolated color.
    pub fn fill_polygon(&mut self, verts: &[RasterVertex], texture: Option<&TextureView<'_>>) {
        if verts.len() < 3 {
            return;
        }
        let clipped = clip_polygon(verts, self.clip);
        if clipped.len() < 3 {
            return;
        }
        let mut painter = self.painter();
        painter.fill(&clipped, texture);
    }

    /// Indexed triangle list. Triangles referencing missing vertices are skipped.
    pub fn draw_batch(
        &mut self,
        vertices: &[RasterVertex],
        indices: &[u32],
        texture: Option<&TextureView<'_>>,
    ) {
        for tri in indices.chunks_exact(3) {
            let corner = |i: u32| vertices.get(i as usize).copied();
            let (Some(a), Some(b), Some(c)) = (corner(tri[0]), corner(tri[1]), corner(tri[2]))
            else {
                tracing::debug!(?tri, "batch triangle references missing vertex");
                continue;
            };
            self.fill_polygon(&[a, b, c], texture);
        }
    }
}

/// Segment count keeping the chord error of a large circle near half a pixel.
fn large_circle_segments(radius: f64) -> u32 {
    (PI * (2.0 * radius).sqrt()).ceil().clamp(64.0, 65_536.0) as u32
}

/// Points of the first octant `(x, y)` with `x >= y`, midpoint algorithm.
fn midpoint_octant(r: i32) -> Vec<(i32, i32)> {
    let mut out = Vec::with_capacity(r as usize + 1);
    let (mut x, mut y) = (r, 0);
    let mut err = 1 - r;
    while x >= y {
        out.push((x, y));
        y += 1;
        if err < 0 {
            err += 2 * y + 1;
        } else {
            x -= 1;
            err += 2 * (y - x) + 1;
        }
    }
    out
}

/// Vertices of an axis-aligned ellipse, counter-clockwise from angle zero.
pub fn ellipse_points(center: Point, radii: Vec2, segments: u32) -> Vec<Point> {
    let n = segments.max(3);
    (0..n)
        .map(|i| {
            let angle = TAU * f64::from(i) / f64::from(n);
            Point::new(
                center.x + radii.x * angle.cos(),
                center.y + radii.y * angle.sin(),
            )
        })
        .collect()
}

struct Painter<'a> {
    px: PixelLock<'a>,
    bounds: PixelBounds,
    blend: BlendMode,
}

impl Painter<'_> {
    fn plot(&mut self, x: i32, y: i32, src: u32) {
        if self.bounds.contains(x, y) {
            self.px.blend(x, y, src, self.blend);
        }
    }

    fn span(&mut self, y: i32, x0: i32, x1: i32, src: u32) {
        if y < self.bounds.y0 || y >= self.bounds.y1 {
            return;
        }
        let x0 = x0.max(self.bounds.x0);
        let x1 = x1.min(self.bounds.x1);
        if x0 < x1 {
            self.px.blend_span(y, x0, x1, src, self.blend);
        }
    }

    fn fill_rect(&mut self, r: Rect, src: u32) {
        let b = PixelBounds::from_rect(r);
        for y in b.y0..b.y1 {
            self.span(y, b.x0, b.x1, src);
        }
    }

    fn line(&mut self, a: Point, b: Point, src: u32) {
        if self.bounds.is_empty() {
            return;
        }
        let window = Rect::new(
            f64::from(self.bounds.x0),
            f64::from(self.bounds.y0),
            f64::from(self.bounds.x1 - 1),
            f64::from(self.bounds.y1 - 1),
        );
        let a = Point::new(a.x.floor(), a.y.floor());
        let b = Point::new(b.x.floor(), b.y.floor());
        let Some((a, b)) = clip_line(a, b, window) else {
            return;
        };

        let (mut x0, mut y0) = (a.x.round() as i32, a.y.round() as i32);
        let (x1, y1) = (b.x.round() as i32, b.y.round() as i32);
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            self.plot(x0, y0, src);
            if x0 == x1 && y0 == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x0 += sx;
            }
            if e2 <= dx {
                err += dx;
                y0 += sy;
            }
        }
    }

    /// Even-odd scanline fill sampling at pixel centers.
    fn fill(&mut self, verts: &[RasterVertex], texture: Option<&TextureView<'_>>) {
        if self.bounds.is_empty() {
            return;
        }
        let (mut ymin, mut ymax) = (f64::INFINITY, f64::NEG_INFINITY);
        for v in verts {
            ymin = ymin.min(v.pos.y);
            ymax = ymax.max(v.pos.y);
        }
        let row0 = ((ymin - 0.5).ceil() as i32).max(self.bounds.y0);
        let row1 = ((ymax - 0.5).ceil() as i32).min(self.bounds.y1);

        let flat = texture.is_none() && verts.iter().all(|v| v.color == verts[0].color);
        let flat_src = pack_color(verts[0].color);

        let mut crossings: Vec<RasterVertex> = Vec::with_capacity(verts.len());
        for y in row0..row1 {
            let yc = f64::from(y) + 0.5;
            crossings.clear();
            let mut prev = verts[verts.len() - 1];
            for &cur in verts {
                let (lo, hi) = if prev.pos.y <= cur.pos.y {
                    (prev, cur)
                } else {
                    (cur, prev)
                };
                if yc >= lo.pos.y && yc < hi.pos.y {
                    let t = (yc - lo.pos.y) / (hi.pos.y - lo.pos.y);
                    crossings.push(lo.lerp(hi, t));
                }
                prev = cur;
            }
            crossings.sort_by(|a, b| a.pos.x.total_cmp(&b.pos.x));

            for pair in crossings.chunks_exact(2) {
                let (l, r) = (pair[0], pair[1]);
                let x0 = ((l.pos.x - 0.5).ceil() as i32).max(self.bounds.x0);
                let x1 = ((r.pos.x - 0.5).ceil() as i32).min(self.bounds.x1);
                if x0 >= x1 {
                    continue;
                }
                if flat {
                    self.px.blend_span(y, x0, x1, flat_src, self.blend);
                    continue;
                }
                let width = r.pos.x - l.pos.x;
                for x in x0..x1 {
                    let s = if width > 0.0 {
                        ((f64::from(x) + 0.5 - l.pos.x) / width).clamp(0.0, 1.0)
                    } else {
                        0.0
                    };
                    let v = l.lerp(r, s);
                    let color = match texture {
                        Some(tex) => tex.sample(v.uv) * v.color,
                        None => v.color,
                    };
                    self.px.blend(x, y, pack_color(color), self.blend);
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/raster/rasterizer.rs"]
mod tests;
