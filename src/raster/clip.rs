//! Line and polygon clipping against an axis-aligned clip rectangle.
//!
//! Lines use Cohen–Sutherland outcodes. Polygons use a Sutherland–Hodgman pass per rectangle
//! edge; every vertex attribute (UV, color) is interpolated along clipped edges so textured
//! geometry clips without distortion.

use crate::foundation::core::{Color, Point, Rect};

/// A polygon vertex as seen by the rasterizer: screen position plus interpolated attributes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RasterVertex {
    pub pos: Point,
    /// Normalized texture coordinate (0..1 spans the texture).
    pub uv: Point,
    pub color: Color,
}

impl RasterVertex {
    pub fn new(pos: Point, uv: Point, color: Color) -> Self {
        Self { pos, uv, color }
    }

    pub fn solid(pos: Point, color: Color) -> Self {
        Self {
            pos,
            uv: Point::ZERO,
            color,
        }
    }

    pub fn lerp(self, other: RasterVertex, t: f64) -> RasterVertex {
        RasterVertex {
            pos: self.pos.lerp(other.pos, t),
            uv: self.uv.lerp(other.uv, t),
            color: self.color.lerp(other.color, t as f32),
        }
    }
}

const INSIDE: u8 = 0;
const LEFT: u8 = 1;
const RIGHT: u8 = 2;
const TOP: u8 = 4;
const BOTTOM: u8 = 8;

fn outcode(p: Point, r: Rect) -> u8 {
    let mut code = INSIDE;
    if p.x < r.x0 {
        code |= LEFT;
    } else if p.x > r.x1 {
        code |= RIGHT;
    }
    if p.y < r.y0 {
        code |= TOP;
    } else if p.y > r.y1 {
        code |= BOTTOM;
    }
    code
}

/// Clip the segment `a`–`b` to the closed rectangle `r`.
///
/// Returns `None` when the segment lies entirely outside.
pub fn clip_line(mut a: Point, mut b: Point, r: Rect) -> Option<(Point, Point)> {
    let mut code_a = outcode(a, r);
    let mut code_b = outcode(b, r);

    loop {
        if code_a | code_b == INSIDE {
            return Some((a, b));
        }
        if code_a & code_b != INSIDE {
            return None;
        }

        let out = if code_a != INSIDE { code_a } else { code_b };
        let dx = b.x - a.x;
        let dy = b.y - a.y;
        let p = if out & BOTTOM != 0 {
            Point::new(a.x + dx * (r.y1 - a.y) / dy, r.y1)
        } else if out & TOP != 0 {
            Point::new(a.x + dx * (r.y0 - a.y) / dy, r.y0)
        } else if out & RIGHT != 0 {
            Point::new(r.x1, a.y + dy * (r.x1 - a.x) / dx)
        } else {
            Point::new(r.x0, a.y + dy * (r.x0 - a.x) / dx)
        };

        if out == code_a {
            a = p;
            code_a = outcode(a, r);
        } else {
            b = p;
            code_b = outcode(b, r);
        }
    }
}

#[derive(Clone, Copy)]
enum Edge {
    Left(f64),
    Right(f64),
    Top(f64),
    Bottom(f64),
}

impl Edge {
    fn inside(self, p: Point) -> bool {
        match self {
            Edge::Left(x) => p.x >= x,
            Edge::Right(x) => p.x <= x,
            Edge::Top(y) => p.y >= y,
            Edge::Bottom(y) => p.y <= y,
        }
    }

    fn intersect(self, a: RasterVertex, b: RasterVertex) -> RasterVertex {
        let t = match self {
            Edge::Left(x) | Edge::Right(x) => (x - a.pos.x) / (b.pos.x - a.pos.x),
            Edge::Top(y) | Edge::Bottom(y) => (y - a.pos.y) / (b.pos.y - a.pos.y),
        };
        a.lerp(b, t.clamp(0.0, 1.0))
    }
}

/// Clip a polygon to `r`, interpolating attributes along clipped edges.
///
/// A polygon fully inside comes back unchanged; one fully outside comes back empty. The
/// result may have fewer than three vertices, which callers drop.
pub fn clip_polygon(verts: &[RasterVertex], r: Rect) -> Vec<RasterVertex> {
    let mut output: Vec<RasterVertex> = verts.to_vec();
    let mut input = Vec::with_capacity(verts.len() + 4);

    for edge in [
        Edge::Left(r.x0),
        Edge::Right(r.x1),
        Edge::Top(r.y0),
        Edge::Bottom(r.y1),
    ] {
        if output.is_empty() {
            break;
        }
        std::mem::swap(&mut input, &mut output);
        output.clear();

        let mut prev = input[input.len() - 1];
        for &cur in &input {
            let cur_in = edge.inside(cur.pos);
            let prev_in = edge.inside(prev.pos);
            if cur_in {
                if !prev_in {
                    output.push(edge.intersect(prev, cur));
                }
                output.push(cur);
            } else if prev_in {
                output.push(edge.intersect(prev, cur));
            }
            prev = cur;
        }
    }

    output
}

#[cfg(test)]
#[path = "../../tests/unit/raster/clip.rs"]
mod tests;
