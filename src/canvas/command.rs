use serde::{Deserialize, Serialize};

use crate::foundation::core::{Color, Point, Rect, Vec2};
use crate::foundation::handle::Rid;

/// How the point list of a [`Command::Primitive`] is assembled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveKind {
    Points,
    /// Independent segments, two consecutive points each.
    Lines,
    LineStrip,
    #[default]
    Triangles,
    /// `(0, i, i + 1)` for every interior `i`.
    TriangleFan,
}

/// One draw command in an item's list. Immutable once appended.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Rect {
        rect: Rect,
        modulate: Color,
        /// Repeat the texture at its native size instead of stretching it.
        tile: bool,
        texture: Option<Rid>,
        /// Normalized texture region; `None` is the whole texture.
        uv_rect: Option<Rect>,
    },
    NinePatch {
        rect: Rect,
        /// Source region in texel units; a zero-area rect selects the whole texture.
        source: Rect,
        texture: Option<Rid>,
        /// Left, top, right, bottom margins in texel units.
        margins: [f64; 4],
        draw_center: bool,
        modulate: Color,
    },
    Primitive {
        points: Vec<Point>,
        colors: Vec<Color>,
        uvs: Vec<Point>,
        texture: Option<Rid>,
        kind: PrimitiveKind,
    },
    Polygon {
        points: Vec<Point>,
        colors: Vec<Color>,
        uvs: Vec<Point>,
        /// Triangle list into `points`; empty fills the outline as one polygon.
        indices: Vec<u32>,
        texture: Option<Rid>,
    },
    Polyline {
        points: Vec<Point>,
        colors: Vec<Color>,
        width: f64,
        antialiased: bool,
    },
    Circle {
        center: Point,
        /// Per-axis radii; equal components describe a circle.
        radii: Vec2,
        color: Color,
    },
    /// Toggle whether the following commands of the same item ignore the active clip.
    ClipIgnore(bool),
}

impl Command {
    /// Local-space bounds of the geometry, `None` for state-only commands.
    pub fn bounds(&self) -> Option<Rect> {
        match self {
            Command::Rect { rect, .. } | Command::NinePatch { rect, .. } => Some(rect.abs()),
            Command::Primitive { points, .. } | Command::Polygon { points, .. } => {
                points_bounds(points)
            }
            Command::Polyline { points, width, .. } => {
                points_bounds(points).map(|r| r.inflate(width / 2.0, width / 2.0))
            }
            Command::Circle { center, radii, .. } => {
                let (rx, ry) = (radii.x.abs(), radii.y.abs());
                Some(Rect::new(
                    center.x - rx,
                    center.y - ry,
                    center.x + rx,
                    center.y + ry,
                ))
            }
            Command::ClipIgnore(_) => None,
        }
    }

    /// The texture this command samples, if any.
    pub fn texture(&self) -> Option<Rid> {
        match self {
            Command::Rect { texture, .. }
            | Command::NinePatch { texture, .. }
            | Command::Primitive { texture, .. }
            | Command::Polygon { texture, .. } => *texture,
            Command::Polyline { .. } | Command::Circle { .. } | Command::ClipIgnore(_) => None,
        }
    }
}

fn points_bounds(points: &[Point]) -> Option<Rect> {
    let (first, rest) = points.split_first()?;
    Some(
        rest.iter()
            .fold(Rect::from_points(*first, *first), |acc, p| acc.union_pt(*p)),
    )
}
