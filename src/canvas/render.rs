//! Render stage: executes item command lists against a state stack and coalesces
//! compatible geometry into batches before it reaches the rasterizer.

use crate::canvas::batch::{BatchData, BatchKey};
use crate::canvas::command::{Command, PrimitiveKind};
use crate::canvas::cull::RenderEntry;
use crate::foundation::config::ServerSettings;
use crate::foundation::core::{Affine, Color, Point, Rect, Vec2, similarity_scale};
use crate::foundation::handle::Rid;
use crate::raster::clip::RasterVertex;
use crate::raster::pixel_buffer::BlendMode;
use crate::raster::rasterizer::{SoftwareRasterizer, ellipse_points};
use crate::raster::sampler::{TextureFilter, TextureRepeat, TextureView};
use crate::storage::TextureStorage;

const QUAD_INDICES: [u32; 6] = [0, 1, 2, 0, 2, 3];

/// Ambient state commands execute against. Saved and restored around every item.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderState {
    pub transform: Affine,
    pub modulate: Color,
    pub blend: BlendMode,
    pub clip_rect: Option<Rect>,
    /// Cleared by a `ClipIgnore(true)` command.
    pub clip_enabled: bool,
    pub texture_filter: Option<TextureFilter>,
    pub texture_repeat: Option<TextureRepeat>,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            transform: Affine::IDENTITY,
            modulate: Color::WHITE,
            blend: BlendMode::Mix,
            clip_rect: None,
            clip_enabled: true,
            texture_filter: None,
            texture_repeat: None,
        }
    }
}

impl RenderState {
    pub fn active_clip(&self) -> Option<Rect> {
        self.clip_rect.filter(|_| self.clip_enabled)
    }
}

/// Per-frame counters, reset by [`CanvasRenderer::begin_frame`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Rasterizer calls: flushed batches plus direct draws.
    pub draw_calls: u64,
    /// Vertices submitted through batches.
    pub vertices: u64,
    /// Geometry commands executed.
    pub primitives: u64,
}

/// How a command's texture resolved for this draw.
enum Binding<'t> {
    Solid,
    /// The handle no longer resolves to pixels; draw the diagnostic color.
    Missing,
    Bound(Rid, TextureView<'t>),
}

#[derive(Debug)]
pub struct CanvasRenderer {
    state: RenderState,
    current_batch: Option<BatchData>,
    stats: RenderStats,
    max_batch_vertices: usize,
    ellipse_segments: u32,
}

impl CanvasRenderer {
    pub fn new(settings: &ServerSettings) -> Self {
        Self {
            state: RenderState::default(),
            current_batch: None,
            stats: RenderStats::default(),
            max_batch_vertices: settings.max_batch_vertices,
            ellipse_segments: settings.effective_ellipse_segments(),
        }
    }

    pub fn state(&self) -> &RenderState {
        &self.state
    }

    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    /// The batch still accumulating, if any.
    pub fn current_batch(&self) -> Option<&BatchData> {
        self.current_batch.as_ref()
    }

    /// Reset counters and ambient state. Any open batch is discarded.
    pub fn begin_frame(&mut self) {
        self.stats = RenderStats::default();
        self.state = RenderState::default();
        self.current_batch = None;
    }

    /// Flush whatever is still batched.
    pub fn end_frame(&mut self, raster: &mut SoftwareRasterizer<'_>, textures: &TextureStorage) {
        self.flush(raster, textures);
    }

    /// Execute `commands` under the state carried by `entry`, then restore the previous state.
    pub fn render_canvas_item(
        &mut self,
        raster: &mut SoftwareRasterizer<'_>,
        textures: &TextureStorage,
        entry: &RenderEntry,
        commands: &[Command],
    ) {
        let saved = self.state;
        self.state = RenderState {
            transform: entry.transform,
            modulate: entry.modulate,
            blend: entry.blend,
            clip_rect: entry.clip,
            clip_enabled: true,
            texture_filter: entry.texture_filter,
            texture_repeat: entry.texture_repeat,
        };

        for command in commands {
            self.execute(raster, textures, command);
        }

        self.state = saved;
    }

    fn execute(
        &mut self,
        raster: &mut SoftwareRasterizer<'_>,
        textures: &TextureStorage,
        command: &Command,
    ) {
        if !matches!(command, Command::ClipIgnore(_)) {
            self.stats.primitives += 1;
        }
        match command {
            Command::Rect {
                rect,
                modulate,
                tile,
                texture,
                uv_rect,
            } => self.draw_rect(raster, textures, *rect, *modulate, *tile, *texture, *uv_rect),
            Command::NinePatch {
                rect,
                source,
                texture,
                margins,
                draw_center,
                modulate,
            } => self.draw_nine_patch(
                raster,
                textures,
                *rect,
                *source,
                *texture,
                *margins,
                *draw_center,
                *modulate,
            ),
            Command::Primitive {
                points,
                colors,
                uvs,
                texture,
                kind,
            } => self.draw_primitive(raster, textures, points, colors, uvs, *texture, *kind),
            Command::Polygon {
                points,
                colors,
                uvs,
                indices,
                texture,
            } => self.draw_polygon(raster, textures, points, colors, uvs, indices, *texture),
            Command::Polyline {
                points,
                colors,
                width,
                antialiased: _,
            } => self.draw_polyline(raster, textures, points, colors, *width),
            Command::Circle {
                center,
                radii,
                color,
            } => self.draw_circle(raster, textures, *center, *radii, *color),
            Command::ClipIgnore(ignore) => self.state.clip_enabled = !*ignore,
        }
    }

    fn bind<'t>(&self, textures: &'t TextureStorage, texture: Option<Rid>) -> Binding<'t> {
        let Some(rid) = texture else {
            return Binding::Solid;
        };
        match textures.resolve(rid) {
            Some(mut view) => {
                if let Some(filter) = self.state.texture_filter {
                    view.filter = filter;
                }
                if let Some(repeat) = self.state.texture_repeat {
                    view.repeat = repeat;
                }
                Binding::Bound(rid, view)
            }
            None => {
                tracing::debug!(%rid, "texture does not resolve, drawing diagnostic color");
                Binding::Missing
            }
        }
    }

    fn solid_key(&self) -> BatchKey {
        BatchKey::solid(self.state.blend, self.state.active_clip())
    }

    fn textured_key(&self, rid: Rid, view: &TextureView<'_>) -> BatchKey {
        BatchKey {
            texture: Some(rid),
            blend: self.state.blend,
            clip: self.state.active_clip(),
            filter: view.filter,
            repeat: view.repeat,
        }
    }

    /// Transformed quad over `rect` with `uv` spread across its corners.
    fn quad(&self, rect: Rect, uv: Rect, color: Color) -> [RasterVertex; 4] {
        let t = self.state.transform;
        [
            (rect.x0, rect.y0, uv.x0, uv.y0),
            (rect.x1, rect.y0, uv.x1, uv.y0),
            (rect.x1, rect.y1, uv.x1, uv.y1),
            (rect.x0, rect.y1, uv.x0, uv.y1),
        ]
        .map(|(x, y, u, v)| RasterVertex::new(t * Point::new(x, y), Point::new(u, v), color))
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_rect(
        &mut self,
        raster: &mut SoftwareRasterizer<'_>,
        textures: &TextureStorage,
        rect: Rect,
        modulate: Color,
        tile: bool,
        texture: Option<Rid>,
        uv_rect: Option<Rect>,
    ) {
        let color = modulate * self.state.modulate;
        let full = Rect::new(0.0, 0.0, 1.0, 1.0);
        let (key, verts) = match self.bind(textures, texture) {
            Binding::Solid => (self.solid_key(), self.quad(rect, full, color)),
            Binding::Missing => (self.solid_key(), self.quad(rect, full, Color::MAGENTA)),
            Binding::Bound(rid, mut view) => {
                let uv = if tile {
                    let (tw, th) = view.image.size();
                    view.repeat = TextureRepeat::Enabled;
                    Rect::new(
                        0.0,
                        0.0,
                        rect.width() / f64::from(tw),
                        rect.height() / f64::from(th),
                    )
                } else {
                    uv_rect.unwrap_or(full)
                };
                (self.textured_key(rid, &view), self.quad(rect, uv, color))
            }
        };
        self.add_to_batch(raster, textures, key, &verts, &QUAD_INDICES);
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_nine_patch(
        &mut self,
        raster: &mut SoftwareRasterizer<'_>,
        textures: &TextureStorage,
        rect: Rect,
        source: Rect,
        texture: Option<Rid>,
        margins: [f64; 4],
        draw_center: bool,
        modulate: Color,
    ) {
        let color = modulate * self.state.modulate;
        let rect = rect.abs();
        let full = Rect::new(0.0, 0.0, 1.0, 1.0);
        let (rid, view) = match self.bind(textures, texture) {
            Binding::Bound(rid, view) => (rid, view),
            Binding::Solid => {
                let verts = self.quad(rect, full, color);
                let key = self.solid_key();
                self.add_to_batch(raster, textures, key, &verts, &QUAD_INDICES);
                return;
            }
            Binding::Missing => {
                let verts = self.quad(rect, full, Color::MAGENTA);
                let key = self.solid_key();
                self.add_to_batch(raster, textures, key, &verts, &QUAD_INDICES);
                return;
            }
        };

        let (tw, th) = view.image.size();
        let (tw, th) = (f64::from(tw), f64::from(th));
        let src = if source.area() > 0.0 {
            source.abs()
        } else {
            Rect::new(0.0, 0.0, tw, th)
        };
        let [ml, mt, mr, mb] = margins.map(|m| m.max(0.0));

        let (sl, sr) = fit_margins(ml, mr, src.width());
        let (st, sb) = fit_margins(mt, mb, src.height());
        let (dl, dr) = fit_margins(ml, mr, rect.width());
        let (dt, db) = fit_margins(mt, mb, rect.height());

        let dx = [rect.x0, rect.x0 + dl, rect.x1 - dr, rect.x1];
        let dy = [rect.y0, rect.y0 + dt, rect.y1 - db, rect.y1];
        let ux = [src.x0, src.x0 + sl, src.x1 - sr, src.x1].map(|x| x / tw);
        let uy = [src.y0, src.y0 + st, src.y1 - sb, src.y1].map(|y| y / th);

        let mut verts = Vec::with_capacity(36);
        let mut indices = Vec::with_capacity(54);
        for row in 0..3 {
            for col in 0..3 {
                if row == 1 && col == 1 && !draw_center {
                    continue;
                }
                let cell = Rect::new(dx[col], dy[row], dx[col + 1], dy[row + 1]);
                if cell.width() <= 0.0 || cell.height() <= 0.0 {
                    continue;
                }
                let uv = Rect::new(ux[col], uy[row], ux[col + 1], uy[row + 1]);
                let base = verts.len() as u32;
                verts.extend(self.quad(cell, uv, color));
                indices.extend(QUAD_INDICES.map(|i| base + i));
            }
        }
        let key = self.textured_key(rid, &view);
        self.add_to_batch(raster, textures, key, &verts, &indices);
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_primitive(
        &mut self,
        raster: &mut SoftwareRasterizer<'_>,
        textures: &TextureStorage,
        points: &[Point],
        colors: &[Color],
        uvs: &[Point],
        texture: Option<Rid>,
        kind: PrimitiveKind,
    ) {
        let n = points.len();
        let binding = self.bind(textures, texture);
        let verts: Vec<RasterVertex> = points
            .iter()
            .enumerate()
            .map(|(i, &p)| {
                let color = match binding {
                    Binding::Missing => Color::MAGENTA,
                    _ => vertex_color(colors, i, n) * self.state.modulate,
                };
                let uv = if uvs.len() == n { uvs[i] } else { Point::ZERO };
                RasterVertex::new(self.state.transform * p, uv, color)
            })
            .collect();

        match kind {
            PrimitiveKind::Points | PrimitiveKind::Lines | PrimitiveKind::LineStrip => {
                // One color per point or segment; short color lists repeat their last entry.
                let modulate = self.state.modulate;
                let missing = matches!(binding, Binding::Missing);
                let color = |k: usize| {
                    if missing {
                        Color::MAGENTA
                    } else {
                        clamped_color(colors, k) * modulate
                    }
                };
                self.flush(raster, textures);
                self.apply_direct_state(raster);
                match kind {
                    PrimitiveKind::Points => {
                        for (k, v) in verts.iter().enumerate() {
                            raster.draw_point(v.pos, color(k));
                        }
                    }
                    PrimitiveKind::Lines => {
                        for (k, seg) in verts.chunks_exact(2).enumerate() {
                            raster.draw_line(seg[0].pos, seg[1].pos, color(k));
                        }
                    }
                    _ => {
                        for (k, seg) in verts.windows(2).enumerate() {
                            raster.draw_line(seg[0].pos, seg[1].pos, color(k));
                        }
                    }
                }
                self.stats.draw_calls += 1;
            }
            PrimitiveKind::Triangles | PrimitiveKind::TriangleFan => {
                let indices: Vec<u32> = if kind == PrimitiveKind::Triangles {
                    (0..(n - n % 3) as u32).collect()
                } else {
                    (1..n.saturating_sub(1) as u32)
                        .flat_map(|i| [0, i, i + 1])
                        .collect()
                };
                let key = match binding {
                    Binding::Bound(rid, view) => self.textured_key(rid, &view),
                    Binding::Solid | Binding::Missing => self.solid_key(),
                };
                self.add_to_batch(raster, textures, key, &verts, &indices);
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_polygon(
        &mut self,
        raster: &mut SoftwareRasterizer<'_>,
        textures: &TextureStorage,
        points: &[Point],
        colors: &[Color],
        uvs: &[Point],
        indices: &[u32],
        texture: Option<Rid>,
    ) {
        let n = points.len();
        let binding = self.bind(textures, texture);
        let verts: Vec<RasterVertex> = points
            .iter()
            .enumerate()
            .map(|(i, &p)| {
                let color = match binding {
                    Binding::Missing => Color::MAGENTA,
                    _ => vertex_color(colors, i, n) * self.state.modulate,
                };
                let uv = if uvs.len() == n { uvs[i] } else { Point::ZERO };
                RasterVertex::new(self.state.transform * p, uv, color)
            })
            .collect();
        let view = match binding {
            Binding::Bound(_, view) => Some(view),
            Binding::Solid | Binding::Missing => None,
        };

        self.flush(raster, textures);
        self.apply_direct_state(raster);
        if indices.is_empty() {
            raster.fill_polygon(&verts, view.as_ref());
        } else {
            raster.draw_batch(&verts, indices, view.as_ref());
        }
        self.stats.draw_calls += 1;
    }

    fn draw_polyline(
        &mut self,
        raster: &mut SoftwareRasterizer<'_>,
        textures: &TextureStorage,
        points: &[Point],
        colors: &[Color],
        width: f64,
    ) {
        let t = self.state.transform;
        let color = colors.first().copied().unwrap_or(Color::WHITE) * self.state.modulate;
        let points: Vec<Point> = points.iter().map(|&p| t * p).collect();
        let width = width * t.determinant().abs().sqrt();

        self.flush(raster, textures);
        self.apply_direct_state(raster);
        raster.draw_polyline(&points, color, width);
        self.stats.draw_calls += 1;
    }

    fn draw_circle(
        &mut self,
        raster: &mut SoftwareRasterizer<'_>,
        textures: &TextureStorage,
        center: Point,
        radii: Vec2,
        color: Color,
    ) {
        if !radii.x.is_finite() || !radii.y.is_finite() || radii.x <= 0.0 || radii.y <= 0.0 {
            return;
        }
        let t = self.state.transform;
        let color = color * self.state.modulate;

        self.flush(raster, textures);
        self.apply_direct_state(raster);
        match similarity_scale(t).filter(|_| radii.x == radii.y) {
            Some(scale) => raster.draw_circle(t * center, radii.x * scale, color, true),
            None => {
                let points: Vec<Point> = ellipse_points(center, radii, self.ellipse_segments)
                    .into_iter()
                    .map(|p| t * p)
                    .collect();
                raster.draw_polygon(&points, color, true);
            }
        }
        self.stats.draw_calls += 1;
    }

    fn apply_direct_state(&self, raster: &mut SoftwareRasterizer<'_>) {
        raster.set_blend_mode(self.state.blend);
        raster.set_clip_rect(self.state.active_clip());
    }

    /// Append geometry to the open batch, flushing first when the key changes or the
    /// vertex ceiling would be exceeded.
    fn add_to_batch(
        &mut self,
        raster: &mut SoftwareRasterizer<'_>,
        textures: &TextureStorage,
        key: BatchKey,
        vertices: &[RasterVertex],
        indices: &[u32],
    ) {
        if vertices.is_empty() || indices.is_empty() {
            return;
        }
        let must_flush = self.current_batch.as_ref().is_some_and(|batch| {
            !batch.can_batch_with(&key)
                || batch.would_overflow(vertices.len(), self.max_batch_vertices)
        });
        if must_flush {
            self.flush(raster, textures);
        }
        self.current_batch
            .get_or_insert_with(|| BatchData::new(key))
            .push(vertices, indices);
    }

    fn flush(&mut self, raster: &mut SoftwareRasterizer<'_>, textures: &TextureStorage) {
        let Some(batch) = self.current_batch.take() else {
            return;
        };
        if batch.is_empty() {
            return;
        }
        let key = batch.key;
        let view = key
            .texture
            .and_then(|rid| textures.resolve(rid))
            .map(|view| TextureView::new(view.image, key.filter, key.repeat));

        raster.set_blend_mode(key.blend);
        raster.set_clip_rect(key.clip);
        raster.draw_batch(&batch.vertices, &batch.indices, view.as_ref());

        self.stats.draw_calls += 1;
        self.stats.vertices += batch.vertices.len() as u64;
    }
}

/// Per-vertex color when one is given for every point, else the first color, else white.
fn vertex_color(colors: &[Color], i: usize, n: usize) -> Color {
    if colors.len() == n {
        colors[i]
    } else {
        colors.first().copied().unwrap_or(Color::WHITE)
    }
}

fn clamped_color(colors: &[Color], k: usize) -> Color {
    colors
        .get(k)
        .or(colors.last())
        .copied()
        .unwrap_or(Color::WHITE)
}

/// Scale a pair of opposing margins down so they fit in `extent`.
fn fit_margins(a: f64, b: f64, extent: f64) -> (f64, f64) {
    let sum = a + b;
    if sum > extent && sum > 0.0 {
        let s = extent.max(0.0) / sum;
        (a * s, b * s)
    } else {
        (a, b)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/canvas/render.rs"]
mod tests;
