//! Viewport orchestration: render targets, update and clear policy, and the per-frame
//! cull → render → present sequence.

pub mod data;
pub mod display;

use std::collections::HashMap;

pub use data::{CanvasAttachment, ClearMode, FrameInfo, RenderInfo, UpdateMode, ViewportData};
pub use display::{DisplaySurface, MemoryDisplay, present};

use crate::canvas::cull::CanvasCull;
use crate::canvas::render::CanvasRenderer;
use crate::foundation::config::ServerSettings;
use crate::foundation::core::{Affine, Color, Rect};
use crate::foundation::handle::{HandleAllocator, Rid};
use crate::raster::pixel_buffer::PixelBuffer;
use crate::raster::rasterizer::SoftwareRasterizer;
use crate::storage::TextureStorage;

pub struct ViewportManager {
    handles: HandleAllocator,
    viewports: HashMap<Rid, ViewportData>,
    display: Option<Box<dyn DisplaySurface>>,
    renderer: CanvasRenderer,
    settings: ServerSettings,
}

impl std::fmt::Debug for ViewportManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewportManager")
            .field("viewports", &self.viewports.len())
            .field("has_display", &self.display.is_some())
            .finish()
    }
}

impl ViewportManager {
    pub fn new(handles: HandleAllocator, settings: &ServerSettings) -> Self {
        Self {
            handles,
            viewports: HashMap::new(),
            display: None,
            renderer: CanvasRenderer::new(settings),
            settings: settings.clone(),
        }
    }

    pub fn owns(&self, rid: Rid) -> bool {
        self.viewports.contains_key(&rid)
    }

    /// Every viewport handle, in no particular order.
    pub fn ids(&self) -> impl Iterator<Item = Rid> + '_ {
        self.viewports.keys().copied()
    }

    pub fn get(&self, viewport: Rid) -> Option<&ViewportData> {
        self.viewports.get(&viewport)
    }

    fn viewport_mut(&mut self, viewport: Rid) -> Option<&mut ViewportData> {
        let vp = self.viewports.get_mut(&viewport);
        if vp.is_none() {
            tracing::debug!(%viewport, "ignoring call on unknown viewport");
        }
        vp
    }

    /// Register the surface screen-attached viewports present to.
    pub fn set_display_window(&mut self, surface: Box<dyn DisplaySurface>) {
        let (width, height, alpha) = (surface.width(), surface.height(), surface.supports_alpha());
        tracing::info!(width, height, alpha, "display surface registered");
        self.display = Some(surface);
    }

    pub fn display(&self) -> Option<&dyn DisplaySurface> {
        self.display.as_deref()
    }

    pub fn viewport_allocate(&mut self) -> Rid {
        let rid = self.handles.allocate();
        let mut vp = ViewportData::new(&self.settings);
        create_render_target(rid, &mut vp);
        self.viewports.insert(rid, vp);
        rid
    }

    pub fn viewport_set_size(&mut self, viewport: Rid, width: u32, height: u32) {
        let Some(vp) = self.viewport_mut(viewport) else {
            return;
        };
        if vp.size == (width, height) {
            return;
        }
        vp.size = (width, height);
        if !vp.screen_attachment {
            vp.rect = Rect::new(0.0, 0.0, f64::from(width), f64::from(height));
        }
        create_render_target(viewport, vp);
    }

    pub fn viewport_set_active(&mut self, viewport: Rid, active: bool) {
        if let Some(vp) = self.viewport_mut(viewport) {
            vp.visible = active;
            tracing::info!(%viewport, active, "viewport active state changed");
        }
    }

    pub fn viewport_set_parent_viewport(&mut self, viewport: Rid, parent: Option<Rid>) {
        if let Some(vp) = self.viewport_mut(viewport) {
            vp.parent = parent;
        }
    }

    pub fn viewport_set_update_mode(&mut self, viewport: Rid, mode: UpdateMode) {
        if let Some(vp) = self.viewport_mut(viewport) {
            vp.update_mode = mode;
        }
    }

    pub fn viewport_set_clear_mode(&mut self, viewport: Rid, mode: ClearMode) {
        if let Some(vp) = self.viewport_mut(viewport) {
            vp.clear_mode = mode;
        }
    }

    pub fn viewport_set_clear_color(&mut self, viewport: Rid, color: Color) {
        if let Some(vp) = self.viewport_mut(viewport) {
            vp.clear_color = color;
        }
    }

    pub fn viewport_set_transparent_background(&mut self, viewport: Rid, enabled: bool) {
        if let Some(vp) = self.viewport_mut(viewport)
            && vp.transparent_bg != enabled
        {
            vp.transparent_bg = enabled;
            vp.needs_update = true;
        }
    }

    pub fn viewport_set_disable_2d(&mut self, viewport: Rid, disabled: bool) {
        if let Some(vp) = self.viewport_mut(viewport) {
            vp.disable_2d = disabled;
            vp.needs_update = true;
        }
    }

    /// Present this viewport to the display at `rect`; the viewport takes the rect's size.
    pub fn viewport_attach_to_screen(&mut self, viewport: Rid, rect: Rect) {
        let Some(vp) = self.viewport_mut(viewport) else {
            return;
        };
        tracing::info!(%viewport, ?rect, "viewport attached to screen");
        let rect = rect.abs();
        vp.screen_attachment = true;
        vp.rect = rect;
        vp.size = (
            rect.width().round().max(0.0) as u32,
            rect.height().round().max(0.0) as u32,
        );
        create_render_target(viewport, vp);
    }

    pub fn viewport_detach_from_screen(&mut self, viewport: Rid) {
        if let Some(vp) = self.viewport_mut(viewport) {
            vp.screen_attachment = false;
        }
    }

    pub fn viewport_attach_canvas(&mut self, viewport: Rid, canvas: Rid) {
        let Some(vp) = self.viewport_mut(viewport) else {
            return;
        };
        if vp.has_canvas(canvas) {
            return;
        }
        tracing::info!(%canvas, %viewport, "canvas attached");
        vp.canvases.push(CanvasAttachment::new(canvas));
        vp.sort_canvases();
        vp.needs_update = true;
    }

    pub fn viewport_remove_canvas(&mut self, viewport: Rid, canvas: Rid) {
        let Some(vp) = self.viewport_mut(viewport) else {
            return;
        };
        let before = vp.canvases.len();
        vp.canvases.retain(|a| a.canvas != canvas);
        if vp.canvases.len() != before {
            vp.needs_update = true;
        }
    }

    pub fn viewport_set_canvas_stacking(
        &mut self,
        viewport: Rid,
        canvas: Rid,
        layer: i32,
        sublayer: i32,
    ) {
        let Some(vp) = self.viewport_mut(viewport) else {
            return;
        };
        let Some(att) = vp.attachment_mut(canvas) else {
            return;
        };
        att.layer = layer;
        att.sublayer = sublayer;
        vp.sort_canvases();
        vp.needs_update = true;
    }

    pub fn viewport_set_canvas_transform(&mut self, viewport: Rid, canvas: Rid, transform: Affine) {
        let Some(vp) = self.viewport_mut(viewport) else {
            return;
        };
        if let Some(att) = vp.attachment_mut(canvas) {
            att.transform = transform;
            vp.needs_update = true;
        }
    }

    pub fn viewport_set_global_canvas_transform(&mut self, viewport: Rid, transform: Affine) {
        if let Some(vp) = self.viewport_mut(viewport) {
            vp.canvas_transform = transform;
            vp.needs_update = true;
        }
    }

    /// Re-arm a viewport in [`UpdateMode::Once`].
    pub fn viewport_request_update(&mut self, viewport: Rid) {
        if let Some(vp) = self.viewport_mut(viewport) {
            vp.needs_update = true;
        }
    }

    /// Texture mirroring the render target, allocated on first request and refreshed after
    /// every drawn frame. `Rid::INVALID` for unknown viewports.
    pub fn viewport_get_texture(&mut self, viewport: Rid, storage: &mut TextureStorage) -> Rid {
        let Some(vp) = self.viewports.get_mut(&viewport) else {
            return Rid::INVALID;
        };
        if let Some(tex) = vp.render_target_texture {
            return tex;
        }
        let tex = storage.texture_allocate();
        if let Some(target) = &vp.render_target {
            storage.texture_copy_from(tex, target);
        }
        vp.render_target_texture = Some(tex);
        tex
    }

    pub fn viewport_get_render_info(&self, viewport: Rid, info: RenderInfo) -> u64 {
        self.viewports
            .get(&viewport)
            .map_or(0, |vp| vp.info.get(info))
    }

    /// Read-only view of the last drawn frame.
    pub fn viewport_get_render_target(&self, viewport: Rid) -> Option<&PixelBuffer> {
        self.viewports.get(&viewport)?.render_target.as_ref()
    }

    pub fn viewport_get_frames_drawn(&self, viewport: Rid) -> u64 {
        self.viewports.get(&viewport).map_or(0, |vp| vp.frames_drawn)
    }

    /// Whether the update policy lets `viewport` draw this frame.
    pub fn should_update(&self, viewport: Rid) -> bool {
        let Some(vp) = self.viewports.get(&viewport) else {
            return false;
        };
        match vp.update_mode {
            UpdateMode::Disabled => false,
            UpdateMode::Once => vp.needs_update,
            UpdateMode::WhenVisible => vp.visible,
            UpdateMode::WhenParentVisible => match vp.parent {
                Some(parent) => self.viewports.get(&parent).is_some_and(|p| p.visible),
                None => true,
            },
            UpdateMode::Always => true,
        }
    }

    /// Draw one frame of `viewport` if its update policy allows it.
    #[tracing::instrument(level = "debug", skip(self, cull, storage))]
    pub fn viewport_draw(
        &mut self,
        viewport: Rid,
        delta: f64,
        cull: &mut CanvasCull,
        storage: &mut TextureStorage,
    ) {
        if !self.viewports.contains_key(&viewport) {
            tracing::warn!(%viewport, "draw requested for unknown viewport");
            return;
        }
        if !self.should_update(viewport) {
            return;
        }
        let Some(vp) = self.viewports.get_mut(&viewport) else {
            return;
        };

        if vp.target_is_stale() {
            create_render_target(viewport, vp);
        }
        let Some(target) = vp.render_target.as_mut() else {
            tracing::warn!(%viewport, "viewport has no render target, skipping draw");
            return;
        };
        vp.time += delta;

        let mut raster = SoftwareRasterizer::new(target);
        match vp.clear_mode {
            ClearMode::Never => {}
            ClearMode::Always | ClearMode::OnlyNextFrame => {
                raster.clear(if vp.transparent_bg {
                    Color::TRANSPARENT
                } else {
                    vp.clear_color
                });
            }
        }

        if !vp.disable_2d {
            let (w, h) = vp.size;
            let view_rect = Rect::new(0.0, 0.0, f64::from(w), f64::from(h));
            let renderer = &mut self.renderer;
            renderer.begin_frame();

            let mut objects = 0u64;
            for att in &vp.canvases {
                let transform = vp.canvas_transform * att.transform;
                let entries = cull.cull_canvas(att.canvas, transform, view_rect);
                for entry in &entries {
                    let commands = cull.canvas_item_get_commands(entry.item);
                    renderer.render_canvas_item(&mut raster, storage, entry, commands);
                }
                objects += entries.len() as u64;
            }
            renderer.end_frame(&mut raster, storage);

            let stats = renderer.stats();
            vp.info = FrameInfo {
                objects,
                primitives: stats.primitives,
                draw_calls: stats.draw_calls,
            };
            tracing::debug!(
                %viewport,
                objects,
                draw_calls = stats.draw_calls,
                vertices = stats.vertices,
                "viewport frame rendered"
            );
        }
        drop(raster);

        if let (Some(tex), Some(target)) = (vp.render_target_texture, vp.render_target.as_ref()) {
            storage.texture_copy_from(tex, target);
        }

        if vp.screen_attachment
            && let (Some(display), Some(target)) =
                (self.display.as_deref_mut(), vp.render_target.as_ref())
        {
            let origin = (vp.rect.x0.round() as i64, vp.rect.y0.round() as i64);
            present(target, display, origin);
        }

        if vp.clear_mode == ClearMode::OnlyNextFrame {
            vp.clear_mode = ClearMode::Never;
        }
        vp.frames_drawn += 1;
        vp.needs_update = false;
    }

    /// Drop `canvas` from every viewport it is attached to.
    pub fn remove_canvas_everywhere(&mut self, canvas: Rid) {
        for vp in self.viewports.values_mut() {
            let before = vp.canvases.len();
            vp.canvases.retain(|a| a.canvas != canvas);
            if vp.canvases.len() != before {
                vp.needs_update = true;
            }
        }
    }

    /// Free a viewport together with its render-target texture.
    pub fn free(&mut self, rid: Rid, storage: &mut TextureStorage) -> bool {
        let Some(vp) = self.viewports.remove(&rid) else {
            return false;
        };
        if let Some(tex) = vp.render_target_texture {
            storage.free(tex);
        }
        for other in self.viewports.values_mut() {
            if other.parent == Some(rid) {
                other.parent = None;
            }
        }
        true
    }

    pub fn len(&self) -> usize {
        self.viewports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.viewports.is_empty()
    }
}

/// (Re)allocate the render target at the viewport's current size. Zero-sized viewports
/// end up without a target and skip drawing.
fn create_render_target(viewport: Rid, vp: &mut ViewportData) {
    let (w, h) = vp.size;
    if w == 0 || h == 0 {
        tracing::warn!(%viewport, w, h, "invalid viewport size, render target not created");
        vp.render_target = None;
        return;
    }
    vp.render_target = Some(PixelBuffer::new(w, h));
    vp.needs_update = true;
}

#[cfg(test)]
#[path = "../../tests/unit/viewport/viewport.rs"]
mod tests;
