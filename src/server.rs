//! The rendering server: one object owning texture storage, the canvas scene graph and the
//! viewports, and the only entry point clients use.

use std::path::Path;

use crate::canvas::command::{Command, PrimitiveKind};
use crate::canvas::cull::CanvasCull;
use crate::foundation::config::ServerSettings;
use crate::foundation::core::{Affine, Color, Point, Rect, Vec2};
use crate::foundation::error::SoftCanvasResult;
use crate::foundation::handle::{HandleAllocator, Rid};
use crate::raster::pixel_buffer::{BlendMode, PixelBuffer};
use crate::raster::sampler::{TextureFilter, TextureRepeat};
use crate::storage::TextureStorage;
use crate::viewport::{
    ClearMode, DisplaySurface, RenderInfo, UpdateMode, ViewportData, ViewportManager,
};

/// What kind of resource a handle names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceType {
    Texture,
    Canvas,
    CanvasItem,
    CanvasLayer,
    Viewport,
}

#[derive(Debug)]
pub struct RenderingServer {
    settings: ServerSettings,
    handles: HandleAllocator,
    storage: TextureStorage,
    canvas: CanvasCull,
    viewports: ViewportManager,
    frame_count: u64,
    time: f64,
}

impl Default for RenderingServer {
    fn default() -> Self {
        Self::new(ServerSettings::default())
    }
}

impl RenderingServer {
    pub fn new(settings: ServerSettings) -> Self {
        let handles = HandleAllocator::new();
        Self {
            storage: TextureStorage::new(handles.clone()),
            canvas: CanvasCull::new(handles.clone(), &settings),
            viewports: ViewportManager::new(handles.clone(), &settings),
            handles,
            settings,
            frame_count: 0,
            time: 0.0,
        }
    }

    pub fn settings(&self) -> &ServerSettings {
        &self.settings
    }

    pub fn storage(&self) -> &TextureStorage {
        &self.storage
    }

    pub fn canvas(&self) -> &CanvasCull {
        &self.canvas
    }

    pub fn viewports(&self) -> &ViewportManager {
        &self.viewports
    }

    /// Handles issued so far across every subsystem.
    pub fn handles_issued(&self) -> u64 {
        self.handles.issued()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Sum of the deltas passed to [`RenderingServer::draw`].
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn resource_type(&self, rid: Rid) -> Option<ResourceType> {
        if self.storage.owns(rid) {
            Some(ResourceType::Texture)
        } else if self.canvas.is_item(rid) {
            Some(ResourceType::CanvasItem)
        } else if self.canvas.is_canvas(rid) {
            Some(ResourceType::Canvas)
        } else if self.canvas.is_canvas_layer(rid) {
            Some(ResourceType::CanvasLayer)
        } else if self.viewports.owns(rid) {
            Some(ResourceType::Viewport)
        } else {
            None
        }
    }

    /// Free any handle. Unknown handles are ignored.
    pub fn free_rid(&mut self, rid: Rid) -> bool {
        match self.resource_type(rid) {
            Some(ResourceType::Texture) => self.storage.free(rid),
            Some(ResourceType::Canvas) => {
                self.viewports.remove_canvas_everywhere(rid);
                self.canvas.free(rid)
            }
            Some(ResourceType::CanvasItem | ResourceType::CanvasLayer) => self.canvas.free(rid),
            Some(ResourceType::Viewport) => self.viewports.free(rid, &mut self.storage),
            None => {
                tracing::debug!(%rid, "free of unknown handle ignored");
                false
            }
        }
    }

    pub fn set_display_window(&mut self, display: Box<dyn DisplaySurface>) {
        self.viewports.set_display_window(display);
    }

    pub fn display(&self) -> Option<&dyn DisplaySurface> {
        self.viewports.display()
    }

    // Textures

    pub fn texture_allocate(&mut self) -> Rid {
        self.storage.texture_allocate()
    }

    /// Allocate and initialize in one step.
    pub fn texture_2d_create(&mut self, image: &image::DynamicImage) -> Rid {
        let rid = self.storage.texture_allocate();
        self.storage.texture_2d_initialize(rid, image);
        rid
    }

    pub fn texture_2d_initialize(&mut self, texture: Rid, image: &image::DynamicImage) {
        self.storage.texture_2d_initialize(texture, image);
    }

    pub fn texture_set_image(&mut self, texture: Rid, image: &image::DynamicImage) {
        self.storage.texture_set_image(texture, image);
    }

    pub fn texture_set_buffer(&mut self, texture: Rid, buffer: PixelBuffer) {
        self.storage.texture_set_buffer(texture, buffer);
    }

    pub fn texture_get_size(&self, texture: Rid) -> (u32, u32) {
        self.storage.texture_get_size(texture)
    }

    pub fn texture_get_native_handle(&self, texture: Rid) -> Option<&PixelBuffer> {
        self.storage.texture_get_native_handle(texture)
    }

    pub fn texture_set_path(&mut self, texture: Rid, path: impl Into<String>) {
        self.storage.texture_set_path(texture, path);
    }

    pub fn texture_get_path(&self, texture: Rid) -> &str {
        self.storage.texture_get_path(texture)
    }

    pub fn texture_load_from_path(&mut self, path: &Path) -> SoftCanvasResult<Rid> {
        self.storage.texture_load_from_path(path)
    }

    pub fn texture_load_from_memory(&mut self, bytes: &[u8]) -> SoftCanvasResult<Rid> {
        self.storage.texture_load_from_memory(bytes)
    }

    pub fn canvas_texture_allocate(&mut self) -> Rid {
        self.storage.canvas_texture_allocate()
    }

    pub fn canvas_texture_set_channel(&mut self, canvas_texture: Rid, channel: u32, texture: Rid) {
        self.storage
            .canvas_texture_set_channel(canvas_texture, channel, texture);
    }

    pub fn canvas_texture_set_texture_filter(&mut self, canvas_texture: Rid, filter: TextureFilter) {
        self.storage
            .canvas_texture_set_texture_filter(canvas_texture, filter);
    }

    pub fn canvas_texture_set_texture_repeat(&mut self, canvas_texture: Rid, repeat: TextureRepeat) {
        self.storage
            .canvas_texture_set_texture_repeat(canvas_texture, repeat);
    }

    pub fn get_default_texture(&mut self) -> Rid {
        self.storage.get_default_texture()
    }

    // Canvases and layers

    pub fn canvas_create(&mut self) -> Rid {
        self.canvas.canvas_allocate()
    }

    pub fn canvas_set_transform(&mut self, canvas: Rid, transform: Affine) {
        self.canvas.canvas_set_transform(canvas, transform);
    }

    pub fn canvas_layer_create(&mut self) -> Rid {
        self.canvas.canvas_layer_create()
    }

    pub fn canvas_layer_set_layer(&mut self, layer: Rid, order: i32) {
        self.canvas.canvas_layer_set_layer(layer, order);
    }

    pub fn canvas_layer_set_transform(&mut self, layer: Rid, transform: Affine) {
        self.canvas.canvas_layer_set_transform(layer, transform);
    }

    pub fn canvas_layer_set_canvas(&mut self, layer: Rid, canvas: Rid) {
        self.canvas.canvas_layer_set_canvas(layer, canvas);
    }

    // Canvas items

    pub fn canvas_item_create(&mut self) -> Rid {
        self.canvas.canvas_item_allocate()
    }

    /// `parent` may be a canvas (the item becomes a root) or another item.
    pub fn canvas_item_set_parent(&mut self, item: Rid, parent: Rid) {
        self.canvas.canvas_item_set_parent(item, parent);
    }

    pub fn canvas_item_set_transform(&mut self, item: Rid, transform: Affine) {
        self.canvas.canvas_item_set_transform(item, transform);
    }

    pub fn canvas_item_set_visible(&mut self, item: Rid, visible: bool) {
        self.canvas.canvas_item_set_visible(item, visible);
    }

    pub fn canvas_item_set_z_index(&mut self, item: Rid, z: i32) {
        self.canvas.canvas_item_set_z_index(item, z);
    }

    pub fn canvas_item_set_z_as_relative_to_parent(&mut self, item: Rid, enabled: bool) {
        self.canvas
            .canvas_item_set_z_as_relative_to_parent(item, enabled);
    }

    pub fn canvas_item_set_sort_children_by_y(&mut self, item: Rid, enabled: bool) {
        self.canvas.canvas_item_set_sort_children_by_y(item, enabled);
    }

    pub fn canvas_item_set_draw_behind_parent(&mut self, item: Rid, enabled: bool) {
        self.canvas.canvas_item_set_draw_behind_parent(item, enabled);
    }

    pub fn canvas_item_set_modulate(&mut self, item: Rid, modulate: Color) {
        self.canvas.canvas_item_set_modulate(item, modulate);
    }

    pub fn canvas_item_set_self_modulate(&mut self, item: Rid, modulate: Color) {
        self.canvas.canvas_item_set_self_modulate(item, modulate);
    }

    pub fn canvas_item_set_clip_rect(&mut self, item: Rid, rect: Option<Rect>) {
        self.canvas.canvas_item_set_clip_rect(item, rect);
    }

    pub fn canvas_item_set_blend_mode(&mut self, item: Rid, mode: BlendMode) {
        self.canvas.canvas_item_set_blend_mode(item, mode);
    }

    pub fn canvas_item_set_default_texture_filter(
        &mut self,
        item: Rid,
        filter: Option<TextureFilter>,
    ) {
        self.canvas
            .canvas_item_set_default_texture_filter(item, filter);
    }

    pub fn canvas_item_set_default_texture_repeat(
        &mut self,
        item: Rid,
        repeat: Option<TextureRepeat>,
    ) {
        self.canvas
            .canvas_item_set_default_texture_repeat(item, repeat);
    }

    pub fn canvas_item_set_canvas_layer(&mut self, item: Rid, layer: Option<Rid>) {
        self.canvas.canvas_item_set_canvas_layer(item, layer);
    }

    pub fn canvas_item_clear(&mut self, item: Rid) {
        self.canvas.canvas_item_clear(item);
    }

    pub fn canvas_item_get_commands(&self, item: Rid) -> &[Command] {
        self.canvas.canvas_item_get_commands(item)
    }

    pub fn canvas_item_get_rect(&mut self, item: Rid) -> Rect {
        self.canvas.canvas_item_get_rect(item)
    }

    pub fn canvas_item_get_global_transform(&self, item: Rid) -> Option<Affine> {
        self.canvas.canvas_item_get_global_transform(item)
    }

    pub fn canvas_item_get_final_modulate(&self, item: Rid) -> Option<Color> {
        self.canvas.canvas_item_get_final_modulate(item)
    }

    pub fn canvas_item_add_line(&mut self, item: Rid, from: Point, to: Point, color: Color) {
        self.canvas.canvas_item_add_line(item, from, to, color);
    }

    pub fn canvas_item_add_rect(&mut self, item: Rid, rect: Rect, color: Color) {
        self.canvas.canvas_item_add_rect(item, rect, color);
    }

    pub fn canvas_item_add_texture_rect(
        &mut self,
        item: Rid,
        rect: Rect,
        texture: Rid,
        tile: bool,
        modulate: Color,
    ) {
        self.canvas
            .canvas_item_add_texture_rect(item, rect, texture, tile, modulate);
    }

    /// `src_rect` is in texture pixels; it is normalized by the texture's current size.
    pub fn canvas_item_add_texture_rect_region(
        &mut self,
        item: Rid,
        rect: Rect,
        texture: Rid,
        src_rect: Rect,
        modulate: Color,
    ) {
        let uv_rect = match self.storage.resolve(texture).map(|view| view.image.size()) {
            Some((w, h)) if w > 0 && h > 0 => Rect::new(
                src_rect.x0 / f64::from(w),
                src_rect.y0 / f64::from(h),
                src_rect.x1 / f64::from(w),
                src_rect.y1 / f64::from(h),
            ),
            _ => {
                tracing::debug!(%texture, "region on a texture without pixels, using full UVs");
                Rect::new(0.0, 0.0, 1.0, 1.0)
            }
        };
        self.canvas
            .canvas_item_add_texture_rect_region(item, rect, texture, uv_rect, modulate);
    }

    #[allow(clippy::too_many_arguments)]
    pub fn canvas_item_add_nine_patch(
        &mut self,
        item: Rid,
        rect: Rect,
        source: Rect,
        texture: Rid,
        top_left: Vec2,
        bottom_right: Vec2,
        draw_center: bool,
        modulate: Color,
    ) {
        self.canvas.canvas_item_add_nine_patch(
            item,
            rect,
            source,
            texture,
            top_left,
            bottom_right,
            draw_center,
            modulate,
        );
    }

    pub fn canvas_item_add_primitive(
        &mut self,
        item: Rid,
        points: Vec<Point>,
        colors: Vec<Color>,
        uvs: Vec<Point>,
        texture: Option<Rid>,
        kind: PrimitiveKind,
    ) {
        self.canvas
            .canvas_item_add_primitive(item, points, colors, uvs, texture, kind);
    }

    pub fn canvas_item_add_polygon(
        &mut self,
        item: Rid,
        points: Vec<Point>,
        colors: Vec<Color>,
        uvs: Vec<Point>,
        texture: Option<Rid>,
    ) {
        self.canvas
            .canvas_item_add_polygon(item, points, colors, uvs, texture);
    }

    pub fn canvas_item_add_triangle_array(
        &mut self,
        item: Rid,
        indices: Vec<u32>,
        points: Vec<Point>,
        colors: Vec<Color>,
        uvs: Vec<Point>,
        texture: Option<Rid>,
    ) {
        self.canvas
            .canvas_item_add_triangle_array(item, indices, points, colors, uvs, texture);
    }

    pub fn canvas_item_add_polyline(
        &mut self,
        item: Rid,
        points: Vec<Point>,
        colors: Vec<Color>,
        width: f64,
        antialiased: bool,
    ) {
        self.canvas
            .canvas_item_add_polyline(item, points, colors, width, antialiased);
    }

    pub fn canvas_item_add_circle(&mut self, item: Rid, center: Point, radius: f64, color: Color) {
        self.canvas.canvas_item_add_circle(item, center, radius, color);
    }

    pub fn canvas_item_add_ellipse(&mut self, item: Rid, center: Point, radii: Vec2, color: Color) {
        self.canvas.canvas_item_add_ellipse(item, center, radii, color);
    }

    pub fn canvas_item_add_clip_ignore(&mut self, item: Rid, ignore: bool) {
        self.canvas.canvas_item_add_clip_ignore(item, ignore);
    }

    // Viewports

    pub fn viewport_create(&mut self) -> Rid {
        self.viewports.viewport_allocate()
    }

    pub fn viewport_get(&self, viewport: Rid) -> Option<&ViewportData> {
        self.viewports.get(viewport)
    }

    pub fn viewport_set_size(&mut self, viewport: Rid, width: u32, height: u32) {
        self.viewports.viewport_set_size(viewport, width, height);
    }

    pub fn viewport_set_active(&mut self, viewport: Rid, active: bool) {
        self.viewports.viewport_set_active(viewport, active);
    }

    pub fn viewport_set_parent_viewport(&mut self, viewport: Rid, parent: Option<Rid>) {
        self.viewports.viewport_set_parent_viewport(viewport, parent);
    }

    pub fn viewport_set_update_mode(&mut self, viewport: Rid, mode: UpdateMode) {
        self.viewports.viewport_set_update_mode(viewport, mode);
    }

    pub fn viewport_set_clear_mode(&mut self, viewport: Rid, mode: ClearMode) {
        self.viewports.viewport_set_clear_mode(viewport, mode);
    }

    pub fn viewport_set_clear_color(&mut self, viewport: Rid, color: Color) {
        self.viewports.viewport_set_clear_color(viewport, color);
    }

    pub fn viewport_set_transparent_background(&mut self, viewport: Rid, enabled: bool) {
        self.viewports
            .viewport_set_transparent_background(viewport, enabled);
    }

    pub fn viewport_set_disable_2d(&mut self, viewport: Rid, disabled: bool) {
        self.viewports.viewport_set_disable_2d(viewport, disabled);
    }

    pub fn viewport_attach_to_screen(&mut self, viewport: Rid, rect: Rect) {
        self.viewports.viewport_attach_to_screen(viewport, rect);
    }

    pub fn viewport_detach_from_screen(&mut self, viewport: Rid) {
        self.viewports.viewport_detach_from_screen(viewport);
    }

    pub fn viewport_attach_canvas(&mut self, viewport: Rid, canvas: Rid) {
        self.viewports.viewport_attach_canvas(viewport, canvas);
    }

    pub fn viewport_remove_canvas(&mut self, viewport: Rid, canvas: Rid) {
        self.viewports.viewport_remove_canvas(viewport, canvas);
    }

    pub fn viewport_set_canvas_stacking(
        &mut self,
        viewport: Rid,
        canvas: Rid,
        layer: i32,
        sublayer: i32,
    ) {
        self.viewports
            .viewport_set_canvas_stacking(viewport, canvas, layer, sublayer);
    }

    pub fn viewport_set_canvas_transform(&mut self, viewport: Rid, canvas: Rid, transform: Affine) {
        self.viewports
            .viewport_set_canvas_transform(viewport, canvas, transform);
    }

    pub fn viewport_set_global_canvas_transform(&mut self, viewport: Rid, transform: Affine) {
        self.viewports
            .viewport_set_global_canvas_transform(viewport, transform);
    }

    pub fn viewport_request_update(&mut self, viewport: Rid) {
        self.viewports.viewport_request_update(viewport);
    }

    pub fn viewport_get_texture(&mut self, viewport: Rid) -> Rid {
        self.viewports
            .viewport_get_texture(viewport, &mut self.storage)
    }

    pub fn viewport_get_render_info(&self, viewport: Rid, info: RenderInfo) -> u64 {
        self.viewports.viewport_get_render_info(viewport, info)
    }

    pub fn viewport_get_render_target(&self, viewport: Rid) -> Option<&PixelBuffer> {
        self.viewports.viewport_get_render_target(viewport)
    }

    pub fn viewport_draw(&mut self, viewport: Rid, delta: f64) {
        self.viewports
            .viewport_draw(viewport, delta, &mut self.canvas, &mut self.storage);
    }

    /// Draw every viewport once, in allocation order.
    pub fn draw(&mut self, delta: f64) {
        let mut ids: Vec<Rid> = self.viewports.ids().collect();
        ids.sort();
        for viewport in ids {
            self.viewport_draw(viewport, delta);
        }
        self.frame_count += 1;
        self.time += delta;
    }
}
