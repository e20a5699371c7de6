//! Canvas scene graph and the cull pass.
//!
//! The cull pass flattens a canvas forest into a paint-ordered render list: transforms,
//! visibility, z and modulate are accumulated top-down, then the list is stable-sorted by
//! `(layer, z, creation index)`.

use std::collections::HashMap;

use crate::canvas::command::{Command, PrimitiveKind};
use crate::canvas::data::{Canvas, CanvasLayer, Item};
use crate::foundation::config::ServerSettings;
use crate::foundation::core::{Affine, Color, Point, Rect, Vec2};
use crate::foundation::handle::{HandleAllocator, Rid};
use crate::raster::pixel_buffer::BlendMode;
use crate::raster::sampler::{TextureFilter, TextureRepeat};

/// One item of the flattened render list with everything it inherited.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderEntry {
    pub item: Rid,
    pub transform: Affine,
    pub z: i32,
    pub modulate: Color,
    /// Active clip in target space.
    pub clip: Option<Rect>,
    pub blend: BlendMode,
    pub texture_filter: Option<TextureFilter>,
    pub texture_repeat: Option<TextureRepeat>,
    /// Stacking order of the canvas layer the entry belongs to, 0 without one.
    pub layer: i32,
    /// Creation index of the item.
    pub order: u64,
}

/// State threaded down the tree during a cull pass.
#[derive(Clone, Copy)]
struct Inherited {
    transform: Affine,
    z: i32,
    modulate: Color,
    clip: Option<Rect>,
    texture_filter: Option<TextureFilter>,
    texture_repeat: Option<TextureRepeat>,
    layer: i32,
}

#[derive(Debug)]
pub struct CanvasCull {
    handles: HandleAllocator,
    items: HashMap<Rid, Item>,
    canvases: HashMap<Rid, Canvas>,
    layers: HashMap<Rid, CanvasLayer>,
    next_index: u64,
    settings: ServerSettings,
}

impl CanvasCull {
    pub fn new(handles: HandleAllocator, settings: &ServerSettings) -> Self {
        Self {
            handles,
            items: HashMap::new(),
            canvases: HashMap::new(),
            layers: HashMap::new(),
            next_index: 0,
            settings: settings.clone(),
        }
    }

    pub fn owns(&self, rid: Rid) -> bool {
        self.items.contains_key(&rid)
            || self.canvases.contains_key(&rid)
            || self.layers.contains_key(&rid)
    }

    pub fn is_item(&self, rid: Rid) -> bool {
        self.items.contains_key(&rid)
    }

    pub fn is_canvas(&self, rid: Rid) -> bool {
        self.canvases.contains_key(&rid)
    }

    pub fn is_canvas_layer(&self, rid: Rid) -> bool {
        self.layers.contains_key(&rid)
    }

    pub fn item(&self, rid: Rid) -> Option<&Item> {
        self.items.get(&rid)
    }

    fn item_mut(&mut self, rid: Rid) -> Option<&mut Item> {
        let item = self.items.get_mut(&rid);
        if item.is_none() {
            tracing::debug!(%rid, "unknown canvas item");
        }
        item
    }

    // Canvases

    pub fn canvas_allocate(&mut self) -> Rid {
        let rid = self.handles.allocate();
        self.canvases.insert(rid, Canvas::default());
        rid
    }

    pub fn canvas_set_transform(&mut self, canvas: Rid, transform: Affine) {
        if let Some(c) = self.canvases.get_mut(&canvas) {
            c.transform = transform;
        }
    }

    // Items

    pub fn canvas_item_allocate(&mut self) -> Rid {
        let rid = self.handles.allocate();
        self.items.insert(rid, Item::new(self.next_index));
        self.next_index += 1;
        rid
    }

    /// Attach `item` under `parent`, which may be an item or a canvas. Any other handle
    /// (including [`Rid::INVALID`]) just detaches. Parenting under a descendant is refused.
    pub fn canvas_item_set_parent(&mut self, item: Rid, parent: Rid) {
        if !self.items.contains_key(&item) {
            return;
        }
        if self.items.contains_key(&parent) && self.is_ancestor_or_self(item, parent) {
            tracing::warn!(%item, %parent, "refusing to parent an item under its own subtree");
            return;
        }

        self.detach(item);

        if let Some(parent_item) = self.items.get_mut(&parent) {
            parent_item.children.push(item);
            let layer = parent_item.canvas_layer;
            if let Some(it) = self.items.get_mut(&item) {
                it.parent = Some(parent);
                if layer.is_some() {
                    it.canvas_layer = layer;
                }
            }
        } else if let Some(canvas) = self.canvases.get_mut(&parent) {
            canvas.root_items.push(item);
            if let Some(it) = self.items.get_mut(&item) {
                it.canvas = Some(parent);
            }
        }

        self.update_visibility(item);
        self.mark_transform_dirty(item);
    }

    fn is_ancestor_or_self(&self, ancestor: Rid, mut node: Rid) -> bool {
        loop {
            if node == ancestor {
                return true;
            }
            match self.items.get(&node).and_then(|it| it.parent) {
                Some(p) => node = p,
                None => return false,
            }
        }
    }

    fn detach(&mut self, item: Rid) {
        let Some(it) = self.items.get_mut(&item) else {
            return;
        };
        let parent = it.parent.take();
        let canvas = it.canvas.take();
        if let Some(p) = parent.and_then(|p| self.items.get_mut(&p)) {
            p.children.retain(|&c| c != item);
        }
        if let Some(c) = canvas.and_then(|c| self.canvases.get_mut(&c)) {
            c.root_items.retain(|&r| r != item);
        }
    }

    fn mark_transform_dirty(&mut self, item: Rid) {
        let mut stack = vec![item];
        while let Some(rid) = stack.pop() {
            if let Some(it) = self.items.get_mut(&rid) {
                it.transform_dirty = true;
                stack.extend(it.children.iter().copied());
            }
        }
    }

    fn update_visibility(&mut self, item: Rid) {
        let parent_visible = self
            .items
            .get(&item)
            .and_then(|it| it.parent)
            .and_then(|p| self.items.get(&p))
            .is_none_or(|p| p.visible_in_tree);

        let mut stack = vec![(item, parent_visible)];
        while let Some((rid, parent_visible)) = stack.pop() {
            if let Some(it) = self.items.get_mut(&rid) {
                it.visible_in_tree = it.visible && parent_visible;
                let v = it.visible_in_tree;
                stack.extend(it.children.iter().map(|&c| (c, v)));
            }
        }
    }

    pub fn canvas_item_set_transform(&mut self, item: Rid, transform: Affine) {
        if let Some(it) = self.item_mut(item) {
            it.transform = transform;
            self.mark_transform_dirty(item);
        }
    }

    pub fn canvas_item_set_visible(&mut self, item: Rid, visible: bool) {
        if let Some(it) = self.item_mut(item) {
            it.visible = visible;
            self.update_visibility(item);
        }
    }

    /// Clamped to the configured z range.
    pub fn canvas_item_set_z_index(&mut self, item: Rid, z: i32) {
        let z = self.settings.clamp_z(z);
        if let Some(it) = self.item_mut(item) {
            it.z_index = z;
        }
    }

    pub fn canvas_item_set_z_as_relative_to_parent(&mut self, item: Rid, enabled: bool) {
        if let Some(it) = self.item_mut(item) {
            it.z_relative = enabled;
        }
    }

    pub fn canvas_item_set_sort_children_by_y(&mut self, item: Rid, enabled: bool) {
        if let Some(it) = self.item_mut(item) {
            it.sort_y = enabled;
        }
    }

    pub fn canvas_item_set_draw_behind_parent(&mut self, item: Rid, enabled: bool) {
        if let Some(it) = self.item_mut(item) {
            it.behind = enabled;
        }
    }

    pub fn canvas_item_set_modulate(&mut self, item: Rid, modulate: Color) {
        if let Some(it) = self.item_mut(item) {
            it.modulate = modulate;
        }
    }

    pub fn canvas_item_set_self_modulate(&mut self, item: Rid, modulate: Color) {
        if let Some(it) = self.item_mut(item) {
            it.self_modulate = modulate;
        }
    }

    /// Item-local clip rectangle applied to the item and its descendants.
    pub fn canvas_item_set_clip_rect(&mut self, item: Rid, rect: Option<Rect>) {
        if let Some(it) = self.item_mut(item) {
            it.clip_rect = rect;
        }
    }

    pub fn canvas_item_set_blend_mode(&mut self, item: Rid, mode: BlendMode) {
        if let Some(it) = self.item_mut(item) {
            it.blend = mode;
        }
    }

    pub fn canvas_item_set_default_texture_filter(
        &mut self,
        item: Rid,
        filter: Option<TextureFilter>,
    ) {
        if let Some(it) = self.item_mut(item) {
            it.texture_filter = filter;
        }
    }

    pub fn canvas_item_set_default_texture_repeat(
        &mut self,
        item: Rid,
        repeat: Option<TextureRepeat>,
    ) {
        if let Some(it) = self.item_mut(item) {
            it.texture_repeat = repeat;
        }
    }

    pub fn canvas_item_set_canvas_layer(&mut self, item: Rid, layer: Option<Rid>) {
        let layer = layer.filter(|l| self.layers.contains_key(l));
        if let Some(it) = self.item_mut(item) {
            it.canvas_layer = layer;
        }
    }

    pub fn canvas_item_clear(&mut self, item: Rid) {
        if let Some(it) = self.item_mut(item) {
            it.commands.clear();
            it.rect_dirty = true;
        }
    }

    pub fn canvas_item_get_commands(&self, item: Rid) -> &[Command] {
        self.items
            .get(&item)
            .map(|it| it.commands.as_slice())
            .unwrap_or_default()
    }

    /// Local bounds of the item's commands; `Rect::ZERO` for unknown or empty items.
    pub fn canvas_item_get_rect(&mut self, item: Rid) -> Rect {
        self.items
            .get_mut(&item)
            .map_or(Rect::ZERO, Item::local_rect)
    }

    /// Global transform from the most recent cull pass.
    pub fn canvas_item_get_global_transform(&self, item: Rid) -> Option<Affine> {
        self.items.get(&item).map(|it| it.global_transform)
    }

    /// Final modulate from the most recent cull pass.
    pub fn canvas_item_get_final_modulate(&self, item: Rid) -> Option<Color> {
        self.items.get(&item).map(|it| it.final_modulate)
    }

    fn push_command(&mut self, item: Rid, command: Command) {
        if let Some(it) = self.item_mut(item) {
            it.commands.push(command);
            it.rect_dirty = true;
        }
    }

    pub fn canvas_item_add_line(&mut self, item: Rid, from: Point, to: Point, color: Color) {
        self.push_command(
            item,
            Command::Primitive {
                points: vec![from, to],
                colors: vec![color, color],
                uvs: vec![Point::ZERO; 2],
                texture: None,
                kind: PrimitiveKind::Lines,
            },
        );
    }

    pub fn canvas_item_add_rect(&mut self, item: Rid, rect: Rect, color: Color) {
        self.push_command(
            item,
            Command::Rect {
                rect,
                modulate: color,
                tile: false,
                texture: None,
                uv_rect: None,
            },
        );
    }

    pub fn canvas_item_add_texture_rect(
        &mut self,
        item: Rid,
        rect: Rect,
        texture: Rid,
        tile: bool,
        modulate: Color,
    ) {
        self.push_command(
            item,
            Command::Rect {
                rect,
                modulate,
                tile,
                texture: Some(texture),
                uv_rect: None,
            },
        );
    }

    /// `uv_rect` is the normalized source region (`0..1` spans the texture).
    pub fn canvas_item_add_texture_rect_region(
        &mut self,
        item: Rid,
        rect: Rect,
        texture: Rid,
        uv_rect: Rect,
        modulate: Color,
    ) {
        self.push_command(
            item,
            Command::Rect {
                rect,
                modulate,
                tile: false,
                texture: Some(texture),
                uv_rect: Some(uv_rect),
            },
        );
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
        self.push_command(
            item,
            Command::NinePatch {
                rect,
                source,
                texture: Some(texture),
                margins: [top_left.x, top_left.y, bottom_right.x, bottom_right.y],
                draw_center,
                modulate,
            },
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
        self.push_command(
            item,
            Command::Primitive {
                points,
                colors,
                uvs,
                texture,
                kind,
            },
        );
    }

    pub fn canvas_item_add_polygon(
        &mut self,
        item: Rid,
        points: Vec<Point>,
        colors: Vec<Color>,
        uvs: Vec<Point>,
        texture: Option<Rid>,
    ) {
        self.canvas_item_add_triangle_array(item, Vec::new(), points, colors, uvs, texture);
    }

    /// Polygon given as an explicit triangle list.
    pub fn canvas_item_add_triangle_array(
        &mut self,
        item: Rid,
        indices: Vec<u32>,
        points: Vec<Point>,
        colors: Vec<Color>,
        uvs: Vec<Point>,
        texture: Option<Rid>,
    ) {
        self.push_command(
            item,
            Command::Polygon {
                points,
                colors,
                uvs,
                indices,
                texture,
            },
        );
    }

    pub fn canvas_item_add_polyline(
        &mut self,
        item: Rid,
        points: Vec<Point>,
        colors: Vec<Color>,
        width: f64,
        antialiased: bool,
    ) {
        self.push_command(
            item,
            Command::Polyline {
                points,
                colors,
                width,
                antialiased,
            },
        );
    }

    pub fn canvas_item_add_circle(&mut self, item: Rid, center: Point, radius: f64, color: Color) {
        self.canvas_item_add_ellipse(item, center, Vec2::new(radius, radius), color);
    }

    pub fn canvas_item_add_ellipse(&mut self, item: Rid, center: Point, radii: Vec2, color: Color) {
        self.push_command(
            item,
            Command::Circle {
                center,
                radii,
                color,
            },
        );
    }

    pub fn canvas_item_add_clip_ignore(&mut self, item: Rid, ignore: bool) {
        self.push_command(item, Command::ClipIgnore(ignore));
    }

    // Layers

    pub fn canvas_layer_create(&mut self) -> Rid {
        let rid = self.handles.allocate();
        self.layers.insert(rid, CanvasLayer::default());
        rid
    }

    pub fn canvas_layer_set_layer(&mut self, layer: Rid, order: i32) {
        if let Some(l) = self.layers.get_mut(&layer) {
            l.layer = order;
        }
    }

    pub fn canvas_layer_set_transform(&mut self, layer: Rid, transform: Affine) {
        if let Some(l) = self.layers.get_mut(&layer) {
            l.transform = transform;
        }
    }

    pub fn canvas_layer_set_canvas(&mut self, layer: Rid, canvas: Rid) {
        let Some(l) = self.layers.get_mut(&layer) else {
            return;
        };
        let previous = l.canvas.take();
        if self.canvases.contains_key(&canvas) {
            l.canvas = Some(canvas);
        }
        if let Some(c) = previous.and_then(|c| self.canvases.get_mut(&c)) {
            c.layers.retain(|&r| r != layer);
        }
        if let Some(c) = self.canvases.get_mut(&canvas) {
            c.layers.push(layer);
        }
    }

    // Cull

    /// Flatten `canvas` into a paint-ordered render list.
    ///
    /// Every visible item with commands is emitted; clipping to `viewport_rect` is left to
    /// the rasterizer.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn cull_canvas(
        &mut self,
        canvas: Rid,
        viewport_transform: Affine,
        viewport_rect: Rect,
    ) -> Vec<RenderEntry> {
        let Some(c) = self.canvases.get(&canvas) else {
            return Vec::new();
        };
        let canvas_transform = viewport_transform * c.transform;
        let roots = c.root_items.clone();

        let mut out = Vec::new();
        for root in roots {
            let Some(it) = self.items.get(&root) else {
                continue;
            };
            let layer = it.canvas_layer.and_then(|l| self.layers.get(&l));
            let (transform, layer_order) = match layer {
                Some(l) => (viewport_transform * l.transform, l.layer),
                None => (canvas_transform, 0),
            };
            let ctx = Inherited {
                transform,
                z: 0,
                modulate: Color::WHITE,
                clip: None,
                texture_filter: None,
                texture_repeat: None,
                layer: layer_order,
            };
            self.cull_item(root, ctx, &mut out);
        }

        out.sort_by_key(|e| (e.layer, e.z, e.order));
        tracing::debug!(entries = out.len(), ?viewport_rect, "canvas culled");
        out
    }

    fn cull_item(&mut self, rid: Rid, parent: Inherited, out: &mut Vec<RenderEntry>) {
        let Some(item) = self.items.get_mut(&rid) else {
            return;
        };
        if !item.visible || !item.visible_in_tree {
            return;
        }

        let global = parent.transform * item.transform;
        item.global_transform = global;
        item.transform_dirty = false;

        let z = self.settings.clamp_z(if item.z_relative {
            parent.z.saturating_add(item.z_index)
        } else {
            item.z_index
        });

        item.final_modulate = parent.modulate * item.modulate * item.self_modulate;

        let clip = match item.clip_rect {
            Some(local) => {
                let r = global.transform_rect_bbox(local);
                Some(parent.clip.map_or(r, |p| p.intersect(r)))
            }
            None => parent.clip,
        };

        let ctx = Inherited {
            transform: global,
            z,
            modulate: item.modulate * parent.modulate,
            clip,
            texture_filter: item.texture_filter.or(parent.texture_filter),
            texture_repeat: item.texture_repeat.or(parent.texture_repeat),
            layer: parent.layer,
        };

        if !item.commands.is_empty() {
            out.push(RenderEntry {
                item: rid,
                transform: global,
                z,
                modulate: item.final_modulate,
                clip,
                blend: item.blend,
                texture_filter: ctx.texture_filter,
                texture_repeat: ctx.texture_repeat,
                layer: parent.layer,
                order: item.index,
            });
        }

        let mut children = item.children.clone();
        if item.sort_y {
            let items = &self.items;
            let y = |c: &Rid| items.get(c).map_or(0.0, |it| it.transform.translation().y);
            children.sort_by(|a, b| y(a).total_cmp(&y(b)));
        }
        let (behind, normal): (Vec<Rid>, Vec<Rid>) = children
            .into_iter()
            .partition(|c| self.items.get(c).is_some_and(|it| it.behind));

        for child in behind.into_iter().chain(normal) {
            self.cull_item(child, ctx, out);
        }
    }

    /// Delete an item, canvas or layer. Children of a freed item are detached and stay
    /// allocated; items of a freed canvas become unparented.
    pub fn free(&mut self, rid: Rid) -> bool {
        if self.items.contains_key(&rid) {
            self.detach(rid);
            if let Some(item) = self.items.remove(&rid) {
                for child in item.children {
                    if let Some(c) = self.items.get_mut(&child) {
                        c.parent = None;
                    }
                    self.update_visibility(child);
                }
            }
            return true;
        }
        if let Some(canvas) = self.canvases.remove(&rid) {
            for root in canvas.root_items {
                if let Some(it) = self.items.get_mut(&root) {
                    it.canvas = None;
                }
            }
            for layer in canvas.layers {
                if let Some(l) = self.layers.get_mut(&layer) {
                    l.canvas = None;
                }
            }
            return true;
        }
        if let Some(layer) = self.layers.remove(&rid) {
            if let Some(c) = layer.canvas.and_then(|c| self.canvases.get_mut(&c)) {
                c.layers.retain(|&l| l != rid);
            }
            for it in self.items.values_mut() {
                if it.canvas_layer == Some(rid) {
                    it.canvas_layer = None;
                }
            }
            return true;
        }
        false
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/canvas/cull.rs"]
mod tests;
