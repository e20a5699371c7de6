use crate::canvas::command::Command;
use crate::foundation::core::{Affine, Color, Rect};
use crate::foundation::handle::Rid;
use crate::raster::pixel_buffer::BlendMode;
use crate::raster::sampler::{TextureFilter, TextureRepeat};

/// A node of the canvas tree.
///
/// Parent and children are stored as handles into the cull arena, never as references.
#[derive(Clone, Debug)]
pub struct Item {
    /// Parent item, when not a canvas root.
    pub parent: Option<Rid>,
    /// Owning canvas, set only on root items.
    pub canvas: Option<Rid>,
    pub children: Vec<Rid>,

    pub transform: Affine,
    /// Global transform computed by the last cull pass.
    pub global_transform: Affine,

    pub visible: bool,
    pub visible_in_tree: bool,

    pub z_index: i32,
    pub z_relative: bool,
    pub sort_y: bool,
    pub behind: bool,

    pub modulate: Color,
    pub self_modulate: Color,
    /// Combined modulate computed by the last cull pass.
    pub final_modulate: Color,

    /// Item-local clip for this item and its descendants.
    pub clip_rect: Option<Rect>,
    pub blend: BlendMode,
    /// `None` inherits from the parent.
    pub texture_filter: Option<TextureFilter>,
    /// `None` inherits from the parent.
    pub texture_repeat: Option<TextureRepeat>,
    pub canvas_layer: Option<Rid>,

    pub commands: Vec<Command>,

    /// Creation order; tie-break for paint order.
    pub index: u64,
    pub transform_dirty: bool,
    pub rect_dirty: bool,
    pub rect: Rect,
}

impl Item {
    pub fn new(index: u64) -> Self {
        Self {
            parent: None,
            canvas: None,
            children: Vec::new(),
            transform: Affine::IDENTITY,
            global_transform: Affine::IDENTITY,
            visible: true,
            visible_in_tree: true,
            z_index: 0,
            z_relative: true,
            sort_y: false,
            behind: false,
            modulate: Color::WHITE,
            self_modulate: Color::WHITE,
            final_modulate: Color::WHITE,
            clip_rect: None,
            blend: BlendMode::Mix,
            texture_filter: None,
            texture_repeat: None,
            canvas_layer: None,
            commands: Vec::new(),
            index,
            transform_dirty: true,
            rect_dirty: true,
            rect: Rect::ZERO,
        }
    }

    /// Local bounds of the command list, recomputed when dirty.
    pub fn local_rect(&mut self) -> Rect {
        if self.rect_dirty {
            self.rect = self
                .commands
                .iter()
                .filter_map(Command::bounds)
                .reduce(|a, b| a.union(b))
                .unwrap_or(Rect::ZERO);
            self.rect_dirty = false;
        }
        self.rect
    }
}

#[derive(Clone, Debug, Default)]
pub struct Canvas {
    pub transform: Affine,
    /// Root items in attachment order.
    pub root_items: Vec<Rid>,
    pub layers: Vec<Rid>,
}

/// Stacking group with its own order and transform (HUD-style overlays).
#[derive(Clone, Debug, Default)]
pub struct CanvasLayer {
    pub layer: i32,
    pub transform: Affine,
    pub canvas: Option<Rid>,
}
