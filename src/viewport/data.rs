use serde::{Deserialize, Serialize};

use crate::foundation::config::ServerSettings;
use crate::foundation::core::{Affine, Color, Rect};
use crate::foundation::handle::Rid;
use crate::raster::pixel_buffer::PixelBuffer;

/// When a viewport redraws.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMode {
    Disabled,
    /// Redraw while an update is pending, then consume it.
    Once,
    #[default]
    WhenVisible,
    /// Follows the parent viewport's visibility; without a parent, always.
    WhenParentVisible,
    Always,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClearMode {
    #[default]
    Always,
    Never,
    /// Clears on the next drawn frame, then behaves as `Never`.
    OnlyNextFrame,
}

/// Per-frame counters readable through `viewport_get_render_info`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RenderInfo {
    ObjectsInFrame,
    PrimitivesInFrame,
    DrawCallsInFrame,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameInfo {
    pub objects: u64,
    pub primitives: u64,
    pub draw_calls: u64,
}

impl FrameInfo {
    pub fn get(&self, info: RenderInfo) -> u64 {
        match info {
            RenderInfo::ObjectsInFrame => self.objects,
            RenderInfo::PrimitivesInFrame => self.primitives,
            RenderInfo::DrawCallsInFrame => self.draw_calls,
        }
    }
}

/// A canvas attached to a viewport and where it stacks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CanvasAttachment {
    pub canvas: Rid,
    pub layer: i32,
    pub sublayer: i32,
    pub transform: Affine,
}

impl CanvasAttachment {
    pub fn new(canvas: Rid) -> Self {
        Self {
            canvas,
            layer: 0,
            sublayer: 0,
            transform: Affine::IDENTITY,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ViewportData {
    pub size: (u32, u32),
    /// Screen-space placement; the origin is where presentation lands.
    pub rect: Rect,
    /// Applied in front of every attachment transform.
    pub canvas_transform: Affine,

    pub visible: bool,
    pub parent: Option<Rid>,
    pub update_mode: UpdateMode,
    pub clear_mode: ClearMode,
    pub clear_color: Color,
    pub transparent_bg: bool,
    pub disable_2d: bool,
    pub screen_attachment: bool,

    pub render_target: Option<PixelBuffer>,
    /// Texture mirroring the render target, created on request.
    pub render_target_texture: Option<Rid>,

    /// Attachments in draw order: `(layer, sublayer)`, then attachment order.
    pub canvases: Vec<CanvasAttachment>,

    pub info: FrameInfo,
    pub frames_drawn: u64,
    pub time: f64,
    pub needs_update: bool,
}

impl ViewportData {
    pub fn new(settings: &ServerSettings) -> Self {
        let [w, h] = settings.default_viewport_size;
        Self {
            size: (w, h),
            rect: Rect::new(0.0, 0.0, f64::from(w), f64::from(h)),
            canvas_transform: Affine::IDENTITY,
            visible: true,
            parent: None,
            update_mode: UpdateMode::default(),
            clear_mode: ClearMode::default(),
            clear_color: settings.default_clear_color,
            transparent_bg: false,
            disable_2d: false,
            screen_attachment: false,
            render_target: None,
            render_target_texture: None,
            canvases: Vec::new(),
            info: FrameInfo::default(),
            frames_drawn: 0,
            time: 0.0,
            needs_update: true,
        }
    }

    pub fn attachment_mut(&mut self, canvas: Rid) -> Option<&mut CanvasAttachment> {
        self.canvases.iter_mut().find(|a| a.canvas == canvas)
    }

    pub fn has_canvas(&self, canvas: Rid) -> bool {
        self.canvases.iter().any(|a| a.canvas == canvas)
    }

    /// Stable, so equal stacking keeps attachment order.
    pub fn sort_canvases(&mut self) {
        self.canvases.sort_by_key(|a| (a.layer, a.sublayer));
    }

    /// Whether the render target is missing or no longer matches `size`.
    pub fn target_is_stale(&self) -> bool {
        self.render_target
            .as_ref()
            .is_none_or(|t| t.size() != self.size)
    }
}
