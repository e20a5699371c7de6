//! JSON scene descriptions: a viewport, named textures and an item tree, built through the
//! public server API.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::foundation::core::{Affine, Color, Point, Rect, Vec2};
use crate::foundation::error::{SoftCanvasError, SoftCanvasResult};
use crate::foundation::handle::Rid;
use crate::raster::pixel_buffer::BlendMode;
use crate::raster::sampler::{TextureFilter, TextureRepeat};
use crate::server::RenderingServer;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SceneDescription {
    pub viewport: ViewportDesc,
    /// Texture name → image path, relative to the scene file.
    #[serde(default)]
    pub textures: BTreeMap<String, String>,
    #[serde(default)]
    pub layers: BTreeMap<String, LayerDesc>,
    #[serde(default)]
    pub items: Vec<ItemDesc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ViewportDesc {
    pub size: [u32; 2],
    #[serde(default)]
    pub clear_color: Option<Color>,
    #[serde(default)]
    pub transparent: bool,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayerDesc {
    #[serde(default)]
    pub layer: i32,
    #[serde(default)]
    pub transform: TransformDesc,
}

/// Translate, then rotate, then scale, applied to item-local points in reverse order.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransformDesc {
    pub translate: [f64; 2],
    pub rotation_deg: f64,
    pub scale: [f64; 2],
}

impl Default for TransformDesc {
    fn default() -> Self {
        Self {
            translate: [0.0, 0.0],
            rotation_deg: 0.0,
            scale: [1.0, 1.0],
        }
    }
}

impl TransformDesc {
    pub fn to_affine(self) -> Affine {
        Affine::translate((self.translate[0], self.translate[1]))
            * Affine::rotate(self.rotation_deg.to_radians())
            * Affine::scale_non_uniform(self.scale[0], self.scale[1])
    }
}

fn yes() -> bool {
    true
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ItemDesc {
    #[serde(default)]
    pub transform: TransformDesc,
    #[serde(default = "yes")]
    pub visible: bool,
    #[serde(default)]
    pub z_index: i32,
    #[serde(default = "yes")]
    pub z_relative: bool,
    #[serde(default)]
    pub sort_children_by_y: bool,
    #[serde(default)]
    pub draw_behind_parent: bool,
    #[serde(default)]
    pub modulate: Option<Color>,
    #[serde(default)]
    pub self_modulate: Option<Color>,
    /// `[x, y, w, h]` in item space.
    #[serde(default)]
    pub clip_rect: Option<[f64; 4]>,
    #[serde(default)]
    pub blend: BlendMode,
    #[serde(default)]
    pub texture_filter: Option<TextureFilter>,
    #[serde(default)]
    pub texture_repeat: Option<TextureRepeat>,
    /// Key into [`SceneDescription::layers`]; only meaningful on root items.
    #[serde(default)]
    pub layer: Option<String>,
    #[serde(default)]
    pub commands: Vec<CommandDesc>,
    #[serde(default)]
    pub children: Vec<ItemDesc>,
}

/// Rects are `[x, y, w, h]`; points are `[x, y]`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum CommandDesc {
    Rect {
        rect: [f64; 4],
        color: Color,
    },
    TextureRect {
        rect: [f64; 4],
        texture: String,
        #[serde(default)]
        tile: bool,
        #[serde(default)]
        modulate: Option<Color>,
    },
    TextureRectRegion {
        rect: [f64; 4],
        texture: String,
        /// Source region in texture pixels.
        src: [f64; 4],
        #[serde(default)]
        modulate: Option<Color>,
    },
    NinePatch {
        rect: [f64; 4],
        texture: String,
        #[serde(default)]
        source: Option<[f64; 4]>,
        /// `[left, top, right, bottom]`.
        margins: [f64; 4],
        #[serde(default = "yes")]
        draw_center: bool,
        #[serde(default)]
        modulate: Option<Color>,
    },
    Line {
        from: [f64; 2],
        to: [f64; 2],
        color: Color,
    },
    Polyline {
        points: Vec<[f64; 2]>,
        color: Color,
        #[serde(default = "one")]
        width: f64,
    },
    Polygon {
        points: Vec<[f64; 2]>,
        #[serde(default)]
        colors: Vec<Color>,
        #[serde(default)]
        texture: Option<String>,
        #[serde(default)]
        uvs: Vec<[f64; 2]>,
    },
    Circle {
        center: [f64; 2],
        radius: f64,
        color: Color,
    },
    Ellipse {
        center: [f64; 2],
        radii: [f64; 2],
        color: Color,
    },
    ClipIgnore {
        ignore: bool,
    },
}

fn one() -> f64 {
    1.0
}

impl CommandDesc {
    fn texture(&self) -> Option<&str> {
        match self {
            Self::TextureRect { texture, .. }
            | Self::TextureRectRegion { texture, .. }
            | Self::NinePatch { texture, .. } => Some(texture),
            Self::Polygon { texture, .. } => texture.as_deref(),
            _ => None,
        }
    }
}

fn rect(r: [f64; 4]) -> Rect {
    Rect::new(r[0], r[1], r[0] + r[2], r[1] + r[3])
}

fn point(p: [f64; 2]) -> Point {
    Point::new(p[0], p[1])
}

fn points(ps: &[[f64; 2]]) -> Vec<Point> {
    ps.iter().copied().map(point).collect()
}

impl SceneDescription {
    pub fn from_json_str(s: &str) -> SoftCanvasResult<Self> {
        let scene: Self =
            serde_json::from_str(s).map_err(|e| SoftCanvasError::serde(e.to_string()))?;
        scene.validate()?;
        Ok(scene)
    }

    pub fn load(path: &Path) -> SoftCanvasResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            SoftCanvasError::validation(format!("read scene '{}': {e}", path.display()))
        })?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> SoftCanvasResult<()> {
        let [w, h] = self.viewport.size;
        if w == 0 || h == 0 {
            return Err(SoftCanvasError::validation(
                "viewport width/height must be > 0",
            ));
        }
        let mut stack: Vec<&ItemDesc> = self.items.iter().collect();
        while let Some(item) = stack.pop() {
            if let Some(layer) = &item.layer
                && !self.layers.contains_key(layer)
            {
                return Err(SoftCanvasError::validation(format!(
                    "item references missing layer '{layer}'"
                )));
            }
            for cmd in &item.commands {
                if let Some(tex) = cmd.texture()
                    && !self.textures.contains_key(tex)
                {
                    return Err(SoftCanvasError::validation(format!(
                        "command references missing texture '{tex}'"
                    )));
                }
            }
            stack.extend(&item.children);
        }
        Ok(())
    }

    /// Load textures relative to `assets_root`, create the canvas tree and one viewport with
    /// the canvas attached. Returns the viewport handle.
    pub fn build(
        &self,
        server: &mut RenderingServer,
        assets_root: &Path,
    ) -> SoftCanvasResult<Rid> {
        let mut textures = BTreeMap::new();
        for (name, rel) in &self.textures {
            let rid = server.texture_load_from_path(&assets_root.join(rel))?;
            server.texture_set_path(rid, rel.clone());
            textures.insert(name.as_str(), rid);
        }

        let canvas = server.canvas_create();
        let mut layers = BTreeMap::new();
        for (name, desc) in &self.layers {
            let layer = server.canvas_layer_create();
            server.canvas_layer_set_layer(layer, desc.layer);
            server.canvas_layer_set_transform(layer, desc.transform.to_affine());
            server.canvas_layer_set_canvas(layer, canvas);
            layers.insert(name.as_str(), layer);
        }

        let builder = Builder {
            textures: &textures,
            layers: &layers,
        };
        for item in &self.items {
            builder.item(server, item, canvas);
        }

        let [w, h] = self.viewport.size;
        let viewport = server.viewport_create();
        server.viewport_set_size(viewport, w, h);
        if let Some(color) = self.viewport.clear_color {
            server.viewport_set_clear_color(viewport, color);
        }
        server.viewport_set_transparent_background(viewport, self.viewport.transparent);
        server.viewport_attach_canvas(viewport, canvas);

        tracing::info!(
            textures = textures.len(),
            items = server.canvas().item_count(),
            "scene built"
        );
        Ok(viewport)
    }
}

struct Builder<'a> {
    textures: &'a BTreeMap<&'a str, Rid>,
    layers: &'a BTreeMap<&'a str, Rid>,
}

impl Builder<'_> {
    fn texture(&self, name: &str) -> Rid {
        self.textures.get(name).copied().unwrap_or(Rid::INVALID)
    }

    fn item(&self, server: &mut RenderingServer, desc: &ItemDesc, parent: Rid) -> Rid {
        let item = server.canvas_item_create();
        server.canvas_item_set_parent(item, parent);
        server.canvas_item_set_transform(item, desc.transform.to_affine());
        server.canvas_item_set_visible(item, desc.visible);
        server.canvas_item_set_z_index(item, desc.z_index);
        server.canvas_item_set_z_as_relative_to_parent(item, desc.z_relative);
        server.canvas_item_set_sort_children_by_y(item, desc.sort_children_by_y);
        server.canvas_item_set_draw_behind_parent(item, desc.draw_behind_parent);
        if let Some(m) = desc.modulate {
            server.canvas_item_set_modulate(item, m);
        }
        if let Some(m) = desc.self_modulate {
            server.canvas_item_set_self_modulate(item, m);
        }
        server.canvas_item_set_clip_rect(item, desc.clip_rect.map(rect));
        server.canvas_item_set_blend_mode(item, desc.blend);
        server.canvas_item_set_default_texture_filter(item, desc.texture_filter);
        server.canvas_item_set_default_texture_repeat(item, desc.texture_repeat);
        if let Some(layer) = desc.layer.as_deref().and_then(|l| self.layers.get(l)) {
            server.canvas_item_set_canvas_layer(item, Some(*layer));
        }

        for cmd in &desc.commands {
            self.command(server, item, cmd);
        }
        for child in &desc.children {
            self.item(server, child, item);
        }
        item
    }

    fn command(&self, server: &mut RenderingServer, item: Rid, cmd: &CommandDesc) {
        let white = |m: &Option<Color>| m.unwrap_or(Color::WHITE);
        match cmd {
            CommandDesc::Rect { rect: r, color } => server.canvas_item_add_rect(item, rect(*r), *color),
            CommandDesc::TextureRect {
                rect: r,
                texture,
                tile,
                modulate,
            } => server.canvas_item_add_texture_rect(
                item,
                rect(*r),
                self.texture(texture),
                *tile,
                white(modulate),
            ),
            CommandDesc::TextureRectRegion {
                rect: r,
                texture,
                src,
                modulate,
            } => server.canvas_item_add_texture_rect_region(
                item,
                rect(*r),
                self.texture(texture),
                rect(*src),
                white(modulate),
            ),
            CommandDesc::NinePatch {
                rect: r,
                texture,
                source,
                margins,
                draw_center,
                modulate,
            } => server.canvas_item_add_nine_patch(
                item,
                rect(*r),
                source.map(rect).unwrap_or(Rect::ZERO),
                self.texture(texture),
                Vec2::new(margins[0], margins[1]),
                Vec2::new(margins[2], margins[3]),
                *draw_center,
                white(modulate),
            ),
            CommandDesc::Line { from, to, color } => {
                server.canvas_item_add_line(item, point(*from), point(*to), *color);
            }
            CommandDesc::Polyline {
                points: ps,
                color,
                width,
            } => server.canvas_item_add_polyline(item, points(ps), vec![*color], *width, false),
            CommandDesc::Polygon {
                points: ps,
                colors,
                texture,
                uvs,
            } => server.canvas_item_add_polygon(
                item,
                points(ps),
                colors.clone(),
                points(uvs),
                texture.as_deref().map(|t| self.texture(t)),
            ),
            CommandDesc::Circle {
                center,
                radius,
                color,
            } => server.canvas_item_add_circle(item, point(*center), *radius, *color),
            CommandDesc::Ellipse {
                center,
                radii,
                color,
            } => server.canvas_item_add_ellipse(
                item,
                point(*center),
                Vec2::new(radii[0], radii[1]),
                *color,
            ),
            CommandDesc::ClipIgnore { ignore } => server.canvas_item_add_clip_ignore(item, *ignore),
        }
    }
}
