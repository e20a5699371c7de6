//! Retained canvas items, the cull pass that flattens them, and the render stage that turns
//! the flattened list into rasterizer calls.

pub mod batch;
pub mod command;
pub mod cull;
pub mod data;
pub mod render;

pub use batch::{BatchData, BatchKey};
pub use command::{Command, PrimitiveKind};
pub use cull::{CanvasCull, RenderEntry};
pub use data::{Canvas, CanvasLayer, Item};
pub use render::{CanvasRenderer, RenderState, RenderStats};
