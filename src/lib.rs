#![forbid(unsafe_code)]

pub mod canvas;
pub mod foundation;
pub mod raster;
pub mod scene;
pub mod server;
pub mod storage;
pub mod viewport;

pub use canvas::{
    BatchData, BatchKey, CanvasCull, CanvasRenderer, Command, PrimitiveKind, RenderEntry,
    RenderStats,
};
pub use foundation::config::ServerSettings;
pub use foundation::core::{Affine, Color, Point, Rect, Vec2};
pub use foundation::error::{SoftCanvasError, SoftCanvasResult};
pub use foundation::handle::{HandleAllocator, Rid};
pub use raster::{BlendMode, PixelBuffer, SoftwareRasterizer, TextureFilter, TextureRepeat};
pub use scene::SceneDescription;
pub use server::{RenderingServer, ResourceType};
pub use storage::TextureStorage;
pub use viewport::{ClearMode, DisplaySurface, MemoryDisplay, RenderInfo, UpdateMode};
