pub mod clip;
pub mod format;
pub mod pixel_buffer;
pub mod rasterizer;
pub mod sampler;

pub use clip::RasterVertex;
pub use pixel_buffer::{BlendMode, PixelBuffer, PixelLock};
pub use rasterizer::SoftwareRasterizer;
pub use sampler::{TextureFilter, TextureRepeat, TextureView};
