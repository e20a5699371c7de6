use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::foundation::core::Color;
use crate::foundation::error::{SoftCanvasError, SoftCanvasResult};

/// Lowest tessellation used for ellipses; smaller configured values are raised to this.
pub const MIN_ELLIPSE_SEGMENTS: u32 = 64;

/// Server-wide tunables.
///
/// All fields have defaults, so a settings file only needs the keys it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSettings {
    /// Vertex ceiling for one batch; exceeding it flushes.
    pub max_batch_vertices: usize,
    /// Lower bound of the z clamp range.
    pub z_min: i32,
    /// Upper bound of the z clamp range.
    pub z_max: i32,
    /// Segments used when tessellating ellipses.
    pub ellipse_segments: u32,
    /// Size given to freshly allocated viewports.
    pub default_viewport_size: [u32; 2],
    /// Clear color given to freshly allocated viewports.
    pub default_clear_color: Color,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            max_batch_vertices: 8192,
            z_min: -4096,
            z_max: 4096,
            ellipse_segments: MIN_ELLIPSE_SEGMENTS,
            default_viewport_size: [800, 600],
            default_clear_color: Color::BLACK,
        }
    }
}

impl ServerSettings {
    pub fn from_json_str(s: &str) -> SoftCanvasResult<Self> {
        let settings: Self =
            serde_json::from_str(s).map_err(|e| SoftCanvasError::serde(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> SoftCanvasResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            SoftCanvasError::config(format!("read settings '{}': {e}", path.display()))
        })?;
        Self::from_json_str(&text)
    }

    /// Apply `SOFTCANVAS_MAX_BATCH_VERTICES` and `SOFTCANVAS_ELLIPSE_SEGMENTS` when set to
    /// positive integers; other values are ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(n) = std::env::var("SOFTCANVAS_MAX_BATCH_VERTICES")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|&n| n > 0)
        {
            self.max_batch_vertices = n;
        }
        if let Some(n) = std::env::var("SOFTCANVAS_ELLIPSE_SEGMENTS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|&n| n > 0)
        {
            self.ellipse_segments = n;
        }
        self
    }

    pub fn validate(&self) -> SoftCanvasResult<()> {
        if self.max_batch_vertices < 4 {
            return Err(SoftCanvasError::config(
                "max_batch_vertices must be at least 4",
            ));
        }
        if self.z_min > self.z_max {
            return Err(SoftCanvasError::config("z_min must be <= z_max"));
        }
        Ok(())
    }

    /// Ellipse segment count with the lower bound applied.
    pub fn effective_ellipse_segments(&self) -> u32 {
        self.ellipse_segments.max(MIN_ELLIPSE_SEGMENTS)
    }

    pub fn clamp_z(&self, z: i32) -> i32 {
        z.clamp(self.z_min, self.z_max)
    }
}
