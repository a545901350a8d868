//! Atlas Configuration

use serde::{Deserialize, Serialize};

use crate::asset::{AssetId, PaletteInfo};
use crate::{AtlasError, Result, BORDER};

/// Texel format of the atlas texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PixelFormat {
    /// Palette indices; the transparent index is keyed out when sampling
    #[default]
    KeyedIndex,
    /// Palette indices without transparency; transparent texels take the duplicate index
    OpaqueIndex,
}

impl PixelFormat {
    /// Index written where an asset has no opaque pixel
    pub fn gap_index(self, palette: &PaletteInfo) -> u8 {
        match self {
            PixelFormat::KeyedIndex => palette.transparent_index,
            PixelFormat::OpaqueIndex => palette.duplicate_index,
        }
    }

    /// Bytes per texel
    pub fn bytes_per_texel(self) -> usize {
        1
    }
}

/// Atlas build configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtlasConfig {
    /// Optional clamp below the backend's texture limit
    pub max_texture_size: Option<u32>,

    /// Right shift applied to the backend's reported texture limit
    pub max_texture_shift: u32,

    /// Texel format of the atlas
    pub pixel_format: PixelFormat,

    /// Placeholder returned for unregistered ids
    pub fallback: Option<AssetId>,

    /// Rows of the synthetic color ramp
    pub color_ramp_height: u32,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            max_texture_size: None,
            max_texture_shift: 0,
            pixel_format: PixelFormat::KeyedIndex,
            fallback: None,
            color_ramp_height: 4,
        }
    }
}

impl AtlasConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clamp the atlas ceiling below the backend limit
    pub fn with_max_texture_size(mut self, size: u32) -> Self {
        self.max_texture_size = Some(size);
        self
    }

    pub fn with_max_texture_shift(mut self, shift: u32) -> Self {
        self.max_texture_shift = shift;
        self
    }

    pub fn with_pixel_format(mut self, format: PixelFormat) -> Self {
        self.pixel_format = format;
        self
    }

    pub fn with_fallback(mut self, id: AssetId) -> Self {
        self.fallback = Some(id);
        self
    }

    pub fn with_color_ramp_height(mut self, height: u32) -> Self {
        self.color_ramp_height = height;
        self
    }

    /// Effective packing ceiling for a backend reporting `backend_max`
    pub fn effective_max_dimension(&self, backend_max: u32) -> Result<u32> {
        let shifted = backend_max.checked_shr(self.max_texture_shift).unwrap_or(0);

        let max = match self.max_texture_size {
            Some(clamp) if clamp < shifted => {
                tracing::warn!(
                    "Atlas ceiling clamped from {} to {} by configuration",
                    shifted,
                    clamp
                );
                clamp
            }
            _ => shifted,
        };

        if max < 1 + 2 * BORDER {
            return Err(AtlasError::InvalidConfig(format!(
                "texture ceiling {max} can't hold a single padded texel (backend {backend_max}, shift {})",
                self.max_texture_shift
            )));
        }
        if self.color_ramp_height == 0 {
            return Err(AtlasError::InvalidConfig("color ramp height must be non-zero".into()));
        }
        if self.color_ramp_height > max - 2 * BORDER {
            return Err(AtlasError::InvalidConfig(format!(
                "color ramp height {} doesn't fit under texture ceiling {max}",
                self.color_ramp_height
            )));
        }

        Ok(max)
    }
}
