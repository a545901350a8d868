//! Atlas debug export
//!
//! Expands a composited atlas to RGBA for inspection in an image viewer.

use std::path::Path;

use image::{Rgba, RgbaImage};

use crate::compositor::AtlasBuffer;
use crate::Result;

/// Expand palette indices to RGBA; `transparent` texels get zero alpha
pub fn to_rgba_image(buffer: &AtlasBuffer, palette: &[[u8; 3]; 256], transparent: Option<u8>) -> RgbaImage {
    RgbaImage::from_fn(buffer.width(), buffer.height(), |x, y| {
        let index = buffer.get(x, y).unwrap_or(0);
        let [r, g, b] = palette[index as usize];
        let a = if transparent == Some(index) { 0 } else { 255 };
        Rgba([r, g, b, a])
    })
}

/// Write the atlas as a PNG
pub fn export_png(
    buffer: &AtlasBuffer,
    palette: &[[u8; 3]; 256],
    transparent: Option<u8>,
    path: impl AsRef<Path>,
) -> Result<()> {
    let path = path.as_ref();
    to_rgba_image(buffer, palette, transparent).save(path)?;
    tracing::info!("Saved {}x{} atlas to {}", buffer.width(), buffer.height(), path.display());
    Ok(())
}
