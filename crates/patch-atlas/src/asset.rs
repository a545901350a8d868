//! Asset Store Interface
//!
//! Types exchanged with the asset store that owns the decoded archive.
//! The atlas never parses archive formats itself: it asks the store for
//! dimensions first and for pixel columns or raw bytes later.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of an image in the atlas
///
/// Images live in separate numeric namespaces: patches by lump number,
/// wall textures by texture number and flats by flat number. The color
/// ramp is synthetic and has no backing lump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AssetId {
    Patch(u32),
    Texture(u32),
    Flat(u32),
    ColorRamp,
}

impl AssetId {
    /// How pixels for this asset are produced
    pub fn kind(self) -> RequestKind {
        match self {
            AssetId::Patch(_) => RequestKind::Patch,
            AssetId::Texture(_) => RequestKind::CompositeTexture,
            AssetId::Flat(_) => RequestKind::Flat,
            AssetId::ColorRamp => RequestKind::ColorRamp,
        }
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetId::Patch(lump) => write!(f, "patch #{lump}"),
            AssetId::Texture(num) => write!(f, "texture #{num}"),
            AssetId::Flat(num) => write!(f, "flat #{num}"),
            AssetId::ColorRamp => f.write_str("color ramp"),
        }
    }
}

/// Pixel source of a packed image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// Column/post encoded sprite or UI graphic
    Patch,
    /// Wall texture composed of several patches by the store
    CompositeTexture,
    /// Raw byte-per-pixel floor/ceiling tile
    Flat,
    /// Synthetic strip of every palette index
    ColorRamp,
}

/// Dimensions and draw anchor of a stored asset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssetInfo {
    pub width: u32,
    pub height: u32,
    /// Horizontal distance from the draw anchor to the left edge
    pub left_offset: i32,
    /// Vertical distance from the draw anchor to the top edge
    pub top_offset: i32,
}

impl AssetInfo {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height, left_offset: 0, top_offset: 0 }
    }

    pub fn with_offsets(mut self, left_offset: i32, top_offset: i32) -> Self {
        self.left_offset = left_offset;
        self.top_offset = top_offset;
        self
    }

    /// Zero-sized assets are treated as absent
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Opaque run of pixels inside a column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    /// Row of the first pixel
    pub top: u32,
    /// Palette indices, top to bottom
    pub pixels: Vec<u8>,
}

impl Post {
    pub fn new(top: u32, pixels: Vec<u8>) -> Self {
        Self { top, pixels }
    }
}

/// One vertical column of a patch; rows outside every post are transparent
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Column {
    pub posts: Vec<Post>,
}

impl Column {
    pub fn new(posts: Vec<Post>) -> Self {
        Self { posts }
    }

    /// Fully opaque column
    pub fn solid(pixels: Vec<u8>) -> Self {
        Self { posts: vec![Post::new(0, pixels)] }
    }
}

/// Pixel payload returned by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetPixels {
    /// Column-major posts, one entry per column
    Columns(Vec<Column>),
    /// Row-major palette indices
    Raw(Vec<u8>),
}

/// Palette metadata needed to fill transparent texels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteInfo {
    /// Index keyed out as transparent by the sampling shader
    pub transparent_index: u8,
    /// Visually identical stand-in used when transparency can't be represented
    pub duplicate_index: u8,
}

impl Default for PaletteInfo {
    fn default() -> Self {
        Self {
            transparent_index: 247,
            duplicate_index: 0,
        }
    }
}

/// Source of asset dimensions and pixels
pub trait AssetStore {
    /// Dimensions and offsets, or `None` if the asset doesn't exist
    fn info(&self, id: AssetId) -> Option<AssetInfo>;

    /// Decoded pixels, or `None` if the asset doesn't exist
    fn pixels(&self, id: AssetId) -> Option<AssetPixels>;

    /// Palette metadata
    fn palette(&self) -> PaletteInfo;
}
