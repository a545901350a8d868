//! Patch Atlas - Sprite and Texture Atlas Builder
//!
//! Packs every image a palette-based renderer needs (patches, wall
//! textures, flats and a synthetic color ramp) into one GPU texture:
//! - Request collection from an asset catalog
//! - Descending-size sort (explicit-stack quicksort)
//! - Region-list bin packing bounded by the hardware texture limit
//! - Compositing with 1px edge bleed for point sampling
//! - O(1) image lookup with a placeholder fallback
//!
//! # Example
//! ```rust,ignore
//! use patch_atlas::{AssetId, AtlasConfig, AtlasRenderer, Catalog, SoftwareBackend};
//!
//! let mut renderer = AtlasRenderer::new(SoftwareBackend::new(), AtlasConfig::default());
//! renderer.init(&catalog, &store)?;
//! let image = renderer.lookup(AssetId::Patch(42));
//! ```

pub mod asset;
pub mod backend;
pub mod catalog;
pub mod collector;
pub mod compositor;
pub mod config;
pub mod context;
pub mod debug;
pub mod packer;
pub mod pipeline;
pub mod registry;
pub mod sort;
pub mod store;

pub use asset::{AssetId, AssetInfo, AssetPixels, AssetStore, Column, PaletteInfo, Post, RequestKind};
pub use backend::{
    BackendError, FilterMode, GraphicsBackend, SoftwareBackend, TextureDescriptor, TextureId, UploadRegion, WrapMode,
};
pub use catalog::Catalog;
pub use collector::{PackRequest, RequestBatch, RequestCollector};
pub use compositor::{AtlasBuffer, AtlasCompositor};
pub use config::{AtlasConfig, PixelFormat};
pub use context::{PackStats, PackerContext};
pub use packer::{Region, RegionArena, RegionPacker};
pub use pipeline::{build_atlas, AtlasRenderer, TextureAtlas};
pub use registry::{Image, ImageRegistry};
pub use sort::sort_requests;
pub use store::{MemoryAssetStore, TexturePatch};

/// Border pad added on every side of each packed image
pub const BORDER: u32 = 1;

/// Number of palette entries (and width of the color ramp)
pub const PALETTE_SIZE: u32 = 256;

/// Atlas build error types
#[derive(Debug, thiserror::Error)]
pub enum AtlasError {
    #[error(
        "No free region for {asset} ({width}x{height} padded); atlas is {tracked_width}x{tracked_height}, limit {max_dimension}"
    )]
    PackingExhausted {
        asset: AssetId,
        width: u32,
        height: u32,
        tracked_width: u32,
        tracked_height: u32,
        max_dimension: u32,
    },

    #[error("Failed to allocate {bytes} bytes for {what}")]
    Allocation { what: &'static str, bytes: usize },

    #[error("Graphics backend failure (asset: {asset:?}): {source}")]
    Backend {
        asset: Option<AssetId>,
        #[source]
        source: BackendError,
    },

    #[error("Malformed asset {asset}: {reason}")]
    MalformedAsset { asset: AssetId, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to export atlas image: {0}")]
    Export(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, AtlasError>;

/// Reserve exactly `additional` elements, reporting failure as [`AtlasError::Allocation`]
pub(crate) fn try_reserve<T>(vec: &mut Vec<T>, additional: usize, what: &'static str) -> Result<()> {
    vec.try_reserve_exact(additional).map_err(|_| AtlasError::Allocation {
        what,
        bytes: additional.saturating_mul(std::mem::size_of::<T>()),
    })
}
