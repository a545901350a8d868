//! Asset Catalog
//!
//! The fixed list of images the renderer needs in the atlas.

use std::collections::HashSet;

use crate::asset::AssetId;

/// Ordered list of required assets
///
/// The color ramp is not listed here; the collector always adds it.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<AssetId>,
    seen: HashSet<AssetId>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one asset; duplicates and explicit color ramps are ignored
    pub fn push(&mut self, id: AssetId) {
        if id == AssetId::ColorRamp || !self.seen.insert(id) {
            return;
        }
        self.entries.push(id);
    }

    /// UI and status bar graphics, sprite frames
    pub fn with_patches(mut self, lumps: impl IntoIterator<Item = u32>) -> Self {
        for lump in lumps {
            self.push(AssetId::Patch(lump));
        }
        self
    }

    /// Wall textures by texture number
    pub fn with_textures(mut self, numbers: impl IntoIterator<Item = u32>) -> Self {
        for num in numbers {
            self.push(AssetId::Texture(num));
        }
        self
    }

    /// Floor and ceiling flats by flat number
    pub fn with_flats(mut self, numbers: impl IntoIterator<Item = u32>) -> Self {
        for num in numbers {
            self.push(AssetId::Flat(num));
        }
        self
    }

    pub fn entries(&self) -> &[AssetId] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<AssetId> for Catalog {
    fn from_iter<I: IntoIterator<Item = AssetId>>(iter: I) -> Self {
        let mut catalog = Catalog::new();
        for id in iter {
            catalog.push(id);
        }
        catalog
    }
}
