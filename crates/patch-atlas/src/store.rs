//! In-Memory Asset Store
//!
//! Holds already-decoded patches, flats and texture definitions. Wall
//! textures are composed from their patches on request, the way an
//! archive-backed store would build them.

use std::collections::HashMap;

use crate::asset::{AssetId, AssetInfo, AssetPixels, AssetStore, Column, PaletteInfo, Post};

/// Patch placed inside a composite texture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TexturePatch {
    /// Lump of the source patch
    pub lump: u32,
    pub origin_x: i32,
    pub origin_y: i32,
}

#[derive(Debug, Clone)]
struct StoredPatch {
    info: AssetInfo,
    columns: Vec<Column>,
}

#[derive(Debug, Clone)]
struct TextureDef {
    width: u32,
    height: u32,
    patches: Vec<TexturePatch>,
}

#[derive(Debug, Clone)]
struct StoredFlat {
    size: u32,
    pixels: Vec<u8>,
}

/// Asset store backed by host memory
#[derive(Debug, Clone, Default)]
pub struct MemoryAssetStore {
    patches: HashMap<u32, StoredPatch>,
    textures: HashMap<u32, TextureDef>,
    flats: HashMap<u32, StoredFlat>,
    palette: PaletteInfo,
}

impl MemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_palette(mut self, palette: PaletteInfo) -> Self {
        self.palette = palette;
        self
    }

    /// Store a column-encoded patch
    pub fn insert_patch(&mut self, lump: u32, info: AssetInfo, columns: Vec<Column>) {
        self.patches.insert(lump, StoredPatch { info, columns });
    }

    /// Store a fully opaque patch from row-major pixels
    pub fn insert_solid_patch(&mut self, lump: u32, width: u32, height: u32, pixels: &[u8]) {
        let columns = (0..width as usize)
            .map(|x| {
                let column = (0..height as usize)
                    .map(|y| pixels.get(y * width as usize + x).copied().unwrap_or(0))
                    .collect();
                Column::solid(column)
            })
            .collect();
        self.insert_patch(lump, AssetInfo::new(width, height), columns);
    }

    /// Define a wall texture composed of patches
    pub fn insert_texture(&mut self, num: u32, width: u32, height: u32, patches: Vec<TexturePatch>) {
        self.textures.insert(num, TextureDef { width, height, patches });
    }

    /// Store a square flat
    pub fn insert_flat(&mut self, num: u32, size: u32, pixels: Vec<u8>) {
        self.flats.insert(num, StoredFlat { size, pixels });
    }

    /// Number of stored assets across all namespaces
    pub fn len(&self) -> usize {
        self.patches.len() + self.textures.len() + self.flats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Draw every patch of a texture into one buffer and re-encode it as posts
    fn compose_texture(&self, num: u32, def: &TextureDef) -> Vec<Column> {
        let width = def.width as usize;
        let height = def.height as usize;
        let mut texels: Vec<Option<u8>> = vec![None; width * height];

        for placed in &def.patches {
            // Missing sub-patches leave holes rather than failing the texture
            let Some(patch) = self.patches.get(&placed.lump) else {
                tracing::debug!("Texture #{} references missing patch #{}", num, placed.lump);
                continue;
            };

            for (col, column) in patch.columns.iter().enumerate() {
                let x = placed.origin_x + col as i32;
                if x < 0 || x >= def.width as i32 {
                    continue;
                }
                for post in &column.posts {
                    for (k, &pixel) in post.pixels.iter().enumerate() {
                        let y = placed.origin_y + post.top as i32 + k as i32;
                        if y >= 0 && y < def.height as i32 {
                            texels[y as usize * width + x as usize] = Some(pixel);
                        }
                    }
                }
            }
        }

        (0..width)
            .map(|x| {
                let mut posts = Vec::new();
                let mut run: Option<Post> = None;
                for y in 0..height {
                    let Some(pixel) = texels[y * width + x] else {
                        posts.extend(run.take());
                        continue;
                    };
                    if let Some(post) = run.as_mut() {
                        post.pixels.push(pixel);
                    } else {
                        run = Some(Post::new(y as u32, vec![pixel]));
                    }
                }
                posts.extend(run);
                Column::new(posts)
            })
            .collect()
    }
}

impl AssetStore for MemoryAssetStore {
    fn info(&self, id: AssetId) -> Option<AssetInfo> {
        match id {
            AssetId::Patch(lump) => self.patches.get(&lump).map(|p| p.info),
            AssetId::Texture(num) => self.textures.get(&num).map(|t| AssetInfo::new(t.width, t.height)),
            AssetId::Flat(num) => self.flats.get(&num).map(|f| AssetInfo::new(f.size, f.size)),
            AssetId::ColorRamp => None,
        }
    }

    fn pixels(&self, id: AssetId) -> Option<AssetPixels> {
        match id {
            AssetId::Patch(lump) => self.patches.get(&lump).map(|p| AssetPixels::Columns(p.columns.clone())),
            AssetId::Texture(num) => self.textures.get(&num).map(|t| AssetPixels::Columns(self.compose_texture(num, t))),
            AssetId::Flat(num) => self.flats.get(&num).map(|f| AssetPixels::Raw(f.pixels.clone())),
            AssetId::ColorRamp => None,
        }
    }

    fn palette(&self) -> PaletteInfo {
        self.palette
    }
}
