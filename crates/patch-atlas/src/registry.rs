//! Image Registry
//!
//! Final atlas placement of every packed asset, keyed by asset id.
//! Read-only once built; replaced wholesale on renderer reinit.

use std::collections::HashMap;

use crate::asset::AssetId;

/// Atlas placement of one asset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Image {
    /// Top-left atlas texel (inclusive)
    pub top_left: (u32, u32),
    /// Bottom-right atlas texel (exclusive)
    pub bottom_right: (u32, u32),
    /// Native width
    pub width: u32,
    /// Native height
    pub height: u32,
    /// Draw anchor relative to the left edge
    pub offset_x: i32,
    /// Draw anchor relative to the top edge
    pub offset_y: i32,
}

impl Image {
    /// Normalized texture coordinates `(u0, v0, u1, v1)` in an atlas of the given size
    pub fn uv(&self, atlas_width: u32, atlas_height: u32) -> (f32, f32, f32, f32) {
        if atlas_width == 0 || atlas_height == 0 {
            return (0.0, 0.0, 0.0, 0.0);
        }
        let w = atlas_width as f32;
        let h = atlas_height as f32;
        (
            self.top_left.0 as f32 / w,
            self.top_left.1 as f32 / h,
            self.bottom_right.0 as f32 / w,
            self.bottom_right.1 as f32 / h,
        )
    }

    /// Quad corners in atlas texels: top-left, top-right, bottom-left, bottom-right
    pub fn corners(&self) -> [(u32, u32); 4] {
        let (l, t) = self.top_left;
        let (r, b) = self.bottom_right;
        [(l, t), (r, t), (l, b), (r, b)]
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Asset id to atlas placement, with a fallback for unknown ids
#[derive(Debug, Clone)]
pub struct ImageRegistry {
    images: Vec<Image>,
    index: HashMap<AssetId, usize>,
    /// Slot returned for unregistered ids
    fallback: usize,
    color_ramp: usize,
}

impl ImageRegistry {
    /// Build from the compositor's image array.
    ///
    /// `placeholder` becomes the fallback if it was packed; otherwise the
    /// color ramp stands in. Returns `None` if the ramp isn't in `index`.
    pub(crate) fn new(
        images: Vec<Image>,
        index: HashMap<AssetId, usize>,
        placeholder: Option<AssetId>,
    ) -> Option<Self> {
        let color_ramp = *index.get(&AssetId::ColorRamp)?;

        let fallback = match placeholder {
            Some(id) => match index.get(&id) {
                Some(&slot) => slot,
                None => {
                    tracing::warn!("Fallback placeholder {} not in atlas, using color ramp", id);
                    color_ramp
                }
            },
            None => color_ramp,
        };

        Some(Self { images, index, fallback, color_ramp })
    }

    /// Placement of `id`, if it was packed
    pub fn get(&self, id: AssetId) -> Option<&Image> {
        self.index.get(&id).map(|&slot| &self.images[slot])
    }

    /// Placement of `id`, or the fallback entry
    pub fn lookup(&self, id: AssetId) -> &Image {
        self.get(id).unwrap_or(&self.images[self.fallback])
    }

    pub fn contains(&self, id: AssetId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn color_ramp(&self) -> &Image {
        &self.images[self.color_ramp]
    }

    pub fn fallback(&self) -> &Image {
        &self.images[self.fallback]
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// All registered ids with their placement, in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (AssetId, &Image)> + '_ {
        self.index.iter().map(|(&id, &slot)| (id, &self.images[slot]))
    }
}
