//! Request Collector
//!
//! Walks the catalog, asks the store for each asset's size and builds one
//! padded packing request per asset that exists.

use std::collections::HashMap;

use crate::asset::{AssetId, AssetInfo, AssetStore, RequestKind};
use crate::context::PackerContext;
use crate::registry::Image;
use crate::{try_reserve, AtlasError, Catalog, Result, BORDER, PALETTE_SIZE};

/// One image waiting to be placed in the atlas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackRequest {
    /// Asset this request places
    pub asset: AssetId,
    /// How the compositor produces pixels
    pub kind: RequestKind,
    /// Padded width while packing, native width after
    pub width: u32,
    /// Padded height while packing, native height after
    pub height: u32,
    /// Assigned position (padded corner while packing, image corner after)
    pub x: u32,
    pub y: u32,
    /// Index of this request's entry in the image array
    pub slot: usize,
    /// Native size and draw anchor reported by the store
    pub info: AssetInfo,
}

impl PackRequest {
    /// New request padded by the border on every side.
    ///
    /// Sizes that overflow saturate at `u32::MAX`; the collector rejects
    /// anything larger than the ceiling before building a request.
    pub fn new(asset: AssetId, info: AssetInfo, slot: usize) -> Self {
        Self {
            asset,
            kind: asset.kind(),
            width: info.width.saturating_add(2 * BORDER),
            height: info.height.saturating_add(2 * BORDER),
            x: 0,
            y: 0,
            slot,
            info,
        }
    }

    /// Sort key; larger keys are packed first
    pub fn sort_key(&self) -> (u32, u32) {
        (self.height, self.width)
    }

    /// Padded area
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Padded size, or `None` if it overflows
    pub fn padded_size(info: &AssetInfo) -> Option<(u32, u32)> {
        let width = info.width.checked_add(2 * BORDER)?;
        let height = info.height.checked_add(2 * BORDER)?;
        Some((width, height))
    }

    /// Strip the border from a placed request
    pub(crate) fn unpad(&mut self) {
        self.x += BORDER;
        self.y += BORDER;
        self.width -= 2 * BORDER;
        self.height -= 2 * BORDER;
    }
}

/// Output of the collector
#[derive(Debug, Default)]
pub struct RequestBatch {
    /// One request per retained asset
    pub requests: Vec<PackRequest>,
    /// Image array, one entry per request, filled by the compositor
    pub images: Vec<Image>,
    /// Asset id to image slot
    pub index: HashMap<AssetId, usize>,
    /// Catalog entries the store doesn't have (diagnostics only)
    pub missing: Vec<AssetId>,
}

impl RequestBatch {
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

/// Builds packing requests from a catalog
#[derive(Debug, Default)]
pub struct RequestCollector;

impl RequestCollector {
    pub fn new() -> Self {
        Self
    }

    /// Collect requests for every catalog entry plus the color ramp
    pub fn collect<S: AssetStore + ?Sized>(
        &self,
        ctx: &mut PackerContext,
        catalog: &Catalog,
        store: &S,
    ) -> Result<RequestBatch> {
        // Every catalog entry plus the synthetic ramp
        let mut expected = catalog.len() + 1;

        let mut batch = RequestBatch::default();
        try_reserve(&mut batch.requests, expected, "pack requests")?;

        for &asset in catalog.entries() {
            match store.info(asset).filter(|info| !info.is_empty()) {
                Some(info) => {
                    Self::check_fits(ctx, asset, &info)?;
                    let slot = batch.requests.len();
                    batch.requests.push(PackRequest::new(asset, info, slot));
                }
                None => {
                    tracing::debug!("Skipping {}: not in asset store", asset);
                    expected -= 1;
                    batch.missing.push(asset);
                }
            }
        }

        let ramp = AssetInfo::new(PALETTE_SIZE, ctx.config().color_ramp_height);
        Self::check_fits(ctx, AssetId::ColorRamp, &ramp)?;
        let slot = batch.requests.len();
        batch.requests.push(PackRequest::new(AssetId::ColorRamp, ramp, slot));

        debug_assert_eq!(batch.requests.len(), expected);

        try_reserve(&mut batch.images, expected, "image array")?;
        batch.images.resize(expected, Image::default());

        batch.index.try_reserve(expected).map_err(|_| AtlasError::Allocation {
            what: "image lookup table",
            bytes: expected * std::mem::size_of::<(AssetId, usize)>(),
        })?;
        for request in &batch.requests {
            batch.index.insert(request.asset, request.slot);
        }

        ctx.stats_mut().requests = batch.requests.len();
        ctx.stats_mut().missing = batch.missing.len();

        tracing::info!(
            "Collected {} atlas requests ({} missing from store)",
            batch.requests.len(),
            batch.missing.len()
        );

        Ok(batch)
    }

    /// Reject an asset whose padded size can't fit under the ceiling
    fn check_fits(ctx: &PackerContext, asset: AssetId, info: &AssetInfo) -> Result<()> {
        let max = ctx.max_dimension();
        match PackRequest::padded_size(info) {
            Some((width, height)) if width <= max && height <= max => Ok(()),
            _ => {
                let (tracked_width, tracked_height) = ctx.tracked_size();
                Err(AtlasError::PackingExhausted {
                    asset,
                    width: info.width.saturating_add(2 * BORDER),
                    height: info.height.saturating_add(2 * BORDER),
                    tracked_width,
                    tracked_height,
                    max_dimension: max,
                })
            }
        }
    }
}
