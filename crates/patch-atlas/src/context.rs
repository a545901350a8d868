//! Packer Context
//!
//! All mutable state of one atlas build. A fresh context is created on
//! every renderer (re)initialization and dropped as a unit afterwards.

use crate::config::AtlasConfig;
use crate::packer::{Region, RegionArena};
use crate::Result;

/// Counters gathered while building an atlas
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PackStats {
    /// Requests retained by the collector
    pub requests: usize,
    /// Catalog entries the store didn't have
    pub missing: usize,
    /// Final atlas width
    pub tracked_width: u32,
    /// Final atlas height
    pub tracked_height: u32,
    /// Sum of padded request areas
    pub used_area: u64,
    /// Region slots allocated in the arena
    pub regions_allocated: usize,
    /// Sub-region uploads issued to the backend
    pub uploads: usize,
}

impl PackStats {
    /// Fraction of the atlas covered by padded images
    pub fn utilization(&self) -> f32 {
        let total = self.tracked_width as u64 * self.tracked_height as u64;
        if total == 0 {
            0.0
        } else {
            self.used_area as f32 / total as f32
        }
    }
}

/// Packing state threaded through collector, packer and compositor
#[derive(Debug)]
pub struct PackerContext {
    config: AtlasConfig,
    /// Hardware ceiling for both axes
    max_dimension: u32,
    /// Bounding box of everything placed so far
    tracked_width: u32,
    tracked_height: u32,
    /// Free regions; released when the context drops
    pub(crate) regions: RegionArena,
    stats: PackStats,
}

impl PackerContext {
    /// New context for a backend whose texture limit is `backend_max`
    pub fn new(config: AtlasConfig, backend_max: u32) -> Result<Self> {
        let max_dimension = config.effective_max_dimension(backend_max)?;

        tracing::info!(
            "Atlas ceiling {}x{} (backend limit {})",
            max_dimension,
            max_dimension,
            backend_max
        );

        Ok(Self {
            config,
            max_dimension,
            tracked_width: 0,
            tracked_height: 0,
            regions: RegionArena::default(),
            stats: PackStats::default(),
        })
    }

    pub fn config(&self) -> &AtlasConfig {
        &self.config
    }

    pub fn max_dimension(&self) -> u32 {
        self.max_dimension
    }

    /// Current atlas size `(width, height)`
    pub fn tracked_size(&self) -> (u32, u32) {
        (self.tracked_width, self.tracked_height)
    }

    /// Free regions left by the last packing run
    pub fn free_regions(&self) -> impl Iterator<Item = &Region> + '_ {
        self.regions.iter()
    }

    /// Grow the bounding box to cover a placed rectangle
    pub(crate) fn grow_to(&mut self, right: u32, bottom: u32) {
        debug_assert!(right <= self.max_dimension && bottom <= self.max_dimension);
        self.tracked_width = self.tracked_width.max(right);
        self.tracked_height = self.tracked_height.max(bottom);
        self.stats.tracked_width = self.tracked_width;
        self.stats.tracked_height = self.tracked_height;
    }

    pub fn stats(&self) -> &PackStats {
        &self.stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut PackStats {
        &mut self.stats
    }
}
