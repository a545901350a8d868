//! Atlas Pipeline
//!
//! Collector → Sorter → Packer → Compositor → Registry, run once per
//! renderer initialization.

use crate::asset::{AssetId, AssetStore};
use crate::backend::GraphicsBackend;
use crate::catalog::Catalog;
use crate::collector::RequestCollector;
use crate::compositor::{AtlasBuffer, AtlasCompositor};
use crate::config::AtlasConfig;
use crate::context::{PackStats, PackerContext};
use crate::packer::RegionPacker;
use crate::registry::{Image, ImageRegistry};
use crate::sort::sort_requests;
use crate::{AtlasError, Result};

/// A built atlas: backend texture, lookup table and host copy
#[derive(Debug)]
pub struct TextureAtlas<T> {
    /// Backend texture holding every image
    pub texture: T,
    pub registry: ImageRegistry,
    /// Host copy of the texture contents
    pub buffer: AtlasBuffer,
    pub stats: PackStats,
}

impl<T> TextureAtlas<T> {
    pub fn size(&self) -> (u32, u32) {
        (self.buffer.width(), self.buffer.height())
    }

    /// Placement of `id`, or the fallback entry
    pub fn lookup(&self, id: AssetId) -> &Image {
        self.registry.lookup(id)
    }

    /// Destroy the backend texture
    pub fn release<B>(self, backend: &mut B)
    where
        B: GraphicsBackend<Texture = T>,
    {
        backend.destroy_texture(self.texture);
    }
}

/// Build an atlas for every asset in `catalog`
pub fn build_atlas<S, B>(
    config: &AtlasConfig,
    catalog: &Catalog,
    store: &S,
    backend: &mut B,
) -> Result<TextureAtlas<B::Texture>>
where
    S: AssetStore + ?Sized,
    B: GraphicsBackend,
{
    let mut ctx = PackerContext::new(config.clone(), backend.max_texture_dimension())?;

    let mut batch = RequestCollector::new().collect(&mut ctx, catalog, store)?;
    sort_requests(&mut batch.requests);
    RegionPacker::new().pack(&mut ctx, &mut batch.requests)?;

    let (texture, buffer) =
        AtlasCompositor::new().composite(&mut ctx, &batch.requests, &mut batch.images, store, backend)?;

    let Some(registry) = ImageRegistry::new(batch.images, batch.index, config.fallback) else {
        backend.destroy_texture(texture);
        return Err(AtlasError::MalformedAsset {
            asset: AssetId::ColorRamp,
            reason: "color ramp was not registered".into(),
        });
    };

    let stats = *ctx.stats();
    tracing::info!(
        "Built {}x{} atlas with {} images ({:.1}% used)",
        stats.tracked_width,
        stats.tracked_height,
        registry.len(),
        stats.utilization() * 100.0
    );

    Ok(TextureAtlas { texture, registry, buffer, stats })
}

/// Owns a graphics backend and the atlas built on it
pub struct AtlasRenderer<B: GraphicsBackend> {
    backend: B,
    config: AtlasConfig,
    atlas: Option<TextureAtlas<B::Texture>>,
}

impl<B: GraphicsBackend> AtlasRenderer<B> {
    pub fn new(backend: B, config: AtlasConfig) -> Self {
        Self { backend, config, atlas: None }
    }

    /// Build the atlas, replacing any previous one
    pub fn init<S>(&mut self, catalog: &Catalog, store: &S) -> Result<&TextureAtlas<B::Texture>>
    where
        S: AssetStore + ?Sized,
    {
        self.teardown();
        let atlas = build_atlas(&self.config, catalog, store, &mut self.backend)?;
        Ok(self.atlas.insert(atlas))
    }

    /// Release the atlas texture and registry
    pub fn teardown(&mut self) {
        if let Some(atlas) = self.atlas.take() {
            tracing::debug!("Releasing {}x{} atlas", atlas.size().0, atlas.size().1);
            atlas.release(&mut self.backend);
        }
    }

    /// Tear down and rebuild, e.g. after a display mode change
    pub fn reinit<S>(&mut self, catalog: &Catalog, store: &S) -> Result<&TextureAtlas<B::Texture>>
    where
        S: AssetStore + ?Sized,
    {
        tracing::info!("Reinitializing atlas");
        self.init(catalog, store)
    }

    pub fn set_config(&mut self, config: AtlasConfig) {
        self.config = config;
    }

    pub fn config(&self) -> &AtlasConfig {
        &self.config
    }

    pub fn atlas(&self) -> Option<&TextureAtlas<B::Texture>> {
        self.atlas.as_ref()
    }

    pub fn is_initialized(&self) -> bool {
        self.atlas.is_some()
    }

    /// Placement of `id` in the current atlas, or its fallback; `None` before init
    pub fn lookup(&self, id: AssetId) -> Option<&Image> {
        self.atlas.as_ref().map(|atlas| atlas.lookup(id))
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

impl<B: GraphicsBackend> Drop for AtlasRenderer<B> {
    fn drop(&mut self) {
        self.teardown();
    }
}
