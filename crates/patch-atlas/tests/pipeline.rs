//! End-to-end atlas pipeline tests
//!
//! Builds atlases from in-memory asset stores and checks the packing,
//! compositing and lookup guarantees on the result.

use patch_atlas::*;

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("patch_atlas=debug")
        .with_test_writer()
        .try_init();
}

/// Padded request of the given padded size
fn padded(n: u32, width: u32, height: u32) -> PackRequest {
    PackRequest::new(
        AssetId::Patch(n),
        AssetInfo::new(width - 2 * BORDER, height - 2 * BORDER),
        n as usize,
    )
}

fn overlaps(a: (u32, u32, u32, u32), b: (u32, u32, u32, u32)) -> bool {
    a.0 < b.0 + b.2 && b.0 < a.0 + a.2 && a.1 < b.1 + b.3 && b.1 < a.1 + a.3
}

/// Store with patches (some with holes), composite textures and flats
fn mixed_store() -> (MemoryAssetStore, Catalog) {
    let mut store = MemoryAssetStore::new();
    let mut seed = 0x1234_5678u32;
    let mut next = move || {
        seed ^= seed << 13;
        seed ^= seed >> 17;
        seed ^= seed << 5;
        seed
    };

    for lump in 0..40 {
        let w = next() % 30 + 1;
        let h = next() % 40 + 1;
        let columns = (0..w)
            .map(|x| {
                if x % 3 == 0 {
                    Column::new(vec![Post::new(h / 2, vec![(lump * 5 + x) as u8; (h - h / 2) as usize])])
                } else {
                    Column::solid(vec![(lump + x) as u8; h as usize])
                }
            })
            .collect();
        store.insert_patch(
            lump,
            AssetInfo::new(w, h).with_offsets(w as i32 / 2, h as i32),
            columns,
        );
    }

    for num in 0..6 {
        store.insert_texture(
            num,
            64,
            32 + num * 8,
            vec![
                TexturePatch { lump: num, origin_x: 0, origin_y: 0 },
                TexturePatch { lump: num + 10, origin_x: 20, origin_y: 4 },
            ],
        );
    }

    for num in 0..4 {
        let pixels = (0..64 * 64).map(|i| (i % 251) as u8 ^ num as u8).collect();
        store.insert_flat(num, 64, pixels);
    }

    let catalog = Catalog::new()
        .with_patches(0..40)
        .with_textures(0..6)
        .with_flats(0..4);

    (store, catalog)
}

fn placements(atlas: &TextureAtlas<TextureId>) -> Vec<(AssetId, Image)> {
    let mut all: Vec<_> = atlas.registry.iter().map(|(id, img)| (id, *img)).collect();
    all.sort_by_key(|(id, _)| *id);
    all
}

// ============================================================================
// PACKING SCENARIOS
// ============================================================================

#[test]
fn test_three_requests_fit_in_64() {
    init_logging();
    let mut ctx = PackerContext::new(AtlasConfig::default(), 64).unwrap();
    let mut requests = vec![padded(0, 34, 34), padded(1, 18, 18), padded(2, 18, 18)];

    sort_requests(&mut requests);
    RegionPacker::new().pack(&mut ctx, &mut requests).unwrap();

    let (w, h) = ctx.tracked_size();
    assert!(w <= 64 && h <= 64, "atlas {w}x{h} exceeds 64x64");
    for (i, a) in requests.iter().enumerate() {
        for b in &requests[i + 1..] {
            assert!(!overlaps((a.x, a.y, a.width, a.height), (b.x, b.y, b.width, b.height)));
        }
    }
}

#[test]
fn test_oversized_request_is_fatal() {
    let mut ctx = PackerContext::new(AtlasConfig::default(), 4096).unwrap();
    let mut requests = vec![padded(7, 4097, 4097)];

    let err = RegionPacker::new().pack(&mut ctx, &mut requests).unwrap_err();
    assert!(matches!(
        err,
        AtlasError::PackingExhausted { asset: AssetId::Patch(7), max_dimension: 4096, .. }
    ));
    assert!(err.to_string().contains("patch #7"));
}

#[test]
fn test_equal_requests_share_a_row() {
    let mut ctx = PackerContext::new(AtlasConfig::default(), 64).unwrap();
    let mut requests = vec![padded(0, 20, 10), padded(1, 20, 10)];

    RegionPacker::new().pack(&mut ctx, &mut requests).unwrap();

    assert_eq!(requests[0].y, requests[1].y);
    assert_eq!(ctx.tracked_size(), (40, 10));
    // No free region thinner than a padded texel
    for region in ctx.free_regions() {
        assert!(region.width >= 3 && region.height >= 3, "sliver {region:?}");
    }
}

// ============================================================================
// COLLECTOR AND LOOKUP
// ============================================================================

#[test]
fn test_missing_asset_resolves_to_fallback() {
    init_logging();
    let mut store = MemoryAssetStore::new();
    store.insert_solid_patch(1, 8, 8, &[1; 64]);
    store.insert_solid_patch(2, 4, 4, &[2; 16]);

    // Catalog plus the implicit ramp
    let catalog = Catalog::new().with_patches([1, 2, 3]);
    let catalog_size = catalog.len() + 1;

    let config = AtlasConfig::default().with_fallback(AssetId::Patch(2));
    let mut backend = SoftwareBackend::new();
    let atlas = build_atlas(&config, &catalog, &store, &mut backend).unwrap();

    assert_eq!(atlas.stats.requests, catalog_size - 1);
    assert_eq!(atlas.stats.missing, 1);
    assert!(atlas.registry.get(AssetId::Patch(3)).is_none());
    assert_eq!(atlas.lookup(AssetId::Patch(3)), atlas.lookup(AssetId::Patch(2)));
    assert_eq!(atlas.lookup(AssetId::Patch(3)), atlas.registry.fallback());
}

#[test]
fn test_fallback_defaults_to_color_ramp() {
    let store = MemoryAssetStore::new();
    let config = AtlasConfig::default().with_fallback(AssetId::Flat(9));

    let atlas = build_atlas(&config, &Catalog::new(), &store, &mut SoftwareBackend::new()).unwrap();

    assert_eq!(atlas.registry.len(), 1);
    let fallback = atlas.lookup(AssetId::Texture(1));
    assert_eq!(fallback, atlas.registry.color_ramp());
    assert_eq!(fallback.size(), (PALETTE_SIZE, 4));
}

// ============================================================================
// COMPOSITING
// ============================================================================

#[test]
fn test_flat_edges_bleed_into_border() {
    let mut store = MemoryAssetStore::new();
    let pixels: Vec<u8> = (0..64 * 64).map(|i| (i * 7 % 256) as u8).collect();
    store.insert_flat(0, 64, pixels);

    let catalog = Catalog::new().with_flats([0]);
    let atlas = build_atlas(&AtlasConfig::default(), &catalog, &store, &mut SoftwareBackend::new()).unwrap();

    let img = atlas.lookup(AssetId::Flat(0));
    let (x, y) = img.top_left;
    let buf = &atlas.buffer;
    assert_eq!(buf.get(x - 1, y), buf.get(x, y));
    assert_eq!(buf.get(x - 1, y - 1), buf.get(x, y));
}

#[test]
fn test_ramp_holds_every_palette_index() {
    let atlas = build_atlas(
        &AtlasConfig::default(),
        &Catalog::new(),
        &MemoryAssetStore::new(),
        &mut SoftwareBackend::new(),
    )
    .unwrap();

    let ramp = atlas.registry.color_ramp();
    let (x, y) = ramp.top_left;
    for row in 0..ramp.height {
        for i in 0..PALETTE_SIZE {
            assert_eq!(atlas.buffer.get(x + i, y + row), Some(i as u8));
        }
    }
}

#[test]
fn test_texture_uploaded_matches_host_copy() {
    let (store, catalog) = mixed_store();
    let mut backend = SoftwareBackend::new();

    let atlas = build_atlas(&AtlasConfig::default(), &catalog, &store, &mut backend).unwrap();

    assert_eq!(backend.texels(&atlas.texture).unwrap(), atlas.buffer.texels());
    assert_eq!(backend.upload_count(), atlas.registry.len());

    let desc = backend.descriptor(&atlas.texture).unwrap();
    assert_eq!((desc.width, desc.height), atlas.size());
    assert_eq!(desc.filter, FilterMode::Nearest);
    assert_eq!(desc.wrap, WrapMode::ClampToEdge);
}

// ============================================================================
// PIPELINE PROPERTIES
// ============================================================================

#[test]
fn test_every_request_gets_a_placement() {
    let (store, catalog) = mixed_store();
    let atlas = build_atlas(&AtlasConfig::default(), &catalog, &store, &mut SoftwareBackend::new()).unwrap();

    assert_eq!(atlas.stats.missing, 0);
    assert_eq!(atlas.registry.len(), catalog.len() + 1);
    for &id in catalog.entries() {
        let img = atlas.registry.get(id).unwrap_or_else(|| panic!("{id} not registered"));
        let info = store.info(id).unwrap();
        assert_eq!(img.size(), (info.width, info.height));
        assert_eq!((img.offset_x, img.offset_y), (info.left_offset, info.top_offset));
    }
}

#[test]
fn test_placements_do_not_overlap() {
    let (store, catalog) = mixed_store();
    let atlas = build_atlas(&AtlasConfig::default(), &catalog, &store, &mut SoftwareBackend::new()).unwrap();

    let images = placements(&atlas);
    for (i, (a_id, a)) in images.iter().enumerate() {
        for (b_id, b) in &images[i + 1..] {
            let pad = |img: &Image| {
                (
                    img.top_left.0 - BORDER,
                    img.top_left.1 - BORDER,
                    img.width + 2 * BORDER,
                    img.height + 2 * BORDER,
                )
            };
            assert!(!overlaps(pad(a), pad(b)), "{a_id} overlaps {b_id}");
        }
    }
}

#[test]
fn test_unpadded_extent_matches_native_size() {
    let (store, catalog) = mixed_store();
    let atlas = build_atlas(&AtlasConfig::default(), &catalog, &store, &mut SoftwareBackend::new()).unwrap();

    for (id, img) in atlas.registry.iter() {
        assert_eq!(img.bottom_right.0 - img.top_left.0, img.width, "{id}");
        assert_eq!(img.bottom_right.1 - img.top_left.1, img.height, "{id}");
        assert!(img.top_left.0 >= BORDER && img.top_left.1 >= BORDER);
    }
}

#[test]
fn test_atlas_within_hardware_limit() {
    let (store, catalog) = mixed_store();
    let mut backend = SoftwareBackend::new().with_max_dimension(1024);
    let atlas = build_atlas(&AtlasConfig::default(), &catalog, &store, &mut backend).unwrap();

    let (w, h) = atlas.size();
    assert!(w <= 1024 && h <= 1024);
    for (_, img) in atlas.registry.iter() {
        assert!(img.bottom_right.0 + BORDER <= w);
        assert!(img.bottom_right.1 + BORDER <= h);
    }
    assert!(atlas.stats.utilization() > 0.0 && atlas.stats.utilization() <= 1.0);
}

#[test]
fn test_every_image_border_bleeds() {
    let (store, catalog) = mixed_store();
    let atlas = build_atlas(&AtlasConfig::default(), &catalog, &store, &mut SoftwareBackend::new()).unwrap();
    let buf = &atlas.buffer;

    for (id, img) in atlas.registry.iter() {
        let (l, t) = img.top_left;
        let (r, b) = (img.bottom_right.0 - 1, img.bottom_right.1 - 1);

        for x in l..=r {
            assert_eq!(buf.get(x, t - 1), buf.get(x, t), "{id} top edge");
            assert_eq!(buf.get(x, b + 1), buf.get(x, b), "{id} bottom edge");
        }
        for y in t..=b {
            assert_eq!(buf.get(l - 1, y), buf.get(l, y), "{id} left edge");
            assert_eq!(buf.get(r + 1, y), buf.get(r, y), "{id} right edge");
        }
        assert_eq!(buf.get(l - 1, t - 1), buf.get(l, t), "{id} corner");
        assert_eq!(buf.get(r + 1, t - 1), buf.get(r, t), "{id} corner");
        assert_eq!(buf.get(l - 1, b + 1), buf.get(l, b), "{id} corner");
        assert_eq!(buf.get(r + 1, b + 1), buf.get(r, b), "{id} corner");
    }
}

#[test]
fn test_builds_are_deterministic() {
    let (store, catalog) = mixed_store();
    let first = build_atlas(&AtlasConfig::default(), &catalog, &store, &mut SoftwareBackend::new()).unwrap();
    let second = build_atlas(&AtlasConfig::default(), &catalog, &store, &mut SoftwareBackend::new()).unwrap();

    assert_eq!(placements(&first), placements(&second));
    assert_eq!(first.buffer, second.buffer);
}

// ============================================================================
// FAILURES AND LIFECYCLE
// ============================================================================

/// Store whose only asset reports an arbitrary size
struct OversizedStore(AssetInfo);

impl AssetStore for OversizedStore {
    fn info(&self, id: AssetId) -> Option<AssetInfo> {
        (id == AssetId::Patch(0)).then_some(self.0)
    }

    fn pixels(&self, _id: AssetId) -> Option<AssetPixels> {
        None
    }

    fn palette(&self) -> PaletteInfo {
        PaletteInfo::default()
    }
}

#[test]
fn test_overflowing_asset_size_is_an_error() {
    let catalog = Catalog::new().with_patches([0]);

    for info in [AssetInfo::new(u32::MAX, 4), AssetInfo::new(4, u32::MAX - 1)] {
        let mut backend = SoftwareBackend::new();
        let err = build_atlas(&AtlasConfig::default(), &catalog, &OversizedStore(info), &mut backend).unwrap_err();

        assert!(matches!(err, AtlasError::PackingExhausted { asset: AssetId::Patch(0), .. }));
        assert_eq!(backend.live_textures(), 0);
    }
}

#[test]
fn test_oversized_ramp_height_is_an_error() {
    let config = AtlasConfig::default().with_color_ramp_height(u32::MAX);
    let mut backend = SoftwareBackend::new();

    let err = build_atlas(&config, &Catalog::new(), &MemoryAssetStore::new(), &mut backend).unwrap_err();
    assert!(matches!(err, AtlasError::InvalidConfig(_)));
    assert_eq!(backend.live_textures(), 0);
}

#[test]
fn test_asset_larger_than_limit_is_fatal() {
    let mut store = MemoryAssetStore::new();
    store.insert_flat(1, 600, vec![0; 600 * 600]);

    let catalog = Catalog::new().with_flats([1]);
    let mut backend = SoftwareBackend::new().with_max_dimension(512);
    let err = build_atlas(&AtlasConfig::default(), &catalog, &store, &mut backend).unwrap_err();

    assert!(matches!(err, AtlasError::PackingExhausted { asset: AssetId::Flat(1), .. }));
    assert_eq!(backend.live_textures(), 0);
}

#[test]
fn test_shifted_limit_applies() {
    let mut store = MemoryAssetStore::new();
    store.insert_flat(1, 300, vec![0; 300 * 300]);
    let catalog = Catalog::new().with_flats([1]);

    // 2048 >> 2 = 512 still holds the flat
    let config = AtlasConfig::default().with_max_texture_shift(2);
    let mut backend = SoftwareBackend::new().with_max_dimension(2048);
    assert!(build_atlas(&config, &catalog, &store, &mut backend).is_ok());

    // 1024 >> 2 = 256 doesn't
    let mut backend = SoftwareBackend::new().with_max_dimension(1024);
    assert!(matches!(
        build_atlas(&config, &catalog, &store, &mut backend),
        Err(AtlasError::PackingExhausted { .. })
    ));
}

#[test]
fn test_backend_failure_carries_asset() {
    let (store, catalog) = mixed_store();
    let mut backend = SoftwareBackend::new().fail_after_uploads(3);

    let err = build_atlas(&AtlasConfig::default(), &catalog, &store, &mut backend).unwrap_err();
    match err {
        AtlasError::Backend { asset: Some(_), source: BackendError::Device(_) } => {}
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(backend.live_textures(), 0);
}

#[test]
fn test_reinit_replaces_atlas() {
    init_logging();
    let (store, catalog) = mixed_store();
    let mut renderer = AtlasRenderer::new(SoftwareBackend::new(), AtlasConfig::default());

    let first = renderer.init(&catalog, &store).unwrap().texture;
    let before = *renderer.lookup(AssetId::Flat(0)).unwrap();

    renderer.set_config(AtlasConfig::default().with_pixel_format(PixelFormat::OpaqueIndex));
    let second = renderer.reinit(&catalog, &store).unwrap().texture;

    assert_ne!(first, second);
    assert_eq!(renderer.backend().live_textures(), 1);
    assert!(renderer.backend().texels(&first).is_none());
    // Same inputs pack the same way regardless of texel format
    assert_eq!(*renderer.lookup(AssetId::Flat(0)).unwrap(), before);

    renderer.teardown();
    assert!(renderer.atlas().is_none());
    assert_eq!(renderer.backend().live_textures(), 0);
}
