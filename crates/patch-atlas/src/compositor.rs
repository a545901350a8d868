//! Atlas Compositor
//!
//! Writes the pixels of every placed request into a host-side atlas
//! buffer, duplicates each image's outermost texels into its border and
//! uploads the padded rectangle to the backend texture.

use crate::asset::{AssetPixels, AssetStore, PaletteInfo, RequestKind};
use crate::backend::{GraphicsBackend, TextureDescriptor, UploadRegion};
use crate::collector::PackRequest;
use crate::config::PixelFormat;
use crate::context::PackerContext;
use crate::registry::Image;
use crate::{try_reserve, AtlasError, Result, BORDER, PALETTE_SIZE};

/// Host copy of the atlas texture, one palette index per texel
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AtlasBuffer {
    width: u32,
    height: u32,
    texels: Vec<u8>,
}

impl AtlasBuffer {
    /// Zeroed buffer; allocation failure is reported instead of aborting
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let len = width as usize * height as usize;
        let mut texels = Vec::new();
        try_reserve(&mut texels, len, "atlas staging buffer")?;
        texels.resize(len, 0);
        Ok(Self { width, height, texels })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn texels(&self) -> &[u8] {
        &self.texels
    }

    /// Texel at `(x, y)`, `None` outside the buffer
    pub fn get(&self, x: u32, y: u32) -> Option<u8> {
        if x < self.width && y < self.height {
            Some(self.texels[self.offset(x, y)])
        } else {
            None
        }
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    #[inline]
    fn at(&self, x: u32, y: u32) -> u8 {
        self.texels[self.offset(x, y)]
    }

    #[inline]
    fn put(&mut self, x: u32, y: u32, value: u8) {
        let i = self.offset(x, y);
        self.texels[i] = value;
    }

    fn fill_rect(&mut self, x: u32, y: u32, width: u32, height: u32, value: u8) {
        for row in y..y + height {
            let start = self.offset(x, row);
            self.texels[start..start + width as usize].fill(value);
        }
    }

    /// Duplicate the outermost texels of `(x, y, width, height)` one texel outward
    fn bleed(&mut self, x: u32, y: u32, width: u32, height: u32) {
        let (left, top) = (x - BORDER, y - BORDER);
        let (right, bottom) = (x + width, y + height);

        for col in x..right {
            self.put(col, top, self.at(col, y));
            self.put(col, bottom, self.at(col, bottom - 1));
        }
        // Rows include the border rows just written, which fills the corners
        for row in top..=bottom {
            self.put(left, row, self.at(x, row));
            self.put(right, row, self.at(right - 1, row));
        }
    }

    /// Copy a rectangle out as row-major texels
    fn extract(&self, region: UploadRegion, out: &mut Vec<u8>) {
        out.clear();
        for row in region.y..region.y + region.height {
            let start = self.offset(region.x, row);
            out.extend_from_slice(&self.texels[start..start + region.width as usize]);
        }
    }
}

/// Index values used while rendering one asset
#[derive(Debug, Clone, Copy)]
struct Indices {
    /// Written where an asset has no pixel
    gap: u8,
    /// Opaque texels equal to this are replaced by `duplicate`
    keyed: Option<u8>,
    duplicate: u8,
}

impl Indices {
    fn new(format: PixelFormat, palette: &PaletteInfo) -> Self {
        Self {
            gap: format.gap_index(palette),
            keyed: match format {
                PixelFormat::KeyedIndex => Some(palette.transparent_index),
                PixelFormat::OpaqueIndex => None,
            },
            duplicate: palette.duplicate_index,
        }
    }

    #[inline]
    fn opaque(&self, index: u8) -> u8 {
        if self.keyed == Some(index) {
            self.duplicate
        } else {
            index
        }
    }
}

impl RequestKind {
    /// Draw the unpadded image of `request` into `atlas` at its placement
    fn render_into(
        self,
        request: &PackRequest,
        pixels: Option<AssetPixels>,
        indices: Indices,
        atlas: &mut AtlasBuffer,
    ) -> Result<()> {
        let (x, y, w, h) = (request.x, request.y, request.width, request.height);
        let malformed = |reason: String| AtlasError::MalformedAsset { asset: request.asset, reason };

        match (self, pixels) {
            (RequestKind::Patch | RequestKind::CompositeTexture, Some(AssetPixels::Columns(columns))) => {
                atlas.fill_rect(x, y, w, h, indices.gap);

                if columns.len() > w as usize {
                    tracing::debug!("{} has {} columns for width {}", request.asset, columns.len(), w);
                }
                for (col, column) in columns.iter().take(w as usize).enumerate() {
                    for post in &column.posts {
                        let rows = h.saturating_sub(post.top) as usize;
                        for (k, &index) in post.pixels.iter().take(rows).enumerate() {
                            atlas.put(x + col as u32, y + post.top + k as u32, indices.opaque(index));
                        }
                    }
                }
            }
            (RequestKind::Flat, Some(AssetPixels::Raw(bytes))) => {
                let needed = w as usize * h as usize;
                if bytes.len() < needed {
                    return Err(malformed(format!("{} bytes for a {w}x{h} flat", bytes.len())));
                }
                for (row, src) in bytes.chunks_exact(w as usize).take(h as usize).enumerate() {
                    let start = atlas.offset(x, y + row as u32);
                    for (dst, &index) in atlas.texels[start..start + w as usize].iter_mut().zip(src) {
                        *dst = indices.opaque(index);
                    }
                }
            }
            (RequestKind::ColorRamp, _) => {
                if w != PALETTE_SIZE {
                    return Err(malformed(format!("ramp width {w}, expected {PALETTE_SIZE}")));
                }
                for row in y..y + h {
                    for i in 0..w {
                        atlas.put(x + i, row, i as u8);
                    }
                }
            }
            (kind, Some(_)) => {
                return Err(malformed(format!("pixel layout doesn't match {kind:?}")));
            }
            (_, None) => {
                return Err(malformed("store has dimensions but no pixels".into()));
            }
        }

        Ok(())
    }
}

/// Renders placed requests and uploads them to the atlas texture
#[derive(Debug, Default)]
pub struct AtlasCompositor;

impl AtlasCompositor {
    pub fn new() -> Self {
        Self
    }

    /// Create the atlas texture, composite every request into it and fill `images`.
    ///
    /// The texture is destroyed again if any step fails.
    pub fn composite<S, B>(
        &self,
        ctx: &mut PackerContext,
        requests: &[PackRequest],
        images: &mut [Image],
        store: &S,
        backend: &mut B,
    ) -> Result<(B::Texture, AtlasBuffer)>
    where
        S: AssetStore + ?Sized,
        B: GraphicsBackend,
    {
        let (width, height) = ctx.tracked_size();
        let format = ctx.config().pixel_format;

        let desc = TextureDescriptor::new("patch atlas", width, height, format);
        let texture = backend
            .create_texture(&desc)
            .map_err(|source| AtlasError::Backend { asset: None, source })?;

        match self.fill(ctx, requests, images, store, backend, &texture) {
            Ok(buffer) => Ok((texture, buffer)),
            Err(e) => {
                backend.destroy_texture(texture);
                Err(e)
            }
        }
    }

    fn fill<S, B>(
        &self,
        ctx: &mut PackerContext,
        requests: &[PackRequest],
        images: &mut [Image],
        store: &S,
        backend: &mut B,
        texture: &B::Texture,
    ) -> Result<AtlasBuffer>
    where
        S: AssetStore + ?Sized,
        B: GraphicsBackend,
    {
        let (width, height) = ctx.tracked_size();
        let mut atlas = AtlasBuffer::new(width, height)?;
        let indices = Indices::new(ctx.config().pixel_format, &store.palette());

        let mut staging = Vec::new();

        for request in requests {
            let pixels = match request.kind {
                RequestKind::ColorRamp => None,
                _ => store.pixels(request.asset),
            };
            request.kind.render_into(request, pixels, indices, &mut atlas)?;
            atlas.bleed(request.x, request.y, request.width, request.height);

            let region = UploadRegion::new(
                request.x - BORDER,
                request.y - BORDER,
                request.width + 2 * BORDER,
                request.height + 2 * BORDER,
            );
            if staging.capacity() < region.texel_count() {
                try_reserve(&mut staging, region.texel_count(), "upload staging")?;
            }
            atlas.extract(region, &mut staging);

            tracing::debug!(
                "Uploading {} at {},{} ({}x{})",
                request.asset,
                region.x,
                region.y,
                region.width,
                region.height
            );
            backend
                .upload_region(texture, region, &staging)
                .map_err(|source| AtlasError::Backend { asset: Some(request.asset), source })?;
            ctx.stats_mut().uploads += 1;

            images[request.slot] = Image {
                top_left: (request.x, request.y),
                bottom_right: (request.x + request.width, request.y + request.height),
                width: request.width,
                height: request.height,
                offset_x: request.info.left_offset,
                offset_y: request.info.top_offset,
            };
        }

        Ok(atlas)
    }
}
