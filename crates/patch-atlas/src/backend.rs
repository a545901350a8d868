//! Graphics Backend
//!
//! The seam between the atlas builder and whatever owns GPU textures.
//! The builder creates one texture, uploads each padded image into it and
//! destroys it on teardown; nothing else crosses this boundary.

use crate::config::PixelFormat;

/// Texture creation and upload errors
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Texture {width}x{height} exceeds device limit {max}")]
    TextureTooLarge { width: u32, height: u32, max: u32 },

    #[error("Unknown texture handle")]
    UnknownTexture,

    #[error("Upload region {x},{y} {width}x{height} outside {texture_width}x{texture_height} texture")]
    RegionOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        texture_width: u32,
        texture_height: u32,
    },

    #[error("Upload data is {actual} bytes, expected {expected}")]
    DataSizeMismatch { expected: usize, actual: usize },

    #[error("Device error: {0}")]
    Device(String),
}

/// Texture sampling filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    #[default]
    Nearest,
    Linear,
}

/// Texture coordinate wrapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WrapMode {
    #[default]
    ClampToEdge,
    Repeat,
}

/// Parameters for creating a texture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureDescriptor {
    /// Debug label
    pub label: &'static str,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub filter: FilterMode,
    pub wrap: WrapMode,
}

impl TextureDescriptor {
    /// Point-sampled, edge-clamped texture
    pub fn new(label: &'static str, width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            label,
            width,
            height,
            format,
            filter: FilterMode::Nearest,
            wrap: WrapMode::ClampToEdge,
        }
    }

    /// Bytes of a full texture
    pub fn byte_size(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_texel()
    }
}

/// Sub-rectangle of a texture, in texels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl UploadRegion {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn texel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// GPU texture owner
pub trait GraphicsBackend {
    /// Texture handle
    type Texture;

    /// Largest texture width or height the device accepts
    fn max_texture_dimension(&self) -> u32;

    fn create_texture(&mut self, desc: &TextureDescriptor) -> Result<Self::Texture, BackendError>;

    /// Copy row-major `texels` into `region` of `texture`
    fn upload_region(
        &mut self,
        texture: &Self::Texture,
        region: UploadRegion,
        texels: &[u8],
    ) -> Result<(), BackendError>;

    fn destroy_texture(&mut self, texture: Self::Texture);
}

/// Handle of a [`SoftwareBackend`] texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(usize);

impl TextureId {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug)]
struct SoftwareTexture {
    desc: TextureDescriptor,
    texels: Vec<u8>,
}

/// Backend keeping textures in host memory
///
/// Used by tests and headless tools; supports read-back and an injected
/// upload failure for exercising error paths.
#[derive(Debug)]
pub struct SoftwareBackend {
    max_dimension: u32,
    textures: Vec<Option<SoftwareTexture>>,
    uploads: usize,
    /// Fail every upload once this many have succeeded
    fail_after: Option<usize>,
}

impl Default for SoftwareBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftwareBackend {
    pub fn new() -> Self {
        Self {
            max_dimension: 8192,
            textures: Vec::new(),
            uploads: 0,
            fail_after: None,
        }
    }

    pub fn with_max_dimension(mut self, max: u32) -> Self {
        self.max_dimension = max;
        self
    }

    /// Inject a device error on upload number `count + 1` and later
    pub fn fail_after_uploads(mut self, count: usize) -> Self {
        self.fail_after = Some(count);
        self
    }

    /// Successful uploads so far
    pub fn upload_count(&self) -> usize {
        self.uploads
    }

    /// Textures not yet destroyed
    pub fn live_textures(&self) -> usize {
        self.textures.iter().filter(|t| t.is_some()).count()
    }

    /// Read back texture contents
    pub fn texels(&self, texture: &TextureId) -> Option<&[u8]> {
        self.get(texture).map(|t| t.texels.as_slice())
    }

    pub fn descriptor(&self, texture: &TextureId) -> Option<&TextureDescriptor> {
        self.get(texture).map(|t| &t.desc)
    }

    fn get(&self, texture: &TextureId) -> Option<&SoftwareTexture> {
        self.textures.get(texture.0).and_then(Option::as_ref)
    }
}

impl GraphicsBackend for SoftwareBackend {
    type Texture = TextureId;

    fn max_texture_dimension(&self) -> u32 {
        self.max_dimension
    }

    fn create_texture(&mut self, desc: &TextureDescriptor) -> Result<TextureId, BackendError> {
        if desc.width > self.max_dimension || desc.height > self.max_dimension {
            return Err(BackendError::TextureTooLarge {
                width: desc.width,
                height: desc.height,
                max: self.max_dimension,
            });
        }

        let mut texels = Vec::new();
        texels
            .try_reserve_exact(desc.byte_size())
            .map_err(|e| BackendError::Device(e.to_string()))?;
        texels.resize(desc.byte_size(), 0);

        let id = TextureId(self.textures.len());
        self.textures.push(Some(SoftwareTexture { desc: desc.clone(), texels }));

        tracing::debug!("Created texture '{}' {}x{}", desc.label, desc.width, desc.height);
        Ok(id)
    }

    fn upload_region(
        &mut self,
        texture: &TextureId,
        region: UploadRegion,
        texels: &[u8],
    ) -> Result<(), BackendError> {
        if self.fail_after.is_some_and(|limit| self.uploads >= limit) {
            return Err(BackendError::Device("injected upload failure".into()));
        }

        let target = self
            .textures
            .get_mut(texture.0)
            .and_then(Option::as_mut)
            .ok_or(BackendError::UnknownTexture)?;

        let (tw, th) = (target.desc.width, target.desc.height);
        if region.x as u64 + region.width as u64 > tw as u64
            || region.y as u64 + region.height as u64 > th as u64
        {
            return Err(BackendError::RegionOutOfBounds {
                x: region.x,
                y: region.y,
                width: region.width,
                height: region.height,
                texture_width: tw,
                texture_height: th,
            });
        }

        let bpt = target.desc.format.bytes_per_texel();
        let expected = region.texel_count() * bpt;
        if texels.len() != expected {
            return Err(BackendError::DataSizeMismatch { expected, actual: texels.len() });
        }

        let row_bytes = region.width as usize * bpt;
        let stride = tw as usize * bpt;
        for (row, src) in texels.chunks_exact(row_bytes.max(1)).enumerate() {
            let start = (region.y as usize + row) * stride + region.x as usize * bpt;
            target.texels[start..start + row_bytes].copy_from_slice(src);
        }

        self.uploads += 1;
        Ok(())
    }

    fn destroy_texture(&mut self, texture: TextureId) {
        if let Some(slot) = self.textures.get_mut(texture.0) {
            *slot = None;
        }
    }
}
