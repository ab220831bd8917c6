//! GPU abstraction layer
//!
//! Platform-agnostic GPU interface used by the raster cache: render-target
//! texture allocation, canvases bound to textures, and immutable images that
//! wrap a texture.

pub mod software;

use std::any::Any;
use std::fmt;

use crate::canvas::Canvas;
use crate::geometry::{IntSize, Size};

/// GPU backend error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GpuError {
    /// Not enough texture memory for the allocation
    #[error("out of GPU memory: requested {requested} bytes, {available} available")]
    OutOfMemory { requested: usize, available: usize },
    /// The backend cannot allocate this pixel format
    #[error("unsupported texture format: {0:?}")]
    UnsupportedFormat(TextureFormat),
    /// The texture was created by a different backend
    #[error("texture does not belong to this backend")]
    ForeignTexture,
    /// Texture creation failed for a backend-specific reason
    #[error("texture creation failed: {0}")]
    TextureCreationFailed(String),
}

/// Texture format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    /// 8-bit RGBA with linear color space
    Rgba8Unorm,
    /// 8-bit BGRA with linear color space (not supported by the software backend)
    Bgra8Unorm,
}

impl TextureFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            TextureFormat::Rgba8Unorm | TextureFormat::Bgra8Unorm => 4,
        }
    }
}

/// Texture descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureDescriptor {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Pixel format
    pub format: TextureFormat,
    /// Whether the texture is used as a render target
    pub render_target: bool,
}

impl TextureDescriptor {
    /// Descriptor for an RGBA render target of the given pixel size
    pub fn render_target(size: IntSize) -> Self {
        Self {
            width: size.width,
            height: size.height,
            format: TextureFormat::Rgba8Unorm,
            render_target: true,
        }
    }

    pub fn size(&self) -> IntSize {
        IntSize::new(self.width, self.height)
    }

    /// Bytes of texture memory this descriptor requires, or `None` if that
    /// does not fit in `usize`
    pub fn byte_size(&self) -> Option<usize> {
        let bytes = self
            .size()
            .area()
            .checked_mul(self.format.bytes_per_pixel() as u64)?;
        usize::try_from(bytes).ok()
    }
}

/// GPU texture
pub trait Texture {
    /// Get texture width
    fn width(&self) -> u32;

    /// Get texture height
    fn height(&self) -> u32;

    /// Get texture format
    fn format(&self) -> TextureFormat;

    /// Backend-specific downcasting
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// GPU backend consumed by the raster cache
pub trait GpuBackend {
    /// Allocate a texture. Fails under memory pressure.
    fn create_texture(&mut self, descriptor: &TextureDescriptor) -> Result<Box<dyn Texture>, GpuError>;

    /// Obtain a canvas that draws into `texture`
    fn texture_canvas<'t>(
        &mut self,
        texture: &'t mut dyn Texture,
    ) -> Result<Box<dyn Canvas + 't>, GpuError>;

    /// Wrap a texture as an immutable image with the given logical size.
    ///
    /// The backend attaches whatever release hook it needs; it runs when the
    /// returned image is dropped.
    fn wrap_texture(
        &mut self,
        texture: Box<dyn Texture>,
        logical_size: Size,
    ) -> Result<RasterImage, GpuError>;
}

/// Callback run exactly once when a [`RasterImage`] is dropped
pub type ReleaseProc = Box<dyn FnOnce(&dyn Texture)>;

/// Immutable, sampleable image backed by a texture
///
/// The image owns its texture. Its logical size may differ from the texture's
/// pixel size: a picture rasterized at 2x density has a texture twice as large
/// as its logical size, so drawing it under a 2x transform is a 1:1 blit.
pub struct RasterImage {
    texture: Box<dyn Texture>,
    logical_size: Size,
    release: Option<ReleaseProc>,
}

impl RasterImage {
    pub fn new(texture: Box<dyn Texture>, logical_size: Size, release: Option<ReleaseProc>) -> Self {
        Self {
            texture,
            logical_size,
            release,
        }
    }

    pub fn logical_size(&self) -> Size {
        self.logical_size
    }

    /// Size of the backing texture in pixels
    pub fn pixel_size(&self) -> IntSize {
        IntSize::new(self.texture.width(), self.texture.height())
    }

    pub fn texture(&self) -> &dyn Texture {
        self.texture.as_ref()
    }

    /// Get a reference to the backing texture as a concrete type.
    ///
    /// Returns `None` if the type doesn't match.
    pub fn texture_as<T: 'static>(&self) -> Option<&T> {
        self.texture.as_any().downcast_ref::<T>()
    }
}

impl Drop for RasterImage {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release(self.texture.as_ref());
        }
    }
}

impl fmt::Debug for RasterImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RasterImage")
            .field("logical_size", &self.logical_size)
            .field("pixel_size", &self.pixel_size())
            .field("format", &self.texture.format())
            .finish()
    }
}
