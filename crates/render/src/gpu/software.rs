//! CPU-backed implementation of the GPU interface
//!
//! Textures are plain [`Pixmap`]s. A VRAM limit is enforced so allocation
//! failure under memory pressure can be exercised without real hardware.

use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use super::{
    GpuBackend, GpuError, RasterImage, ReleaseProc, Texture, TextureDescriptor, TextureFormat,
};
use crate::canvas::Canvas;
use crate::geometry::Size;
use crate::pixmap::{PixelCanvas, Pixmap};

/// Shared accounting between the backend and the textures it handed out
#[derive(Debug, Default)]
struct VramLedger {
    used: AtomicUsize,
    live_textures: AtomicUsize,
    textures_created: AtomicUsize,
    images_released: AtomicUsize,
}

/// Texture allocated by [`SoftwareGpu`]
pub struct SoftwareTexture {
    pixmap: Pixmap,
    format: TextureFormat,
    byte_size: usize,
    ledger: Arc<VramLedger>,
}

impl SoftwareTexture {
    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }
}

impl Texture for SoftwareTexture {
    fn width(&self) -> u32 {
        self.pixmap.width()
    }

    fn height(&self) -> u32 {
        self.pixmap.height()
    }

    fn format(&self) -> TextureFormat {
        self.format
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Drop for SoftwareTexture {
    fn drop(&mut self) {
        self.ledger.used.fetch_sub(self.byte_size, Ordering::Relaxed);
        self.ledger.live_textures.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Software GPU with a bounded texture memory pool
///
/// # Example
///
/// ```
/// use sky_render::gpu::software::SoftwareGpu;
/// use sky_render::gpu::{GpuBackend, TextureDescriptor};
/// use sky_render::IntSize;
///
/// let mut gpu = SoftwareGpu::new(1024 * 1024);
/// let texture = gpu.create_texture(&TextureDescriptor::render_target(IntSize::new(64, 64)));
/// assert!(texture.is_ok());
/// assert_eq!(gpu.vram_used(), 64 * 64 * 4);
/// ```
#[derive(Debug)]
pub struct SoftwareGpu {
    vram_limit: usize,
    fail_allocations: AtomicBool,
    ledger: Arc<VramLedger>,
}

impl SoftwareGpu {
    /// Create a backend with the given texture memory limit in bytes
    pub fn new(vram_limit: usize) -> Self {
        Self {
            vram_limit,
            fail_allocations: AtomicBool::new(false),
            ledger: Arc::new(VramLedger::default()),
        }
    }

    /// Create a backend with a limit in megabytes
    pub fn with_mb_limit(megabytes: usize) -> Self {
        Self::new(megabytes * 1024 * 1024)
    }

    /// Make every subsequent allocation fail as if memory were exhausted
    pub fn set_fail_allocations(&self, fail: bool) {
        self.fail_allocations.store(fail, Ordering::Relaxed);
    }

    pub fn set_vram_limit(&mut self, limit: usize) {
        self.vram_limit = limit;
    }

    pub fn vram_limit(&self) -> usize {
        self.vram_limit
    }

    /// Bytes held by live textures
    pub fn vram_used(&self) -> usize {
        self.ledger.used.load(Ordering::Relaxed)
    }

    pub fn live_textures(&self) -> usize {
        self.ledger.live_textures.load(Ordering::Relaxed)
    }

    pub fn textures_created(&self) -> usize {
        self.ledger.textures_created.load(Ordering::Relaxed)
    }

    /// Number of image release callbacks that have run
    pub fn images_released(&self) -> usize {
        self.ledger.images_released.load(Ordering::Relaxed)
    }
}

impl Default for SoftwareGpu {
    /// Create a backend with a default 512MB limit
    fn default() -> Self {
        Self::with_mb_limit(512)
    }
}

impl GpuBackend for SoftwareGpu {
    fn create_texture(&mut self, descriptor: &TextureDescriptor) -> Result<Box<dyn Texture>, GpuError> {
        if descriptor.width == 0 || descriptor.height == 0 {
            return Err(GpuError::TextureCreationFailed(format!(
                "zero-sized texture {}x{}",
                descriptor.width, descriptor.height
            )));
        }

        if descriptor.format != TextureFormat::Rgba8Unorm {
            return Err(GpuError::UnsupportedFormat(descriptor.format));
        }

        let used = self.vram_used();
        let available = self.vram_limit.saturating_sub(used);
        let Some(requested) = descriptor.byte_size() else {
            return Err(GpuError::OutOfMemory {
                requested: usize::MAX,
                available,
            });
        };
        if self.fail_allocations.load(Ordering::Relaxed) || requested > available {
            return Err(GpuError::OutOfMemory {
                requested,
                available,
            });
        }

        self.ledger.used.fetch_add(requested, Ordering::Relaxed);
        self.ledger.live_textures.fetch_add(1, Ordering::Relaxed);
        self.ledger.textures_created.fetch_add(1, Ordering::Relaxed);

        Ok(Box::new(SoftwareTexture {
            pixmap: Pixmap::new(descriptor.width, descriptor.height),
            format: descriptor.format,
            byte_size: requested,
            ledger: Arc::clone(&self.ledger),
        }))
    }

    fn texture_canvas<'t>(
        &mut self,
        texture: &'t mut dyn Texture,
    ) -> Result<Box<dyn Canvas + 't>, GpuError> {
        let texture = texture
            .as_any_mut()
            .downcast_mut::<SoftwareTexture>()
            .ok_or(GpuError::ForeignTexture)?;
        Ok(Box::new(PixelCanvas::new(&mut texture.pixmap)))
    }

    fn wrap_texture(
        &mut self,
        texture: Box<dyn Texture>,
        logical_size: Size,
    ) -> Result<RasterImage, GpuError> {
        if !texture.as_any().is::<SoftwareTexture>() {
            return Err(GpuError::ForeignTexture);
        }

        let ledger = Arc::clone(&self.ledger);
        let release: ReleaseProc = Box::new(move |_: &dyn Texture| {
            ledger.images_released.fetch_add(1, Ordering::Relaxed);
        });
        Ok(RasterImage::new(texture, logical_size, Some(release)))
    }
}
