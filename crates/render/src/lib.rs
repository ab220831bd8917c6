//! Sky Render Library
//!
//! Drawing interfaces consumed by the compositor: recorded pictures, the 2D
//! canvas, and the GPU backend used to rasterize pictures into textures. A
//! software backend implements all of them on the CPU.

pub mod canvas;
pub mod geometry;
pub mod gpu;
pub mod picture;
pub mod pixmap;

pub use canvas::{Canvas, TextStyle};
pub use geometry::{Color, IntSize, Point, Rect, Size, Transform};
pub use gpu::software::{SoftwareGpu, SoftwareTexture};
pub use gpu::{GpuBackend, GpuError, RasterImage, ReleaseProc, Texture, TextureDescriptor, TextureFormat};
pub use picture::{DrawCommand, Picture, PictureId, PictureRecorder};
pub use pixmap::{DrawStats, PixelCanvas, Pixmap, TextRun};
