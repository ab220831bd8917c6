//! Sky Raster Cache Library
//!
//! Frame-scoped cache of pictures rasterized into GPU-backed images, with
//! one-idle-frame eviction, plus the compositor options that drive it.

pub mod checkerboard;
pub mod config;
pub mod rasterizer;

pub use config::{CompositorOption, CompositorOptions, ConfigError};
pub use rasterizer::{CacheEntry, CacheKey, Liveness, PictureRasterizer, RasterCacheStats};
