//! Frame-scoped cache of rasterized pictures
//!
//! Pictures are rasterized into GPU textures at their native device resolution
//! and reused across frames. Every entry carries a [`Liveness`] state that
//! [`PictureRasterizer::purge`] decays once per frame: an entry that goes one
//! whole frame without being requested is evicted at the following purge.
//!
//! The first request for a new key is always a miss. The entry is inserted so
//! the next frame's request rasterizes it, and the caller replays the picture
//! directly for this frame.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use sky_render::{
    GpuBackend, GpuError, IntSize, Picture, PictureId, RasterImage, Size, TextureDescriptor, Transform,
};

use crate::checkerboard::draw_checkerboard;
use crate::config::{CompositorOption, CompositorOptions};

/// Identifies one rasterization of a picture at a given pixel size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub picture: PictureId,
    pub size: IntSize,
}

impl CacheKey {
    pub fn new(picture: PictureId, size: IntSize) -> Self {
        Self { picture, size }
    }
}

/// Per-entry liveness across frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// Inserted or requested during the current frame
    Live,
    /// Survived one purge without being requested
    Idle,
    /// Expired; removed by the purge that produced it
    Dead,
}

impl Liveness {
    /// State after one purge
    fn decay(self) -> Liveness {
        match self {
            Liveness::Live => Liveness::Idle,
            Liveness::Idle | Liveness::Dead => Liveness::Dead,
        }
    }
}

/// A cache slot: liveness plus the rasterized image, once there is one
#[derive(Debug)]
pub struct CacheEntry {
    liveness: Liveness,
    image: Option<RasterImage>,
}

impl CacheEntry {
    fn new() -> Self {
        Self {
            liveness: Liveness::Live,
            image: None,
        }
    }

    pub fn liveness(&self) -> Liveness {
        self.liveness
    }

    pub fn image(&self) -> Option<&RasterImage> {
        self.image.as_ref()
    }
}

/// Raster cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RasterCacheStats {
    /// Lookups answered with a rasterized image
    pub hits: u64,
    /// Pictures successfully rasterized into a new image
    pub fills: u64,
    /// Entries removed from the cache
    pub evictions: u64,
}

/// Cache of pictures rasterized into GPU-backed images
///
/// # Example
///
/// ```
/// use sky_cache::{CompositorOptions, PictureRasterizer};
/// use sky_render::{Color, IntSize, PictureRecorder, Rect, SoftwareGpu, Transform};
///
/// let mut gpu = SoftwareGpu::default();
/// let mut rasterizer = PictureRasterizer::new();
/// let options = CompositorOptions::default();
///
/// let mut recorder = PictureRecorder::new(Rect::from_size(100.0, 50.0));
/// recorder.fill_rect(Rect::from_size(100.0, 50.0), Color::RED);
/// let picture = recorder.finish();
/// let size = IntSize::new(100, 50);
///
/// // Frame 1: a new key is always a miss
/// let ctm = Transform::IDENTITY;
/// assert!(rasterizer.get_or_rasterize(&options, Some(&mut gpu), &picture, size, &ctm).is_none());
/// rasterizer.purge();
///
/// // Frame 2: rasterized and returned
/// assert!(rasterizer.get_or_rasterize(&options, Some(&mut gpu), &picture, size, &ctm).is_some());
/// rasterizer.purge();
///
/// assert_eq!(rasterizer.cache_hits(), 1);
/// assert_eq!(rasterizer.cache_fills(), 1);
/// ```
#[derive(Debug, Default)]
pub struct PictureRasterizer {
    entries: HashMap<CacheKey, CacheEntry>,
    stats: RasterCacheStats,
}

impl PictureRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached raster of `picture` at `physical_size`, rasterizing it
    /// on the second consecutive frame it is requested.
    ///
    /// Returns `None` without touching the cache when the size is empty, no GPU
    /// backend is available, or `ctm` does not have a positive scale. Returns
    /// `None` on the first request for a key, and whenever the GPU cannot
    /// allocate a texture; callers draw the picture directly in that case.
    ///
    /// # Panics
    ///
    /// In debug builds, panics if the same key is requested twice without a
    /// [`purge`](Self::purge) in between.
    pub fn get_or_rasterize<G: GpuBackend + ?Sized>(
        &mut self,
        options: &CompositorOptions,
        gpu: Option<&mut G>,
        picture: &Picture,
        physical_size: IntSize,
        ctm: &Transform,
    ) -> Option<&RasterImage> {
        let gpu = gpu?;
        if physical_size.is_empty() || !(ctm.scale_x > 0.0 && ctm.scale_y > 0.0) {
            return None;
        }

        let key = CacheKey::new(picture.id(), physical_size);
        let entry = match self.entries.entry(key) {
            Entry::Vacant(vacant) => {
                vacant.insert(CacheEntry::new());
                tracing::trace!(picture = key.picture.get(), ?physical_size, "raster cache miss");
                return None;
            }
            Entry::Occupied(occupied) => occupied.into_mut(),
        };

        debug_assert!(
            entry.liveness != Liveness::Live,
            "picture {} at {}x{} requested twice in one frame; did you forget to call purge between frames?",
            key.picture.get(),
            physical_size.width,
            physical_size.height,
        );
        match entry.liveness {
            Liveness::Idle => entry.liveness = Liveness::Live,
            Liveness::Dead => {
                *entry = CacheEntry::new();
                return None;
            }
            Liveness::Live => {
                tracing::error!(
                    picture = key.picture.get(),
                    ?physical_size,
                    "raster cache entry requested twice in one frame; purge was not called between frames"
                );
                return None;
            }
        }

        if entry.image.is_none() {
            match image_from_picture(options, gpu, picture, physical_size, ctm) {
                Ok(image) => {
                    self.stats.fills += 1;
                    tracing::trace!(picture = key.picture.get(), ?physical_size, "rasterized picture");
                    entry.image = Some(image);
                }
                Err(err) => {
                    // Draw the picture directly until memory pressure subsides.
                    tracing::debug!(picture = key.picture.get(), %err, "picture rasterization failed");
                    return None;
                }
            }
        }

        let image = entry.image.as_ref()?;
        self.stats.hits += 1;
        Some(image)
    }

    /// Decay every entry by one frame and evict the ones that expire.
    ///
    /// Must run exactly once per frame, after all lookups for that frame.
    pub fn purge(&mut self) {
        let before = self.entries.len();
        self.entries.retain(|_, entry| {
            entry.liveness = entry.liveness.decay();
            entry.liveness != Liveness::Dead
        });

        let evicted = before - self.entries.len();
        self.stats.evictions += evicted as u64;
        if evicted > 0 {
            tracing::debug!(evicted, remaining = self.entries.len(), "purged raster cache");
        }
    }

    /// Evict every entry regardless of liveness, releasing all images
    pub fn clear(&mut self) {
        let evicted = self.entries.len();
        self.entries.clear();
        self.stats.evictions += evicted as u64;
    }

    pub fn cache_hits(&self) -> u64 {
        self.stats.hits
    }

    pub fn cache_fills(&self) -> u64 {
        self.stats.fills
    }

    pub fn cache_evictions(&self) -> u64 {
        self.stats.evictions
    }

    pub fn stats(&self) -> RasterCacheStats {
        self.stats
    }

    /// Number of entries, including ones without an image yet
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn entry(&self, key: &CacheKey) -> Option<&CacheEntry> {
        self.entries.get(key)
    }
}

/// Render `picture` into a new texture at the density implied by `ctm`
fn image_from_picture<G: GpuBackend + ?Sized>(
    options: &CompositorOptions,
    gpu: &mut G,
    picture: &Picture,
    physical_size: IntSize,
    ctm: &Transform,
) -> Result<RasterImage, GpuError> {
    let mut texture = gpu.create_texture(&TextureDescriptor::render_target(physical_size))?;

    let logical_size = Size::new(
        physical_size.width as f32 / ctm.scale_x,
        physical_size.height as f32 / ctm.scale_y,
    );

    {
        let mut canvas = gpu.texture_canvas(texture.as_mut())?;
        canvas.set_matrix(Transform::scale(ctm.scale_x, ctm.scale_y));
        canvas.draw_picture(picture);

        if options.is_enabled(CompositorOption::HighlightRasterizedImages) {
            draw_checkerboard(canvas.as_mut(), logical_size.width, logical_size.height);
        }
    }

    gpu.wrap_texture(texture, logical_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use sky_render::{Color, PictureRecorder, Rect, SoftwareGpu, SoftwareTexture};

    fn red_picture(id: u64, width: f32, height: f32) -> Picture {
        let mut recorder = PictureRecorder::new(Rect::from_size(width, height));
        recorder.fill_rect(Rect::from_size(width, height), Color::RED);
        let recorded = recorder.finish();
        Picture::with_id(
            PictureId::from_raw(id),
            recorded.cull_rect(),
            recorded.commands().to_vec(),
        )
    }

    fn lookup(
        cache: &mut PictureRasterizer,
        gpu: &mut SoftwareGpu,
        picture: &Picture,
        size: IntSize,
    ) -> bool {
        cache
            .get_or_rasterize(
                &CompositorOptions::default(),
                Some(gpu),
                picture,
                size,
                &Transform::IDENTITY,
            )
            .is_some()
    }

    #[test]
    fn test_first_request_is_a_miss() {
        let mut gpu = SoftwareGpu::default();
        let mut cache = PictureRasterizer::new();
        let picture = red_picture(1, 10.0, 10.0);

        assert!(!lookup(&mut cache, &mut gpu, &picture, IntSize::new(10, 10)));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats(), RasterCacheStats::default());
        // Nothing was allocated for the miss
        assert_eq!(gpu.textures_created(), 0);
    }

    #[test]
    fn test_hit_after_warm_up() {
        let mut gpu = SoftwareGpu::default();
        let mut cache = PictureRasterizer::new();
        let picture = red_picture(1, 10.0, 10.0);
        let size = IntSize::new(10, 10);

        assert!(!lookup(&mut cache, &mut gpu, &picture, size));
        cache.purge();
        assert!(lookup(&mut cache, &mut gpu, &picture, size));
        cache.purge();
        assert!(lookup(&mut cache, &mut gpu, &picture, size));
        cache.purge();

        assert_eq!(cache.cache_hits(), 2);
        assert_eq!(cache.cache_fills(), 1);
        assert_eq!(cache.cache_evictions(), 0);
        assert_eq!(gpu.textures_created(), 1);
    }

    #[test]
    fn test_evicted_after_one_idle_frame() {
        let mut gpu = SoftwareGpu::default();
        let mut cache = PictureRasterizer::new();
        let picture = red_picture(1, 10.0, 10.0);
        let key = CacheKey::new(picture.id(), IntSize::new(10, 10));

        lookup(&mut cache, &mut gpu, &picture, key.size);
        cache.purge();
        assert_eq!(cache.entry(&key).map(CacheEntry::liveness), Some(Liveness::Idle));

        // Not requested this frame
        cache.purge();
        assert!(!cache.contains(&key));
        assert_eq!(cache.cache_evictions(), 1);
    }

    #[test]
    fn test_eviction_releases_image_once() {
        let mut gpu = SoftwareGpu::default();
        let mut cache = PictureRasterizer::new();
        let picture = red_picture(1, 10.0, 10.0);
        let size = IntSize::new(10, 10);

        lookup(&mut cache, &mut gpu, &picture, size);
        cache.purge();
        assert!(lookup(&mut cache, &mut gpu, &picture, size));
        cache.purge();
        assert_eq!(gpu.live_textures(), 1);

        cache.purge();
        assert_eq!(gpu.images_released(), 1);
        assert_eq!(gpu.live_textures(), 0);
        assert_eq!(gpu.vram_used(), 0);

        cache.purge();
        assert_eq!(gpu.images_released(), 1);
    }

    #[test]
    fn test_keys_distinguish_picture_and_size() {
        let mut gpu = SoftwareGpu::default();
        let mut cache = PictureRasterizer::new();
        let a = red_picture(1, 10.0, 10.0);
        let b = red_picture(2, 10.0, 10.0);

        lookup(&mut cache, &mut gpu, &a, IntSize::new(10, 10));
        cache.purge();
        assert!(lookup(&mut cache, &mut gpu, &a, IntSize::new(10, 10)));

        // Same picture at another size, and another picture at the same size, both miss
        assert!(!lookup(&mut cache, &mut gpu, &a, IntSize::new(20, 20)));
        assert!(!lookup(&mut cache, &mut gpu, &b, IntSize::new(10, 10)));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_oversized_picture_degrades_to_replay() {
        let mut gpu = SoftwareGpu::default();
        let mut cache = PictureRasterizer::new();
        let picture = red_picture(1, 1e10, 1e10);
        let size = IntSize::from_f32(1e10, 1e10);

        for _ in 0..3 {
            assert!(!lookup(&mut cache, &mut gpu, &picture, size));
            cache.purge();
        }
        assert_eq!(cache.cache_fills(), 0);
        assert_eq!(gpu.textures_created(), 0);
        assert_eq!(gpu.vram_used(), 0);
    }

    #[test]
    fn test_empty_size_and_missing_gpu_do_not_touch_cache() {
        let mut gpu = SoftwareGpu::default();
        let mut cache = PictureRasterizer::new();
        let picture = red_picture(1, 10.0, 10.0);
        let options = CompositorOptions::default();

        assert!(!lookup(&mut cache, &mut gpu, &picture, IntSize::new(0, 10)));
        let no_gpu: Option<&mut SoftwareGpu> = None;
        assert!(cache
            .get_or_rasterize(&options, no_gpu, &picture, IntSize::new(10, 10), &Transform::IDENTITY)
            .is_none());
        assert!(cache
            .get_or_rasterize(
                &options,
                Some(&mut gpu),
                &picture,
                IntSize::new(10, 10),
                &Transform::scale(0.0, 1.0),
            )
            .is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_allocation_failure_degrades_and_recovers() {
        let mut gpu = SoftwareGpu::default();
        gpu.set_fail_allocations(true);
        let mut cache = PictureRasterizer::new();
        let picture = red_picture(1, 10.0, 10.0);
        let size = IntSize::new(10, 10);

        for _ in 0..4 {
            assert!(!lookup(&mut cache, &mut gpu, &picture, size));
            cache.purge();
        }
        assert_eq!(cache.cache_fills(), 0);
        assert_eq!(cache.cache_hits(), 0);
        // The entry stays alive while it keeps being requested
        assert_eq!(cache.len(), 1);

        gpu.set_fail_allocations(false);
        assert!(lookup(&mut cache, &mut gpu, &picture, size));
        assert_eq!(cache.cache_fills(), 1);
    }

    #[test]
    fn test_rasterizes_at_native_resolution() {
        let mut gpu = SoftwareGpu::default();
        let mut cache = PictureRasterizer::new();
        let mut recorder = PictureRecorder::new(Rect::from_size(100.0, 50.0));
        recorder.fill_rect(Rect::new(50.0, 0.0, 50.0, 50.0), Color::RED);
        let picture = recorder.finish();
        let size = IntSize::new(200, 100);
        let ctm = Transform::scale(2.0, 2.0);
        let options = CompositorOptions::default();

        cache.get_or_rasterize(&options, Some(&mut gpu), &picture, size, &ctm);
        cache.purge();
        let image = cache
            .get_or_rasterize(&options, Some(&mut gpu), &picture, size, &ctm)
            .expect("second frame should rasterize");

        assert_eq!(image.pixel_size(), size);
        assert_eq!(image.logical_size(), Size::new(100.0, 50.0));
        let pixmap = image.texture_as::<SoftwareTexture>().unwrap().pixmap();
        assert_eq!(pixmap.pixel(99, 50), [0, 0, 0, 0]);
        assert_eq!(pixmap.pixel(100, 50), [255, 0, 0, 255]);
        assert_eq!(pixmap.pixel(199, 99), [255, 0, 0, 255]);
    }

    #[test]
    fn test_highlight_overlays_checkerboard() {
        let mut gpu = SoftwareGpu::default();
        let mut cache = PictureRasterizer::new();
        let mut recorder = PictureRecorder::new(Rect::from_size(16.0, 16.0));
        recorder.fill_rect(Rect::from_size(16.0, 16.0), Color::WHITE);
        let picture = recorder.finish();
        let size = IntSize::new(16, 16);
        let options = CompositorOptions::default().with(CompositorOption::HighlightRasterizedImages);

        cache.get_or_rasterize(&options, Some(&mut gpu), &picture, size, &Transform::IDENTITY);
        cache.purge();
        let image = cache
            .get_or_rasterize(&options, Some(&mut gpu), &picture, size, &Transform::IDENTITY)
            .unwrap();

        let pixmap = image.texture_as::<SoftwareTexture>().unwrap().pixmap();
        assert_ne!(pixmap.pixel(0, 0), [255, 255, 255, 255]);
        assert_ne!(pixmap.pixel(0, 0), pixmap.pixel(8, 0));
    }

    #[test]
    fn test_clear_evicts_everything() {
        let mut gpu = SoftwareGpu::default();
        let mut cache = PictureRasterizer::new();
        lookup(&mut cache, &mut gpu, &red_picture(1, 4.0, 4.0), IntSize::new(4, 4));
        lookup(&mut cache, &mut gpu, &red_picture(2, 4.0, 4.0), IntSize::new(4, 4));

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.cache_evictions(), 2);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "forgot to call purge")]
    fn test_double_lookup_without_purge_panics() {
        let mut gpu = SoftwareGpu::default();
        let mut cache = PictureRasterizer::new();
        let picture = red_picture(1, 4.0, 4.0);
        let size = IntSize::new(4, 4);

        lookup(&mut cache, &mut gpu, &picture, size);
        cache.purge();
        lookup(&mut cache, &mut gpu, &picture, size);
        lookup(&mut cache, &mut gpu, &picture, size);
    }

    #[test]
    fn test_random_frames_keep_counters_monotonic() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut gpu = SoftwareGpu::new(64 * 64 * 4 * 6);
        let mut cache = PictureRasterizer::new();
        let pictures: Vec<Picture> = (1..=4).map(|id| red_picture(id, 8.0, 8.0)).collect();
        let sizes = [IntSize::new(8, 8), IntSize::new(16, 16), IntSize::new(64, 64)];
        let mut previous = cache.stats();

        for _ in 0..200 {
            // Each key at most once per frame
            let mut requested = Vec::new();
            for _ in 0..rng.gen_range(0..6) {
                let picture = &pictures[rng.gen_range(0..pictures.len())];
                let size = sizes[rng.gen_range(0..sizes.len())];
                let key = CacheKey::new(picture.id(), size);
                if requested.contains(&key) {
                    continue;
                }
                requested.push(key);

                let hit = cache
                    .get_or_rasterize(
                        &CompositorOptions::default(),
                        Some(&mut gpu),
                        picture,
                        size,
                        &Transform::IDENTITY,
                    )
                    .map(RasterImage::pixel_size);
                if let Some(pixel_size) = hit {
                    assert_eq!(pixel_size, size);
                }
            }
            cache.purge();

            let stats = cache.stats();
            assert!(stats.hits >= previous.hits);
            assert!(stats.fills >= previous.fills);
            assert!(stats.evictions >= previous.evictions);
            assert!(stats.fills <= stats.hits);
            previous = stats;
        }
    }
}
