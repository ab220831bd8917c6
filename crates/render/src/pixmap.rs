//! CPU pixel buffer and the canvas that draws into it
//!
//! [`PixelCanvas`] is the reference [`Canvas`] implementation. Fills cover a
//! pixel when the pixel centre lies inside the device-space rectangle, images
//! are sampled nearest-neighbour, and text is recorded rather than rasterized.

use crate::canvas::{Canvas, TextStyle};
use crate::geometry::{Color, Point, Rect, Transform};
use crate::gpu::software::SoftwareTexture;
use crate::gpu::RasterImage;
use crate::picture::Picture;

/// Owned RGBA8 pixel buffer (non-premultiplied)
#[derive(Clone, PartialEq, Eq)]
pub struct Pixmap {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Pixmap {
    /// Create a fully transparent pixmap
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * 4],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Read one pixel. Out-of-bounds reads return transparent black.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        if x >= self.width || y >= self.height {
            return [0; 4];
        }
        let i = self.index(x, y);
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }

    /// Overwrite every pixel with `color`
    pub fn fill(&mut self, color: Color) {
        let rgba = color.to_rgba8();
        for px in self.data.chunks_exact_mut(4) {
            px.copy_from_slice(&rgba);
        }
    }

    /// Source-over blend `src` onto the pixel at `(x, y)`
    pub fn blend_pixel(&mut self, x: u32, y: u32, src: [u8; 4]) {
        if x >= self.width || y >= self.height || src[3] == 0 {
            return;
        }
        let i = self.index(x, y);
        if src[3] == 255 {
            self.data[i..i + 4].copy_from_slice(&src);
            return;
        }

        let sa = src[3] as f32 / 255.0;
        let da = self.data[i + 3] as f32 / 255.0;
        let oa = sa + da * (1.0 - sa);
        for c in 0..3 {
            let s = src[c] as f32;
            let d = self.data[i + c] as f32;
            self.data[i + c] = ((s * sa + d * da * (1.0 - sa)) / oa).round() as u8;
        }
        self.data[i + 3] = (oa * 255.0).round() as u8;
    }

    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }
}

impl std::fmt::Debug for Pixmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pixmap")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// Text drawn through [`Canvas::draw_text`], kept for inspection
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    /// Baseline origin in device pixels
    pub origin: Point,
    pub style: TextStyle,
}

/// Counts of drawing operations issued to a [`PixelCanvas`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawStats {
    pub fills: u64,
    pub images: u64,
    pub pictures: u64,
    pub text_runs: u64,
}

/// Software canvas drawing into a borrowed [`Pixmap`]
pub struct PixelCanvas<'p> {
    pixmap: &'p mut Pixmap,
    matrix: Transform,
    saved: Vec<Transform>,
    text_runs: Vec<TextRun>,
    stats: DrawStats,
}

impl<'p> PixelCanvas<'p> {
    pub fn new(pixmap: &'p mut Pixmap) -> Self {
        Self {
            pixmap,
            matrix: Transform::IDENTITY,
            saved: Vec::new(),
            text_runs: Vec::new(),
            stats: DrawStats::default(),
        }
    }

    pub fn pixmap(&self) -> &Pixmap {
        &*self.pixmap
    }

    pub fn text_runs(&self) -> &[TextRun] {
        &self.text_runs
    }

    pub fn stats(&self) -> DrawStats {
        self.stats
    }

    /// Depth of the save stack
    pub fn save_count(&self) -> usize {
        self.saved.len()
    }

    /// Pixel index range whose centres fall in `[start, end)`, clipped to `limit`
    fn covered(start: f32, end: f32, limit: u32) -> std::ops::Range<u32> {
        let first = (start - 0.5).ceil().max(0.0);
        let last = (end - 0.5).ceil().min(limit as f32).max(0.0);
        if first >= last {
            return 0..0;
        }
        first as u32..last as u32
    }
}

impl Canvas for PixelCanvas<'_> {
    fn save(&mut self) {
        self.saved.push(self.matrix);
    }

    fn restore(&mut self) {
        if let Some(matrix) = self.saved.pop() {
            self.matrix = matrix;
        }
    }

    fn set_matrix(&mut self, matrix: Transform) {
        self.matrix = matrix;
    }

    fn total_matrix(&self) -> Transform {
        self.matrix
    }

    fn fill_rect(&mut self, rect: &Rect, color: Color) {
        self.stats.fills += 1;
        let device = self.matrix.map_rect(rect);
        let rgba = color.to_rgba8();
        for y in Self::covered(device.y, device.bottom(), self.pixmap.height()) {
            for x in Self::covered(device.x, device.right(), self.pixmap.width()) {
                self.pixmap.blend_pixel(x, y, rgba);
            }
        }
    }

    fn draw_image(&mut self, image: &RasterImage, x: f32, y: f32) {
        self.stats.images += 1;
        let Some(texture) = image.texture_as::<SoftwareTexture>() else {
            tracing::warn!("skipping image backed by a non-software texture");
            return;
        };
        let source = texture.pixmap();
        if source.width() == 0 || source.height() == 0 {
            return;
        }

        let logical = image.logical_size();
        let device = self
            .matrix
            .map_rect(&Rect::new(x, y, logical.width, logical.height));
        if device.is_empty() {
            return;
        }

        let sx = source.width() as f32 / device.width;
        let sy = source.height() as f32 / device.height;
        for py in Self::covered(device.y, device.bottom(), self.pixmap.height()) {
            let v = (((py as f32 + 0.5 - device.y) * sy).floor() as u32).min(source.height() - 1);
            for px in Self::covered(device.x, device.right(), self.pixmap.width()) {
                let u = (((px as f32 + 0.5 - device.x) * sx).floor() as u32).min(source.width() - 1);
                self.pixmap.blend_pixel(px, py, source.pixel(u, v));
            }
        }
    }

    fn draw_picture(&mut self, picture: &Picture) {
        self.stats.pictures += 1;
        self.save();
        picture.playback(self);
        self.restore();
    }

    fn draw_text(&mut self, text: &str, origin: Point, style: &TextStyle) {
        self.stats.text_runs += 1;
        self.text_runs.push(TextRun {
            text: text.to_string(),
            origin: self.matrix.map_point(origin),
            style: *style,
        });
    }
}
