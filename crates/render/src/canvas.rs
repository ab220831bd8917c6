//! 2D drawing context interface

use crate::geometry::{Color, Point, Rect, Transform};
use crate::gpu::RasterImage;
use crate::picture::Picture;

/// Text appearance for diagnostic text
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    /// Font size in logical units
    pub size: f32,
    pub color: Color,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            size: 14.0,
            color: Color::BLACK,
        }
    }
}

/// Platform-agnostic 2D drawing context
///
/// Every canvas carries a current transform (the total matrix) and a stack of
/// saved transforms. Geometry passed to the drawing calls is in the local
/// coordinate space and mapped through the total matrix.
pub trait Canvas {
    /// Push the current state
    fn save(&mut self);

    /// Pop the most recently saved state. Extra restores are ignored.
    fn restore(&mut self);

    /// Replace the total matrix
    fn set_matrix(&mut self, matrix: Transform);

    /// Current total matrix
    fn total_matrix(&self) -> Transform;

    fn translate(&mut self, dx: f32, dy: f32) {
        let matrix = self.total_matrix().pre_concat(&Transform::translate(dx, dy));
        self.set_matrix(matrix);
    }

    fn scale(&mut self, sx: f32, sy: f32) {
        let matrix = self.total_matrix().pre_concat(&Transform::scale(sx, sy));
        self.set_matrix(matrix);
    }

    fn fill_rect(&mut self, rect: &Rect, color: Color);

    /// Draw `image` with its top-left corner at `(x, y)`, covering the image's
    /// logical size in local coordinates.
    fn draw_image(&mut self, image: &RasterImage, x: f32, y: f32);

    /// Replay `picture`, leaving the canvas state unchanged
    fn draw_picture(&mut self, picture: &Picture) {
        self.save();
        picture.playback(self);
        self.restore();
    }

    fn draw_text(&mut self, text: &str, origin: Point, style: &TextStyle);
}
