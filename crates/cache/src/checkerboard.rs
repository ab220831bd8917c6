//! Debug checkerboard drawn over rasterized pictures

use sky_render::{Canvas, Color, Rect};

/// Edge length of one checkerboard square in logical units
pub const CHECKER_SIZE: f32 = 8.0;

const CHECKER_EVEN: Color = Color::rgba(1.0, 0.0, 1.0, 0.25);
const CHECKER_ODD: Color = Color::rgba(0.0, 1.0, 0.0, 0.25);

/// Tile `[0, width) x [0, height)` with alternating translucent squares.
///
/// Squares on the right and bottom edges are clipped to the area.
pub fn draw_checkerboard(canvas: &mut dyn Canvas, width: f32, height: f32) {
    if width <= 0.0 || height <= 0.0 {
        return;
    }

    let columns = (width / CHECKER_SIZE).ceil() as u32;
    let rows = (height / CHECKER_SIZE).ceil() as u32;
    for row in 0..rows {
        for column in 0..columns {
            let x = column as f32 * CHECKER_SIZE;
            let y = row as f32 * CHECKER_SIZE;
            let square = Rect::new(
                x,
                y,
                CHECKER_SIZE.min(width - x),
                CHECKER_SIZE.min(height - y),
            );
            let color = if (row + column) % 2 == 0 {
                CHECKER_EVEN
            } else {
                CHECKER_ODD
            };
            canvas.fill_rect(&square, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sky_render::{PixelCanvas, Pixmap};

    #[test]
    fn test_checkerboard_alternates() {
        let mut pixmap = Pixmap::new(16, 16);
        let mut canvas = PixelCanvas::new(&mut pixmap);
        draw_checkerboard(&mut canvas, 16.0, 16.0);
        assert_eq!(canvas.stats().fills, 4);

        let even = canvas.pixmap().pixel(0, 0);
        let odd = canvas.pixmap().pixel(8, 0);
        assert_ne!(even, odd);
        assert_eq!(even, canvas.pixmap().pixel(8, 8));
        assert_eq!(even[3], CHECKER_EVEN.to_rgba8()[3]);
    }

    #[test]
    fn test_checkerboard_clips_partial_squares() {
        let mut pixmap = Pixmap::new(32, 32);
        let mut canvas = PixelCanvas::new(&mut pixmap);
        draw_checkerboard(&mut canvas, 10.0, 4.0);
        assert_eq!(canvas.stats().fills, 2);
        assert_ne!(canvas.pixmap().pixel(9, 3), [0, 0, 0, 0]);
        assert_eq!(canvas.pixmap().pixel(10, 0), [0, 0, 0, 0]);
        assert_eq!(canvas.pixmap().pixel(0, 4), [0, 0, 0, 0]);
    }

    #[test]
    fn test_empty_area_draws_nothing() {
        let mut pixmap = Pixmap::new(4, 4);
        let mut canvas = PixelCanvas::new(&mut pixmap);
        draw_checkerboard(&mut canvas, 0.0, 4.0);
        assert_eq!(canvas.stats().fills, 0);
    }
}
