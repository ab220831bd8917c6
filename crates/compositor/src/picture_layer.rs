//! Leaf layer drawing a recorded picture
//!
//! When the frame has a GPU backend and the layer's device origin sits on the
//! pixel grid, the picture goes through the raster cache: a cached image is
//! blitted at the layer offset, otherwise the picture's commands are replayed
//! directly. Rasters are aligned to whole device pixels, so a sub-pixel origin
//! always replays.

use std::sync::Arc;

use sky_render::{IntSize, Picture, Point, Rect};

use crate::layer::Layer;
use crate::paint_context::ScopedFrame;

#[derive(Debug, Clone, Default)]
pub struct PictureLayer {
    picture: Option<Arc<Picture>>,
    offset: Point,
}

impl PictureLayer {
    pub fn new(picture: Arc<Picture>, offset: Point) -> Self {
        Self {
            picture: Some(picture),
            offset,
        }
    }

    pub fn set_picture(&mut self, picture: Arc<Picture>) {
        self.picture = Some(picture);
    }

    pub fn picture(&self) -> Option<&Arc<Picture>> {
        self.picture.as_ref()
    }

    pub fn set_offset(&mut self, offset: Point) {
        self.offset = offset;
    }

    pub fn offset(&self) -> Point {
        self.offset
    }
}

impl Layer for PictureLayer {
    /// # Panics
    ///
    /// Panics if no picture has been set.
    fn paint(&self, frame: &mut ScopedFrame<'_>) {
        let Some(picture) = self.picture.as_deref() else {
            panic!("PictureLayer painted without a picture");
        };

        let (context, canvas, gpu) = frame.parts();
        let ctm = canvas.total_matrix();
        let cull = picture.cull_rect();
        let physical_size = IntSize::from_f32(cull.width * ctm.scale_x, cull.height * ctm.scale_y);

        let (rasterizer, options) = context.rasterizer_and_options();
        let image = if is_pixel_aligned(ctm.map_point(self.offset)) {
            rasterizer.get_or_rasterize(options, gpu, picture, physical_size, &ctm)
        } else {
            None
        };
        match image {
            Some(image) => canvas.draw_image(image, self.offset.x, self.offset.y),
            None => {
                canvas.save();
                canvas.translate(self.offset.x, self.offset.y);
                canvas.draw_picture(picture);
                canvas.restore();
            }
        }
    }

    fn paint_bounds(&self) -> Rect {
        match &self.picture {
            Some(picture) => picture.cull_rect().translate(self.offset.x, self.offset.y),
            None => Rect::default(),
        }
    }
}

fn is_pixel_aligned(point: Point) -> bool {
    point.x.fract() == 0.0 && point.y.fract() == 0.0
}
