//! Layer tree node interface

use sky_render::Rect;

use crate::paint_context::ScopedFrame;

/// A node in the layer tree that knows how to paint itself into a frame
pub trait Layer {
    /// Paint into the frame's canvas under its current total matrix
    fn paint(&self, frame: &mut ScopedFrame<'_>);

    /// Area the layer draws into, in its parent's coordinate space
    fn paint_bounds(&self) -> Rect;
}
