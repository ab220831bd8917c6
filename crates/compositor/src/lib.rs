//! Frame orchestration for the layer compositor
//!
//! A [`PaintContext`] lives as long as the compositor. Each frame is bracketed
//! by a [`ScopedFrame`] handle; layers such as [`PictureLayer`] paint into it
//! and consult the context's raster cache.

pub mod instrumentation;
pub mod layer;
pub mod paint_context;
pub mod picture_layer;

pub use instrumentation::{Counter, Stopwatch, FRAME_BUDGET_120FPS, FRAME_BUDGET_60FPS};
pub use layer::Layer;
pub use paint_context::{PaintContext, ScopedFrame};
pub use picture_layer::PictureLayer;
