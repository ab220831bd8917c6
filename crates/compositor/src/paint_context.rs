//! Per-frame paint orchestration
//!
//! [`PaintContext`] owns the raster cache for the lifetime of the compositor
//! and brackets every frame with [`begin_frame`](PaintContext::begin_frame) and
//! [`end_frame`](PaintContext::end_frame). The end of a frame purges the cache
//! exactly once and draws the optional statistics overlay.

use std::time::Duration;

use sky_cache::{CompositorOption, CompositorOptions, PictureRasterizer};
use sky_render::{Canvas, Color, GpuBackend, Point, TextStyle, Transform};

use crate::instrumentation::{Counter, Stopwatch, FRAME_BUDGET_60FPS};

const STATISTICS_X: f32 = 10.0;
const STATISTICS_FIRST_BASELINE: f32 = 20.0;
const STATISTICS_LINE_SPACING: f32 = 18.0;
const STATISTICS_STYLE: TextStyle = TextStyle {
    size: 14.0,
    color: Color::RED,
};

/// Long-lived state shared by every frame
#[derive(Debug, Default)]
pub struct PaintContext {
    rasterizer: PictureRasterizer,
    options: CompositorOptions,
    frame_count: Counter,
    frame_time: Stopwatch,
    in_frame: bool,
}

impl PaintContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: CompositorOptions) -> Self {
        let mut context = Self::default();
        context.options = options;
        context
    }

    pub fn options(&self) -> &CompositorOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut CompositorOptions {
        &mut self.options
    }

    pub fn rasterizer(&self) -> &PictureRasterizer {
        &self.rasterizer
    }

    /// Split borrow of the cache and the options it rasterizes with
    pub fn rasterizer_and_options(&mut self) -> (&mut PictureRasterizer, &CompositorOptions) {
        (&mut self.rasterizer, &self.options)
    }

    /// Number of frames begun so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count.count()
    }

    pub fn last_frame_duration(&self) -> Duration {
        self.frame_time.last_lap()
    }

    pub fn is_in_frame(&self) -> bool {
        self.in_frame
    }

    /// Start a frame. Must precede any paint work for the frame.
    pub fn begin_frame(&mut self) {
        debug_assert!(!self.in_frame, "begin_frame called while a frame is still in flight");
        self.in_frame = true;
        self.frame_count.increment();
        self.frame_time.start();
    }

    /// Finish the frame: purge the raster cache once, stop the frame timer and
    /// draw the statistics overlay onto `canvas`.
    pub fn end_frame(&mut self, canvas: &mut dyn Canvas) {
        debug_assert!(self.in_frame, "end_frame called without a matching begin_frame");
        self.in_frame = false;

        self.rasterizer.purge();
        let elapsed = self.frame_time.stop();
        if elapsed > FRAME_BUDGET_60FPS {
            tracing::trace!(
                frame = self.frame_count.count(),
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                "frame exceeded 60fps budget"
            );
        }

        self.display_statistics(canvas);
    }

    /// Begin a frame and return a handle that ends it when dropped
    pub fn acquire_frame<'a>(
        &'a mut self,
        canvas: &'a mut dyn Canvas,
        gpu: Option<&'a mut dyn GpuBackend>,
    ) -> ScopedFrame<'a> {
        self.begin_frame();
        ScopedFrame {
            context: self,
            canvas,
            gpu,
        }
    }

    fn statistics_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();

        if self.options.is_enabled(CompositorOption::DisplayFrameStatistics) {
            // Frame (2032): 3.26ms
            lines.push(format!(
                "Frame ({}): {:.2}ms",
                self.frame_count.count(),
                self.frame_time.last_lap().as_secs_f64() * 1000.0
            ));
        }

        if self.options.is_enabled(CompositorOption::DisplayRasterizerStatistics) {
            let stats = self.rasterizer.stats();
            lines.push(format!(
                "Rasterizer Hits: {} Fills: {} Evictions: {}",
                stats.hits, stats.fills, stats.evictions
            ));
        }

        lines
    }

    fn display_statistics(&self, canvas: &mut dyn Canvas) {
        let lines = self.statistics_lines();
        if lines.is_empty() {
            return;
        }

        // Screen space, top left corner
        canvas.save();
        canvas.set_matrix(Transform::IDENTITY);
        let mut y = STATISTICS_FIRST_BASELINE;
        for line in &lines {
            canvas.draw_text(line, Point::new(STATISTICS_X, y), &STATISTICS_STYLE);
            y += STATISTICS_LINE_SPACING;
        }
        canvas.restore();
    }
}

impl Drop for PaintContext {
    fn drop(&mut self) {
        self.rasterizer.clear();
    }
}

/// Handle for one in-flight frame
///
/// Created by [`PaintContext::acquire_frame`]; dropping it ends the frame. The
/// handle borrows its context, so a second frame cannot begin while it lives.
pub struct ScopedFrame<'a> {
    context: &'a mut PaintContext,
    canvas: &'a mut dyn Canvas,
    gpu: Option<&'a mut dyn GpuBackend>,
}

impl<'a> ScopedFrame<'a> {
    pub fn canvas(&mut self) -> &mut (dyn Canvas + 'a) {
        &mut *self.canvas
    }

    /// GPU backend for this frame, if rasterization is available
    pub fn gpu(&mut self) -> Option<&mut (dyn GpuBackend + 'a)> {
        self.gpu.as_deref_mut()
    }

    pub fn paint_context(&self) -> &PaintContext {
        &*self.context
    }

    pub fn paint_context_mut(&mut self) -> &mut PaintContext {
        &mut *self.context
    }

    /// Borrow the context, canvas and GPU backend at the same time
    pub fn parts(
        &mut self,
    ) -> (
        &mut PaintContext,
        &mut (dyn Canvas + 'a),
        Option<&mut (dyn GpuBackend + 'a)>,
    ) {
        (&mut *self.context, &mut *self.canvas, self.gpu.as_deref_mut())
    }
}

impl Drop for ScopedFrame<'_> {
    fn drop(&mut self) {
        self.context.end_frame(&mut *self.canvas);
    }
}
