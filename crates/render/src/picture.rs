//! Recorded vector pictures
//!
//! A [`Picture`] is an immutable list of drawing commands with a stable
//! identity. Replaying it into a [`Canvas`] reproduces the recorded drawing.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::canvas::Canvas;
use crate::geometry::{Color, Rect};

/// Stable identity of a picture instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PictureId(u64);

impl PictureId {
    /// Allocate a new process-unique id
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Wrap a caller-chosen id
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

/// A single recorded drawing command
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Save,
    Restore,
    Translate { dx: f32, dy: f32 },
    Scale { sx: f32, sy: f32 },
    FillRect { rect: Rect, color: Color },
}

/// Immutable, replayable list of vector drawing commands
#[derive(Debug, Clone, PartialEq)]
pub struct Picture {
    id: PictureId,
    cull_rect: Rect,
    commands: Vec<DrawCommand>,
}

impl Picture {
    /// Build a picture with an explicit identity.
    ///
    /// Two pictures sharing an id are treated as the same content by any cache
    /// keyed on [`Picture::id`].
    pub fn with_id(id: PictureId, cull_rect: Rect, commands: Vec<DrawCommand>) -> Self {
        Self {
            id,
            cull_rect,
            commands,
        }
    }

    pub fn id(&self) -> PictureId {
        self.id
    }

    /// Bounds the recorded content is expected to stay within
    pub fn cull_rect(&self) -> Rect {
        self.cull_rect
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Replay every command into `canvas`.
    ///
    /// Unbalanced saves are restored before returning so the canvas state is
    /// left as it was found.
    pub fn playback<C: Canvas + ?Sized>(&self, canvas: &mut C) {
        let mut depth = 0usize;
        for command in &self.commands {
            match *command {
                DrawCommand::Save => {
                    canvas.save();
                    depth += 1;
                }
                DrawCommand::Restore => {
                    if depth > 0 {
                        canvas.restore();
                        depth -= 1;
                    }
                }
                DrawCommand::Translate { dx, dy } => canvas.translate(dx, dy),
                DrawCommand::Scale { sx, sy } => canvas.scale(sx, sy),
                DrawCommand::FillRect { rect, color } => canvas.fill_rect(&rect, color),
            }
        }
        for _ in 0..depth {
            canvas.restore();
        }
    }
}

/// Records drawing commands into a new [`Picture`]
///
/// # Example
///
/// ```
/// use sky_render::{Color, PictureRecorder, Rect};
///
/// let mut recorder = PictureRecorder::new(Rect::from_size(100.0, 50.0));
/// recorder.fill_rect(Rect::new(0.0, 0.0, 50.0, 50.0), Color::RED);
/// let picture = recorder.finish();
/// assert_eq!(picture.commands().len(), 1);
/// ```
#[derive(Debug)]
pub struct PictureRecorder {
    cull_rect: Rect,
    commands: Vec<DrawCommand>,
}

impl PictureRecorder {
    pub fn new(cull_rect: Rect) -> Self {
        Self {
            cull_rect,
            commands: Vec::new(),
        }
    }

    pub fn save(&mut self) -> &mut Self {
        self.commands.push(DrawCommand::Save);
        self
    }

    pub fn restore(&mut self) -> &mut Self {
        self.commands.push(DrawCommand::Restore);
        self
    }

    pub fn translate(&mut self, dx: f32, dy: f32) -> &mut Self {
        self.commands.push(DrawCommand::Translate { dx, dy });
        self
    }

    pub fn scale(&mut self, sx: f32, sy: f32) -> &mut Self {
        self.commands.push(DrawCommand::Scale { sx, sy });
        self
    }

    pub fn fill_rect(&mut self, rect: Rect, color: Color) -> &mut Self {
        self.commands.push(DrawCommand::FillRect { rect, color });
        self
    }

    /// Finish recording, assigning a fresh process-unique id
    pub fn finish(self) -> Picture {
        Picture::with_id(PictureId::next(), self.cull_rect, self.commands)
    }
}
