//! Board surface contract
//!
//! The renderer (3D board, web canvas, terminal) implements [`BoardSurface`].
//! Animations talk only in squares, overlays and piece slides; they never see
//! step ids or lesson content.

use chess_logic_shared::Square;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::debug;

/// Colour class of a square highlight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HighlightKind {
    Correct,
    Incorrect,
    Guidance,
    Capture,
}

/// A transient visual element drawn over the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Overlay {
    Highlight { square: Square, kind: HighlightKind },
    Arrow { from: Square, to: Square },
}

/// Rendering failure reported by a surface
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnimationError {
    #[error("Surface rejected {operation}: {message}")]
    Surface {
        operation: &'static str,
        message: String,
    },
}

/// Drawing operations the animation orchestrator needs from a renderer
pub trait BoardSurface: Send + Sync {
    /// Start sliding the piece on `from` to `to`
    fn slide_piece(&self, from: Square, to: Square) -> Result<(), AnimationError>;

    /// Fade out the piece on `square` (captured piece)
    fn fade_piece(&self, square: Square) -> Result<(), AnimationError>;

    /// Snap a piece to its destination without animating
    fn settle_piece(&self, from: Square, to: Square) -> Result<(), AnimationError>;

    fn show_overlay(&self, overlay: Overlay) -> Result<(), AnimationError>;

    fn clear_overlay(&self, overlay: Overlay) -> Result<(), AnimationError>;
}

/// Surface that only logs, for headless runs
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSurface;

impl BoardSurface for LogSurface {
    fn slide_piece(&self, from: Square, to: Square) -> Result<(), AnimationError> {
        debug!("[ANIM] slide {}{}", from, to);
        Ok(())
    }

    fn fade_piece(&self, square: Square) -> Result<(), AnimationError> {
        debug!("[ANIM] fade {}", square);
        Ok(())
    }

    fn settle_piece(&self, from: Square, to: Square) -> Result<(), AnimationError> {
        debug!("[ANIM] settle {}{}", from, to);
        Ok(())
    }

    fn show_overlay(&self, overlay: Overlay) -> Result<(), AnimationError> {
        debug!("[ANIM] show {:?}", overlay);
        Ok(())
    }

    fn clear_overlay(&self, overlay: Overlay) -> Result<(), AnimationError> {
        debug!("[ANIM] clear {:?}", overlay);
        Ok(())
    }
}

/// One call made on a [`RecordingSurface`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceOp {
    Slide { from: Square, to: Square },
    Fade(Square),
    Settle { from: Square, to: Square },
    Show(Overlay),
    Clear(Overlay),
}

/// Surface that records every call and the overlays currently on screen
///
/// Can be switched into a failing mode where every drawing call errors.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    ops: Mutex<Vec<SurfaceOp>>,
    live: Mutex<Vec<Overlay>>,
    failing: AtomicBool,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// A surface whose drawing calls all fail
    pub fn failing() -> Self {
        let surface = Self::default();
        surface.set_failing(true);
        surface
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn ops(&self) -> Vec<SurfaceOp> {
        self.ops.lock().clone()
    }

    /// Overlays shown and not yet cleared
    pub fn live_overlays(&self) -> Vec<Overlay> {
        self.live.lock().clone()
    }

    fn record(&self, operation: &'static str, op: SurfaceOp) -> Result<(), AnimationError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AnimationError::Surface {
                operation,
                message: "surface unavailable".to_string(),
            });
        }

        match op {
            SurfaceOp::Show(overlay) => self.live.lock().push(overlay),
            SurfaceOp::Clear(overlay) => self.live.lock().retain(|o| *o != overlay),
            _ => {}
        }
        self.ops.lock().push(op);
        Ok(())
    }
}

impl BoardSurface for RecordingSurface {
    fn slide_piece(&self, from: Square, to: Square) -> Result<(), AnimationError> {
        self.record("slide", SurfaceOp::Slide { from, to })
    }

    fn fade_piece(&self, square: Square) -> Result<(), AnimationError> {
        self.record("fade", SurfaceOp::Fade(square))
    }

    fn settle_piece(&self, from: Square, to: Square) -> Result<(), AnimationError> {
        self.record("settle", SurfaceOp::Settle { from, to })
    }

    fn show_overlay(&self, overlay: Overlay) -> Result<(), AnimationError> {
        self.record("show", SurfaceOp::Show(overlay))
    }

    fn clear_overlay(&self, overlay: Overlay) -> Result<(), AnimationError> {
        self.record("clear", SurfaceOp::Clear(overlay))
    }
}
