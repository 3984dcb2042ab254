//! Rendering module - visual feedback for lessons
//!
//! The lesson engine never draws anything itself. It drives a renderer through
//! the [`BoardSurface`] trait, and all timing of that drawing lives in the
//! [`AnimationOrchestrator`].
//!
//! # Architecture
//!
//! - `surface` - renderer contract plus headless ([`LogSurface`]) and
//!   recording ([`RecordingSurface`]) implementations
//! - `animation` - cancellable move, feedback and explanation animations

pub mod animation;
pub mod surface;

pub use animation::{
    AnimationHandle, AnimationKind, AnimationOrchestrator, AnimationStatus, AnimationTimings,
};
pub use surface::{
    AnimationError, BoardSurface, HighlightKind, LogSurface, Overlay, RecordingSurface, SurfaceOp,
};
