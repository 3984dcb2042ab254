//! Animation orchestrator
//!
//! Schedules non-blocking visual feedback on a [`BoardSurface`]:
//!
//! - [`AnimationOrchestrator::play_move`] - piece slide; captures fade the
//!   captured piece first, then slide
//! - [`AnimationOrchestrator::play_feedback`] - transient correct/incorrect square
//! - [`AnimationOrchestrator::play_explanation`] - highlights and arrows shown one
//!   after another, held, then cleared
//!
//! Each call spawns a tokio task and returns an [`AnimationHandle`]. The handle
//! can be awaited or cancelled. Whatever way an animation ends (finished,
//! cancelled, or the surface failed) its overlays are cleared exactly once, so
//! nothing is left orphaned on the board. A cancelled move snaps the piece to
//! its destination.
//!
//! Surface failures never propagate: they are logged and reported as
//! [`AnimationStatus::Failed`].

use crate::rendering::surface::{BoardSurface, HighlightKind, Overlay};
use chess_logic_shared::{MoveResult, Square};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Per-phase animation durations in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnimationTimings {
    pub slide_ms: u64,
    pub capture_fade_ms: u64,
    pub feedback_ms: u64,
    /// Delay between consecutive explanation highlights/arrows
    pub explanation_step_ms: u64,
    /// How long the full explanation stays on screen
    pub explanation_hold_ms: u64,
}

impl Default for AnimationTimings {
    fn default() -> Self {
        Self {
            slide_ms: 250,
            capture_fade_ms: 150,
            feedback_ms: 600,
            explanation_step_ms: 400,
            explanation_hold_ms: 1200,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationKind {
    Move,
    Feedback,
    Explanation,
}

/// How an animation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationStatus {
    Finished,
    Cancelled,
    Failed,
}

enum Action {
    Slide(Square, Square),
    Fade(Square),
    Show(Overlay),
    Wait(Duration),
}

struct Script {
    id: u64,
    kind: AnimationKind,
    actions: Vec<Action>,
    /// Piece to snap into place if the slide does not complete
    settle: Option<(Square, Square)>,
}

/// Awaitable, cancellable handle to a running animation
#[derive(Debug)]
pub struct AnimationHandle {
    id: u64,
    kind: AnimationKind,
    token: CancellationToken,
    done: oneshot::Receiver<AnimationStatus>,
    resolved: Option<AnimationStatus>,
}

impl AnimationHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> AnimationKind {
        self.kind
    }

    /// Wait for the animation to end
    ///
    /// Returns immediately for a handle that was already cancelled or awaited.
    pub async fn wait(&mut self) -> AnimationStatus {
        if let Some(status) = self.resolved {
            return status;
        }

        let status = (&mut self.done).await.unwrap_or(AnimationStatus::Cancelled);
        self.resolved = Some(status);
        status
    }

    /// Stop the animation
    ///
    /// The handle resolves to [`AnimationStatus::Cancelled`] right away; the
    /// task clears its overlays on its own. Cancelling an animation that has
    /// already ended keeps its original status and does nothing else.
    pub fn cancel(&mut self) -> AnimationStatus {
        if let Some(status) = self.poll_resolved() {
            return status;
        }

        self.token.cancel();
        self.resolved = Some(AnimationStatus::Cancelled);
        AnimationStatus::Cancelled
    }

    /// Whether the animation has ended (or was cancelled)
    pub fn is_resolved(&mut self) -> bool {
        self.poll_resolved().is_some()
    }

    fn poll_resolved(&mut self) -> Option<AnimationStatus> {
        if self.resolved.is_none() {
            if let Ok(status) = self.done.try_recv() {
                self.resolved = Some(status);
            }
        }
        self.resolved
    }
}

/// Spawns animations against a shared board surface
///
/// Holds no lesson state: only squares, overlays and timings.
pub struct AnimationOrchestrator {
    surface: Arc<dyn BoardSurface>,
    timings: AnimationTimings,
    next_id: AtomicU64,
}

impl AnimationOrchestrator {
    pub fn new(surface: Arc<dyn BoardSurface>, timings: AnimationTimings) -> Self {
        Self {
            surface,
            timings,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn timings(&self) -> &AnimationTimings {
        &self.timings
    }

    /// Slide a piece; captures play as fade-then-slide
    pub fn play_move(&self, mv: &MoveResult) -> AnimationHandle {
        let mut actions = Vec::new();

        if let Some(square) = mv.capture_square {
            actions.push(Action::Show(Overlay::Highlight {
                square,
                kind: HighlightKind::Capture,
            }));
            actions.push(Action::Fade(square));
            actions.push(Action::Wait(ms(self.timings.capture_fade_ms)));
        }
        actions.push(Action::Slide(mv.from, mv.to));
        actions.push(Action::Wait(ms(self.timings.slide_ms)));

        self.spawn(AnimationKind::Move, actions, Some((mv.from, mv.to)))
    }

    /// Flash a square green (correct) or red (incorrect)
    pub fn play_feedback(&self, correct: bool, square: Square) -> AnimationHandle {
        let kind = if correct {
            HighlightKind::Correct
        } else {
            HighlightKind::Incorrect
        };
        let actions = vec![
            Action::Show(Overlay::Highlight { square, kind }),
            Action::Wait(ms(self.timings.feedback_ms)),
        ];

        self.spawn(AnimationKind::Feedback, actions, None)
    }

    /// Show guidance highlights, then arrows, one at a time
    pub fn play_explanation(
        &self,
        highlights: &[Square],
        arrows: &[(Square, Square)],
    ) -> AnimationHandle {
        let step = ms(self.timings.explanation_step_ms);
        let mut actions = Vec::new();

        for &square in highlights {
            actions.push(Action::Show(Overlay::Highlight {
                square,
                kind: HighlightKind::Guidance,
            }));
            actions.push(Action::Wait(step));
        }
        for &(from, to) in arrows {
            actions.push(Action::Show(Overlay::Arrow { from, to }));
            actions.push(Action::Wait(step));
        }
        if !actions.is_empty() {
            actions.push(Action::Wait(ms(self.timings.explanation_hold_ms)));
        }

        self.spawn(AnimationKind::Explanation, actions, None)
    }

    fn spawn(
        &self,
        kind: AnimationKind,
        actions: Vec<Action>,
        settle: Option<(Square, Square)>,
    ) -> AnimationHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        let (tx, rx) = oneshot::channel();

        let script = Script {
            id,
            kind,
            actions,
            settle,
        };
        let surface = Arc::clone(&self.surface);
        let child = token.clone();

        tokio::spawn(async move {
            let status = run_script(surface.as_ref(), script, child).await;
            let _ = tx.send(status);
        });

        AnimationHandle {
            id,
            kind,
            token,
            done: rx,
            resolved: None,
        }
    }
}

async fn run_script(
    surface: &dyn BoardSurface,
    script: Script,
    token: CancellationToken,
) -> AnimationStatus {
    let mut live: Vec<Overlay> = Vec::new();
    let mut slid = false;
    let mut status = AnimationStatus::Finished;

    for action in &script.actions {
        if token.is_cancelled() {
            status = AnimationStatus::Cancelled;
            break;
        }

        let outcome = match action {
            Action::Wait(duration) => {
                let cancelled = tokio::select! {
                    _ = token.cancelled() => true,
                    _ = tokio::time::sleep(*duration) => false,
                };
                if cancelled {
                    status = AnimationStatus::Cancelled;
                    break;
                }
                Ok(())
            }
            Action::Slide(from, to) => surface.slide_piece(*from, *to).map(|_| slid = true),
            Action::Fade(square) => surface.fade_piece(*square),
            Action::Show(overlay) => surface.show_overlay(*overlay).map(|_| live.push(*overlay)),
        };

        if let Err(e) = outcome {
            warn!("[ANIM] {:?} animation #{} failed: {}", script.kind, script.id, e);
            status = AnimationStatus::Failed;
            break;
        }
    }

    // A slide that was interrupted, or never started, still has to land
    if status != AnimationStatus::Finished || !slid {
        if let Some((from, to)) = script.settle {
            if let Err(e) = surface.settle_piece(from, to) {
                warn!("[ANIM] Could not settle piece {}{}: {}", from, to, e);
            }
        }
    }

    for overlay in live.drain(..) {
        if let Err(e) = surface.clear_overlay(overlay) {
            warn!("[ANIM] Could not clear {:?}: {}", overlay, e);
        }
    }

    debug!("[ANIM] {:?} animation #{} ended: {:?}", script.kind, script.id, status);
    status
}

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}
