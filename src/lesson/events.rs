//! Host-facing notifications and the renderer payload
//!
//! The state machine reports every transition to a [`LessonObserver`]. A host
//! UI implements the trait directly, or uses [`ChannelObserver`] to receive
//! [`LessonEvent`]s on a tokio channel. [`TracingObserver`] only logs.
//!
//! [`StepView`] is the complete, serializable description of what the board
//! should show for the current step.

use crate::lesson::machine::LessonPhase;
use crate::lesson::scoring::SessionSummary;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Everything the renderer needs to draw the current step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepView {
    pub step_index: usize,
    pub total_steps: usize,
    pub step_id: Option<String>,
    pub fen: String,
    pub arrows: Vec<String>,
    pub highlights: Vec<String>,
    pub tooltip: Option<String>,
    /// Advisory text from the last judged move
    pub feedback: Option<String>,
    /// Whether the board should accept drag/drop input
    pub interaction_enabled: bool,
    pub phase: LessonPhase,
}

/// What happened to a submitted move
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum MoveOutcome {
    /// Played and counted as correct
    Accepted { san: String, uci: String },
    /// Right piece, wrong square
    Hint { message: String },
    WrongPiece { message: String },
    /// Excluded by the lesson, or not legal at all
    Blocked { message: String },
}

impl MoveOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, MoveOutcome::Accepted { .. })
    }

    /// Whether the attempt counted as a mistake
    pub fn is_mistake(&self) -> bool {
        matches!(
            self,
            MoveOutcome::Hint { .. } | MoveOutcome::WrongPiece { .. } | MoveOutcome::Blocked { .. }
        )
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            MoveOutcome::Hint { message }
            | MoveOutcome::WrongPiece { message }
            | MoveOutcome::Blocked { message } => Some(message),
            MoveOutcome::Accepted { .. } => None,
        }
    }
}

/// Callbacks a host UI receives from the lesson engine
///
/// All methods default to doing nothing.
pub trait LessonObserver: Send + Sync {
    fn on_step_changed(&self, _index: usize, _total: usize) {}

    fn on_render(&self, _view: &StepView) {}

    fn on_move_feedback(&self, _outcome: &MoveOutcome) {}

    fn on_session_summary(&self, _summary: &SessionSummary) {}

    fn on_lesson_completed(&self) {}

    fn on_lesson_failed(&self, _reason: &str) {}
}

/// Observer callbacks as data
#[derive(Debug, Clone, PartialEq)]
pub enum LessonEvent {
    StepChanged { index: usize, total: usize },
    Render(StepView),
    MoveFeedback(MoveOutcome),
    Summary(SessionSummary),
    Completed,
    Failed { reason: String },
}

/// Forwards every callback as a [`LessonEvent`]
///
/// Events sent after the receiver is dropped are discarded.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<LessonEvent>,
}

impl ChannelObserver {
    pub fn new(tx: mpsc::UnboundedSender<LessonEvent>) -> Self {
        Self { tx }
    }

    /// Observer plus the receiving end of its channel
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<LessonEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    fn send(&self, event: LessonEvent) {
        let _ = self.tx.send(event);
    }
}

impl LessonObserver for ChannelObserver {
    fn on_step_changed(&self, index: usize, total: usize) {
        self.send(LessonEvent::StepChanged { index, total });
    }

    fn on_render(&self, view: &StepView) {
        self.send(LessonEvent::Render(view.clone()));
    }

    fn on_move_feedback(&self, outcome: &MoveOutcome) {
        self.send(LessonEvent::MoveFeedback(outcome.clone()));
    }

    fn on_session_summary(&self, summary: &SessionSummary) {
        self.send(LessonEvent::Summary(summary.clone()));
    }

    fn on_lesson_completed(&self) {
        self.send(LessonEvent::Completed);
    }

    fn on_lesson_failed(&self, reason: &str) {
        self.send(LessonEvent::Failed {
            reason: reason.to_string(),
        });
    }
}

/// Logs lesson progress through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl LessonObserver for TracingObserver {
    fn on_step_changed(&self, index: usize, total: usize) {
        info!("[LESSON] Step {}/{}", index + 1, total);
    }

    fn on_move_feedback(&self, outcome: &MoveOutcome) {
        info!("[LESSON] Move feedback: {:?}", outcome);
    }

    fn on_session_summary(&self, summary: &SessionSummary) {
        info!(
            "[LESSON] {} correct, {} mistakes ({:.0}%) - next difficulty {}",
            summary.correct_moves,
            summary.mistakes,
            summary.success_rate * 100.0,
            summary.recommended_next_difficulty.level()
        );
    }

    fn on_lesson_completed(&self) {
        info!("[LESSON] Lesson completed");
    }

    fn on_lesson_failed(&self, reason: &str) {
        warn!("[LESSON] Lesson failed: {}", reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_observer_forwards_in_order() {
        let (observer, mut rx) = ChannelObserver::channel();
        observer.on_step_changed(0, 3);
        observer.on_move_feedback(&MoveOutcome::Hint {
            message: "Try the other square".to_string(),
        });
        observer.on_lesson_failed("broken branch");

        assert_eq!(rx.try_recv().unwrap(), LessonEvent::StepChanged { index: 0, total: 3 });
        assert!(matches!(rx.try_recv().unwrap(), LessonEvent::MoveFeedback(o) if o.is_mistake()));
        assert_eq!(
            rx.try_recv().unwrap(),
            LessonEvent::Failed {
                reason: "broken branch".to_string()
            }
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_dropped_receiver_is_ignored() {
        let (observer, rx) = ChannelObserver::channel();
        drop(rx);
        observer.on_lesson_completed();
    }

    #[test]
    fn test_outcome_json_shape() {
        let json = serde_json::to_string(&MoveOutcome::WrongPiece {
            message: "Move a center pawn".to_string(),
        })
        .unwrap();
        assert_eq!(json, r#"{"outcome":"wrong-piece","message":"Move a center pawn"}"#);
    }
}
