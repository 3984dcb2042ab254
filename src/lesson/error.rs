//! Error types for lesson module
//!
//! Provides error types for computer-move resolution and for step transitions
//! requested by the host.

use crate::lesson::machine::LessonPhase;

/// A scripted computer move that no notation strategy could turn into a legal move
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("Unresolvable computer move '{text}' in position {fen}")]
    UnresolvableMove { text: String, fen: String },
}

/// Result type alias for move resolution
pub type ResolveResult<T> = Result<T, ResolveError>;

/// Errors that can occur while driving a lesson
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LessonError {
    /// A choice names a step that does not exist
    #[error("Choice '{choice}' on step '{step_id}' targets unknown step '{target}'")]
    UnknownChoiceTarget {
        step_id: String,
        choice: String,
        target: String,
    },

    /// A step's `nextStepId` names a step that does not exist
    #[error("Step '{step_id}' continues at unknown step '{target}'")]
    UnknownStepTarget { step_id: String, target: String },

    /// Option index outside the current choice list
    #[error("Choice {index} out of range: step '{step_id}' offers {available} options")]
    InvalidChoice {
        step_id: String,
        index: usize,
        available: usize,
    },

    /// The request does not apply to the current phase
    #[error("Cannot {operation} while {phase:?}")]
    WrongPhase {
        operation: &'static str,
        phase: LessonPhase,
    },

    /// Computer steps chain back on themselves without ever waiting for input
    #[error("Step '{step_id}' loops without waiting for the learner")]
    EndlessLoop { step_id: String },

    /// The driver task is gone; commands can no longer be delivered
    #[error("Lesson driver has stopped")]
    DriverStopped,

    /// The lesson's initial position is unusable
    #[error("Lesson '{lesson_id}' has an invalid starting position: {message}")]
    InvalidStart { lesson_id: String, message: String },
}

/// Result type alias for lesson operations
pub type LessonResult<T> = Result<T, LessonError>;
