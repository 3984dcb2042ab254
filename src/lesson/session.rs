//! Per-attempt session state
//!
//! Everything that changes while a learner works through a lesson lives in
//! [`SessionState`], and only the state machine writes to it. Restarting
//! replaces it with a fresh one; completing or abandoning discards it.

use crate::lesson::machine::LessonPhase;
use crate::lesson::resolver::Interpretation;
use crate::lesson::scoring::SessionScorer;
use chess_logic_shared::{MoveResult, Position};
use uuid::Uuid;

/// What the computer played on its last move step
#[derive(Debug, Clone, PartialEq)]
pub struct ComputerMoveReport {
    /// Move text as authored
    pub authored: String,
    pub result: MoveResult,
    /// Notation reading that matched, or `None` when a recovery move was played
    pub interpretation: Option<Interpretation>,
}

impl ComputerMoveReport {
    pub fn recovered(&self) -> bool {
        self.interpretation.is_none()
    }
}

/// Mutable state of one lesson attempt
#[derive(Debug, Clone)]
pub struct SessionState {
    pub session_id: Uuid,
    pub step_index: usize,
    pub position: Position,
    pub scorer: SessionScorer,
    pub last_computer_move: Option<ComputerMoveReport>,
    /// Advisory text shown to the learner, e.g. a hint
    pub last_feedback: Option<String>,
    pub phase: LessonPhase,
}

impl SessionState {
    pub fn new(position: Position, scorer: SessionScorer) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            step_index: 0,
            position,
            scorer,
            last_computer_move: None,
            last_feedback: None,
            phase: LessonPhase::NotStarted,
        }
    }

    /// Fresh state for a new attempt at the same lesson
    ///
    /// Gets a new session id; counters and the clock start over.
    pub fn restarted(&self, position: Position) -> Self {
        let mut scorer = self.scorer.clone();
        scorer.reset();
        Self::new(position, scorer)
    }

    /// Moves judged so far (correct + mistakes)
    pub fn moves_judged(&self) -> u32 {
        self.scorer.correct_moves() + self.scorer.mistakes()
    }
}
