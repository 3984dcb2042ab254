//! Session scoring
//!
//! Tracks correct moves and mistakes for one lesson attempt and turns them into
//! a [`SessionSummary`]: success rate, a recommended difficulty for the next
//! lesson, and a short feedback message.
//!
//! # Difficulty Adaptation
//!
//! | Success rate              | Next difficulty |
//! |---------------------------|-----------------|
//! | above `promote_above`     | one level up    |
//! | below `demote_below`      | one level down  |
//! | otherwise                 | unchanged       |
//!
//! Thresholds default to 0.8 / 0.5 and can be overridden per lesson.

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Computer-opponent strength on a 1-10 scale
///
/// Out-of-range values in lesson files are clamped on load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub struct Difficulty(u8);

impl Difficulty {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;

    /// Create a difficulty, clamped to the supported range
    pub fn new(level: u8) -> Self {
        Self(level.clamp(Self::MIN, Self::MAX))
    }

    pub fn level(self) -> u8 {
        self.0
    }

    pub fn harder(self) -> Self {
        Self::new(self.0.saturating_add(1))
    }

    pub fn easier(self) -> Self {
        Self::new(self.0.saturating_sub(1))
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Self(3)
    }
}

impl From<u8> for Difficulty {
    fn from(level: u8) -> Self {
        Self::new(level)
    }
}

impl From<Difficulty> for u8 {
    fn from(difficulty: Difficulty) -> Self {
        difficulty.0
    }
}

/// Success-rate thresholds for difficulty adaptation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScoringThresholds {
    pub promote_above: f64,
    pub demote_below: f64,
}

impl Default for ScoringThresholds {
    fn default() -> Self {
        Self {
            promote_above: 0.8,
            demote_below: 0.5,
        }
    }
}

/// What a learner must achieve for the lesson to count as passed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SuccessCriteria {
    pub min_correct_moves: u32,
    pub max_mistakes: u32,
    /// Finishing within this many seconds earns a time bonus
    pub time_bonus: Option<u64>,
}

impl Default for SuccessCriteria {
    fn default() -> Self {
        Self {
            min_correct_moves: 1,
            max_mistakes: 3,
            time_bonus: None,
        }
    }
}

/// Final (or interim) performance report for a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub correct_moves: u32,
    pub mistakes: u32,
    pub success_rate: f64,
    pub recommended_next_difficulty: Difficulty,
    pub feedback_message: String,
    pub passed: bool,
    pub time_bonus_earned: bool,
    pub elapsed_seconds: u64,
}

/// Correct-move / mistake counters for one lesson attempt
///
/// Counters only ever grow until [`SessionScorer::reset`].
#[derive(Debug, Clone)]
pub struct SessionScorer {
    correct_moves: u32,
    mistakes: u32,
    base_difficulty: Difficulty,
    thresholds: ScoringThresholds,
    criteria: SuccessCriteria,
    started_at: Instant,
}

impl SessionScorer {
    pub fn new(
        base_difficulty: Difficulty,
        thresholds: ScoringThresholds,
        criteria: SuccessCriteria,
    ) -> Self {
        Self {
            correct_moves: 0,
            mistakes: 0,
            base_difficulty,
            thresholds,
            criteria,
            started_at: Instant::now(),
        }
    }

    pub fn record_move(&mut self, correct: bool) {
        if correct {
            self.correct_moves = self.correct_moves.saturating_add(1);
        } else {
            self.mistakes = self.mistakes.saturating_add(1);
        }
    }

    pub fn correct_moves(&self) -> u32 {
        self.correct_moves
    }

    pub fn mistakes(&self) -> u32 {
        self.mistakes
    }

    /// `correct / (correct + mistakes)`, or 0.0 when nothing was recorded
    pub fn success_rate(&self) -> f64 {
        let total = self.correct_moves + self.mistakes;
        if total == 0 {
            return 0.0;
        }
        if self.mistakes == 0 {
            return 1.0;
        }
        f64::from(self.correct_moves) / f64::from(total)
    }

    /// Difficulty for the next lesson
    ///
    /// With nothing recorded there is no evidence either way, so the base
    /// difficulty is kept.
    pub fn recommended_difficulty(&self) -> Difficulty {
        if self.correct_moves + self.mistakes == 0 {
            return self.base_difficulty;
        }

        let rate = self.success_rate();
        if rate > self.thresholds.promote_above {
            self.base_difficulty.harder()
        } else if rate < self.thresholds.demote_below {
            self.base_difficulty.easier()
        } else {
            self.base_difficulty
        }
    }

    pub fn passed(&self) -> bool {
        self.correct_moves >= self.criteria.min_correct_moves
            && self.mistakes <= self.criteria.max_mistakes
    }

    pub fn summary(&self) -> SessionSummary {
        let elapsed = self.started_at.elapsed().as_secs();
        let passed = self.passed();
        let time_bonus_earned = passed
            && self
                .criteria
                .time_bonus
                .is_some_and(|limit| elapsed <= limit);

        SessionSummary {
            correct_moves: self.correct_moves,
            mistakes: self.mistakes,
            success_rate: self.success_rate(),
            recommended_next_difficulty: self.recommended_difficulty(),
            feedback_message: self.feedback_message(),
            passed,
            time_bonus_earned,
            elapsed_seconds: elapsed,
        }
    }

    /// Clear counters and restart the clock
    pub fn reset(&mut self) {
        self.correct_moves = 0;
        self.mistakes = 0;
        self.started_at = Instant::now();
    }

    fn feedback_message(&self) -> String {
        if self.correct_moves + self.mistakes == 0 {
            return "No moves were played in this lesson.".to_string();
        }

        let rate = self.success_rate();
        let message = if rate >= 0.9 {
            "Excellent! You found almost every move."
        } else if rate >= 0.7 {
            "Good work. A few slips, but the ideas are sinking in."
        } else if rate >= 0.5 {
            "Decent effort. Review the highlighted ideas and try again."
        } else {
            "This one was tough. Replay the lesson and follow the hints."
        };
        message.to_string()
    }
}
