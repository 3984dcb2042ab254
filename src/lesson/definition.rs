//! Lesson content model
//!
//! A [`LessonDefinition`] is authored JSON: an initial position, an ordered list
//! of [`Step`]s and the criteria used to score an attempt. It is read-only to
//! the engine.
//!
//! # JSON Shape
//!
//! ```json
//! {
//!   "id": "open-center",
//!   "title": "Claim the center",
//!   "computerStrength": 3,
//!   "successCriteria": { "minCorrectMoves": 2, "maxMistakes": 3, "timeBonus": 120 },
//!   "steps": [
//!     { "id": "first", "kind": "user-move", "allowedMoves": ["e2e4", "d2d4"],
//!       "arrows": ["e2e4"], "tooltip": "Take the center" },
//!     { "id": "reply", "kind": "computer-move", "computerMove": "e5" },
//!     { "id": "why", "kind": "explanation", "text": "...", "timeLimitSeconds": 5 },
//!     { "id": "plan", "kind": "choice", "choices": [
//!         { "text": "Develop", "nextStepId": "develop", "explanation": "..." } ] }
//!   ]
//! }
//! ```

use crate::core::error::{CoreError, CoreResult};
use crate::lesson::scoring::{Difficulty, ScoringThresholds, SuccessCriteria};
use chess_logic_shared::{MoveDescriptor, Position, RulesResult, Square};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// FEN of the standard starting position
pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

fn default_fen() -> String {
    STARTING_FEN.to_string()
}

/// A complete authored lesson
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonDefinition {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_fen")]
    pub initial_fen: String,
    /// Default strength of the computer opponent for this lesson
    #[serde(default)]
    pub computer_strength: Difficulty,
    #[serde(default)]
    pub objectives: Vec<String>,
    #[serde(default)]
    pub success_criteria: SuccessCriteria,
    /// Overrides the configured difficulty thresholds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scoring: Option<ScoringThresholds>,
    /// Lesson-specific entries for the computer-move remap table
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub move_aliases: BTreeMap<String, String>,
    pub steps: Vec<Step>,
}

impl LessonDefinition {
    pub fn from_json(json: &str) -> CoreResult<Self> {
        let lesson: Self = serde_json::from_str(json)?;
        if lesson.steps.is_empty() {
            return Err(CoreError::InvalidLesson {
                lesson_id: lesson.id,
                message: "lesson has no steps".to_string(),
            });
        }
        Ok(lesson)
    }

    pub fn initial_position(&self) -> RulesResult<Position> {
        Position::from_fen(&self.initial_fen)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    /// Index of the step with the given id
    pub fn index_of(&self, step_id: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.id == step_id)
    }

    /// Thresholds to score this lesson with
    pub fn thresholds(&self, configured: ScoringThresholds) -> ScoringThresholds {
        self.scoring.unwrap_or(configured)
    }
}

/// One node of the lesson graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub id: String,
    #[serde(flatten)]
    pub guidance: Guidance,
    /// Continue at this step instead of the next one in order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_step_id: Option<String>,
    #[serde(flatten)]
    pub action: StepAction,
}

impl Step {
    pub fn kind(&self) -> StepKind {
        match self.action {
            StepAction::UserMove { .. } => StepKind::UserMove,
            StepAction::ComputerMove { .. } => StepKind::ComputerMove,
            StepAction::Explanation { .. } => StepKind::Explanation,
            StepAction::Choice { .. } => StepKind::Choice,
        }
    }

    /// Auto-advance timer, for the step kinds that have one
    pub fn time_limit(&self) -> Option<Duration> {
        match self.action {
            StepAction::Explanation {
                time_limit_seconds, ..
            }
            | StepAction::Choice {
                time_limit_seconds, ..
            } => time_limit_seconds.map(Duration::from_secs),
            _ => None,
        }
    }
}

/// Advisory visuals for a step; never affects legality
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guidance {
    /// Arrows in coordinate form, e.g. `"e2e4"`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arrows: Vec<String>,
    /// Square names, e.g. `"e4"`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub highlights: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
}

impl Guidance {
    /// Highlight squares that parse; malformed entries are skipped
    pub fn highlight_squares(&self) -> Vec<Square> {
        self.highlights
            .iter()
            .filter_map(|s| s.trim().parse().ok())
            .collect()
    }

    /// Arrow endpoints that parse; malformed entries are skipped
    pub fn arrow_pairs(&self) -> Vec<(Square, Square)> {
        self.arrows
            .iter()
            .filter_map(|a| MoveDescriptor::parse_coordinate(a).ok())
            .map(|m| (m.from, m.to))
            .collect()
    }
}

/// Per-kind behaviour of a step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum StepAction {
    UserMove {
        /// Whitelist of accepted moves; absent or empty means any legal move
        #[serde(default, skip_serializing_if = "Option::is_none")]
        allowed_moves: Option<Vec<String>>,
        /// Legal moves the lesson excludes on purpose
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        blocked_moves: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hint: Option<String>,
    },
    ComputerMove {
        /// SAN or coordinate notation
        computer_move: String,
    },
    Explanation {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        time_limit_seconds: Option<u64>,
    },
    Choice {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prompt: Option<String>,
        choices: Vec<ChoiceOption>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        time_limit_seconds: Option<u64>,
    },
}

/// Step kind without its payload, for logging and matching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    UserMove,
    ComputerMove,
    Explanation,
    Choice,
}

/// One branch offered by a choice step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceOption {
    pub text: String,
    pub next_step_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const LESSON: &str = r#"{
        "id": "demo",
        "title": "Demo",
        "computerStrength": 4,
        "successCriteria": { "minCorrectMoves": 1, "maxMistakes": 2 },
        "steps": [
            { "id": "a", "kind": "user-move", "allowedMoves": ["e2e4"],
              "arrows": ["e2e4", "bogus"], "highlights": ["e4", "z9"], "tooltip": "Push" },
            { "id": "b", "kind": "computer-move", "computerMove": "e5" },
            { "id": "c", "kind": "explanation", "text": "Center!", "timeLimitSeconds": 5 },
            { "id": "d", "kind": "choice", "nextStepId": "a", "choices": [
                { "text": "Again", "nextStepId": "a", "explanation": "Once more" } ] }
        ]
    }"#;

    #[test]
    fn test_parse_lesson() {
        let lesson = LessonDefinition::from_json(LESSON).unwrap();
        assert_eq!(lesson.len(), 4);
        assert_eq!(lesson.initial_fen, STARTING_FEN);
        assert_eq!(lesson.computer_strength, Difficulty::new(4));
        assert_eq!(lesson.success_criteria.max_mistakes, 2);

        let kinds: Vec<_> = lesson.steps.iter().map(Step::kind).collect();
        assert_eq!(
            kinds,
            [
                StepKind::UserMove,
                StepKind::ComputerMove,
                StepKind::Explanation,
                StepKind::Choice
            ]
        );

        assert_eq!(
            lesson.steps[0].action,
            StepAction::UserMove {
                allowed_moves: Some(vec!["e2e4".to_string()]),
                blocked_moves: vec![],
                hint: None,
            }
        );
        assert_eq!(lesson.steps[3].next_step_id.as_deref(), Some("a"));
        assert_eq!(lesson.index_of("c"), Some(2));
        assert_eq!(lesson.index_of("zz"), None);
    }

    #[test]
    fn test_guidance_skips_malformed_entries() {
        let lesson = LessonDefinition::from_json(LESSON).unwrap();
        let guidance = &lesson.steps[0].guidance;
        assert_eq!(guidance.highlight_squares(), vec![Square::E4]);
        assert_eq!(guidance.arrow_pairs(), vec![(Square::E2, Square::E4)]);
        assert_eq!(guidance.tooltip.as_deref(), Some("Push"));
    }

    #[test]
    fn test_time_limit_only_for_timed_kinds() {
        let lesson = LessonDefinition::from_json(LESSON).unwrap();
        assert_eq!(lesson.steps[0].time_limit(), None);
        assert_eq!(lesson.steps[2].time_limit(), Some(Duration::from_secs(5)));
        assert_eq!(lesson.steps[3].time_limit(), None);
    }

    #[test]
    fn test_serialize_round_trip_keeps_kind_tag() {
        let lesson = LessonDefinition::from_json(LESSON).unwrap();
        let json = serde_json::to_string(&lesson).unwrap();
        assert!(json.contains(r#""kind":"computer-move""#));
        assert!(json.contains(r#""computerMove":"e5""#));
        assert_eq!(LessonDefinition::from_json(&json).unwrap(), lesson);
    }

    #[test]
    fn test_empty_lesson_is_rejected() {
        let err = LessonDefinition::from_json(r#"{ "id": "x", "title": "X", "steps": [] }"#)
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidLesson { .. }));
    }
}
