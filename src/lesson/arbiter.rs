//! Move arbitration - pure classification of a learner's move attempt
//!
//! Decides whether an attempted move satisfies the current user-move step,
//! before the rules adapter ever sees it. Nothing here mutates state; the
//! state machine acts on the returned [`Verdict`].
//!
//! # Rules
//!
//! 1. Pawn moves to the last rank without a promotion piece promote to a
//!    queen, unless a whitelisted move for the same squares names a piece
//! 2. A move listed in `blockedMoves` is [`Verdict::Blocked`]
//! 3. Without a whitelist (absent or empty) the move is [`Verdict::Allowed`];
//!    legality is checked later by the rules adapter
//! 4. With a whitelist: exact match is allowed, a whitelisted origin square
//!    earns a [`Verdict::Hint`], anything else is [`Verdict::WrongPiece`]
//!
//! Whitelist and blocklist entries are coordinate strings (`e2e4`) or SAN
//! resolved against the live position (`Nf3`). Entries that are neither are
//! ignored.

use crate::lesson::definition::{Step, StepAction};
use chess_logic_shared::{Color, MoveDescriptor, Position, PromotionPiece, Role, Square};
use tracing::debug;

/// Outcome of classifying one move attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Acceptable; carries the normalized move to hand to the rules adapter
    Allowed(MoveDescriptor),
    /// Right piece, wrong destination
    Hint,
    /// Excluded by the lesson
    Blocked,
    /// A piece the lesson does not want moved
    WrongPiece,
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allowed(_))
    }
}

/// Classify `attempt` against `step` in `position`
///
/// Steps that do not expect a user move block every attempt.
pub fn classify(attempt: &MoveDescriptor, step: &Step, position: &Position) -> Verdict {
    let StepAction::UserMove {
        allowed_moves,
        blocked_moves,
        ..
    } = &step.action
    else {
        return Verdict::Blocked;
    };

    let whitelist = allowed_moves
        .as_deref()
        .map(|entries| resolve_entries(entries, position))
        .unwrap_or_default();
    let restricted = allowed_moves.as_ref().is_some_and(|entries| !entries.is_empty());
    let blocklist = resolve_entries(blocked_moves, position);

    let attempt = normalize_promotion(attempt, &whitelist, position);

    if blocklist.iter().any(|entry| matches_entry(entry, &attempt)) {
        return Verdict::Blocked;
    }

    if !restricted {
        return Verdict::Allowed(attempt);
    }

    if whitelist.iter().any(|entry| matches_entry(entry, &attempt)) {
        Verdict::Allowed(attempt)
    } else if whitelist.iter().any(|entry| entry.from == attempt.from) {
        Verdict::Hint
    } else {
        Verdict::WrongPiece
    }
}

/// Turn authored move strings into descriptors for `position`
pub fn resolve_entries(entries: &[String], position: &Position) -> Vec<MoveDescriptor> {
    entries
        .iter()
        .filter_map(|entry| resolve_entry(entry, position))
        .collect()
}

fn resolve_entry(entry: &str, position: &Position) -> Option<MoveDescriptor> {
    if let Ok(desc) = MoveDescriptor::parse_coordinate(entry) {
        return Some(desc);
    }
    match position.apply_san(entry) {
        Ok((_, result)) => Some(result.descriptor()),
        Err(e) => {
            debug!("[LESSON] Ignoring move entry '{}': {}", entry, e);
            None
        }
    }
}

/// An entry without a promotion piece accepts any promotion on its squares
fn matches_entry(entry: &MoveDescriptor, attempt: &MoveDescriptor) -> bool {
    entry.same_squares(attempt) && (entry.promotion.is_none() || entry.promotion == attempt.promotion)
}

fn normalize_promotion(
    attempt: &MoveDescriptor,
    whitelist: &[MoveDescriptor],
    position: &Position,
) -> MoveDescriptor {
    if attempt.promotion.is_some() || !is_promotion_square(attempt, position) {
        return *attempt;
    }

    let piece = whitelist
        .iter()
        .filter(|entry| entry.same_squares(attempt))
        .find_map(|entry| entry.promotion)
        .unwrap_or(PromotionPiece::Queen);

    attempt.with_promotion(piece)
}

fn is_promotion_square(attempt: &MoveDescriptor, position: &Position) -> bool {
    let Some(piece) = position.piece_at(attempt.from) else {
        return false;
    };
    if piece.role != Role::Pawn {
        return false;
    }

    let last_rank = match piece.color {
        Color::White => Square::A8.rank(),
        Color::Black => Square::A1.rank(),
    };
    attempt.to.rank() == last_rank
}
