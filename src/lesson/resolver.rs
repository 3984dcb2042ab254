//! Computer move resolution
//!
//! Lesson authors write computer replies in whatever notation comes to hand:
//! `"e5"`, `"Nf3!"`, `"e7e5"`, `"0-0"`. [`MoveResolver`] turns that text into
//! exactly one legal move by trying an ordered list of strategies:
//!
//! 1. [`NotationStrategy::Algebraic`] - SAN for the side to move, trailing
//!    `!`/`?` annotations ignored
//! 2. [`NotationStrategy::Coordinate`] - origin, destination, optional promotion
//!
//! Both strategies read a pawn move onto the last rank that names no piece
//! (`"h1"`, `"e7e8"`) as a queen promotion.
//! 3. Remap - look the text up in a [`RemapTable`] and retry 1-2 with the result
//!
//! If all fail the move is [`ResolveError::UnresolvableMove`]. What the caller
//! does then is its own policy; [`recovery_move`] offers a deterministic
//! replacement.

use crate::lesson::error::{ResolveError, ResolveResult};
use chess_logic_shared::{role_value, MoveDescriptor, MoveResult, Position, PromotionPiece};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// One way of reading move text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotationStrategy {
    Algebraic,
    Coordinate,
}

impl NotationStrategy {
    /// Strategies in the order they are tried
    pub const ORDER: [NotationStrategy; 2] =
        [NotationStrategy::Algebraic, NotationStrategy::Coordinate];

    /// Try to read `text` as a legal move in `position`
    pub fn attempt(self, text: &str, position: &Position) -> Option<(Position, MoveResult)> {
        let text = text.trim();
        match self {
            NotationStrategy::Algebraic => {
                let san = text.trim_end_matches(['!', '?']);
                if san.is_empty() {
                    return None;
                }
                position.apply_san(san).ok().or_else(|| {
                    queen_promotion_san(san).and_then(|promoted| position.apply_san(&promoted).ok())
                })
            }
            NotationStrategy::Coordinate => {
                if text.len() < 4 {
                    return None;
                }
                let desc = MoveDescriptor::parse_coordinate(text).ok()?;
                position.apply_move(&desc).ok().or_else(|| match desc.promotion {
                    None => position
                        .apply_move(&desc.with_promotion(PromotionPiece::Queen))
                        .ok(),
                    Some(_) => None,
                })
            }
        }
    }
}

/// `"h1"` -> `"h1=Q"` for pawn moves onto the last rank that name no piece
fn queen_promotion_san(san: &str) -> Option<String> {
    let core = san.trim_end_matches(['+', '#']);
    let pawn_move = core.starts_with(|c: char| ('a'..='h').contains(&c));
    let last_rank = core.ends_with(['1', '8']);
    (pawn_move && last_rank && !core.contains('=')).then(|| format!("{core}=Q"))
}

/// Which reading of the scripted text produced the move
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interpretation {
    Algebraic,
    Coordinate,
    /// The text was remapped to `alias`, which `via` then read
    Remap {
        alias: String,
        via: NotationStrategy,
    },
}

impl From<NotationStrategy> for Interpretation {
    fn from(strategy: NotationStrategy) -> Self {
        match strategy {
            NotationStrategy::Algebraic => Interpretation::Algebraic,
            NotationStrategy::Coordinate => Interpretation::Coordinate,
        }
    }
}

/// Explicit text-to-text aliases for notation the strategies do not accept
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemapTable {
    entries: BTreeMap<String, String>,
}

impl RemapTable {
    pub fn new(entries: BTreeMap<String, String>) -> Self {
        Self { entries }
    }

    /// Table with `overrides` layered on top of this one
    pub fn merged(&self, overrides: &BTreeMap<String, String>) -> Self {
        let mut entries = self.entries.clone();
        entries.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self { entries }
    }

    pub fn lookup(&self, text: &str) -> Option<&str> {
        self.entries.get(text.trim()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A scripted move turned into a legal one
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedMove {
    /// Position after the move
    pub position: Position,
    pub result: MoveResult,
    pub interpretation: Interpretation,
}

/// Resolves scripted computer moves against live positions
#[derive(Debug, Clone, Default)]
pub struct MoveResolver {
    remap: RemapTable,
}

impl MoveResolver {
    pub fn new(remap: RemapTable) -> Self {
        Self { remap }
    }

    pub fn remap(&self) -> &RemapTable {
        &self.remap
    }

    /// Resolve `scripted` for the side to move in `position`
    ///
    /// # Errors
    ///
    /// [`ResolveError::UnresolvableMove`] when no strategy yields a legal move.
    pub fn resolve(&self, scripted: &str, position: &Position) -> ResolveResult<ResolvedMove> {
        for strategy in NotationStrategy::ORDER {
            if let Some((next, result)) = strategy.attempt(scripted, position) {
                info!(
                    "[RESOLVER] '{}' resolved as {} via {:?}",
                    scripted, result.san, strategy
                );
                return Ok(ResolvedMove {
                    position: next,
                    result,
                    interpretation: strategy.into(),
                });
            }
            debug!("[RESOLVER] '{}' is not {:?}", scripted, strategy);
        }

        if let Some(alias) = self.remap.lookup(scripted) {
            for strategy in NotationStrategy::ORDER {
                if let Some((next, result)) = strategy.attempt(alias, position) {
                    info!(
                        "[RESOLVER] '{}' remapped to '{}', resolved as {} via {:?}",
                        scripted, alias, result.san, strategy
                    );
                    return Ok(ResolvedMove {
                        position: next,
                        result,
                        interpretation: Interpretation::Remap {
                            alias: alias.to_string(),
                            via: strategy,
                        },
                    });
                }
            }
        }

        Err(ResolveError::UnresolvableMove {
            text: scripted.to_string(),
            fen: position.to_fen(),
        })
    }
}

/// Pick one legal move deterministically, or `None` when there is none
///
/// Preference: checkmate, then the most valuable capture made by the
/// cheapest piece, then check, then a quiet move. Ties go to the
/// alphabetically first coordinate string.
pub fn recovery_move(position: &Position) -> Option<(Position, MoveResult)> {
    let best = position
        .legal_move_results()
        .into_iter()
        .min_by(|a, b| rank(b).cmp(&rank(a)).then_with(|| a.uci.cmp(&b.uci)))?;
    position.apply_move(&best.descriptor()).ok()
}

/// Higher is better
fn rank(result: &MoveResult) -> (u8, u32, i64) {
    let tier = if result.is_checkmate {
        3
    } else if result.is_capture() {
        2
    } else if result.is_check {
        1
    } else {
        0
    };
    let victim = result.captured.map(role_value).unwrap_or(0);
    let attacker = -i64::from(role_value(result.role));
    (tier, victim, attacker)
}

#[cfg(test)]
mod tests {
    use super::*;

    const AFTER_E4: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1";
    const AFTER_E4_E5: &str = "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq e6 0 2";

    fn after_e4() -> Position {
        Position::from_fen(AFTER_E4).unwrap()
    }

    #[test]
    fn test_algebraic_reply() {
        let resolved = MoveResolver::default().resolve("e5", &after_e4()).unwrap();
        assert_eq!(resolved.position.to_fen(), AFTER_E4_E5);
        assert_eq!(resolved.interpretation, Interpretation::Algebraic);
    }

    #[test]
    fn test_annotations_are_ignored() {
        let resolved = MoveResolver::default().resolve("e5!?", &after_e4()).unwrap();
        assert_eq!(resolved.position.to_fen(), AFTER_E4_E5);
    }

    #[test]
    fn test_coordinate_reply() {
        let resolved = MoveResolver::default().resolve("b8-c6", &after_e4()).unwrap();
        assert_eq!(resolved.result.san, "Nc6");
        assert_eq!(resolved.interpretation, Interpretation::Coordinate);
    }

    #[test]
    fn test_strategies_are_independent() {
        let pos = after_e4();
        assert!(NotationStrategy::Algebraic.attempt("Nc6", &pos).is_some());
        assert!(NotationStrategy::Coordinate.attempt("Nc6", &pos).is_none());
        assert!(NotationStrategy::Coordinate.attempt("g8f6", &pos).is_some());
        assert!(NotationStrategy::Coordinate.attempt("e5", &pos).is_none());
    }

    #[test]
    fn test_remap_retries_strategies() {
        let table = RemapTable::default().merged(
            &[("knight out".to_string(), "Nf6".to_string())]
                .into_iter()
                .collect(),
        );
        let resolved = MoveResolver::new(table).resolve("knight out", &after_e4()).unwrap();
        assert_eq!(resolved.result.uci, "g8f6");
        assert_eq!(
            resolved.interpretation,
            Interpretation::Remap {
                alias: "Nf6".to_string(),
                via: NotationStrategy::Algebraic,
            }
        );
    }

    #[test]
    fn test_lesson_aliases_override_defaults() {
        let base = RemapTable::new([("x".to_string(), "e5".to_string())].into_iter().collect());
        let merged = base.merged(&[("x".to_string(), "d5".to_string())].into_iter().collect());
        assert_eq!(merged.lookup("x"), Some("d5"));
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn test_unresolvable() {
        let err = MoveResolver::default().resolve("Qh5", &after_e4()).unwrap_err();
        assert_eq!(
            err,
            ResolveError::UnresolvableMove {
                text: "Qh5".to_string(),
                fen: AFTER_E4.to_string(),
            }
        );
    }

    #[test]
    fn test_resolved_position_is_one_legal_move_away() {
        let pos = after_e4();
        let resolver = MoveResolver::default();
        for text in ["e5", "c7c5", "Nf6", "d6"] {
            let resolved = resolver.resolve(text, &pos).unwrap();
            let replay = pos.apply_move(&resolved.result.descriptor()).unwrap().0;
            assert_eq!(replay, resolved.position, "{text}");
        }
    }

    #[test]
    fn test_bare_promotion_defaults_to_queen() {
        let black = Position::from_fen("4k3/8/8/8/8/2n5/7p/3RK3 b - - 0 1").unwrap();
        let resolver = MoveResolver::default();
        for text in ["h2h1", "h1", "h1=Q"] {
            let resolved = resolver.resolve(text, &black).unwrap();
            assert_eq!(resolved.result.uci, "h2h1q", "{text}");
        }

        let white = Position::from_fen("8/4P3/8/8/8/8/k7/4K3 w - - 0 1").unwrap();
        let resolved = resolver.resolve("e7e8", &white).unwrap();
        assert_eq!(resolved.result.uci, "e7e8q");
        assert_eq!(resolved.result.promotion, Some(PromotionPiece::Queen));
    }

    #[test]
    fn test_named_underpromotion_is_kept() {
        let white = Position::from_fen("8/4P3/8/8/8/8/k7/4K3 w - - 0 1").unwrap();
        let resolved = MoveResolver::default().resolve("e7e8n", &white).unwrap();
        assert_eq!(resolved.result.uci, "e7e8n");
    }

    #[test]
    fn test_recovery_prefers_mate() {
        // Scholar's mate available: Qxf7#
        let pos = Position::from_fen(
            "r1bqkb1r/pppp1ppp/2n2n2/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR w KQkq - 4 4",
        )
        .unwrap();
        let (next, result) = recovery_move(&pos).unwrap();
        assert_eq!(result.uci, "h5f7");
        assert!(next.is_checkmate());
    }

    #[test]
    fn test_recovery_prefers_valuable_capture() {
        // Pawn and knight can both take the queen; the pawn is cheaper
        let pos = Position::from_fen("4k3/8/8/3q4/4P3/2N5/8/4K3 w - - 0 1").unwrap();
        let (_, result) = recovery_move(&pos).unwrap();
        assert_eq!(result.uci, "e4d5");
    }

    #[test]
    fn test_recovery_is_deterministic_and_none_when_stuck() {
        let start = Position::starting();
        let first = recovery_move(&start).unwrap().1;
        let second = recovery_move(&start).unwrap().1;
        assert_eq!(first, second);
        assert_eq!(first.uci, "a2a3", "quiet moves fall back to coordinate order");

        let mated = Position::from_fen("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3")
            .unwrap();
        assert!(recovery_move(&mated).is_none());
    }
}
