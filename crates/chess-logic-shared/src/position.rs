//! Immutable position snapshots
//!
//! [`Position`] wraps a `shakmaty::Chess` value. The lesson engine owns one
//! position at a time and replaces it wholesale after each move; every other
//! consumer receives a clone.

use crate::error::{RulesError, RulesResult};
use crate::moves::{MoveDescriptor, MoveResult, PromotionPiece};
use shakmaty::fen::Fen;
use shakmaty::san::{San, SanPlus};
use shakmaty::uci::UciMove;
use shakmaty::{
    CastlingMode, Chess, Color, EnPassantMode, Move, Piece, Position as _, Role, Square,
};
use std::fmt;
use std::str::FromStr;

/// A complete board state including side to move, castling and en passant rights
#[derive(Debug, Clone)]
pub struct Position {
    chess: Chess,
}

impl Position {
    /// Standard starting position
    pub fn starting() -> Self {
        Self {
            chess: Chess::default(),
        }
    }

    /// Parse a 6-field FEN string
    pub fn from_fen(fen: &str) -> RulesResult<Self> {
        let invalid = |message: String| RulesError::InvalidFen {
            fen: fen.to_string(),
            message,
        };

        let parsed: Fen = fen.trim().parse().map_err(|e| invalid(format!("{e}")))?;
        let chess: Chess = parsed
            .into_position(CastlingMode::Standard)
            .map_err(|e| invalid(format!("{e}")))?;

        Ok(Self { chess })
    }

    /// Serialize to FEN
    ///
    /// The en passant square is written after every double pawn push, whether
    /// or not a capture is actually available.
    pub fn to_fen(&self) -> String {
        Fen::from_position(self.chess.clone(), EnPassantMode::Always).to_string()
    }

    pub fn turn(&self) -> Color {
        self.chess.turn()
    }

    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.chess.board().piece_at(square)
    }

    pub fn is_check(&self) -> bool {
        self.chess.is_check()
    }

    pub fn is_checkmate(&self) -> bool {
        self.chess.is_checkmate()
    }

    pub fn is_game_over(&self) -> bool {
        self.chess.is_game_over()
    }

    /// Legal moves for the side to move, optionally restricted to one origin square
    pub fn legal_moves(&self, from: Option<Square>) -> Vec<MoveDescriptor> {
        self.chess
            .legal_moves()
            .iter()
            .filter_map(descriptor_of)
            .filter(|desc| from.map_or(true, |sq| desc.from == sq))
            .collect()
    }

    /// Every legal move together with the result of playing it
    pub fn legal_move_results(&self) -> Vec<MoveResult> {
        self.chess
            .legal_moves()
            .iter()
            .filter_map(|m| self.play(m).map(|(_, result)| result))
            .collect()
    }

    /// Apply a move described by squares
    ///
    /// The promotion piece must be given explicitly for promotions; no piece is
    /// chosen on the caller's behalf.
    ///
    /// # Errors
    ///
    /// [`RulesError::IllegalMove`] when no legal move matches the descriptor.
    pub fn apply_move(&self, desc: &MoveDescriptor) -> RulesResult<(Position, MoveResult)> {
        let legal = self.chess.legal_moves();
        let found = legal
            .iter()
            .find(|m| descriptor_of(m).as_ref() == Some(desc))
            .ok_or_else(|| self.illegal(desc.to_string()))?;

        self.play(found)
            .ok_or_else(|| self.illegal(desc.to_string()))
    }

    /// Apply a move in standard algebraic notation for the side to move
    ///
    /// # Errors
    ///
    /// [`RulesError::InvalidMoveText`] when the text is not SAN,
    /// [`RulesError::IllegalMove`] when it is SAN but not playable here.
    pub fn apply_san(&self, text: &str) -> RulesResult<(Position, MoveResult)> {
        let san: SanPlus = text.trim().parse().map_err(|_| RulesError::InvalidMoveText {
            text: text.to_string(),
        })?;
        let m = san
            .san
            .to_move(&self.chess)
            .map_err(|_| self.illegal(text.to_string()))?;

        self.play(&m).ok_or_else(|| self.illegal(text.to_string()))
    }

    /// Apply a move in coordinate notation (`e2e4`, `e7e8q`)
    pub fn apply_coordinate(&self, text: &str) -> RulesResult<(Position, MoveResult)> {
        let desc = MoveDescriptor::parse_coordinate(text)?;
        self.apply_move(&desc)
    }

    /// Play a move known to be in the legal move list
    fn play(&self, m: &Move) -> Option<(Position, MoveResult)> {
        if !self.chess.is_legal(m) {
            return None;
        }

        let desc = descriptor_of(m)?;
        let san = San::from_move(&self.chess, m);

        let mut next = self.chess.clone();
        next.play_unchecked(m);

        let is_checkmate = next.is_checkmate();
        let is_check = next.is_check();
        let suffix = if is_checkmate {
            "#"
        } else if is_check {
            "+"
        } else {
            ""
        };

        let capture_square = match m {
            Move::EnPassant { from, to } => Some(Square::from_coords(to.file(), from.rank())),
            _ if m.is_capture() => Some(desc.to),
            _ => None,
        };

        let result = MoveResult {
            from: desc.from,
            to: desc.to,
            promotion: desc.promotion,
            role: m.role(),
            captured: m.capture(),
            capture_square,
            san: format!("{san}{suffix}"),
            uci: desc.to_string(),
            is_check,
            is_checkmate,
            is_castle: m.is_castle(),
        };

        Some((Position { chess: next }, result))
    }

    fn illegal(&self, notation: String) -> RulesError {
        RulesError::IllegalMove {
            notation,
            fen: self.to_fen(),
        }
    }
}

/// Coordinate descriptor of a shakmaty move, king-destination style for castling
fn descriptor_of(m: &Move) -> Option<MoveDescriptor> {
    match UciMove::from_move(m, CastlingMode::Standard) {
        UciMove::Normal {
            from,
            to,
            promotion,
        } => Some(MoveDescriptor {
            from,
            to,
            promotion: promotion.and_then(PromotionPiece::from_role),
        }),
        _ => None,
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::starting()
    }
}

impl PartialEq for Position {
    fn eq(&self, other: &Self) -> bool {
        self.to_fen() == other.to_fen()
    }
}

impl Eq for Position {}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_fen())
    }
}

impl FromStr for Position {
    type Err = RulesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_fen(s)
    }
}

/// Conventional material value, used for ranking captures
pub fn role_value(role: Role) -> u32 {
    match role {
        Role::Pawn => 1,
        Role::Knight | Role::Bishop => 3,
        Role::Rook => 5,
        Role::Queen => 9,
        Role::King => 100,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AFTER_E4: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1";

    #[test]
    fn test_starting_position_fen() {
        let pos = Position::starting();
        assert_eq!(
            pos.to_fen(),
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"
        );
        assert_eq!(pos.turn(), Color::White);
        assert_eq!(pos.legal_moves(None).len(), 20);
    }

    #[test]
    fn test_apply_move_returns_new_snapshot() {
        //! The original position is left untouched
        let start = Position::starting();
        let (next, result) = start
            .apply_move(&MoveDescriptor::new(Square::E2, Square::E4))
            .unwrap();

        assert_eq!(next.to_fen(), AFTER_E4);
        assert_eq!(start, Position::starting());
        assert_eq!(result.san, "e4");
        assert_eq!(result.uci, "e2e4");
        assert_eq!(result.role, Role::Pawn);
        assert!(!result.is_capture());
    }

    #[test]
    fn test_illegal_move_is_reported() {
        let start = Position::starting();
        let err = start
            .apply_move(&MoveDescriptor::new(Square::E2, Square::E5))
            .unwrap_err();
        assert!(matches!(err, RulesError::IllegalMove { .. }));
    }

    #[test]
    fn test_san_reply_after_e4() {
        let pos = Position::from_fen(AFTER_E4).unwrap();
        let (next, result) = pos.apply_san("e5").unwrap();
        assert_eq!(
            next.to_fen(),
            "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq e6 0 2"
        );
        assert_eq!(result.uci, "e7e5");
    }

    #[test]
    fn test_legal_moves_filtered_by_origin() {
        let pos = Position::starting();
        let knight = pos.legal_moves(Some(Square::G1));
        assert_eq!(knight.len(), 2);
        assert!(knight.iter().all(|m| m.from == Square::G1));
    }

    #[test]
    fn test_castling_uses_king_destination() {
        let pos = Position::from_fen("r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R3K2R w KQkq - 0 1").unwrap();
        let (_, result) = pos.apply_coordinate("e1g1").unwrap();
        assert!(result.is_castle);
        assert_eq!(result.san, "O-O");
        assert_eq!(result.to, Square::G1);
    }

    #[test]
    fn test_en_passant_capture_square() {
        let pos =
            Position::from_fen("rnbqkbnr/pppp1ppp/8/4pP2/8/8/PPPPP1PP/RNBQKBNR w KQkq e6 0 3")
                .unwrap();
        let (_, result) = pos.apply_coordinate("f5e6").unwrap();
        assert_eq!(result.captured, Some(Role::Pawn));
        assert_eq!(result.capture_square, Some(Square::E5));
    }

    #[test]
    fn test_promotion_requires_piece() {
        let pos = Position::from_fen("8/P7/8/8/8/8/8/4K2k w - - 0 1").unwrap();
        assert!(pos
            .apply_move(&MoveDescriptor::new(Square::A7, Square::A8))
            .is_err());

        let (_, result) = pos.apply_coordinate("a7a8q").unwrap();
        assert_eq!(result.promotion, Some(PromotionPiece::Queen));
        assert_eq!(result.san, "a8=Q+");
    }

    #[test]
    fn test_checkmate_flags() {
        let pos = Position::from_fen("rnbqkbnr/pppp1ppp/8/4p3/6P1/5P2/PPPPP2P/RNBQKBNR b KQkq - 0 2")
            .unwrap();
        let (next, result) = pos.apply_san("Qh4#").unwrap();
        assert!(result.is_checkmate);
        assert_eq!(result.san, "Qh4#");
        assert!(next.is_game_over());
    }

    #[test]
    fn test_invalid_fen() {
        assert!(matches!(
            Position::from_fen("not a fen"),
            Err(RulesError::InvalidFen { .. })
        ));
    }
}
