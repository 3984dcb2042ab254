//! Move descriptors and move results
//!
//! A [`MoveDescriptor`] is what the board renderer hands us: an origin, a
//! destination and an optional promotion piece. A [`MoveResult`] is what the
//! adapter hands back after a move was applied, with enough detail for
//! animations (captured square, castling) and for display (SAN).

use crate::error::{RulesError, RulesResult};
use shakmaty::{Role, Square};
use std::fmt;

/// Piece a pawn may promote to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromotionPiece {
    Queen,
    Rook,
    Bishop,
    Knight,
}

impl PromotionPiece {
    /// Parse the lowercase or uppercase letter used in coordinate notation
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'q' => Some(Self::Queen),
            'r' => Some(Self::Rook),
            'b' => Some(Self::Bishop),
            'n' => Some(Self::Knight),
            _ => None,
        }
    }

    pub fn char(self) -> char {
        match self {
            Self::Queen => 'q',
            Self::Rook => 'r',
            Self::Bishop => 'b',
            Self::Knight => 'n',
        }
    }

    pub fn role(self) -> Role {
        match self {
            Self::Queen => Role::Queen,
            Self::Rook => Role::Rook,
            Self::Bishop => Role::Bishop,
            Self::Knight => Role::Knight,
        }
    }

    pub fn from_role(role: Role) -> Option<Self> {
        match role {
            Role::Queen => Some(Self::Queen),
            Role::Rook => Some(Self::Rook),
            Role::Bishop => Some(Self::Bishop),
            Role::Knight => Some(Self::Knight),
            _ => None,
        }
    }
}

/// A raw move attempt: origin, destination and optional promotion
///
/// Castling is described by the king's own move (`e1g1`), the way a player
/// drags the king on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MoveDescriptor {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<PromotionPiece>,
}

impl MoveDescriptor {
    pub fn new(from: Square, to: Square) -> Self {
        Self {
            from,
            to,
            promotion: None,
        }
    }

    pub fn with_promotion(mut self, piece: PromotionPiece) -> Self {
        self.promotion = Some(piece);
        self
    }

    /// Parse coordinate notation: `e2e4`, `e7e8q`, or `e2-e4`
    ///
    /// # Errors
    ///
    /// Returns [`RulesError::InvalidMoveText`] when the text is not two squares
    /// followed by an optional promotion letter.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let mv = MoveDescriptor::parse_coordinate("e7e8q")?;
    /// assert_eq!(mv.promotion, Some(PromotionPiece::Queen));
    /// ```
    pub fn parse_coordinate(text: &str) -> RulesResult<Self> {
        let invalid = || RulesError::InvalidMoveText {
            text: text.to_string(),
        };

        let cleaned: String = text
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| *c != '-')
            .collect();

        if !(4..=5).contains(&cleaned.len()) || !cleaned.is_ascii() {
            return Err(invalid());
        }

        let from: Square = cleaned[0..2].parse().map_err(|_| invalid())?;
        let to: Square = cleaned[2..4].parse().map_err(|_| invalid())?;
        let promotion = match cleaned.chars().nth(4) {
            Some(c) => Some(PromotionPiece::from_char(c).ok_or_else(invalid)?),
            None => None,
        };

        Ok(Self {
            from,
            to,
            promotion,
        })
    }

    /// Same origin and destination, ignoring the promotion piece
    pub fn same_squares(&self, other: &MoveDescriptor) -> bool {
        self.from == other.from && self.to == other.to
    }
}

impl fmt::Display for MoveDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(piece) = self.promotion {
            write!(f, "{}", piece.char())?;
        }
        Ok(())
    }
}

/// Details of a move that was applied to a position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveResult {
    /// Origin square (king origin for castling)
    pub from: Square,
    /// Destination square (king destination for castling)
    pub to: Square,
    pub promotion: Option<PromotionPiece>,
    /// Role of the piece that moved
    pub role: Role,
    /// Role of the captured piece, if any
    pub captured: Option<Role>,
    /// Square the captured piece stood on (differs from `to` for en passant)
    pub capture_square: Option<Square>,
    /// Standard algebraic notation, with check/mate suffix
    pub san: String,
    /// Coordinate notation
    pub uci: String,
    pub is_check: bool,
    pub is_checkmate: bool,
    pub is_castle: bool,
}

impl MoveResult {
    pub fn descriptor(&self) -> MoveDescriptor {
        MoveDescriptor {
            from: self.from,
            to: self.to,
            promotion: self.promotion,
        }
    }

    pub fn is_capture(&self) -> bool {
        self.captured.is_some()
    }
}
