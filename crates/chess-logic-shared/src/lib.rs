//! Shared chess logic for XFChess lessons
//!
//! Thin adapter over `shakmaty` that the lesson engine treats as its rules
//! engine. Everything here works on immutable [`Position`] snapshots: applying
//! a move returns a new position and never touches the old one.
//!
//! # Contract
//!
//! - Positions round-trip through the standard 6-field FEN format
//! - Moves are described as `{from, to, promotion?}` ([`MoveDescriptor`])
//! - A move that is not legal in a position fails with [`RulesError::IllegalMove`],
//!   never with a placeholder result

pub mod error;
pub mod moves;
pub mod position;

pub use error::{RulesError, RulesResult};
pub use moves::{MoveDescriptor, MoveResult, PromotionPiece};
pub use position::{role_value, Position};

pub use shakmaty::{Color, Piece, Role, Square};
