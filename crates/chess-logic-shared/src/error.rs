//! Error types for the rules adapter

use thiserror::Error;

/// Errors reported by the rules adapter
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RulesError {
    /// The move is not legal in the given position
    #[error("Illegal move {notation} in position {fen}")]
    IllegalMove { notation: String, fen: String },

    /// The position string could not be parsed or describes an impossible board
    #[error("Invalid FEN '{fen}': {message}")]
    InvalidFen { fen: String, message: String },

    /// The move text is not syntactically a move in the requested notation
    #[error("Invalid move text '{text}'")]
    InvalidMoveText { text: String },
}

/// Result type alias for rules adapter operations
pub type RulesResult<T> = Result<T, RulesError>;
