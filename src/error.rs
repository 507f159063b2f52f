//! Errors reported by the engine
//!
//! Running out of time is not an error: the search always absorbs it and
//! answers with the best move it has.

use thiserror::Error;

/// The ways a board handed to the engine can be malformed
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputError {
    #[error("invalid cell value {value} at index {index}, expected 0, 1 or 2")]
    InvalidCell { index: usize, value: u8 },
    #[error("invalid mark {0}, expected 1 or 2")]
    InvalidMark(u8),
    #[error("floating piece in column {column}")]
    FloatingPiece { column: usize },
    #[error("could not parse '{0}' as a valid move")]
    InvalidMoveChar(char),
    #[error("column {0} out of range")]
    ColumnOutOfRange(usize),
    #[error("invalid move, column {0} full")]
    ColumnFull(usize),
    #[error("invalid position, game is over")]
    GameOver,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineError {
    /// The caller broke the input contract
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InputError),
    /// The board is full, the game is a draw
    #[error("no legal move, the board is full")]
    NoLegalMove,
}
