//! A time-limited agent for playing the board game 'Connect 4'
//!
//! This agent runs an iterative deepening game tree search over a bitboard
//! and always answers with a legal move before its time budget runs out.
//!
//! # Basic Usage
//!
//! ```
//! use connect4_engine::{search::SearchEngine, bitboard::Position};
//! use std::time::Duration;
//!
//!# use std::error::Error;
//!# fn main() -> Result<(), Box<dyn Error>> {
//! let mut engine = SearchEngine::new();
//! let report = engine.search(Position::from_moves("112233")?, None, Duration::from_millis(50))?;
//!
//! assert_eq!(report.column, 3);
//!# Ok(())
//!# }
//! ```

use static_assertions::*;
pub use anyhow;

pub mod error;

pub mod bitboard;

pub mod evaluation;

pub mod transposition_table;

pub mod move_order;

pub mod book;

pub mod search;


/// The width of the game board in tiles
pub const WIDTH: usize = 7;

/// The height of the game board in tiles
pub const HEIGHT: usize = 6;

/// The number of tiles on a full board
pub const CELLS: usize = WIDTH * HEIGHT;

// ensure that the given dimensions fit in a u64 for the bitboard representation
const_assert!(WIDTH * (HEIGHT + 1) < 64);
// alignments of four have to fit on the board
const_assert!(WIDTH >= 4 && HEIGHT >= 4);
