//! Hook for an external opening book or endgame tablebase
//!
//! The engine never builds or loads books itself. Anything that can map the
//! moves played so far to a column can be injected into a
//! [`SearchEngine`](crate::search::SearchEngine), and it is consulted before
//! every search that is given the game's move history.
//!
//! ```
//! use connect4_engine::search::SearchEngine;
//! use std::time::Duration;
//!
//!# fn main() -> connect4_engine::anyhow::Result<()> {
//! // always answer the opening move in the middle column
//! let book = |history: &[usize]| -> Option<usize> {
//!     if history.is_empty() { Some(3) } else { None }
//! };
//! let mut engine = SearchEngine::new().with_book(book);
//!
//! assert_eq!(engine.choose_move_from_history(&[], Duration::from_millis(10))?, 3);
//!# Ok(())
//!# }
//! ```

use std::collections::HashMap;

/// Suggests a move from the sequence of 0-indexed columns played so far
pub trait OpeningBook {
    fn lookup(&self, history: &[usize]) -> Option<usize>;
}

impl<F> OpeningBook for F
where
    F: Fn(&[usize]) -> Option<usize>,
{
    fn lookup(&self, history: &[usize]) -> Option<usize> {
        self(history)
    }
}

/// An in-memory book mapping move sequences to replies
#[derive(Clone, Debug, Default)]
pub struct OpeningTable {
    replies: HashMap<Vec<usize>, usize>,
}

impl OpeningTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, history: Vec<usize>, column: usize) -> Option<usize> {
        self.replies.insert(history, column)
    }

    pub fn len(&self) -> usize {
        self.replies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replies.is_empty()
    }
}

impl std::iter::FromIterator<(Vec<usize>, usize)> for OpeningTable {
    fn from_iter<I: IntoIterator<Item = (Vec<usize>, usize)>>(iter: I) -> Self {
        Self {
            replies: iter.into_iter().collect(),
        }
    }
}

impl OpeningBook for OpeningTable {
    fn lookup(&self, history: &[usize]) -> Option<usize> {
        self.replies.get(history).copied()
    }
}
