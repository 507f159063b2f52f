//! Move ordering for the tree search
//!
//! Killer moves and history scores are keyed by ply and side only, not by
//! position, so a cutoff in one subtree also promotes that column in
//! unrelated subtrees at the same ply. They only affect the order moves are
//! tried in, never the result of a search.

use crate::WIDTH;

/// Deepest ply that keeps killer moves
pub const MAX_PLY: usize = 64;

// history scores are halved once any of them passes this
const HISTORY_LIMIT: i32 = 1 << 20;

/// Returns a slice ordering the columns from the middle outwards, as
/// the middle columns are often better moves
pub const fn move_order() -> [usize; WIDTH] {
    let mut move_order = [0; WIDTH];
    let mut i = 0;
    while i < WIDTH {
        move_order[i] = (WIDTH / 2) + (i % 2) * (i / 2 + 1) - (1 - i % 2) * (i / 2);
        i += 1;
    }
    move_order
}

/// Distance of a column from the middle column
pub fn center_distance(column: usize) -> usize {
    if column > WIDTH / 2 {
        column - WIDTH / 2
    } else {
        WIDTH / 2 - column
    }
}

// compared field by field, larger is searched first
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
struct Priority {
    // 3 for the table move, 2 and 1 for killers, 0 otherwise
    class: u8,
    history: i32,
    centrality: i32,
}

/// Columns in search order, best first
pub struct MoveList {
    size: usize,
    moves: [(usize, Priority); WIDTH],
}

impl MoveList {
    fn new() -> Self {
        Self {
            size: 0,
            moves: [(0, Priority::default()); WIDTH],
        }
    }

    fn push(&mut self, column: usize, priority: Priority) {
        let mut pos = self.size;
        self.size += 1;
        while pos != 0 && self.moves[pos - 1].1 > priority {
            self.moves[pos] = self.moves[pos - 1];
            pos -= 1;
        }
        self.moves[pos] = (column, priority);
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }
}

impl Iterator for MoveList {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        match self.size {
            0 => None,
            _ => {
                self.size -= 1;
                Some(self.moves[self.size].0)
            }
        }
    }
}

/// Killer and history tables
#[derive(Clone)]
pub struct MoveOrderer {
    killers: [[Option<usize>; 2]; MAX_PLY],
    history: [[i32; WIDTH]; 2],
}

impl MoveOrderer {
    pub fn new() -> Self {
        Self {
            killers: [[None; 2]; MAX_PLY],
            history: [[0; WIDTH]; 2],
        }
    }

    /// Orders `valid_moves`: the table move first, then the killers of this
    /// ply, then the rest by history score with central columns breaking ties
    pub fn order<I>(&self, valid_moves: I, ply: usize, tt_move: Option<usize>, side: usize) -> MoveList
    where
        I: IntoIterator<Item = usize>,
    {
        let killers = self.killers.get(ply).copied().unwrap_or([None; 2]);

        let mut moves = MoveList::new();
        for column in valid_moves {
            let class = if tt_move == Some(column) {
                3
            } else if killers[0] == Some(column) {
                2
            } else if killers[1] == Some(column) {
                1
            } else {
                0
            };
            moves.push(
                column,
                Priority {
                    class,
                    history: self.history[side][column],
                    centrality: -(center_distance(column) as i32),
                },
            );
        }
        moves
    }

    /// Remembers a move that caused a beta cutoff
    pub fn record_cutoff(&mut self, ply: usize, side: usize, column: usize, depth: i32) {
        if let Some(killers) = self.killers.get_mut(ply) {
            if killers[0] != Some(column) {
                killers[1] = killers[0];
                killers[0] = Some(column);
            }
        }

        let score = &mut self.history[side][column];
        *score += depth * depth;
        if *score > HISTORY_LIMIT {
            self.age_history();
        }
    }

    fn age_history(&mut self) {
        for score in self.history.iter_mut().flat_map(|side| side.iter_mut()) {
            *score /= 2;
        }
    }

    pub fn killers(&self, ply: usize) -> [Option<usize>; 2] {
        self.killers.get(ply).copied().unwrap_or([None; 2])
    }

    pub fn history(&self, side: usize, column: usize) -> i32 {
        self.history[side][column]
    }

    /// Forgets the killer moves, at the start of every search
    pub fn clear_killers(&mut self) {
        self.killers = [[None; 2]; MAX_PLY];
    }

    /// Forgets everything, for a new game
    pub fn reset(&mut self) {
        self.clear_killers();
        self.history = [[0; WIDTH]; 2];
    }
}

impl Default for MoveOrderer {
    fn default() -> Self {
        Self::new()
    }
}
