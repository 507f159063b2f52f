use std::mem::size_of;

/// Default memory budget of a [`TranspositionTable`] in megabytes
pub const DEFAULT_SIZE_MB: usize = 16;

/// How a stored score relates to the true score of its position
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Bound {
    /// The search completed inside the window
    Exact,
    /// The search failed high, the true score is at least this
    Lower,
    /// The search failed low, the true score is at most this
    Upper,
}

#[derive(Copy, Clone, Debug)]
pub struct Entry {
    pub key: u64,
    pub depth: i16,
    pub score: i32,
    pub bound: Bound,
    pub best_move: Option<u8>,
    // tiles on the board, positions with fewer tiles than the root can't recur
    pub pieces: u8,
}

/// A direct-mapped table of search results
///
/// The slot count is a power of two fixed at construction. Each slot keeps
/// the full key so that a different position mapping to the same slot is
/// never mistaken for a hit.
#[derive(Clone)]
pub struct TranspositionTable {
    entries: Vec<Option<Entry>>,
    mask: usize,
    filled: usize,
}

impl TranspositionTable {
    /// Creates a table using at most `size_mb` megabytes
    pub fn new(size_mb: usize) -> Self {
        let budget = size_mb.max(1) * 1024 * 1024 / size_of::<Option<Entry>>();
        let slots = if budget.is_power_of_two() {
            budget
        } else {
            budget.next_power_of_two() >> 1
        };

        Self {
            entries: vec![None; slots],
            mask: slots - 1,
            filled: 0,
        }
    }

    #[inline]
    fn index(&self, key: u64) -> usize {
        key as usize & self.mask
    }

    /// Looks up a score that can stand in for a search of `depth` with the
    /// window `(alpha, beta)`
    pub fn probe(&self, key: u64, depth: i32, alpha: i32, beta: i32) -> Option<(i32, Option<usize>)> {
        let entry = self.entries[self.index(key)]?;
        if entry.key != key || i32::from(entry.depth) < depth {
            return None;
        }

        let usable = match entry.bound {
            Bound::Exact => true,
            Bound::Lower => entry.score >= beta,
            Bound::Upper => entry.score <= alpha,
        };
        if usable {
            Some((entry.score, entry.best_move.map(usize::from)))
        } else {
            None
        }
    }

    /// The best move stored for `key` at any depth, for move ordering
    pub fn best_move(&self, key: u64) -> Option<usize> {
        self.entries[self.index(key)]
            .filter(|entry| entry.key == key)
            .and_then(|entry| entry.best_move)
            .map(usize::from)
    }

    /// Stores a result unless the slot holds a deeper one
    pub fn store(
        &mut self,
        key: u64,
        depth: i32,
        score: i32,
        bound: Bound,
        best_move: Option<usize>,
        pieces: usize,
    ) {
        let index = self.index(key);
        let slot = &mut self.entries[index];
        match *slot {
            Some(existing) if i32::from(existing.depth) > depth => return,
            None => self.filled += 1,
            _ => {}
        }

        *slot = Some(Entry {
            key,
            depth: depth as i16,
            score,
            bound,
            best_move: best_move.map(|column| column as u8),
            pieces: pieces as u8,
        });
    }

    /// Empties the table, for a new game
    pub fn clear(&mut self) {
        for slot in self.entries.iter_mut() {
            *slot = None;
        }
        self.filled = 0;
    }

    /// Evicts every position with fewer than `min_pieces` tiles
    ///
    /// Tiles are never removed, so once the game has moved past a position
    /// its entry can't be probed again. Returns the number of evicted entries.
    pub fn trim(&mut self, min_pieces: usize) -> usize {
        let mut evicted = 0;
        for slot in self.entries.iter_mut() {
            if slot.map_or(false, |entry| usize::from(entry.pieces) < min_pieces) {
                *slot = None;
                evicted += 1;
            }
        }
        self.filled -= evicted;
        evicted
    }

    /// Number of occupied slots
    pub fn len(&self) -> usize {
        self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    /// Number of slots
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// True once more than three quarters of the slots are in use
    pub fn is_crowded(&self) -> bool {
        self.filled * 4 > self.capacity() * 3
    }
}

impl Default for TranspositionTable {
    fn default() -> Self {
        Self::new(DEFAULT_SIZE_MB)
    }
}
