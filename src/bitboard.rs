//! Bitboard representation of a position
//!
//! Each column takes `HEIGHT + 1` bits, bottom cell first. The extra bit on
//! top of every column is a guard that is never occupied, which keeps the
//! shift-based alignment checks from wrapping between columns.

use crate::error::InputError;
use crate::{CELLS, HEIGHT, WIDTH};

/// Bits per column, including the guard bit
pub const STRIDE: usize = HEIGHT + 1;

pub(crate) mod static_masks {
    use crate::{HEIGHT, WIDTH};

    pub const fn bottom_mask() -> u64 {
        let mut mask = 0;
        let mut column = 0;
        while column < WIDTH {
            mask |= 1 << (column * (HEIGHT + 1));
            column += 1;
        }
        mask
    }
    pub const fn full_board_mask() -> u64 {
        bottom_mask() * ((1 << HEIGHT as u64) - 1)
    }
}

/// Checks a single player's tiles for an alignment of four
///
/// Each direction marks runs of two, then looks for two runs of two spaced
/// one run apart.
#[inline]
pub fn is_win(bits: u64) -> bool {
    // vertical
    let v = bits & (bits >> 1);
    // horizontal
    let h = bits & (bits >> STRIDE);
    // diagonal /
    let d1 = bits & (bits >> (STRIDE - 1));
    // diagonal \
    let d2 = bits & (bits >> (STRIDE + 1));

    ((v & (v >> 2))
        | (h & (h >> (2 * STRIDE)))
        | (d1 & (d1 >> (2 * (STRIDE - 1))))
        | (d2 & (d2 >> (2 * (STRIDE + 1)))))
        != 0
}

/// Lists the columns touched by a move bitmap, left to right
pub fn columns(moves: u64) -> impl Iterator<Item = usize> {
    (0..WIDTH).filter(move |&column| moves & Position::column_mask(column) != 0)
}

/// A Connect 4 position seen from the player to move
///
/// `own` holds the tiles of the player about to move and `occupied` holds
/// every tile on the board, so `own` is always a subset of `occupied`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Position {
    own: u64,
    occupied: u64,
}

impl Position {
    pub fn new() -> Self {
        Self {
            own: 0,
            occupied: 0,
        }
    }

    /// Builds a position from a row-major board (row 0 at the top), from
    /// the point of view of the player using `mark`
    pub fn encode(board: &[u8; CELLS], mark: u8) -> Result<Self, InputError> {
        if mark != 1 && mark != 2 {
            return Err(InputError::InvalidMark(mark));
        }

        let mut own = 0;
        let mut occupied = 0;
        for column in 0..WIDTH {
            let mut column_open = false;
            for row in 0..HEIGHT {
                let index = (HEIGHT - 1 - row) * WIDTH + column;
                let bit = 1 << (column * STRIDE + row);
                match board[index] {
                    0 => column_open = true,
                    value @ 1..=2 => {
                        if column_open {
                            return Err(InputError::FloatingPiece { column });
                        }
                        occupied |= bit;
                        if value == mark {
                            own |= bit;
                        }
                    }
                    value => return Err(InputError::InvalidCell { index, value }),
                }
            }
        }

        if is_win(own) || is_win(own ^ occupied) {
            return Err(InputError::GameOver);
        }
        Ok(Self { own, occupied })
    }

    /// Writes the position back out as a row-major board, `mark` being the
    /// player to move
    pub fn decode(&self, mark: u8) -> [u8; CELLS] {
        debug_assert!(mark == 1 || mark == 2, "invalid mark {}", mark);
        let other = 3 - mark;

        let mut board = [0; CELLS];
        for column in 0..WIDTH {
            for row in 0..HEIGHT {
                let bit = 1 << (column * STRIDE + row);
                let index = (HEIGHT - 1 - row) * WIDTH + column;
                if self.own & bit != 0 {
                    board[index] = mark;
                } else if self.occupied & bit != 0 {
                    board[index] = other;
                }
            }
        }
        board
    }

    /// Replays a game given as a string of 1-indexed column digits
    pub fn from_moves<S: AsRef<str>>(moves: S) -> Result<Self, InputError> {
        let mut position = Self::new();

        for column_char in moves.as_ref().chars() {
            match column_char.to_digit(10).map(|c| c as usize) {
                Some(column @ 1..=WIDTH) => position = position.play_checked(column - 1)?,
                _ => return Err(InputError::InvalidMoveChar(column_char)),
            }
        }
        Ok(position)
    }

    /// Replays a game given as 0-indexed columns
    pub fn from_slice(moves: &[usize]) -> Result<Self, InputError> {
        moves
            .iter()
            .try_fold(Self::new(), |position, &column| position.play_checked(column))
    }

    fn play_checked(self, column: usize) -> Result<Self, InputError> {
        if column >= WIDTH {
            return Err(InputError::ColumnOutOfRange(column));
        }
        if !self.can_play(column) {
            return Err(InputError::ColumnFull(column));
        }
        // abort if the position is won at any point
        if self.is_winning_move(column) {
            return Err(InputError::GameOver);
        }
        Ok(self.drop(column))
    }

    pub fn own(&self) -> u64 {
        self.own
    }

    pub fn occupied(&self) -> u64 {
        self.occupied
    }

    /// Tiles of the player who moved last
    pub fn opponent(&self) -> u64 {
        self.own ^ self.occupied
    }

    pub fn num_moves(&self) -> usize {
        self.occupied.count_ones() as usize
    }

    /// 0 when the first player is to move, 1 for the second player
    pub fn side(&self) -> usize {
        self.num_moves() & 1
    }

    pub fn is_full(&self) -> bool {
        self.num_moves() == CELLS
    }

    pub fn top_mask(column: usize) -> u64 {
        1 << (column * STRIDE + (HEIGHT - 1))
    }

    pub fn bottom_mask(column: usize) -> u64 {
        1 << (column * STRIDE)
    }

    pub fn column_mask(column: usize) -> u64 {
        ((1 << HEIGHT) - 1) << (column * STRIDE)
    }

    /// True while a drop into `column` stays below the guard bit
    pub fn can_play(&self, column: usize) -> bool {
        Self::top_mask(column) & self.occupied == 0
    }

    /// Plays a tile for the player to move and hands the move to the opponent
    ///
    /// `column` must be playable.
    #[inline]
    pub fn drop(&self, column: usize) -> Self {
        debug_assert!(self.can_play(column), "drop into full column {}", column);
        Self {
            // the previous occupancy flips ownership to the opponent, leaving
            // the new tile out of their mask
            own: self.own ^ self.occupied,
            occupied: self.occupied | (self.occupied + Self::bottom_mask(column)),
        }
    }

    /// Hands the move to the opponent without placing a tile
    pub fn pass(&self) -> Self {
        Self {
            own: self.own ^ self.occupied,
            occupied: self.occupied,
        }
    }

    /// The cell a drop into `column` would fill
    pub fn move_bit(&self, column: usize) -> u64 {
        (self.occupied + Self::bottom_mask(column)) & Self::column_mask(column)
    }

    pub fn is_winning_move(&self, column: usize) -> bool {
        is_win(self.own | self.move_bit(column))
    }

    pub fn possible_moves(&self) -> u64 {
        (self.occupied + static_masks::bottom_mask()) & static_masks::full_board_mask()
    }

    /// Playable cells that win immediately for the player to move
    pub fn winning_moves(&self) -> u64 {
        self.threat_cells(self.own) & self.possible_moves()
    }

    /// Playable cells the opponent would win with if it were their turn
    pub fn opponent_winning_moves(&self) -> u64 {
        self.threat_cells(self.opponent()) & self.possible_moves()
    }

    /// Moves that don't hand the opponent a win on their next turn
    pub fn non_losing_moves(&self) -> u64 {
        let mut possible_moves = self.possible_moves();
        let opponent_threats = self.threat_cells(self.opponent());
        let forced_moves = possible_moves & opponent_threats;

        if forced_moves != 0 {
            // if more than one forced move exists, you can't prevent the opponent winning
            if forced_moves & (forced_moves - 1) != 0 {
                return 0;
            }
            possible_moves = forced_moves;
        }
        // avoid playing below an opponent's winning cell
        possible_moves & !(opponent_threats >> 1)
    }

    /// Empty cells that would complete an alignment of four for `bits`
    pub fn threat_cells(&self, bits: u64) -> u64 {
        // vertical: only the cell on top of three stacked tiles
        let mut cells = (bits << 1) & (bits << 2) & (bits << 3);

        // horizontal and both diagonals
        for &shift in &[STRIDE, STRIDE - 1, STRIDE + 1] {
            let pair = (bits << shift) & (bits << (2 * shift));
            // right ends of three in a row
            cells |= pair & (bits << (3 * shift));
            // holes of the type O O _ O
            cells |= pair & (bits >> shift);

            let pair = (bits >> shift) & (bits >> (2 * shift));
            // left ends of three in a row
            cells |= pair & (bits >> (3 * shift));
            // holes of the type O _ O O
            cells |= pair & (bits << shift);
        }

        cells & (static_masks::full_board_mask() ^ self.occupied)
    }

    /// Unique key of the position from the mover's point of view
    pub fn key(&self) -> u64 {
        self.own + self.occupied
    }

    /// Well-spread hash of [`key`](Self::key)
    ///
    /// The mix is a bijection, so two positions never share a hash.
    #[inline]
    pub fn hash(&self) -> u64 {
        let mut h = self.key();
        h = (h ^ (h >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        h = (h ^ (h >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        h ^ (h >> 31)
    }
}
