//! Static evaluation of quiet positions
//!
//! Scores are from the point of view of the player to move. Terminal
//! positions never reach this module, the search scores those itself.

use crate::bitboard::{Position, STRIDE};
use crate::{HEIGHT, WIDTH};

/// Weight of each playable cell that wins immediately for the player to move
pub const OWN_THREAT_WEIGHT: i32 = 120;
/// Weight of each playable cell that wins immediately for the opponent
pub const OPPONENT_THREAT_WEIGHT: i32 = 100;
/// Bonus per tile in the middle column, falling off by one step per column
pub const CENTER_WEIGHT: i32 = 3;
/// Score of an unblocked window by the number of tiles of one player in it
pub const WINDOW_SCORES: [i32; 5] = [0, 1, 4, 16, 0];

pub const NUM_WINDOWS: usize =
    (WIDTH - 3) * HEIGHT + WIDTH * (HEIGHT - 3) + 2 * (WIDTH - 3) * (HEIGHT - 3);

/// Every line of four cells on the board
pub(crate) const WINDOWS: [u64; NUM_WINDOWS] = window_masks();

const fn window_masks() -> [u64; NUM_WINDOWS] {
    // horizontal, vertical, diagonal /, diagonal \
    const DIRECTIONS: [(i32, i32); 4] = [(1, 0), (0, 1), (1, 1), (1, -1)];

    let mut masks = [0; NUM_WINDOWS];
    let mut n = 0;
    let mut d = 0;
    while d < 4 {
        let (dc, dr) = DIRECTIONS[d];
        let mut column = 0;
        while column < WIDTH as i32 {
            let mut row = 0;
            while row < HEIGHT as i32 {
                let (end_column, end_row) = (column + 3 * dc, row + 3 * dr);
                if end_column >= 0
                    && end_column < WIDTH as i32
                    && end_row >= 0
                    && end_row < HEIGHT as i32
                {
                    let mut mask = 0;
                    let mut k = 0;
                    while k < 4 {
                        let c = (column + k * dc) as usize;
                        let r = (row + k * dr) as usize;
                        mask |= 1 << (c * STRIDE + r);
                        k += 1;
                    }
                    masks[n] = mask;
                    n += 1;
                }
                row += 1;
            }
            column += 1;
        }
        d += 1;
    }
    masks
}

/// Weight of a tile in `column`, highest in the middle column
pub const fn center_weight(column: usize) -> i32 {
    let middle = WIDTH / 2;
    let distance = if column > middle {
        column - middle
    } else {
        middle - column
    };
    (middle - distance) as i32 * CENTER_WEIGHT
}

/// Scores a non-terminal position for the player to move
pub fn evaluate(position: &Position) -> i32 {
    let own = position.own();
    let opponent = position.opponent();

    // immediate threats
    let mut score = OWN_THREAT_WEIGHT * position.winning_moves().count_ones() as i32
        - OPPONENT_THREAT_WEIGHT * position.opponent_winning_moves().count_ones() as i32;

    for column in 0..WIDTH {
        let mask = Position::column_mask(column);
        let balance = (own & mask).count_ones() as i32 - (opponent & mask).count_ones() as i32;
        score += balance * center_weight(column);
    }

    for &window in WINDOWS.iter() {
        let mine = (own & window).count_ones() as usize;
        let theirs = (opponent & window).count_ones() as usize;
        match (mine, theirs) {
            (0, 0) => {}
            (mine, 0) => score += WINDOW_SCORES[mine],
            (0, theirs) => score -= WINDOW_SCORES[theirs],
            // blocked for both players
            _ => {}
        }
    }

    score
}
