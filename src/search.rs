//! A time-limited agent to play Connect 4

use log::{debug, info, trace, warn};

use std::time::{Duration, Instant};

use crate::bitboard::{columns, Position};
use crate::book::OpeningBook;
use crate::error::EngineError;
use crate::evaluation::evaluate;
use crate::move_order::{move_order, MoveOrderer, MAX_PLY};
use crate::transposition_table::{Bound, TranspositionTable, DEFAULT_SIZE_MB};
use crate::{CELLS, WIDTH};

/// Score of a win on the current move at the root, later wins score lower
pub const WIN_SCORE: i32 = 1_000_000;
/// Bound of the search window, outside any reachable score
pub const INF: i32 = WIN_SCORE + 1;
/// Scores at least this far from zero are forced wins or losses
pub const MATE_BOUND: i32 = WIN_SCORE - MAX_PLY as i32;

/// Tunable parameters of a [`SearchEngine`]
#[derive(Clone, Debug)]
pub struct SearchConfig {
    /// Deepest iteration of the iterative deepening loop
    pub max_depth: i32,
    /// Memory budget of the transposition table
    pub tt_size_mb: usize,
    /// Try passing the move to prove a cutoff. Connect 4 has no legal pass
    /// and is full of zugzwang, so this is off unless asked for.
    pub null_move_pruning: bool,
    /// Extra depth taken off the null move search
    pub null_move_reduction: i32,
    /// Evaluation margin per remaining ply for futility pruning
    pub futility_margin: i32,
    /// Move index from which late moves are searched one ply shallower
    pub lmr_threshold: usize,
    /// Move index beyond which late moves are searched two plies shallower
    pub lmr_deep_threshold: usize,
    /// Nodes searched between two looks at the clock
    pub node_check_interval: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_depth: CELLS as i32,
            tt_size_mb: DEFAULT_SIZE_MB,
            null_move_pruning: false,
            null_move_reduction: 2,
            futility_margin: 150,
            lmr_threshold: 3,
            lmr_deep_threshold: 6,
            node_check_interval: 1024,
        }
    }
}

/// Where the move of a [`SearchReport`] came from
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MoveSource {
    /// The injected opening book
    Book,
    /// A completed search iteration
    Search,
    /// No iteration completed in time
    Fallback,
}

/// The outcome of a call to [`SearchEngine::search`]
#[derive(Clone, Debug)]
pub struct SearchReport {
    /// The chosen column, always playable
    pub column: usize,
    /// Score of the last completed iteration, from the mover's point of view
    pub score: Option<i32>,
    /// Depth of the last completed iteration
    pub depth: i32,
    pub nodes: u64,
    pub elapsed: Duration,
    pub source: MoveSource,
}

impl SearchReport {
    /// Plies until the game is decided, when the score is a forced result
    pub fn win_distance(&self) -> Option<i32> {
        self.score.and_then(win_distance)
    }
}

/// Converts a forced win or loss score into the number of plies until the
/// deciding tile is played, counting that tile
pub fn win_distance(score: i32) -> Option<i32> {
    if score.abs() >= MATE_BOUND {
        Some(WIN_SCORE - score.abs() + 1)
    } else {
        None
    }
}

// win scores are stored relative to the node so they stay valid at any ply
fn to_tt_score(score: i32, ply: usize) -> i32 {
    if score >= MATE_BOUND {
        score + ply as i32
    } else if score <= -MATE_BOUND {
        score - ply as i32
    } else {
        score
    }
}

fn from_tt_score(score: i32, ply: usize) -> i32 {
    if score >= MATE_BOUND {
        score - ply as i32
    } else if score <= -MATE_BOUND {
        score + ply as i32
    } else {
        score
    }
}

/// Picks a move without searching: a win, else a block, else the most
/// central playable column
pub fn fallback_move(position: &Position) -> Option<usize> {
    let playable: Vec<usize> = move_order()
        .iter()
        .copied()
        .filter(|&column| position.can_play(column))
        .collect();
    let opponent_wins = position.opponent_winning_moves();

    playable
        .iter()
        .copied()
        .find(|&column| position.is_winning_move(column))
        .or_else(|| {
            playable
                .iter()
                .copied()
                .find(|&column| opponent_wins & Position::column_mask(column) != 0)
        })
        .or_else(|| playable.first().copied())
}

/// An agent to play Connect 4 under a time budget
///
/// # Notes
/// Runs an iterative deepening negamax search with alpha-beta pruning, a
/// transposition table, killer and history move ordering, futility pruning,
/// late move reductions and optional null move pruning. Only iterations
/// that complete within the budget are trusted.
///
/// # Position Scoring
/// Scores are from the point of view of the player to move. A win on ply `p`
/// (counted from the root, starting at 0) scores `WIN_SCORE - p` and a loss
/// the negation, so faster wins and slower losses are preferred. Other
/// positions get a heuristic score far from these bounds.
///
/// The tables are kept between calls so the engine can be reused for every
/// move of a game; call [`new_game`](Self::new_game) between games.
pub struct SearchEngine {
    config: SearchConfig,
    transposition_table: TranspositionTable,
    move_orderer: MoveOrderer,
    book: Option<Box<dyn OpeningBook>>,
    deadline: Option<Instant>,
    stopped: bool,

    /// The number of nodes searched by the last search (for diagnostics only)
    pub node_count: u64,
}

impl SearchEngine {
    /// Creates a new `SearchEngine` with the default configuration
    pub fn new() -> Self {
        Self::from_config(SearchConfig::default())
    }

    pub fn from_config(config: SearchConfig) -> Self {
        Self {
            transposition_table: TranspositionTable::new(config.tt_size_mb),
            config,
            move_orderer: MoveOrderer::new(),
            book: None,
            deadline: None,
            stopped: false,
            node_count: 0,
        }
    }

    /// Adds an opening book to an existing `SearchEngine`
    pub fn with_book<B: OpeningBook + 'static>(mut self, book: B) -> Self {
        self.book = Some(Box::new(book));
        self
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn transposition_table(&self) -> &TranspositionTable {
        &self.transposition_table
    }

    pub fn move_orderer(&self) -> &MoveOrderer {
        &self.move_orderer
    }

    /// Forgets everything learnt in the previous game
    pub fn new_game(&mut self) {
        self.transposition_table.clear();
        self.move_orderer.reset();
    }

    /// Chooses a column for the player using `mark` on a row-major board
    /// (row 0 at the top, 0 empty, 1 and 2 the players)
    pub fn choose_move(
        &mut self,
        board: &[u8; CELLS],
        mark: u8,
        budget: Duration,
    ) -> Result<usize, EngineError> {
        let position = Position::encode(board, mark)?;
        Ok(self.search(position, None, budget)?.column)
    }

    /// Chooses a column after the given 0-indexed moves, consulting the
    /// opening book first
    pub fn choose_move_from_history(
        &mut self,
        moves: &[usize],
        budget: Duration,
    ) -> Result<usize, EngineError> {
        let position = Position::from_slice(moves)?;
        Ok(self.search(position, Some(moves), budget)?.column)
    }

    /// Searches `root` until the budget runs out or the result is decided
    ///
    /// Fails only when the board is full.
    pub fn search(
        &mut self,
        root: Position,
        history: Option<&[usize]>,
        budget: Duration,
    ) -> Result<SearchReport, EngineError> {
        let start = Instant::now();
        if root.possible_moves() == 0 {
            return Err(EngineError::NoLegalMove);
        }
        self.node_count = 0;

        if let Some(column) = self.book_move(&root, history) {
            return Ok(SearchReport {
                column,
                score: None,
                depth: 0,
                nodes: 0,
                elapsed: start.elapsed(),
                source: MoveSource::Book,
            });
        }

        self.prepare(&root);
        self.deadline = start.checked_add(budget);
        self.stopped = false;

        // depth 1 always runs, even when configured lower
        let max_depth = self
            .config
            .max_depth
            .max(1)
            .min((CELLS - root.num_moves()) as i32);
        let mut best = None;
        for depth in 1..=max_depth {
            if self.out_of_time() {
                break;
            }
            match self.search_root(root, depth) {
                Some((score, column)) => {
                    debug!(
                        "depth {}: best move {}, score {}, {} nodes",
                        depth, column, score, self.node_count
                    );
                    best = Some((score, column, depth));
                    // a result decided within the searched plies won't change
                    if win_distance(score).map_or(false, |plies| plies <= depth) {
                        break;
                    }
                }
                None => {
                    trace!(
                        "depth {} interrupted after {} nodes",
                        depth,
                        self.node_count
                    );
                    break;
                }
            }
        }

        let report = match best {
            Some((score, column, depth)) => SearchReport {
                column,
                score: Some(score),
                depth,
                nodes: self.node_count,
                elapsed: start.elapsed(),
                source: MoveSource::Search,
            },
            None => {
                let column = fallback_move(&root).ok_or(EngineError::NoLegalMove)?;
                warn!(
                    "no search iteration completed within {:?}, falling back to column {}",
                    budget, column
                );
                SearchReport {
                    column,
                    score: None,
                    depth: 0,
                    nodes: self.node_count,
                    elapsed: start.elapsed(),
                    source: MoveSource::Fallback,
                }
            }
        };
        Ok(report)
    }

    fn book_move(&self, root: &Position, history: Option<&[usize]>) -> Option<usize> {
        let (book, history) = match (&self.book, history) {
            (Some(book), Some(history)) => (book, history),
            _ => return None,
        };

        match book.lookup(history) {
            Some(column) if column < WIDTH && root.can_play(column) => {
                info!("book move {} after {:?}", column, history);
                Some(column)
            }
            Some(column) => {
                warn!("ignoring unplayable book move {} after {:?}", column, history);
                None
            }
            None => None,
        }
    }

    // per-search housekeeping, the deadline is not running yet
    fn prepare(&mut self, root: &Position) {
        self.move_orderer.clear_killers();
        if self.transposition_table.is_crowded() {
            let evicted = self.transposition_table.trim(root.num_moves());
            trace!(
                "evicted {} unreachable entries, {} of {} slots in use",
                evicted,
                self.transposition_table.len(),
                self.transposition_table.capacity()
            );
        }
    }

    fn out_of_time(&self) -> bool {
        self.deadline.map_or(false, |deadline| Instant::now() >= deadline)
    }

    /// Searches every root move to `depth`, bypassing the transposition
    /// table cutoff so that a move is always found
    ///
    /// Returns `None` if the iteration ran out of time.
    fn search_root(&mut self, root: Position, depth: i32) -> Option<(i32, usize)> {
        self.node_count += 1;

        // check for win for current player on this move
        if let Some(column) = move_order()
            .iter()
            .copied()
            .find(|&column| root.can_play(column) && root.is_winning_move(column))
        {
            return Some((WIN_SCORE, column));
        }

        let candidates = root.non_losing_moves();
        if candidates == 0 {
            // every move loses, play the most central one
            let column = move_order()
                .iter()
                .copied()
                .find(|&column| root.can_play(column))?;
            return Some((-(WIN_SCORE - 1), column));
        }

        let key = root.hash();
        let tt_move = self.transposition_table.best_move(key);
        let side = root.side();
        let moves = self
            .move_orderer
            .order(columns(candidates), 0, tt_move, side);

        let mut alpha = -INF;
        let mut best_move = None;
        for column in moves {
            let score = -self.negamax(root.drop(column), depth - 1, -INF, -alpha, 1, side ^ 1, true);
            if self.stopped {
                return None;
            }
            if score > alpha {
                alpha = score;
                best_move = Some(column);
            }
        }

        let best_move = best_move?;
        self.transposition_table.store(
            key,
            depth,
            to_tt_score(alpha, 0),
            Bound::Exact,
            Some(best_move),
            root.num_moves(),
        );
        Some((alpha, best_move))
    }

    /// Performs game tree search
    ///
    /// `side` is the player to move, which the tile count can't tell after a
    /// null move.
    ///
    /// Returns the score of the position (see [Position Scoring]). After the
    /// clock runs out the return value is meaningless and `self.stopped` is
    /// set; callers must unwind without recording anything.
    ///
    /// [Position Scoring]: #position-scoring
    fn negamax(
        &mut self,
        position: Position,
        depth: i32,
        mut alpha: i32,
        beta: i32,
        ply: usize,
        side: usize,
        allow_null: bool,
    ) -> i32 {
        self.node_count += 1;
        if self.node_count % self.config.node_check_interval.max(1) == 0 && self.out_of_time() {
            self.stopped = true;
        }
        if self.stopped {
            return 0;
        }

        let key = position.hash();
        if let Some((score, _)) = self.transposition_table.probe(
            key,
            depth,
            to_tt_score(alpha, ply),
            to_tt_score(beta, ply),
        ) {
            return from_tt_score(score, ply);
        }

        // check for next-move win for current player
        if position.winning_moves() != 0 {
            return WIN_SCORE - ply as i32;
        }

        if position.is_full() {
            return 0;
        }

        // look for moves that don't give the opponent a next turn win
        let candidates = position.non_losing_moves();
        if candidates == 0 {
            return -(WIN_SCORE - (ply as i32 + 1));
        }

        if depth <= 0 {
            return evaluate(&position);
        }

        // skip a move and see if the opponent can still catch up
        if self.config.null_move_pruning
            && allow_null
            && depth >= 3
            && beta < MATE_BOUND
            && position.opponent_winning_moves() == 0
            && self.null_move_cutoff(position, depth, beta, ply, side)
        {
            return beta;
        }
        if self.stopped {
            return 0;
        }

        // hopeless shallow nodes aren't worth expanding
        if depth <= 2 && alpha.abs() < MATE_BOUND {
            let static_eval = evaluate(&position);
            if static_eval + self.config.futility_margin * depth < alpha {
                return alpha;
            }
        }

        let original_alpha = alpha;
        let tt_move = self.transposition_table.best_move(key);
        let moves = self
            .move_orderer
            .order(columns(candidates), ply, tt_move, side);

        let mut best_score = -INF;
        let mut best_move = None;
        for (index, column) in moves.enumerate() {
            let child = position.drop(column);
            let reduction = self.reduction(index, depth);

            // the search window is flipped for the other player
            let mut score = -self.negamax(child, depth - 1 - reduction, -beta, -alpha, ply + 1, side ^ 1, true);
            if self.stopped {
                return 0;
            }
            // a reduced search that raises alpha has to be verified at full depth
            if reduction > 0 && score > alpha {
                score = -self.negamax(child, depth - 1, -beta, -alpha, ply + 1, side ^ 1, true);
                if self.stopped {
                    return 0;
                }
            }

            if score > best_score {
                best_score = score;
                best_move = Some(column);
            }
            if score > alpha {
                alpha = score;
            }
            // the opponent will not pick this branch
            if alpha >= beta {
                self.move_orderer.record_cutoff(ply, side, column, depth);
                break;
            }
        }

        let bound = if best_score <= original_alpha {
            Bound::Upper
        } else if best_score >= beta {
            Bound::Lower
        } else {
            Bound::Exact
        };
        self.transposition_table.store(
            key,
            depth,
            to_tt_score(best_score, ply),
            bound,
            best_move,
            position.num_moves(),
        );
        best_score
    }

    /// Lets the opponent move twice in a row with a reduced, null window
    /// search, true if `side` still reaches `beta`
    pub(crate) fn null_move_cutoff(
        &mut self,
        position: Position,
        depth: i32,
        beta: i32,
        ply: usize,
        side: usize,
    ) -> bool {
        let reduced = depth - 1 - self.config.null_move_reduction;
        let score = -self.negamax(position.pass(), reduced, -beta, -beta + 1, ply + 1, side ^ 1, false);
        !self.stopped && score >= beta
    }

    fn reduction(&self, index: usize, depth: i32) -> i32 {
        if depth <= 3 {
            0
        } else if index > self.config.lmr_deep_threshold {
            2
        } else if index >= self.config.lmr_threshold {
            1
        } else {
            0
        }
    }
}

impl Default for SearchEngine {
    fn default() -> Self {
        Self::new()
    }
}
