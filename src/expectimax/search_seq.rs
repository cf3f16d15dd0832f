use std::collections::HashMap;

use crate::engine::{Board, Move};
use crate::heuristic;

use super::{warm_tables, BranchEval, SearchConfig, SearchStats, PROB_TILE_2, PROB_TILE_4};

/// Transposition cache for one search call: chance-node values keyed by
/// `(board, remaining depth)`. Only exact-depth hits are reused, so caching
/// never changes the returned values.
type Cache = HashMap<(Board, u64), f64>;

/// Single-threaded depth-bounded expectimax.
///
/// Max layers pick the best legal move; chance layers average over every
/// `(empty cell, tile value)` spawn outcome with weight
/// `P(value) / num_empty`. Leaves are scored with the heuristic evaluator.
pub struct Expectimax {
    cfg: SearchConfig,
    stats: SearchStats,
}

impl Expectimax {
    pub fn new() -> Self {
        Self::with_config(SearchConfig::default())
    }

    pub fn with_config(cfg: SearchConfig) -> Self {
        assert!(cfg.depth >= 1, "search depth must be positive");
        warm_tables();
        Self {
            cfg,
            stats: SearchStats::default(),
        }
    }

    /// Compute the best move using expectimax.
    ///
    /// Returns `None` only when no legal move exists: game over, not an
    /// error.
    ///
    /// ```
    /// use twenty48_ai::engine::{self as GameEngine, Board};
    /// use twenty48_ai::expectimax::Expectimax;
    /// use rand::{rngs::StdRng, SeedableRng};
    /// GameEngine::new();
    /// let mut rng = StdRng::seed_from_u64(7);
    /// let b = Board::EMPTY.with_random_tile(&mut rng).with_random_tile(&mut rng);
    /// let mut ex = Expectimax::new();
    /// assert!(ex.best_move(b).is_some());
    /// ```
    pub fn best_move(&mut self, board: Board) -> Option<Move> {
        let mut cache = Cache::new();
        let mut nodes = 0u64;
        let result = self.max_node(board, self.cfg.depth, &mut cache, &mut nodes);
        self.stats.nodes = nodes;
        self.stats.peak_nodes = self.stats.peak_nodes.max(nodes);
        result.move_dir
    }

    /// Compute EV for each direction (no normalization).
    ///
    /// Returns a fixed array in order `[Up, Down, Left, Right]` with
    /// illegal moves marked `legal = false`.
    pub fn branch_evals(&mut self, board: Board) -> [BranchEval; 4] {
        let mut cache = Cache::new();
        let mut nodes = 0u64;
        let mut out = [
            BranchEval { dir: Move::Up, ev: 0.0, legal: false },
            BranchEval { dir: Move::Down, ev: 0.0, legal: false },
            BranchEval { dir: Move::Left, ev: 0.0, legal: false },
            BranchEval { dir: Move::Right, ev: 0.0, legal: false },
        ];
        for (i, &dir) in Move::ALL.iter().enumerate() {
            let new_board = board.shift(dir);
            if new_board != board {
                let ev = self.chance_node(new_board, self.cfg.depth - 1, &mut cache, &mut nodes);
                out[i] = BranchEval { dir, ev, legal: true };
            }
        }
        self.stats.nodes = nodes;
        self.stats.peak_nodes = self.stats.peak_nodes.max(nodes);
        out
    }

    /// EV at the root max node: the best branch EV, or the heuristic leaf
    /// value on a terminal board.
    pub fn state_value(&mut self, board: Board) -> f64 {
        let mut cache = Cache::new();
        let mut nodes = 0u64;
        let result = self.max_node(board, self.cfg.depth, &mut cache, &mut nodes);
        self.stats.nodes = nodes;
        self.stats.peak_nodes = self.stats.peak_nodes.max(nodes);
        result.value
    }

    /// Statistics from the last call to [`Self::best_move`],
    /// [`Self::branch_evals`] or [`Self::state_value`].
    #[inline]
    pub fn last_stats(&self) -> SearchStats {
        self.stats
    }

    /// Reset accumulated stats to zero.
    #[inline]
    pub fn reset_stats(&mut self) {
        self.stats = SearchStats::default();
    }

    #[inline]
    fn leaf(&self, board: Board) -> f64 {
        heuristic::evaluate(board, &self.cfg.weights)
    }

    fn max_node(
        &self,
        board: Board,
        depth: u64,
        cache: &mut Cache,
        nodes: &mut u64,
    ) -> MaxResult {
        *nodes += 1;
        if depth == 0 {
            return MaxResult { value: self.leaf(board), move_dir: None };
        }
        let mut best: Option<(Move, f64)> = None;
        for &dir in &Move::ALL {
            let new_board = board.shift(dir);
            if new_board == board {
                continue;
            }
            let ev = self.chance_node(new_board, depth - 1, cache, nodes);
            match best {
                Some((_, best_ev)) if ev <= best_ev => {}
                _ => best = Some((dir, ev)),
            }
        }
        match best {
            Some((dir, value)) => MaxResult { value, move_dir: Some(dir) },
            // Zero legal moves: game over, evaluate as a leaf.
            None => MaxResult { value: self.leaf(board), move_dir: None },
        }
    }

    fn chance_node(
        &self,
        board: Board,
        depth: u64,
        cache: &mut Cache,
        nodes: &mut u64,
    ) -> f64 {
        *nodes += 1;
        if depth == 0 {
            return self.leaf(board);
        }
        if self.cfg.cache_enabled {
            if let Some(&value) = cache.get(&(board, depth)) {
                return value;
            }
        }
        let num_empty = board.count_empty();
        if num_empty == 0 {
            return self.leaf(board);
        }
        let mut tiles_searched = 0;
        let mut tmp = board.raw();
        let mut insert_tile = 1u64;
        let mut ev = 0.0;
        while tiles_searched < num_empty {
            if (tmp & 0xf) == 0 {
                let with_2 = Board::from_raw(board.raw() | insert_tile);
                let with_4 = Board::from_raw(board.raw() | (insert_tile << 1));
                // One addition per slot, so the parallel search can sum
                // slot contributions in the same association order.
                ev += self.max_node(with_2, depth - 1, cache, nodes).value * PROB_TILE_2
                    + self.max_node(with_4, depth - 1, cache, nodes).value * PROB_TILE_4;
                tiles_searched += 1;
            }
            tmp >>= 4;
            insert_tile <<= 4;
        }
        ev /= num_empty as f64;
        if self.cfg.cache_enabled {
            cache.insert((board, depth), ev);
        }
        ev
    }
}

#[derive(Debug, Clone, Copy)]
struct MaxResult {
    value: f64,
    move_dir: Option<Move>,
}

impl Default for Expectimax {
    fn default() -> Self {
        Self::new()
    }
}
