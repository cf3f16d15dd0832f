use ahash::RandomState as AHasher;
use dashmap::DashMap;
use rayon::prelude::*;

use crate::engine::{Board, Move};
use crate::heuristic;

use super::{best_branch, warm_tables, BranchEval, ParThresholds, SearchConfig, SearchStats, PROB_TILE_2, PROB_TILE_4};

/// Shared transposition cache: chance-node values keyed by
/// `(board, remaining depth)`, exact-depth hits only.
type Cache = DashMap<(Board, u64), f64, AHasher>;

/// Parallel expectimax using rayon and a shared `DashMap` transposition
/// table.
///
/// Sibling branches are independent pure computations over copied boards;
/// slot contributions are collected in slot order and summed sequentially,
/// and ties resolve toward the earlier direction, so results are identical
/// to [`super::Expectimax`].
pub struct ExpectimaxParallel {
    cfg: SearchConfig,
    stats: SearchStats,
}

impl ExpectimaxParallel {
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

    /// Compute the best move using parallel expectimax.
    ///
    /// This is a convenience wrapper around `branch_evals` that just picks
    /// the best legal branch.
    #[inline]
    pub fn best_move(&mut self, board: Board) -> Option<Move> {
        let branches = self.branch_evals(board);
        best_branch(&branches)
    }

    /// Convenience for drivers: both the best move and all branch
    /// evaluations from a single search.
    #[inline]
    pub fn best_move_with_branches(&mut self, board: Board) -> (Option<Move>, [BranchEval; 4]) {
        let branches = self.branch_evals(board);
        (best_branch(&branches), branches)
    }

    /// Core function: compute EV for each direction in parallel.
    ///
    /// Returns a fixed array in order `[Up, Down, Left, Right]` with
    /// illegal moves marked `legal = false`.
    pub fn branch_evals(&mut self, board: Board) -> [BranchEval; 4] {
        let depth = self.cfg.depth;
        let map: Cache = DashMap::with_hasher(AHasher::new());
        let out_vec: Vec<(usize, BranchEval)> = Move::ALL
            .par_iter()
            .enumerate()
            .map(|(i, &dir)| {
                let new_board = board.shift(dir);
                if new_board == board {
                    (i, BranchEval { dir, ev: 0.0, legal: false })
                } else {
                    let ev = self.chance_node(new_board, depth - 1, &map);
                    (i, BranchEval { dir, ev, legal: true })
                }
            })
            .collect();
        let mut out = [
            BranchEval { dir: Move::Up, ev: 0.0, legal: false },
            BranchEval { dir: Move::Down, ev: 0.0, legal: false },
            BranchEval { dir: Move::Left, ev: 0.0, legal: false },
            BranchEval { dir: Move::Right, ev: 0.0, legal: false },
        ];
        for (i, be) in out_vec {
            out[i] = be;
        }
        // Node counting is not tracked across worker threads.
        self.stats.nodes = 0;
        out
    }

    /// EV at the root max node: the best branch EV, or the heuristic leaf
    /// value on a terminal board.
    pub fn state_value(&mut self, board: Board) -> f64 {
        let branches = self.branch_evals(board);
        let best = branches
            .iter()
            .filter(|branch| branch.legal)
            .map(|branch| branch.ev)
            .fold(f64::NEG_INFINITY, f64::max);
        if best == f64::NEG_INFINITY {
            // Terminal board: the root itself is the leaf.
            self.leaf(board)
        } else {
            best
        }
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

    fn max_node(&self, board: Board, depth: u64, map: &Cache) -> f64 {
        if depth == 0 {
            return self.leaf(board);
        }
        let successors: Vec<Board> = Move::ALL
            .iter()
            .map(|&dir| board.shift(dir))
            .filter(|&next| next != board)
            .collect();
        if successors.is_empty() {
            // Zero legal moves: game over, evaluate as a leaf.
            return self.leaf(board);
        }
        let ParThresholds { max_par_depth, .. } = self.cfg.par_thresholds;
        if depth >= max_par_depth {
            successors
                .par_iter()
                .map(|&next| self.chance_node(next, depth - 1, map))
                .reduce(|| f64::NEG_INFINITY, f64::max)
        } else {
            successors
                .iter()
                .map(|&next| self.chance_node(next, depth - 1, map))
                .fold(f64::NEG_INFINITY, f64::max)
        }
    }

    fn chance_node(&self, board: Board, depth: u64, map: &Cache) -> f64 {
        if depth == 0 {
            return self.leaf(board);
        }
        if self.cfg.cache_enabled {
            if let Some(entry) = map.get(&(board, depth)) {
                return *entry;
            }
        }
        let num_empty = board.count_empty() as usize;
        if num_empty == 0 {
            return self.leaf(board);
        }
        let mut slots = Vec::with_capacity(num_empty);
        let mut tiles_searched = 0;
        let mut tmp = board.raw();
        let mut insert_tile = 1u64;
        while tiles_searched < num_empty {
            if (tmp & 0xf) == 0 {
                slots.push(insert_tile);
                tiles_searched += 1;
            }
            tmp >>= 4;
            insert_tile <<= 4;
        }
        let slot_ev = |ins: u64| {
            let with_2 = Board::from_raw(board.raw() | ins);
            let with_4 = Board::from_raw(board.raw() | (ins << 1));
            self.max_node(with_2, depth - 1, map) * PROB_TILE_2
                + self.max_node(with_4, depth - 1, map) * PROB_TILE_4
        };
        let ParThresholds { par_depth, par_slots, .. } = self.cfg.par_thresholds;
        // Collect in slot order, sum sequentially: the association order
        // matches the sequential search exactly.
        let ev: f64 = if depth >= par_depth && slots.len() >= par_slots {
            let contributions: Vec<f64> = slots.par_iter().map(|&ins| slot_ev(ins)).collect();
            contributions.iter().sum::<f64>() / num_empty as f64
        } else {
            slots.iter().map(|&ins| slot_ev(ins)).sum::<f64>() / num_empty as f64
        };
        if self.cfg.cache_enabled {
            map.insert((board, depth), ev);
        }
        ev
    }
}

impl Default for ExpectimaxParallel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expectimax::{Expectimax, SearchConfig};
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn it_matches_sequential_results() {
        let cfg = SearchConfig { depth: 3, ..SearchConfig::default() };
        let mut seq = Expectimax::with_config(cfg.clone());
        let mut par = ExpectimaxParallel::with_config(cfg);
        let mut rng = StdRng::seed_from_u64(21);
        let mut board = Board::EMPTY.with_random_tile(&mut rng).with_random_tile(&mut rng);
        for _ in 0..40 {
            let chosen = seq.best_move(board);
            assert_eq!(chosen, par.best_move(board));
            let sv = seq.state_value(board);
            let pv = par.state_value(board);
            assert!((sv - pv).abs() < 1e-9, "state values diverged: {sv} vs {pv}");
            match chosen {
                Some(dir) => board = board.make_move(dir, &mut rng),
                None => break,
            }
        }
    }

    #[test]
    fn it_forces_parallel_thresholds() {
        // Thresholds low enough that every node takes the parallel path.
        let cfg = SearchConfig {
            depth: 3,
            par_thresholds: ParThresholds { max_par_depth: 1, par_depth: 1, par_slots: 1 },
            ..SearchConfig::default()
        };
        let mut par = ExpectimaxParallel::with_config(cfg.clone());
        let mut seq = Expectimax::with_config(cfg);
        let board = Board::from_raw(0x0012_0031_1200_2100);
        assert_eq!(par.best_move(board), seq.best_move(board));
        let sv = seq.state_value(board);
        let pv = par.state_value(board);
        assert!((sv - pv).abs() < 1e-9);
    }

    #[test]
    fn it_terminal_board_returns_no_move() {
        let mut par = ExpectimaxParallel::new();
        let board = Board::from_raw(0x1234_5678_1234_5678);
        assert_eq!(par.best_move(board), None);
        let (mv, branches) = par.best_move_with_branches(board);
        assert_eq!(mv, None);
        assert!(branches.iter().all(|b| !b.legal));
    }
}
