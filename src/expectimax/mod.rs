//! Expectimax search policy (single-threaded and parallel) for 2048.
//!
//! This module provides two policy implementations:
//! - [`Expectimax`]: single-threaded depth-bounded expectimax.
//! - [`ExpectimaxParallel`]: rayon-based parallel expectimax.
//!
//! Both variants share the same public surface and return identical results;
//! the parallel search only changes how sibling branches are scheduled.
//!
//! Leaf positions (depth exhausted or no legal move) are scored with the
//! [`crate::heuristic`] evaluator, never with the raw game score.
//!
//! Quick start
//! ```
//! use twenty48_ai::engine::{self as GameEngine, Board};
//! use twenty48_ai::expectimax::{Expectimax, ExpectimaxParallel};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! GameEngine::new();
//! let mut rng = StdRng::seed_from_u64(123);
//! let b0 = Board::EMPTY
//!     .with_random_tile(&mut rng)
//!     .with_random_tile(&mut rng);
//!
//! let mut ex = Expectimax::new();
//! let m = ex.best_move(b0);
//! assert!(m.is_some());
//!
//! let mut ex_par = ExpectimaxParallel::new();
//! assert_eq!(ex_par.best_move(b0), m);
//! ```

use crate::engine;
use crate::heuristic::{self, HeuristicWeights};

mod search_par;
mod search_seq;

pub use search_par::ExpectimaxParallel;
pub use search_seq::Expectimax;

/// Probability of a spawned tile being a 2 (exponent 1); the remainder
/// spawns a 4.
pub(crate) const PROB_TILE_2: f64 = 0.9;
pub(crate) const PROB_TILE_4: f64 = 0.1;

/// Configurable knobs for Expectimax, fixed at construction.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Search depth in plies (max and chance layers each consume one).
    /// Must be at least 1.
    pub depth: u64,
    /// Enable/disable the transposition cache. Purely a performance
    /// toggle; returned values are identical either way.
    pub cache_enabled: bool,
    /// Evaluator weights used at leaf positions.
    pub weights: HeuristicWeights,
    /// Thresholds used only by the parallel implementation.
    pub par_thresholds: ParThresholds,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            depth: 3,
            cache_enabled: true,
            weights: HeuristicWeights::default(),
            par_thresholds: ParThresholds::default(),
        }
    }
}

/// Thresholds used to balance parallel overheads: shallow subtrees run
/// sequentially where task fan-out costs more than it buys.
#[derive(Debug, Clone, Copy)]
pub struct ParThresholds {
    /// Minimum remaining depth for parallel max-node expansion.
    pub max_par_depth: u64,
    /// Minimum remaining depth for parallel chance-node expansion.
    pub par_depth: u64,
    /// Minimum empty-slot count for parallel chance-node expansion.
    pub par_slots: usize,
}

impl Default for ParThresholds {
    fn default() -> Self {
        Self {
            max_par_depth: 4,
            par_depth: 4,
            par_slots: 6,
        }
    }
}

/// Per-branch expected value at the root (no normalization).
///
/// - `ev` is the expected value for taking `dir` from the current board.
/// - `legal` is false when the move is a no-op for the current board.
#[derive(Debug, Clone, Copy)]
pub struct BranchEval {
    pub dir: engine::Move,
    pub ev: f64,
    pub legal: bool,
}

/// Basic search stats for a single evaluation.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchStats {
    pub nodes: u64,
    pub peak_nodes: u64,
}

/// Common helper for constructors to ensure tables are initialized.
fn warm_tables() {
    // Safe to call multiple times.
    engine::new();
    heuristic::warm();
}

/// Pick the best legal branch, resolving ties toward the earlier direction
/// so sequential and parallel searches agree.
pub(crate) fn best_branch(branches: &[BranchEval; 4]) -> Option<engine::Move> {
    let mut best: Option<(engine::Move, f64)> = None;
    for branch in branches {
        if !branch.legal {
            continue;
        }
        match best {
            Some((_, ev)) if branch.ev <= ev => {}
            _ => best = Some((branch.dir, branch.ev)),
        }
    }
    best.map(|(dir, _)| dir)
}
