//! N-tuple value agent trained online with TD(0).
//!
//! The approximator sums weights looked up by four fixed 6-cell patterns.
//! One sparse table is shared across all patterns: a key is the packed
//! tuple of observed cell exponents, so patterns observing equal values
//! share an entry. Missing keys read as 0 and are materialized lazily on
//! update.
//!
//! Evaluation optionally averages over symmetry transforms of the board;
//! TD updates touch only the tuples of the untransformed board. That
//! asymmetry is a property of the trained behavior and is kept as is.

use std::collections::HashMap;

use ahash::RandomState;
use serde::{Deserialize, Serialize};

use crate::engine::{self, Board, Move};
use crate::heuristic::{self, HeuristicWeights};

/// The four fixed 6-cell pattern shapes, as `(row, col)` coordinates.
pub const PATTERNS: [[(usize, usize); 6]; 4] = [
    [(0, 0), (0, 1), (0, 2), (0, 3), (1, 0), (1, 1)],
    [(0, 0), (0, 1), (0, 2), (0, 3), (1, 0), (1, 2)],
    [(0, 0), (0, 1), (0, 2), (1, 0), (1, 2), (1, 3)],
    [(0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (1, 2)],
];

/// Symmetry transforms included in evaluation, each independently
/// toggle-able. The identity board is always included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SymmetryConfig {
    pub mirror_horizontal: bool,
    pub mirror_vertical: bool,
    pub rotate_90: bool,
    pub rotate_270: bool,
}

impl SymmetryConfig {
    /// Identity only.
    pub const NONE: SymmetryConfig = SymmetryConfig {
        mirror_horizontal: false,
        mirror_vertical: false,
        rotate_90: false,
        rotate_270: false,
    };

    /// All four transforms enabled.
    pub const ALL: SymmetryConfig = SymmetryConfig {
        mirror_horizontal: true,
        mirror_vertical: true,
        rotate_90: true,
        rotate_270: true,
    };
}

/// Constructor-time configuration for [`NTupleAgent`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NTupleConfig {
    /// TD step size, in `[0, 1]`.
    pub learning_rate: f64,
    /// Discount factor on the next-state value, in `[0, 1]`.
    pub discount: f64,
    pub symmetry: SymmetryConfig,
    /// Evaluator weights for the reward term of the TD update.
    pub weights: HeuristicWeights,
}

impl Default for NTupleConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            discount: 0.9,
            symmetry: SymmetryConfig::NONE,
            weights: HeuristicWeights::default(),
        }
    }
}

/// Pattern-based value approximator with a mutable weight table.
///
/// The table is owned by the agent instance and lives for the whole
/// training run; there is no global state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NTupleAgent {
    cfg: NTupleConfig,
    table: HashMap<u32, f64, RandomState>,
}

impl NTupleAgent {
    pub fn new() -> Self {
        Self::with_config(NTupleConfig::default())
    }

    pub fn with_config(cfg: NTupleConfig) -> Self {
        assert!(
            (0.0..=1.0).contains(&cfg.learning_rate),
            "learning rate must be in [0, 1]"
        );
        assert!(
            (0.0..=1.0).contains(&cfg.discount),
            "discount factor must be in [0, 1]"
        );
        engine::new();
        heuristic::warm();
        Self {
            cfg,
            table: HashMap::default(),
        }
    }

    #[inline]
    pub fn config(&self) -> &NTupleConfig {
        &self.cfg
    }

    /// Number of materialized table entries.
    #[inline]
    pub fn table_len(&self) -> usize {
        self.table.len()
    }

    /// Estimated value of a board: the tuple-weight sum, averaged over the
    /// identity board and every enabled symmetry transform.
    pub fn value(&self, board: Board) -> f64 {
        let boards = self.symmetric_boards(board);
        let total: f64 = boards.iter().map(|&b| self.lookup_sum(b)).sum();
        total / boards.len() as f64
    }

    /// TD(0) step from a committed transition `prev -> next`.
    ///
    /// The reward is the heuristic evaluation of `prev` (an immediate-reward
    /// proxy, not the merge score delta), and only the untransformed tuples
    /// of `prev` receive the update even when evaluation reads symmetric
    /// transforms.
    pub fn td_update(&mut self, prev: Board, next: Board) {
        let reward = heuristic::evaluate(prev, &self.cfg.weights);
        let td_error = reward + self.cfg.discount * self.value(next) - self.value(prev);
        let step = self.cfg.learning_rate * td_error;
        for key in extract_tuples(prev) {
            *self.table.entry(key).or_insert(0.0) += step;
        }
    }

    /// One-ply greedy move selection: apply each legal move (no chance
    /// sampling), score the successor with [`Self::value`], pick the argmax.
    /// Ties resolve toward the earlier direction in `Move::ALL`; `None`
    /// means no legal move exists.
    pub fn best_move(&self, board: Board) -> Option<Move> {
        let mut best: Option<(Move, f64)> = None;
        for &dir in &Move::ALL {
            let next = board.shift(dir);
            if next == board {
                continue;
            }
            let value = self.value(next);
            match best {
                Some((_, best_value)) if value <= best_value => {}
                _ => best = Some((dir, value)),
            }
        }
        best.map(|(dir, _)| dir)
    }

    fn lookup_sum(&self, board: Board) -> f64 {
        extract_tuples(board)
            .iter()
            .map(|key| self.table.get(key).copied().unwrap_or(0.0))
            .sum()
    }

    fn symmetric_boards(&self, board: Board) -> Vec<Board> {
        let mut boards = vec![board];
        let sym = self.cfg.symmetry;
        if sym.mirror_horizontal {
            boards.push(board.mirror_horizontal());
        }
        if sym.mirror_vertical {
            boards.push(board.mirror_vertical());
        }
        if sym.rotate_90 {
            boards.push(board.rotate_90());
        }
        if sym.rotate_270 {
            boards.push(board.rotate_270());
        }
        boards
    }
}

impl Default for NTupleAgent {
    fn default() -> Self {
        Self::new()
    }
}

/// Read the four fixed patterns off the board, each packed into a `u32`
/// key of six 4-bit cell exponents.
pub fn extract_tuples(board: Board) -> [u32; 4] {
    let mut keys = [0u32; 4];
    for (slot, pattern) in keys.iter_mut().zip(PATTERNS.iter()) {
        *slot = pattern.iter().fold(0u32, |key, &(row, col)| {
            (key << 4) | board.exponent(row * 4 + col) as u32
        });
    }
    keys
}
