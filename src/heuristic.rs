//! Static board evaluation: empty cells, monotonicity, smoothness, max tile.
//!
//! All terms operate on raw tile values (2, 4, 8, ...), not exponents. Line
//! terms are precomputed for every 16-bit line once per process; the weights
//! stay out of the tables so they remain pure configuration.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::engine::{self, Board};

/// Tunable term weights for [`evaluate`]. These are configuration, not
/// derived quantities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeuristicWeights {
    /// Reward per empty cell.
    pub empty: f64,
    /// Weight on the (negative) monotonicity disorder term.
    pub monotonicity: f64,
    /// Weight on the (negative) smoothness jump term.
    pub smoothness: f64,
    /// Weight on the highest tile value.
    pub max_tile: f64,
}

impl Default for HeuristicWeights {
    fn default() -> Self {
        Self {
            empty: 2.5,
            monotonicity: 1.2,
            smoothness: 0.8,
            max_tile: 1.0,
        }
    }
}

/// Per-line components, combined with the weights at evaluation time.
#[derive(Clone, Copy)]
struct LineTerms {
    empty: f64,
    disorder: f64,
    jump: f64,
    max: f64,
}

static LINE_TERMS: OnceLock<Box<[LineTerms]>> = OnceLock::new();

pub(crate) fn warm() {
    let _ = line_terms();
}

fn line_terms() -> &'static [LineTerms] {
    LINE_TERMS
        .get_or_init(|| {
            (0..0x1_0000u64)
                .map(calc_line_terms)
                .collect::<Vec<_>>()
                .into_boxed_slice()
        })
        .as_ref()
}

fn calc_line_terms(line: u64) -> LineTerms {
    let values = line_values(line);
    LineTerms {
        empty: values.iter().filter(|&&v| v == 0.0).count() as f64,
        disorder: calc_disorder(&values),
        jump: calc_jump(&values),
        max: values.iter().copied().fold(0.0, f64::max),
    }
}

fn line_values(line: u64) -> [f64; 4] {
    let tiles = engine::line_to_tiles(line);
    let mut values = [0.0; 4];
    for (slot, &exp) in values.iter_mut().zip(tiles.iter()) {
        if exp != 0 {
            *slot = (1u64 << exp) as f64;
        }
    }
    values
}

/// Sum of positive forward and backward differences over the three adjacent
/// gaps; the smaller of the two rewards whichever ordering is closer to
/// achieved.
fn calc_disorder(values: &[f64; 4]) -> f64 {
    let mut increasing = 0.0;
    let mut decreasing = 0.0;
    for i in 0..3 {
        increasing += (values[i + 1] - values[i]).max(0.0);
        decreasing += (values[i] - values[i + 1]).max(0.0);
    }
    increasing.min(decreasing)
}

fn calc_jump(values: &[f64; 4]) -> f64 {
    (0..3).map(|i| (values[i] - values[i + 1]).abs()).sum()
}

/// Static score for a board snapshot:
///
/// `empty * #empty + monotonicity * mono(board) + smoothness * smooth(board)
///  + max_tile * highest value`
///
/// where `mono` and `smooth` are the (non-positive) values returned by
/// [`monotonicity`] and [`smoothness`].
pub fn evaluate(board: Board, weights: &HeuristicWeights) -> f64 {
    let terms = line_terms();
    let transposed = engine::transpose(board.raw());
    let mut empty = 0.0;
    let mut disorder = 0.0;
    let mut jump = 0.0;
    let mut max: f64 = 0.0;
    for line_idx in 0..4 {
        let row_val = engine::extract_line(board.raw(), line_idx);
        let col_val = engine::extract_line(transposed, line_idx);
        let row = unsafe { terms.get_unchecked(row_val as usize) };
        let col = unsafe { terms.get_unchecked(col_val as usize) };
        empty += row.empty;
        disorder += row.disorder + col.disorder;
        jump += row.jump + col.jump;
        max = max.max(row.max);
    }
    weights.empty * empty - weights.monotonicity * disorder - weights.smoothness * jump
        + weights.max_tile * max
}

/// Negated disorder total over all 4 rows and 4 columns. Zero for a board
/// whose every line is already ordered in one direction.
pub fn monotonicity(board: Board) -> f64 {
    let terms = line_terms();
    let transposed = engine::transpose(board.raw());
    -(0..4).fold(0.0, |acc, line_idx| {
        let row_val = engine::extract_line(board.raw(), line_idx);
        let col_val = engine::extract_line(transposed, line_idx);
        acc + terms[row_val as usize].disorder + terms[col_val as usize].disorder
    })
}

/// Negated sum of absolute adjacent differences in every row and column.
pub fn smoothness(board: Board) -> f64 {
    let terms = line_terms();
    let transposed = engine::transpose(board.raw());
    -(0..4).fold(0.0, |acc, line_idx| {
        let row_val = engine::extract_line(board.raw(), line_idx);
        let col_val = engine::extract_line(transposed, line_idx);
        acc + terms[row_val as usize].jump + terms[col_val as usize].jump
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Board;

    const EPS: f64 = 1e-9;

    #[test]
    fn it_empty_board() {
        warm();
        let weights = HeuristicWeights::default();
        // 16 empty cells, no tiles: 2.5 * 16.
        assert!((evaluate(Board::EMPTY, &weights) - 40.0).abs() < EPS);
        assert_eq!(monotonicity(Board::EMPTY), 0.0);
        assert_eq!(smoothness(Board::EMPTY), 0.0);
    }

    #[test]
    fn it_single_tile() {
        warm();
        let board = Board::from_raw(0x1000_0000_0000_0000);
        // Row 0 and column 0 each jump 2 -> 0 once: smoothness -4. The lone
        // tile is already ordered, so monotonicity stays 0.
        assert_eq!(monotonicity(board), 0.0);
        assert!((smoothness(board) + 4.0).abs() < EPS);
        let weights = HeuristicWeights::default();
        // 15 empties, max tile 2, smoothness -4.
        let expected = 2.5 * 15.0 + 0.8 * -4.0 + 2.0;
        assert!((evaluate(board, &weights) - expected).abs() < EPS);
    }

    #[test]
    fn it_monotonicity_prefers_ordered_lines() {
        warm();
        // [2,4,8,16] is strictly increasing: disorder 0.
        let ordered = Board::from_raw(0x1234_0000_0000_0000);
        // [4,2,8,2] mixes directions on the same row.
        let disordered = Board::from_raw(0x2131_0000_0000_0000);
        assert!(monotonicity(ordered) > monotonicity(disordered));
        // Row [4,2,8,2]: increasing (8-2)=6, decreasing (4-2)+(8-2)=8,
        // min = 6 in raw values: 4->2 dec 2, 2->8 inc 6, 8->2 dec 6.
        // increasing = 6, decreasing = 8 -> disorder 6. Columns are
        // single-tile and ordered.
        assert!((monotonicity(disordered) + 6.0).abs() < EPS);
    }

    #[test]
    fn it_smoothness_penalizes_jumps() {
        warm();
        // Row [2,2,2,2]: no jumps inside the row; each column jumps 2 -> 0.
        let flat = Board::from_raw(0x1111_0000_0000_0000);
        assert!((smoothness(flat) + 8.0).abs() < EPS);
        // Row [2,256,2,256] alternates hard.
        let spiky = Board::from_raw(0x1818_0000_0000_0000);
        assert!(smoothness(spiky) < smoothness(flat));
    }

    #[test]
    fn it_weights_are_configuration() {
        warm();
        let board = Board::from_raw(0x1234_0000_0000_0000);
        let zero = HeuristicWeights {
            empty: 0.0,
            monotonicity: 0.0,
            smoothness: 0.0,
            max_tile: 1.0,
        };
        // With only the max-tile term the score is exactly the highest value.
        assert!((evaluate(board, &zero) - 16.0).abs() < EPS);
        let doubled = HeuristicWeights {
            empty: 5.0,
            ..HeuristicWeights::default()
        };
        let base = evaluate(board, &HeuristicWeights::default());
        assert!((evaluate(board, &doubled) - base - 2.5 * 12.0).abs() < EPS);
    }
}
