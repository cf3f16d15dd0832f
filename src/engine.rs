use rand::Rng;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// A direction to move/merge tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Move {
    Up,
    Down,
    Left,
    Right,
}

impl Move {
    /// Candidate order used by search and greedy selection. Ties between
    /// equally-valued moves resolve toward the earlier entry.
    pub const ALL: [Move; 4] = [Move::Up, Move::Down, Move::Left, Move::Right];
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Move::Up => "UP",
            Move::Down => "DOWN",
            Move::Left => "LEFT",
            Move::Right => "RIGHT",
        };
        write!(f, "{}", s)
    }
}

/// An unrecognized direction token. Parsing is the only place an invalid
/// direction can exist; it never silently no-ops.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid direction: {0:?}")]
pub struct ParseMoveError(String);

impl FromStr for Move {
    type Err = ParseMoveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "UP" | "U" => Ok(Move::Up),
            "DOWN" | "D" => Ok(Move::Down),
            "LEFT" | "L" => Ok(Move::Left),
            "RIGHT" | "R" => Ok(Move::Right),
            _ => Err(ParseMoveError(s.to_string())),
        }
    }
}

const LINE_TABLE_SIZE: usize = 0x1_0000; // 65,536 possible 16-bit lines

struct Stores {
    shift_left: Box<[u64]>,
    shift_right: Box<[u64]>,
    shift_up: Box<[u64]>,
    shift_down: Box<[u64]>,
    delta_left: Box<[Score]>,
    delta_right: Box<[Score]>,
}

type BoardRaw = u64;
type Line = u64;
type Tile = u64;
type Score = u64;

/// Packed 4x4 2048 board as 16 4-bit nibbles in a `u64`.
///
/// Each nibble holds the log2 exponent of its cell (0 = empty, k = tile 2^k),
/// row-major with the top-left cell in the most significant nibble. Public
/// methods provide safe operations while preserving an escape hatch to the
/// raw packed representation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Board(BoardRaw);

/// Result of sliding/merging in one direction (no random insert).
///
/// `score_delta` is the sum of merged resulting tile values for this move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    pub board: Board,
    pub score_delta: Score,
}

impl Board {
    /// A constant empty board (all zeros).
    pub const EMPTY: Board = Board(0);

    /// Construct a `Board` from its raw packed representation.
    #[inline]
    pub fn from_raw(raw: BoardRaw) -> Self {
        Board(raw)
    }

    /// Consume this `Board`, returning the raw packed `u64`.
    #[inline]
    pub fn into_raw(self) -> BoardRaw {
        self.0
    }

    /// Borrow the raw packed `u64` for this `Board`.
    #[inline]
    pub fn raw(&self) -> BoardRaw {
        self.0
    }

    /// Construct a board from 16 row-major cell exponents (0 = empty).
    pub fn from_exponents(exponents: [u8; 16]) -> Self {
        let raw = exponents
            .iter()
            .fold(0u64, |acc, &e| (acc << 4) | (e as u64 & 0xf));
        Board(raw)
    }

    /// Return the 16 row-major cell exponents.
    pub fn to_exponents(self) -> [u8; 16] {
        let mut out = [0u8; 16];
        for (idx, slot) in out.iter_mut().enumerate() {
            *slot = self.exponent(idx);
        }
        out
    }

    /// Slide/merge tiles in `dir` and report the merge score delta.
    ///
    /// No random insert happens here; an illegal move returns the input
    /// board unchanged with a zero delta.
    ///
    /// ```
    /// use twenty48_ai::engine::{self as GameEngine, Board, Move};
    /// GameEngine::new();
    /// let b = Board::from_raw(0x1100_0000_0000_0000);
    /// let out = b.apply_move(Move::Left);
    /// assert_eq!(out.board, Board::from_raw(0x2000_0000_0000_0000));
    /// assert_eq!(out.score_delta, 4);
    /// ```
    #[inline]
    pub fn apply_move(self, dir: Move) -> MoveOutcome {
        match dir {
            Move::Left | Move::Right => apply_rows(self, dir),
            Move::Up | Move::Down => apply_cols(self, dir),
        }
    }

    /// Return the board resulting from sliding/merging tiles in `dir`.
    ///
    /// Hot-path variant of [`Self::apply_move`] for callers that do not
    /// need the score delta.
    #[inline]
    pub fn shift(self, dir: Move) -> Self {
        self.apply_move(dir).board
    }

    /// True iff moving in `dir` changes the board.
    #[inline]
    pub fn is_legal(self, dir: Move) -> bool {
        self.shift(dir) != self
    }

    /// All directions that change the board, in `Move::ALL` order.
    pub fn legal_moves(self) -> Vec<Move> {
        Move::ALL.iter().copied().filter(|&d| self.is_legal(d)).collect()
    }

    /// Return true if no legal moves remain.
    #[inline]
    pub fn is_game_over(self) -> bool {
        Move::ALL.iter().all(|&d| !self.is_legal(d))
    }

    /// Insert a random 2 (90%) or 4 (10%) tile into a uniformly chosen empty
    /// slot. A full board is returned unchanged.
    ///
    /// Deterministic example using a seeded RNG:
    /// ```
    /// use twenty48_ai::engine::Board;
    /// use rand::{rngs::StdRng, SeedableRng};
    /// let mut rng = StdRng::seed_from_u64(123);
    /// let b = Board::EMPTY.with_random_tile(&mut rng).with_random_tile(&mut rng);
    /// assert_eq!(b.count_empty(), 14);
    /// ```
    #[inline]
    pub fn with_random_tile<R: Rng + ?Sized>(self, rng: &mut R) -> Self {
        let num_empty = count_empty(self);
        if num_empty == 0 {
            return self;
        }
        let mut index = rng.gen_range(0..num_empty);
        let mut tmp = self.0;
        let mut tile = generate_random_tile(rng);
        loop {
            while (tmp & 0xf) != 0 {
                tmp >>= 4;
                tile <<= 4;
            }
            if index == 0 {
                break;
            }
            index -= 1;
            tmp >>= 4;
            tile <<= 4;
        }
        Board(self.0 | tile)
    }

    /// Convenience: like `with_random_tile` but uses thread-local RNG.
    #[inline]
    pub fn with_random_tile_thread(self) -> Self {
        let mut rng = rand::thread_rng();
        self.with_random_tile(&mut rng)
    }

    /// Perform a move then insert a random tile if the move changed the
    /// board, using the provided RNG.
    #[inline]
    pub fn make_move<R: Rng + ?Sized>(self, direction: Move, rng: &mut R) -> Self {
        let moved = self.shift(direction);
        if moved != self {
            moved.with_random_tile(rng)
        } else {
            self
        }
    }

    /// Count the number of empty cells on the board.
    #[inline]
    pub fn count_empty(self) -> u64 {
        count_empty(self)
    }

    /// All `(row, col)` coordinates of empty cells, row-major.
    pub fn empty_cells(self) -> Vec<(u8, u8)> {
        (0..16)
            .filter(|&idx| self.exponent(idx) == 0)
            .map(|idx| ((idx / 4) as u8, (idx % 4) as u8))
            .collect()
    }

    /// The cell exponent at row-major index `idx` (0 = empty).
    #[inline]
    pub fn exponent(self, idx: usize) -> u8 {
        ((self.0 >> (60 - 4 * idx)) & 0xf) as u8
    }

    /// The cell value at row-major index `idx` (0 if empty), e.g. 2, 4, 8.
    #[inline]
    pub fn tile_value(self, idx: usize) -> u32 {
        match self.exponent(idx) {
            0 => 0,
            e => 1 << e,
        }
    }

    /// The highest tile value present on the board (0 for an empty board).
    pub fn highest_tile(self) -> u32 {
        (0..16).map(|idx| self.tile_value(idx)).max().unwrap_or(0)
    }

    /// The board transposed across its main diagonal.
    #[inline]
    pub fn transposed(self) -> Self {
        Board(transpose(self.0))
    }

    /// The board mirrored left-to-right (each row reversed).
    #[inline]
    pub fn mirror_horizontal(self) -> Self {
        let x = self.0;
        Board(
            ((x & 0x000F_000F_000F_000F) << 12)
                | ((x & 0x00F0_00F0_00F0_00F0) << 4)
                | ((x & 0x0F00_0F00_0F00_0F00) >> 4)
                | ((x & 0xF000_F000_F000_F000) >> 12),
        )
    }

    /// The board mirrored top-to-bottom (row order reversed).
    #[inline]
    pub fn mirror_vertical(self) -> Self {
        let x = self.0;
        Board(
            (x << 48)
                | ((x << 16) & 0x0000_FFFF_0000_0000)
                | ((x >> 16) & 0x0000_0000_FFFF_0000)
                | (x >> 48),
        )
    }

    /// The board rotated 90 degrees counterclockwise.
    #[inline]
    pub fn rotate_90(self) -> Self {
        self.transposed().mirror_vertical()
    }

    /// The board rotated 270 degrees counterclockwise (90 clockwise).
    #[inline]
    pub fn rotate_270(self) -> Self {
        self.transposed().mirror_horizontal()
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Board({:#018x})", self.0)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells: Vec<_> = (0..16).map(|idx| format_val(self.tile_value(idx))).collect();
        write!(
            f,
            "\n{}|{}|{}|{}\n--------------------------------\n{}|{}|{}|{}\n--------------------------------\n{}|{}|{}|{}\n--------------------------------\n{}|{}|{}|{}\n",
            cells[0], cells[1], cells[2], cells[3],
            cells[4], cells[5], cells[6], cells[7],
            cells[8], cells[9], cells[10], cells[11],
            cells[12], cells[13], cells[14], cells[15]
        )
    }
}

impl From<BoardRaw> for Board {
    fn from(v: BoardRaw) -> Self {
        Board::from_raw(v)
    }
}

impl From<Board> for BoardRaw {
    fn from(b: Board) -> Self {
        b.into_raw()
    }
}

/// A committed game: the real board plus the accumulated merge score.
///
/// The score increases only by the `score_delta` of committed moves; it is
/// not recomputable from the board alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Game {
    board: Board,
    score: Score,
}

impl Game {
    /// Start a fresh game: empty board plus two random tiles, score 0.
    pub fn new<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let board = Board::EMPTY.with_random_tile(rng).with_random_tile(rng);
        Game { board, score: 0 }
    }

    /// Rehydrate a simulated state.
    pub fn from_parts(board: Board, score: Score) -> Self {
        Game { board, score }
    }

    #[inline]
    pub fn board(&self) -> Board {
        self.board
    }

    #[inline]
    pub fn score(&self) -> Score {
        self.score
    }

    /// The successor state for `dir` without the random spawn, or `None`
    /// if the move is illegal.
    pub fn peek(&self, dir: Move) -> Option<Game> {
        let out = self.board.apply_move(dir);
        (out.board != self.board).then(|| Game {
            board: out.board,
            score: self.score + out.score_delta,
        })
    }

    /// Commit a move and spawn a random tile. Returns false (state
    /// untouched) if the move was illegal.
    pub fn advance<R: Rng + ?Sized>(&mut self, dir: Move, rng: &mut R) -> bool {
        match self.peek(dir) {
            Some(next) => {
                self.board = next.board.with_random_tile(rng);
                self.score = next.score;
                true
            }
            None => false,
        }
    }

    #[inline]
    pub fn is_over(&self) -> bool {
        self.board.is_game_over()
    }
}

/// Initialize internal tables on first use. Safe to call multiple times.
pub fn new() {
    STORES.get_or_init(create_stores);
}

// Credit to Nneonneo
pub(crate) fn transpose(x: BoardRaw) -> BoardRaw {
    let a1 = x & 0xF0F0_0F0F_F0F0_0F0F;
    let a2 = x & 0x0000_F0F0_0000_F0F0;
    let a3 = x & 0x0F0F_0000_0F0F_0000;
    let a = a1 | (a2 << 12) | (a3 >> 12);
    let b1 = a & 0xFF00_FF00_00FF_00FF;
    let b2 = a & 0x00FF_00FF_0000_0000;
    let b3 = a & 0x0000_0000_FF00_FF00;
    b1 | (b2 >> 24) | (b3 << 24)
}

pub(crate) fn extract_line(board: BoardRaw, line_idx: u64) -> Line {
    (board >> ((3 - line_idx) * 16)) & 0xffff
}

pub(crate) fn line_to_tiles(line: Line) -> [Tile; 4] {
    [
        (line >> 12) & 0xf,
        (line >> 8) & 0xf,
        (line >> 4) & 0xf,
        line & 0xf,
    ]
}

static STORES: OnceLock<Stores> = OnceLock::new();

fn create_stores() -> Stores {
    // Allocate on the heap to avoid large stack frames
    let mut shift_left = vec![0u64; LINE_TABLE_SIZE];
    let mut shift_right = vec![0u64; LINE_TABLE_SIZE];
    let mut shift_up = vec![0u64; LINE_TABLE_SIZE];
    let mut shift_down = vec![0u64; LINE_TABLE_SIZE];
    let mut delta_left = vec![0u64; LINE_TABLE_SIZE];
    let mut delta_right = vec![0u64; LINE_TABLE_SIZE];

    for val in 0..LINE_TABLE_SIZE {
        let line = val as Line;
        let (left, dl) = merge_line(line, Move::Left);
        let (right, dr) = merge_line(line, Move::Right);
        shift_left[val] = tiles_to_row(&left);
        shift_right[val] = tiles_to_row(&right);
        shift_up[val] = tiles_to_col(&left);
        shift_down[val] = tiles_to_col(&right);
        delta_left[val] = dl;
        delta_right[val] = dr;
    }

    Stores {
        shift_left: shift_left.into_boxed_slice(),
        shift_right: shift_right.into_boxed_slice(),
        shift_up: shift_up.into_boxed_slice(),
        shift_down: shift_down.into_boxed_slice(),
        delta_left: delta_left.into_boxed_slice(),
        delta_right: delta_right.into_boxed_slice(),
    }
}

#[inline(always)]
fn stores() -> &'static Stores {
    STORES
        .get()
        .expect("Engine stores not initialized; call engine::new() first")
}

#[inline(always)]
fn get_line_entry(table: &[u64], idx: u16) -> u64 {
    debug_assert!((idx as usize) < LINE_TABLE_SIZE);
    unsafe { *table.get_unchecked(idx as usize) }
}

fn generate_random_tile<R: Rng + ?Sized>(rng: &mut R) -> Tile {
    if rng.gen_range(0..10) < 9 {
        1
    } else {
        2
    }
}

fn apply_rows(board: Board, dir: Move) -> MoveOutcome {
    let s = stores();
    let (table, deltas) = match dir {
        Move::Left => (&s.shift_left, &s.delta_left),
        Move::Right => (&s.shift_right, &s.delta_right),
        _ => panic!("Trying to move up or down in apply rows"),
    };
    let mut raw = 0u64;
    let mut score_delta = 0;
    for row_idx in 0..4u64 {
        let row_val = extract_line(board.0, row_idx) as u16;
        raw |= get_line_entry(table, row_val) << (48 - 16 * row_idx);
        score_delta += get_line_entry(deltas, row_val);
    }
    MoveOutcome { board: Board(raw), score_delta }
}

fn apply_cols(board: Board, dir: Move) -> MoveOutcome {
    let transpose_board = transpose(board.0);
    let s = stores();
    let (table, deltas) = match dir {
        Move::Up => (&s.shift_up, &s.delta_left),
        Move::Down => (&s.shift_down, &s.delta_right),
        _ => panic!("Trying to move left or right in apply cols"),
    };
    let mut raw = 0u64;
    let mut score_delta = 0;
    for col_idx in 0..4u64 {
        let col_val = extract_line(transpose_board, col_idx) as u16;
        raw |= get_line_entry(table, col_val) << (12 - 4 * col_idx);
        score_delta += get_line_entry(deltas, col_val);
    }
    MoveOutcome { board: Board(raw), score_delta }
}

/// Left-merge of one 4-tile line is the single source of truth for every
/// direction: RIGHT is the left merge of the reversed line, reversed back;
/// UP/DOWN reuse the row results on transposed boards via the column tables.
fn merge_line(line: Line, direction: Move) -> ([Tile; 4], Score) {
    let tiles = line_to_tiles(line);
    match direction {
        Move::Left | Move::Up => merge_tiles_left(tiles),
        Move::Right | Move::Down => {
            let mut rev = tiles;
            rev.reverse();
            let (mut merged, delta) = merge_tiles_left(rev);
            merged.reverse();
            (merged, delta)
        }
    }
}

fn merge_tiles_left(tiles: [Tile; 4]) -> ([Tile; 4], Score) {
    let mut compact = [0u64; 4];
    let mut n = 0;
    for &t in &tiles {
        if t != 0 {
            compact[n] = t;
            n += 1;
        }
    }
    let mut out = [0u64; 4];
    let mut delta = 0;
    let (mut i, mut pos) = (0, 0);
    while i < n {
        if i + 1 < n && compact[i] == compact[i + 1] {
            // A merged tile never merges again within the same move.
            let merged = compact[i] + 1;
            out[pos] = merged;
            delta += 1u64 << merged;
            i += 2;
        } else {
            out[pos] = compact[i];
            i += 1;
        }
        pos += 1;
    }
    (out, delta)
}

fn tiles_to_row(tiles: &[Tile; 4]) -> Line {
    tiles[0] << 12 | tiles[1] << 8 | tiles[2] << 4 | tiles[3]
}

fn tiles_to_col(tiles: &[Tile; 4]) -> Line {
    tiles[0] << 48 | tiles[1] << 32 | tiles[2] << 16 | tiles[3]
}

// https://stackoverflow.com/questions/38225571/count-number-of-zero-nibbles-in-an-unsigned-64-bit-integer
fn count_empty(board: Board) -> u64 {
    let mut board_copy = board.0;
    board_copy |= board_copy >> 1;
    board_copy |= board_copy >> 2;
    board_copy &= 0x1111_1111_1111_1111;
    16 - board_copy.count_ones() as u64
}

fn format_val(val: u32) -> String {
    match val {
        0 => String::from("       "),
        x => {
            let mut x = x.to_string();
            while x.len() < 7 {
                match x.len() {
                    6 => x = format!(" {}", x),
                    _ => x = format!(" {} ", x),
                }
            }
            x
        }
    }
}
