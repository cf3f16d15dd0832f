//! twenty48-ai: a 2048 game engine with two decision layers
//!
//! This crate provides:
//! - A compact `Board` type with ergonomic methods (`apply_move`, `shift`,
//!   `with_random_tile`, ...) plus a score-tracking `Game` wrapper
//! - A static heuristic evaluator (`heuristic` module)
//! - An Expectimax policy (`expectimax` module) with single-threaded and
//!   parallel variants
//! - An N-tuple value approximator trained online with TD(0)
//!   (`ntuple` module)
//!
//! Quick start:
//! ```
//! use twenty48_ai::engine::{self as GameEngine, Game, Move};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! // One-time table init
//! GameEngine::new();
//!
//! // Deterministic game initialization with a seeded RNG
//! let mut rng = StdRng::seed_from_u64(42);
//! let mut game = Game::new(&mut rng);
//! if game.board().is_legal(Move::Left) {
//!     game.advance(Move::Left, &mut rng);
//! }
//! assert!(game.score() < u64::MAX);
//! ```
//!
//! The policies take `Board` snapshots and return `Option<Move>`; `None`
//! means no legal move remains and the driver should treat the game as
//! over, not as an error.

pub mod engine;
pub mod expectimax;
pub mod heuristic;
pub mod ntuple;
