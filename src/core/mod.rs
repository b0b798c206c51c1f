//! Core deterministic primitives.
//!
//! The board data model plus the seedable RNG and state hasher that every
//! higher layer builds on.

pub mod token;
pub mod grid;
pub mod rng;
pub mod hash;

// Re-export core types
pub use token::{Color, Token, TokenKind, ClearedToken};
pub use grid::{Grid, Position, GridParseError, is_adjacent};
pub use rng::{DeterministicRng, RandomSource};
pub use hash::{compute_state_hash, StateHash};
