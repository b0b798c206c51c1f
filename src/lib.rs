//! # Candy Cascade
//!
//! Deterministic match-3 board engine: run detection, special tokens,
//! chain reactions, gravity with refill, obstacles and streak scoring.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      CANDY CASCADE                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── token.rs    - Colors, token kinds, durability           │
//! │  ├── grid.rs     - 8x8 flat grid, positions, text encoding   │
//! │  ├── rng.rs      - Injectable Xorshift128+ random source     │
//! │  └── hash.rs     - State hashing for verification            │
//! │                                                              │
//! │  game/           - Board logic (deterministic)               │
//! │  ├── level.rs    - Level table, goals, obstacle tiers        │
//! │  ├── generator.rs- Initial boards with no runs               │
//! │  ├── detector.rs - Runs, specials, chain expansion           │
//! │  ├── gravity.rs  - Column compaction and refill              │
//! │  ├── streak.rs   - Streak meter and score multipliers        │
//! │  ├── cascade.rs  - Resolution loop                           │
//! │  ├── moves.rs    - Swaps, combos, power-ups                  │
//! │  ├── state.rs    - Owned board state                         │
//! │  ├── events.rs   - Pass-boundary events                      │
//! │  └── replay.rs   - Action log and replay                     │
//! │                                                              │
//! │  external/       - Collaborators (non-deterministic edges)   │
//! │  ├── hint.rs     - Hint oracle boundary (async, timeout)     │
//! │  ├── progress.rs - Score policy and goal tallies             │
//! │  ├── persistence.rs - Checksummed save games                 │
//! │  └── session.rs  - Session facade and status                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! The `core/` and `game/` modules are **100% deterministic**:
//! - No HashMap (BTreeSet/BTreeMap for sorted iteration)
//! - No system time dependencies (streak decay takes elapsed time as input)
//! - All randomness from an injected, seeded random source
//!
//! Given the same level, seed and action log, a board replays to the
//! **identical state hash** on any platform.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod external;

// Re-export commonly used types
pub use core::grid::{Grid, Position};
pub use core::rng::{DeterministicRng, RandomSource};
pub use core::token::{Color, Token, TokenKind};
pub use game::moves::{play, Action, MoveError};
pub use game::state::BoardState;
pub use external::session::{GameSession, SessionStatus};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Board width and height
pub const GRID_SIZE: usize = 8;
