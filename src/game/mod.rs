//! Game Logic Module
//!
//! All board simulation code. 100% deterministic given a seed.
//!
//! ## Module Structure
//!
//! - `level`: Level table, goals, obstacle tiers
//! - `generator`: Initial boards with no pre-existing runs
//! - `detector`: Runs, intersections, special spawns, chain expansion
//! - `gravity`: Column compaction and refill
//! - `streak`: Streak meter and score multipliers
//! - `cascade`: Resolution loop (detect, score, clear, gravity)
//! - `moves`: Swap, special combo and power-up executor
//! - `state`: Owned board state threaded through every action
//! - `events`: Pass-boundary events for animation and replay
//! - `replay`: Re-run recorded actions and compare hashes

pub mod level;
pub mod generator;
pub mod detector;
pub mod gravity;
pub mod streak;
pub mod cascade;
pub mod moves;
pub mod state;
pub mod events;
pub mod replay;

// Re-export key types
pub use level::{LevelConfig, LevelGoal, GoalTarget, ObstacleConfig, PowerUp, PowerUpInventory};
pub use detector::{MatchResult, SpecialSpawn};
pub use cascade::{CascadeConfig, CascadeState, MoveReport, PassSummary, ScoreAward, StepOutcome};
pub use moves::{Action, MoveError};
pub use state::{BoardState, Phase};
pub use events::GameEvent;
