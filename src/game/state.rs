//! Board State
//!
//! The single owned, explicitly passed mutable state every action runs
//! against: grid, RNG, streak, phase and the cascade in flight.

use serde::{Serialize, Deserialize};

use crate::core::grid::Grid;
use crate::core::hash::{StateHash, compute_state_hash};
use crate::core::rng::DeterministicRng;
use crate::game::cascade::CascadeState;
use crate::game::events::GameEvent;
use crate::game::generator::generate;
use crate::game::level::LevelConfig;
use crate::game::streak::Streak;

// =============================================================================
// PHASE
// =============================================================================

/// Resolution phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[derive(Default)]
pub enum Phase {
    /// At rest, accepting input
    #[default]
    Idle,
    /// A cascade is in flight; input is rejected
    Resolving,
}

// =============================================================================
// BOARD STATE
// =============================================================================

/// Complete state of one level attempt's board.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BoardState {
    /// Level this board belongs to
    pub level_id: u32,

    /// Seed the RNG started from (for verification)
    pub seed: u64,

    /// The board
    pub grid: Grid,

    /// Deterministic RNG state
    pub rng: DeterministicRng,

    /// Current phase
    pub phase: Phase,

    /// Cross-move streak
    pub streak: Streak,

    /// Cascade in flight (Some iff Resolving)
    pub cascade: Option<CascadeState>,

    /// Accepted actions so far
    pub actions: u32,

    /// Events generated since the last take
    #[serde(skip)]
    pub pending_events: Vec<GameEvent>,
}

impl BoardState {
    /// Generate a fresh board for a level.
    pub fn new(level: &LevelConfig, seed: u64) -> Self {
        let mut rng = DeterministicRng::new(seed);
        let grid = generate(level, &mut rng);
        Self::with_parts(level.id, seed, grid, rng)
    }

    /// Start from an existing grid (tests, hand-built boards).
    pub fn from_grid(level_id: u32, seed: u64, grid: Grid) -> Self {
        Self::with_parts(level_id, seed, grid, DeterministicRng::new(seed))
    }

    /// Assemble a state from restored parts.
    pub fn with_parts(level_id: u32, seed: u64, grid: Grid, rng: DeterministicRng) -> Self {
        Self {
            level_id,
            seed,
            grid,
            rng,
            phase: Phase::Idle,
            streak: Streak::new(),
            cascade: None,
            actions: 0,
            pending_events: Vec::new(),
        }
    }

    /// Is the board at rest and accepting input?
    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Idle
    }

    /// Copy of the grid for snapshotting; only available while idle.
    pub fn snapshot_grid(&self) -> Option<Grid> {
        self.is_idle().then(|| self.grid.clone())
    }

    /// Advance streak decay by wall-clock time.
    ///
    /// Frozen while resolving or paused. Returns true if the streak reset.
    pub fn tick_streak(&mut self, elapsed_ms: u32, paused: bool) -> bool {
        if paused || !self.is_idle() {
            return false;
        }
        let old_level = self.streak.level();
        let reset = self.streak.decay(elapsed_ms);
        if reset {
            self.push_event(GameEvent::streak_changed(self.actions, 0, old_level, 1));
        }
        reset
    }

    /// Compute hash of current state for verification.
    pub fn compute_hash(&self) -> StateHash {
        compute_state_hash(self.actions, self.seed, |hasher| {
            hasher.update_u32(self.level_id);
            self.grid.hash_into(hasher);

            let [s0, s1] = self.rng.state();
            hasher.update_u64(s0);
            hasher.update_u64(s1);

            hasher.update_u8(self.streak.level());
            hasher.update_u32(self.streak.remaining_ms());
            hasher.update_bool(self.is_idle());
        })
    }

    /// Take pending events (consumes them).
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Push a game event.
    pub fn push_event(&mut self, event: GameEvent) {
        self.pending_events.push(event);
    }
}

// =============================================================================
// TESTS
// =============================================================================
