//! Action Recording and Replay
//!
//! A level attempt is fully determined by its level, seed and the ordered
//! list of accepted actions (plus the idle time between them, which drives
//! streak decay). Replaying the log must land on the same state hash.

use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::core::hash::StateHash;
use crate::game::cascade::{CascadeConfig, MoveReport};
use crate::game::level::LevelConfig;
use crate::game::moves::{play, Action};
use crate::game::state::BoardState;

/// One recorded step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogEntry {
    /// Accepted action
    Act(Action),
    /// Wall-clock time spent idle (streak decay)
    Idle {
        /// Milliseconds elapsed
        elapsed_ms: u32,
    },
}

/// Complete action recording for one level attempt.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionLog {
    /// Level played
    pub level_id: u32,

    /// Seed the board was generated from
    pub seed: u64,

    /// Entries in order
    entries: Vec<LogEntry>,
}

impl ActionLog {
    /// Create an empty log.
    pub fn new(level_id: u32, seed: u64) -> Self {
        Self {
            level_id,
            seed,
            entries: Vec::with_capacity(64),
        }
    }

    /// Record an accepted action.
    pub fn record(&mut self, action: Action) {
        self.entries.push(LogEntry::Act(action));
    }

    /// Record idle time. Consecutive idle entries are merged.
    pub fn record_idle(&mut self, elapsed_ms: u32) {
        if elapsed_ms == 0 {
            return;
        }
        if let Some(LogEntry::Idle { elapsed_ms: last }) = self.entries.last_mut() {
            *last = last.saturating_add(elapsed_ms);
            return;
        }
        self.entries.push(LogEntry::Idle { elapsed_ms });
    }

    /// Recorded entries.
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Number of recorded actions.
    pub fn action_count(&self) -> usize {
        self.entries.iter().filter(|e| matches!(e, LogEntry::Act(_))).count()
    }
}

/// Replay entries against a starting state.
///
/// Actions the board rejects are skipped (a well-formed log has none).
pub fn replay_actions(
    initial_state: BoardState,
    entries: &[LogEntry],
    config: &CascadeConfig,
) -> (BoardState, Vec<MoveReport>) {
    let mut state = initial_state;
    let mut reports = Vec::with_capacity(entries.len());

    for entry in entries {
        match *entry {
            LogEntry::Act(action) => match play(&mut state, action, config) {
                Ok(report) => reports.push(report),
                Err(err) => debug!(?action, %err, "replayed action rejected"),
            },
            LogEntry::Idle { elapsed_ms } => {
                state.tick_streak(elapsed_ms, false);
            }
        }
    }

    (state, reports)
}

/// Regenerate the board from the log's seed and replay it.
pub fn replay_log(level: &LevelConfig, log: &ActionLog, config: &CascadeConfig) -> (BoardState, Vec<MoveReport>) {
    replay_actions(BoardState::new(level, log.seed), log.entries(), config)
}

/// Does replaying the log reproduce `expected`?
pub fn verify_log(level: &LevelConfig, log: &ActionLog, expected: &StateHash, config: &CascadeConfig) -> bool {
    let (state, _) = replay_log(level, log, config);
    state.compute_hash() == *expected
}

// =============================================================================
// TESTS
// =============================================================================
