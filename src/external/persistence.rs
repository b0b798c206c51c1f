//! Save Games
//!
//! Snapshot of an idle board plus progress and the action log so far,
//! wrapped in a SHA-256 checksum envelope. JSON for save files, bincode for compact snapshots. Restoring
//! a damaged or inconsistent save falls back to a freshly generated board.

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::core::grid::Grid;
use crate::core::hash::{to_hex, StateHasher};
use crate::core::rng::DeterministicRng;
use crate::external::progress::GameProgress;
use crate::game::detector::has_any_run;
use crate::game::level::LevelConfig;
use crate::game::replay::ActionLog;
use crate::game::state::BoardState;
use crate::game::streak::Streak;

/// Current save format version.
pub const SAVE_VERSION: u8 = 1;

/// Errors reading or writing a save.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// JSON encoding failed
    #[error("save json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Binary encoding failed
    #[error("save binary error: {0}")]
    Binary(#[from] bincode::Error),

    /// Envelope checksum does not match the payload
    #[error("save checksum mismatch")]
    ChecksumMismatch,

    /// Written by an unknown format version
    #[error("unsupported save version {0}")]
    UnsupportedVersion(u8),

    /// Save belongs to another level
    #[error("save is for level {found}, expected {expected}")]
    LevelMismatch {
        /// Level being restored
        expected: u32,
        /// Level in the save
        found: u32,
    },

    /// Board is not full or has a pending run
    #[error("saved board is not at rest")]
    NotAtRest,

    /// RNG state is all zeros
    #[error("saved rng state is invalid")]
    InvalidRng,

    /// Action log does not describe the saved attempt
    #[error("saved action log does not match the board")]
    LogMismatch,
}

/// Everything needed to resume a level attempt.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SaveGame {
    /// Format version
    pub version: u8,
    /// Level id
    pub level_id: u32,
    /// Original board seed
    pub seed: u64,
    /// Board at rest
    pub grid: Grid,
    /// RNG state at the snapshot
    pub rng_state: [u64; 2],
    /// Streak level
    pub streak_level: u8,
    /// Streak window left
    pub streak_remaining_ms: u32,
    /// Accepted actions so far
    pub actions: u32,
    /// Score, moves, goals, inventory
    pub progress: GameProgress,
    /// Everything played since the board was generated
    pub log: ActionLog,
    /// When the snapshot was taken
    pub saved_at: DateTime<Utc>,
}

/// Checksummed wrapper around a [`SaveGame`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SaveEnvelope {
    /// Hex SHA-256 of the bincode payload
    pub checksum: String,
    /// The save
    pub payload: SaveGame,
}

impl SaveGame {
    /// Snapshot an idle board. Returns None while a cascade is in flight.
    pub fn capture(state: &BoardState, progress: &GameProgress, log: &ActionLog) -> Option<Self> {
        let grid = state.snapshot_grid()?;
        Some(Self {
            version: SAVE_VERSION,
            level_id: state.level_id,
            seed: state.seed,
            grid,
            rng_state: state.rng.state(),
            streak_level: state.streak.level(),
            streak_remaining_ms: state.streak.remaining_ms(),
            actions: state.actions,
            progress: progress.clone(),
            log: log.clone(),
            saved_at: Utc::now(),
        })
    }

    /// Hex checksum of the payload.
    pub fn checksum(&self) -> Result<String, PersistenceError> {
        let bytes = bincode::serialize(self)?;
        let mut hasher = StateHasher::for_save_game();
        hasher.update_bytes(&bytes);
        Ok(to_hex(&hasher.finalize()))
    }

    /// Wrap in a checksummed envelope.
    pub fn seal(self) -> Result<SaveEnvelope, PersistenceError> {
        let checksum = self.checksum()?;
        Ok(SaveEnvelope { checksum, payload: self })
    }

    /// Check that the save can seed a board for `level`.
    pub fn validate(&self, level: &LevelConfig) -> Result<(), PersistenceError> {
        if self.version != SAVE_VERSION {
            return Err(PersistenceError::UnsupportedVersion(self.version));
        }
        if self.level_id != level.id {
            return Err(PersistenceError::LevelMismatch { expected: level.id, found: self.level_id });
        }
        if !self.grid.is_well_formed() || !self.grid.is_full() || has_any_run(&self.grid) {
            return Err(PersistenceError::NotAtRest);
        }
        if self.rng_state == [0, 0] {
            return Err(PersistenceError::InvalidRng);
        }
        if self.log.level_id != self.level_id
            || self.log.seed != self.seed
            || self.log.action_count() != self.actions as usize
        {
            return Err(PersistenceError::LogMismatch);
        }
        Ok(())
    }

    /// Rebuild the board state, progress and action log.
    pub fn into_parts(self) -> Restored {
        let mut rng = DeterministicRng::new(self.seed);
        rng.set_state(self.rng_state);
        let mut state = BoardState::with_parts(self.level_id, self.seed, self.grid, rng);
        state.streak = Streak::restore(self.streak_level, self.streak_remaining_ms);
        state.actions = self.actions;
        Restored { state, progress: self.progress, log: self.log, from_save: true }
    }
}

/// A level attempt ready to continue.
#[derive(Clone, Debug)]
pub struct Restored {
    /// Board at rest
    pub state: BoardState,
    /// Score, moves, goals, inventory
    pub progress: GameProgress,
    /// Log that replays from the generated board to `state`
    pub log: ActionLog,
    /// Was a save used?
    pub from_save: bool,
}

impl Restored {
    /// Fresh attempt with a generated board.
    pub fn generate(level: &LevelConfig, seed: u64) -> Self {
        Self {
            state: BoardState::new(level, seed),
            progress: GameProgress::new(level),
            log: ActionLog::new(level.id, seed),
            from_save: false,
        }
    }
}

impl SaveEnvelope {
    /// Open the envelope, verifying the checksum.
    pub fn open(self) -> Result<SaveGame, PersistenceError> {
        if self.payload.checksum()? != self.checksum {
            return Err(PersistenceError::ChecksumMismatch);
        }
        Ok(self.payload)
    }
}

// =============================================================================
// ENCODINGS
// =============================================================================

/// Encode a save as pretty JSON.
pub fn to_json(save: &SaveGame) -> Result<String, PersistenceError> {
    Ok(serde_json::to_string_pretty(&save.clone().seal()?)?)
}

/// Decode and verify a JSON save.
pub fn from_json(text: &str) -> Result<SaveGame, PersistenceError> {
    let envelope: SaveEnvelope = serde_json::from_str(text)?;
    envelope.open()
}

/// Encode a save as bincode.
pub fn to_bytes(save: &SaveGame) -> Result<Vec<u8>, PersistenceError> {
    Ok(bincode::serialize(&save.clone().seal()?)?)
}

/// Decode and verify a bincode save.
pub fn from_bytes(bytes: &[u8]) -> Result<SaveGame, PersistenceError> {
    let envelope: SaveEnvelope = bincode::deserialize(bytes)?;
    envelope.open()
}

/// Restore a level attempt from JSON, or generate a fresh board.
pub fn restore_or_generate(level: &LevelConfig, seed: u64, saved: Option<&str>) -> Restored {
    if let Some(text) = saved {
        match from_json(text).and_then(|save| save.validate(level).map(|_| save)) {
            Ok(save) => {
                info!(level = level.id, actions = save.actions, "save restored");
                return save.into_parts();
            }
            Err(err) => warn!(level = level.id, error = %err, "save rejected, generating a new board"),
        }
    }
    Restored::generate(level, seed)
}

// =============================================================================
// TESTS
// =============================================================================
