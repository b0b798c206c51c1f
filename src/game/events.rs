//! Game Events
//!
//! Discrete pass-boundary events emitted while an action resolves. The
//! presentation layer paces its animations off these; the engine itself
//! never waits on them.

use serde::{Serialize, Deserialize};

use crate::core::grid::{Grid, Position};
use crate::core::token::{ClearedToken, Color, TokenKind};
use crate::game::cascade::ScoreAward;
use crate::game::moves::{Action, Combo};

/// Game event data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum GameEventData {
    /// An accepted action began resolving
    ActionStarted {
        action: Action,
        streak_level: u8,
    },

    /// Two specials were swapped together
    ComboTriggered {
        combo: Combo,
        destination: Position,
    },

    /// Cells cleared directly by a combo or power-up, before the loop
    DirectClear {
        destroyed: Vec<Position>,
        damaged: Vec<Position>,
    },

    /// A cascade pass found matches
    PassStarted {
        destroyed: Vec<Position>,
        damaged: Vec<Position>,
    },

    /// Points awarded
    ScoreAwarded {
        award: ScoreAward,
    },

    /// Tokens left the board
    TokensCleared {
        tokens: Vec<ClearedToken>,
    },

    /// An obstacle absorbed a hit and stayed
    ObstacleHit {
        position: Position,
        remaining: u8,
    },

    /// A special was placed
    SpecialSpawned {
        position: Position,
        color: Color,
        kind: TokenKind,
    },

    /// Gravity and refill finished
    GravityApplied {
        moved: usize,
        refilled: Vec<Position>,
        /// Read-only copy of the board, when snapshots are enabled
        snapshot: Option<Grid>,
    },

    /// Streak level changed
    StreakChanged {
        old_level: u8,
        new_level: u8,
    },

    /// The board is back at rest
    Settled {
        passes: u32,
        score: u32,
    },
}

/// A game event tagged with the action and pass it belongs to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    /// Action counter when the event occurred
    pub action: u32,

    /// Cascade pass (0 = before the first pass)
    pub pass: u32,

    /// Event data
    pub data: GameEventData,
}

impl GameEvent {
    /// Create a new event.
    pub fn new(action: u32, pass: u32, data: GameEventData) -> Self {
        Self { action, pass, data }
    }

    /// Create action started event.
    pub fn action_started(action_no: u32, action: Action, streak_level: u8) -> Self {
        Self::new(action_no, 0, GameEventData::ActionStarted { action, streak_level })
    }

    /// Create pass started event.
    pub fn pass_started(action: u32, pass: u32, destroyed: Vec<Position>, damaged: Vec<Position>) -> Self {
        Self::new(action, pass, GameEventData::PassStarted { destroyed, damaged })
    }

    /// Create score awarded event.
    pub fn score_awarded(action: u32, pass: u32, award: ScoreAward) -> Self {
        Self::new(action, pass, GameEventData::ScoreAwarded { award })
    }

    /// Create streak changed event.
    pub fn streak_changed(action: u32, pass: u32, old_level: u8, new_level: u8) -> Self {
        Self::new(action, pass, GameEventData::StreakChanged { old_level, new_level })
    }

    /// Create settled event.
    pub fn settled(action: u32, passes: u32, score: u32) -> Self {
        Self::new(action, passes, GameEventData::Settled { passes, score })
    }

    /// Is this the end-of-action marker?
    pub fn is_settled(&self) -> bool {
        matches!(self.data, GameEventData::Settled { .. })
    }
}
