//! Level Configuration
//!
//! Static per-level parameters: score target, move budget, goals, starting
//! power-ups and obstacle tiers. Loaded from JSON or taken from the built-in
//! five-level table.

use std::collections::BTreeSet;

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::core::token::{Color, TokenKind};
use crate::GRID_SIZE;

// =============================================================================
// GOALS
// =============================================================================

/// What a goal counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum GoalTarget {
    /// Cleared tokens of a color (any kind except rock)
    Color(Color),
    /// Cleared tokens of a kind
    Kind(TokenKind),
}

impl GoalTarget {
    /// Does a cleared (color, kind) pair count toward this target?
    pub fn counts(&self, color: Color, kind: TokenKind) -> bool {
        match self {
            GoalTarget::Color(c) => kind != TokenKind::Rock && *c == color,
            GoalTarget::Kind(k) => *k == kind,
        }
    }
}

/// A level goal: clear `required` tokens matching `target`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelGoal {
    /// What to clear
    pub target: GoalTarget,
    /// How many
    pub required: u32,
}

// =============================================================================
// POWER-UP INVENTORY
// =============================================================================

/// Power-up kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PowerUp {
    /// Hit one cell
    Hammer,
    /// Swap two adjacent cells without a match
    FreeSwitch,
    /// Detonate random line clearers
    Ufo,
    /// Clear one random color
    Party,
}

/// Remaining uses per power-up.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerUpInventory {
    /// Hammer uses
    pub hammer: u32,
    /// Free switch uses
    pub free_switch: u32,
    /// UFO uses
    pub ufo: u32,
    /// Party uses
    pub party: u32,
}

impl PowerUpInventory {
    /// Remaining uses of a power-up.
    pub fn count(&self, power_up: PowerUp) -> u32 {
        match power_up {
            PowerUp::Hammer => self.hammer,
            PowerUp::FreeSwitch => self.free_switch,
            PowerUp::Ufo => self.ufo,
            PowerUp::Party => self.party,
        }
    }

    fn slot(&mut self, power_up: PowerUp) -> &mut u32 {
        match power_up {
            PowerUp::Hammer => &mut self.hammer,
            PowerUp::FreeSwitch => &mut self.free_switch,
            PowerUp::Ufo => &mut self.ufo,
            PowerUp::Party => &mut self.party,
        }
    }

    /// Use one charge. Returns false when none are left.
    pub fn consume(&mut self, power_up: PowerUp) -> bool {
        let slot = self.slot(power_up);
        if *slot == 0 {
            return false;
        }
        *slot -= 1;
        true
    }

    /// Add charges.
    pub fn grant(&mut self, power_up: PowerUp, amount: u32) {
        let slot = self.slot(power_up);
        *slot = slot.saturating_add(amount);
    }
}

// =============================================================================
// OBSTACLES
// =============================================================================

/// Obstacle tiers for board generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObstacleConfig {
    /// First level with the rock block
    pub rock_from_level: u32,
    /// Top-left cell of the rock block (row, col)
    pub rock_origin: (u8, u8),
    /// Rock block height and width
    pub rock_size: (u8, u8),
    /// Hits each rock takes
    pub rock_durability: u8,
    /// First level with jelly
    pub jelly_from_level: u32,
    /// Jelly cells per board
    pub jelly_count: u8,
    /// Hits each jelly takes
    pub jelly_durability: u8,
}

impl Default for ObstacleConfig {
    fn default() -> Self {
        Self {
            rock_from_level: 3,
            rock_origin: (3, 3),
            rock_size: (2, 2),
            rock_durability: 2,
            jelly_from_level: 4,
            jelly_count: 4,
            jelly_durability: 2,
        }
    }
}

impl ObstacleConfig {
    /// A config with no obstacles at any level.
    pub fn none() -> Self {
        Self {
            rock_from_level: u32::MAX,
            jelly_from_level: u32::MAX,
            ..Self::default()
        }
    }

    /// Does the rock block fit on the board?
    pub fn rock_block_fits(&self) -> bool {
        let (row, col) = self.rock_origin;
        let (height, width) = self.rock_size;
        row as usize + height as usize <= GRID_SIZE && col as usize + width as usize <= GRID_SIZE
    }
}

// =============================================================================
// LEVEL CONFIG
// =============================================================================

/// One level's static parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelConfig {
    /// Level number (1-based)
    pub id: u32,
    /// Display title
    pub title: String,
    /// Score needed to complete the level
    pub target_score: u32,
    /// Move budget
    pub moves: u32,
    /// Clear goals (all must be met alongside the score target)
    #[serde(default)]
    pub goals: Vec<LevelGoal>,
    /// Power-ups granted at level start
    #[serde(default)]
    pub power_ups: PowerUpInventory,
    /// Obstacle tiers
    #[serde(default)]
    pub obstacles: ObstacleConfig,
}

impl LevelConfig {
    /// Create a level with default obstacles, no goals and no power-ups.
    pub fn new(id: u32, title: &str, target_score: u32, moves: u32) -> Self {
        Self {
            id,
            title: title.to_string(),
            target_score,
            moves,
            goals: Vec::new(),
            power_ups: PowerUpInventory::default(),
            obstacles: ObstacleConfig::default(),
        }
    }

    /// Does this level place the rock block?
    pub fn has_rocks(&self) -> bool {
        self.id >= self.obstacles.rock_from_level
    }

    /// Does this level place jelly?
    pub fn has_jelly(&self) -> bool {
        self.id >= self.obstacles.jelly_from_level
    }
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self::new(1, "Sugar Start", 500, 25)
    }
}

/// Built-in five-level table.
pub fn default_levels() -> Vec<LevelConfig> {
    let starter = PowerUpInventory { hammer: 1, free_switch: 1, ufo: 1, party: 1 };

    let mut levels = vec![
        LevelConfig::new(1, "Sugar Start", 500, 25),
        LevelConfig::new(2, "Sweet Success", 1200, 20),
        LevelConfig::new(3, "Caramel Canyon", 2500, 18),
        LevelConfig::new(4, "Marshmallow Mountain", 4000, 15),
        LevelConfig::new(5, "Chocolate Champ", 6000, 12),
    ];

    for level in &mut levels {
        level.power_ups = starter;
    }
    levels[1].goals.push(LevelGoal { target: GoalTarget::Color(Color::Red), required: 20 });
    levels[2].goals.push(LevelGoal { target: GoalTarget::Kind(TokenKind::Rock), required: 4 });
    levels[3].goals.push(LevelGoal { target: GoalTarget::Kind(TokenKind::Jelly), required: 4 });
    levels[4].goals.push(LevelGoal { target: GoalTarget::Kind(TokenKind::Rock), required: 4 });
    levels[4].goals.push(LevelGoal { target: GoalTarget::Color(Color::Purple), required: 30 });

    levels
}

/// Find a level by id.
pub fn level_by_id(levels: &[LevelConfig], id: u32) -> Option<&LevelConfig> {
    levels.iter().find(|level| level.id == id)
}

/// Errors loading a level table.
#[derive(Debug, Error)]
pub enum LevelConfigError {
    /// Malformed JSON
    #[error("level table parse error: {0}")]
    Parse(#[from] serde_json::Error),
    /// Table has no levels
    #[error("level table is empty")]
    Empty,
    /// Two levels share an id
    #[error("duplicate level id {0}")]
    DuplicateId(u32),
    /// Level with zero moves
    #[error("level {0} has no moves")]
    NoMoves(u32),
    /// Rock block extends past the board
    #[error("level {0}: rock block does not fit on the board")]
    RockBlockOutOfBounds(u32),
}

/// Load and validate a level table from JSON.
pub fn load_levels(json: &str) -> Result<Vec<LevelConfig>, LevelConfigError> {
    let levels: Vec<LevelConfig> = serde_json::from_str(json)?;
    if levels.is_empty() {
        return Err(LevelConfigError::Empty);
    }

    let mut seen = BTreeSet::new();
    for level in &levels {
        if !seen.insert(level.id) {
            return Err(LevelConfigError::DuplicateId(level.id));
        }
        if level.moves == 0 {
            return Err(LevelConfigError::NoMoves(level.id));
        }
        if !level.obstacles.rock_block_fits() {
            return Err(LevelConfigError::RockBlockOutOfBounds(level.id));
        }
    }

    Ok(levels)
}

// =============================================================================
// TESTS
// =============================================================================
