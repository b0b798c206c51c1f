//! Streak and Scoring Multipliers
//!
//! The streak is a cross-move multiplier that grows on every action that
//! cleared something and decays back to level 1 after a quiet window.
//! Multipliers are kept in integer form: the streak multiplier
//! `1 + (level - 1) * 0.5` equals `(level + 1) / 2`.

use serde::{Serialize, Deserialize};

/// Highest streak level
pub const MAX_STREAK: u8 = 10;

/// Decay window in milliseconds
pub const STREAK_WINDOW_MS: u32 = 7000;

/// Points per destroyed token in a cascade pass
pub const POINTS_PER_DESTROYED: u32 = 10;

/// Points per damaged obstacle in a cascade pass
pub const POINTS_PER_DAMAGED: u32 = 20;

/// Points per cell of a direct (special combo / power-up) clear
pub const POINTS_PER_DIRECT_CELL: u32 = 20;

/// Flat award for a hammer hit
pub const HAMMER_POINTS: u32 = 50;

/// Flat award per token cleared by a party
pub const PARTY_POINTS_PER_TOKEN: u32 = 15;

/// Persistent streak meter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Streak {
    level: u8,
    remaining_ms: u32,
}

impl Default for Streak {
    fn default() -> Self {
        Self::new()
    }
}

impl Streak {
    /// Fresh streak at level 1.
    pub const fn new() -> Self {
        Self { level: 1, remaining_ms: 0 }
    }

    /// Restore a saved streak (level clamped to 1..=10).
    pub fn restore(level: u8, remaining_ms: u32) -> Self {
        let level = level.clamp(1, MAX_STREAK);
        let remaining_ms = if level > 1 { remaining_ms.min(STREAK_WINDOW_MS) } else { 0 };
        Self { level, remaining_ms }
    }

    /// Current level (1..=10).
    pub fn level(&self) -> u8 {
        self.level
    }

    /// Milliseconds until decay.
    pub fn remaining_ms(&self) -> u32 {
        self.remaining_ms
    }

    /// Display multiplier.
    pub fn multiplier(&self) -> f32 {
        streak_multiplier(self.level)
    }

    /// Fraction of the decay window left, 0.0..=1.0.
    pub fn meter(&self) -> f32 {
        self.remaining_ms as f32 / STREAK_WINDOW_MS as f32
    }

    /// Raise the level by one (capped) and refill the window.
    pub fn bump(&mut self) -> u8 {
        self.level = (self.level + 1).min(MAX_STREAK);
        self.remaining_ms = STREAK_WINDOW_MS;
        self.level
    }

    /// Count the window down. Returns true if the streak just reset.
    pub fn decay(&mut self, elapsed_ms: u32) -> bool {
        if self.level <= 1 {
            return false;
        }
        self.remaining_ms = self.remaining_ms.saturating_sub(elapsed_ms);
        if self.remaining_ms == 0 {
            self.level = 1;
            return true;
        }
        false
    }

    /// Back to level 1.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// `1 + (level - 1) * 0.5`
pub fn streak_multiplier(level: u8) -> f32 {
    1.0 + (level.max(1) - 1) as f32 * 0.5
}

/// Scale a base score by pass and streak multipliers.
///
/// Exact for every level: `base * pass * (level + 1) / 2`.
pub fn scale_score(base: u32, pass: u32, streak_level: u8) -> u32 {
    let scaled = base as u64 * pass.max(1) as u64 * (streak_level.max(1) as u64 + 1) / 2;
    scaled.min(u32::MAX as u64) as u32
}

/// Base score of a cascade pass.
pub fn pass_base(destroyed: usize, damaged: usize) -> u32 {
    (destroyed as u32) * POINTS_PER_DESTROYED + (damaged as u32) * POINTS_PER_DAMAGED
}
