//! Score and Goal Tracking
//!
//! The score/goal owner outside the board. It takes each [`MoveReport`],
//! filters score awards through a plausibility policy, tallies cleared
//! tokens against level goals and spends moves and power-ups. A rejected
//! award never touches the board.

use serde::{Serialize, Deserialize};
use tracing::warn;

use crate::game::cascade::MoveReport;
use crate::game::level::{LevelConfig, LevelGoal, PowerUp, PowerUpInventory};

/// Plausibility check for single score awards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScorePolicy {
    /// Awards must be strictly below this
    pub max_award: u32,
}

impl Default for ScorePolicy {
    fn default() -> Self {
        Self { max_award: 50_000 }
    }
}

impl ScorePolicy {
    /// Is this award plausible? Accepts `0 < points < max_award`.
    pub fn accepts(&self, points: u32) -> bool {
        points > 0 && points < self.max_award
    }
}

/// What applying one report changed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProgressDelta {
    /// Points added to the score
    pub accepted: u32,
    /// Awards the policy refused
    pub rejected: usize,
    /// Per-goal increments, in goal order
    pub goal_increments: Vec<u32>,
}

/// Score, moves, goal tallies and inventory for one level attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameProgress {
    /// Level being played
    pub level_id: u32,
    /// Accepted score
    pub score: u32,
    /// Moves remaining
    pub moves_left: u32,
    /// Cleared count per level goal, in goal order
    pub goal_counts: Vec<u32>,
    /// Power-ups left
    pub inventory: PowerUpInventory,
    /// Awards refused so far
    pub rejected_awards: u32,
}

impl GameProgress {
    /// Fresh progress at level start.
    pub fn new(level: &LevelConfig) -> Self {
        Self {
            level_id: level.id,
            score: 0,
            moves_left: level.moves,
            goal_counts: vec![0; level.goals.len()],
            inventory: level.power_ups,
            rejected_awards: 0,
        }
    }

    /// Can this power-up be used right now?
    pub fn has_power_up(&self, power_up: PowerUp) -> bool {
        self.inventory.count(power_up) > 0
    }

    /// Fold one resolved action into the progress.
    pub fn apply(&mut self, level: &LevelConfig, report: &MoveReport, policy: &ScorePolicy) -> ProgressDelta {
        let mut delta = ProgressDelta {
            goal_increments: vec![0; level.goals.len()],
            ..Default::default()
        };

        for award in &report.awards {
            if policy.accepts(award.points) {
                delta.accepted = delta.accepted.saturating_add(award.points);
            } else {
                delta.rejected += 1;
                if award.points > 0 {
                    warn!(points = award.points, source = ?award.source, "implausible score award rejected");
                }
            }
        }
        self.score = self.score.saturating_add(delta.accepted);
        self.rejected_awards = self.rejected_awards.saturating_add(delta.rejected as u32);

        self.goal_counts.resize(level.goals.len(), 0);
        for token in &report.cleared {
            for (i, goal) in level.goals.iter().enumerate() {
                if goal.target.counts(token.color, token.kind) {
                    self.goal_counts[i] = self.goal_counts[i].saturating_add(1);
                    delta.goal_increments[i] += 1;
                }
            }
        }

        if report.move_consumed {
            self.moves_left = self.moves_left.saturating_sub(1);
        }
        if let Some(power_up) = report.action.and_then(|a| a.power_up()) {
            self.inventory.consume(power_up);
        }

        delta
    }

    /// Each goal with its current tally.
    pub fn goal_status<'a>(&'a self, level: &'a LevelConfig) -> impl Iterator<Item = (&'a LevelGoal, u32)> + 'a {
        level
            .goals
            .iter()
            .enumerate()
            .map(move |(i, goal)| (goal, self.goal_counts.get(i).copied().unwrap_or(0)))
    }

    /// Are all clear goals met?
    pub fn goals_met(&self, level: &LevelConfig) -> bool {
        self.goal_status(level).all(|(goal, count)| count >= goal.required)
    }

    /// Score target reached and every goal met.
    pub fn is_complete(&self, level: &LevelConfig) -> bool {
        self.score >= level.target_score && self.goals_met(level)
    }

    /// No moves left.
    pub fn out_of_moves(&self) -> bool {
        self.moves_left == 0
    }
}

// =============================================================================
// TESTS
// =============================================================================
