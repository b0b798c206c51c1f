//! Resolution Loop
//!
//! Drives one action's cascade: detect, score, clear, spawn, gravity,
//! repeat until the board is at rest. Passes can be stepped one at a time
//! (so an animator can pace them) or collapsed with [`run_to_rest`].

use std::collections::BTreeSet;

use serde::{Serialize, Deserialize};
use tracing::{debug, info, warn};

use crate::core::grid::Position;
use crate::core::token::{ClearedToken, TokenKind};
use crate::game::detector::{detect, SpecialSpawn};
use crate::game::events::{GameEvent, GameEventData};
use crate::game::gravity::{apply_gravity, GravityOutcome};
use crate::game::moves::Action;
use crate::game::state::{BoardState, Phase};
use crate::game::streak::{
    pass_base, scale_score, HAMMER_POINTS, PARTY_POINTS_PER_TOKEN, POINTS_PER_DIRECT_CELL,
};

// =============================================================================
// CONFIG
// =============================================================================

/// Configuration for cascade resolution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeConfig {
    /// Attach a copy of the grid to every gravity event
    pub publish_snapshots: bool,
    /// Passes after which the loop stops even if matches remain
    pub max_passes: u32,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            publish_snapshots: false,
            max_passes: 256,
        }
    }
}

// =============================================================================
// SCORE AWARDS
// =============================================================================

/// Where an award came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AwardSource {
    /// A cascade pass (1-based)
    Pass(u32),
    /// Combo or power-up direct clear
    DirectClear,
    /// Hammer hit
    Hammer,
    /// Party clear
    Party,
}

/// One score award, as reported to the score owner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreAward {
    /// Source of the award
    pub source: AwardSource,
    /// Unscaled points
    pub base: u32,
    /// Points after multipliers
    pub points: u32,
}

/// How a direct clear is scored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum DirectScoring {
    /// 20 per destroyed or damaged cell, scaled by the streak
    PerCell,
    /// Flat hammer award
    Hammer,
    /// Flat per destroyed token
    Party,
}

// =============================================================================
// CASCADE STATE
// =============================================================================

/// Transient per-action state. Lives from `begin` until the board settles.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeState {
    /// Action being resolved (None for a bare resolve)
    pub action: Option<Action>,
    /// Did the action use up a move?
    pub move_consumed: bool,
    /// Streak level captured when the action started
    pub streak_level: u8,
    /// Spawn preference for the first pass
    pub preferred: Option<Position>,
    /// Passes resolved so far
    pub pass: u32,
    /// Did a direct clear run before the loop?
    pub direct_clear: bool,
    /// Accumulated score
    pub score: u32,
    /// Every award, in order
    pub awards: Vec<ScoreAward>,
    /// Every token that left the board
    pub cleared: Vec<ClearedToken>,
}

impl CascadeState {
    fn new(action: Option<Action>, streak_level: u8, preferred: Option<Position>, move_consumed: bool) -> Self {
        Self {
            action,
            move_consumed,
            streak_level,
            preferred,
            pass: 0,
            direct_clear: false,
            score: 0,
            awards: Vec::new(),
            cleared: Vec::new(),
        }
    }

    fn record(&mut self, award: ScoreAward) {
        self.score = self.score.saturating_add(award.points);
        self.awards.push(award);
    }
}

/// Result of one pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassSummary {
    /// Pass number (1-based, also the pass multiplier)
    pub pass: u32,
    /// Destroyed cells
    pub destroyed: usize,
    /// Damaged obstacles
    pub damaged: usize,
    /// Points this pass
    pub points: u32,
    /// Tokens that left the board
    pub cleared: Vec<ClearedToken>,
    /// Specials actually placed
    pub spawned: Vec<SpecialSpawn>,
    /// Cells refilled by gravity
    pub refilled: usize,
}

/// Everything one action did, for the score/goal owner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MoveReport {
    /// Action resolved (None for a bare resolve)
    pub action: Option<Action>,
    /// Did the action use up a move?
    pub move_consumed: bool,
    /// Cascade passes resolved
    pub passes: u32,
    /// Total points
    pub score: u32,
    /// Individual awards
    pub awards: Vec<ScoreAward>,
    /// Tokens that left the board
    pub cleared: Vec<ClearedToken>,
    /// Streak level after settling
    pub streak_level: u8,
    /// Events emitted while resolving
    pub events: Vec<GameEvent>,
}

impl MoveReport {
    /// Count cleared tokens of a kind.
    pub fn cleared_of_kind(&self, kind: TokenKind) -> usize {
        self.cleared.iter().filter(|t| t.kind == kind).count()
    }
}

/// Outcome of [`step`].
#[derive(Clone, Debug, PartialEq)]
pub enum StepOutcome {
    /// A pass resolved; more may follow
    Pass(PassSummary),
    /// The board is at rest
    Settled(MoveReport),
}

// =============================================================================
// LIFECYCLE
// =============================================================================

/// Enter `Resolving` for an accepted action.
pub(crate) fn begin(state: &mut BoardState, action: Option<Action>, preferred: Option<Position>, move_consumed: bool) {
    let level = state.streak.level();
    if let Some(action) = action {
        state.actions += 1;
        state.push_event(GameEvent::action_started(state.actions, action, level));
    }
    state.cascade = Some(CascadeState::new(action, level, preferred, move_consumed));
    state.phase = Phase::Resolving;
}

/// Resolve whatever matches the board currently holds, outside any action.
///
/// On a board at rest this is a no-op: zero passes, zero score, and the
/// grid and streak are untouched. Returns None while another action is
/// still resolving.
pub fn resolve(state: &mut BoardState, config: &CascadeConfig) -> Option<MoveReport> {
    if !state.is_idle() {
        return None;
    }
    begin(state, None, None, false);
    run_to_rest(state, config)
}

/// Resolve one pass. Returns None when nothing is in flight.
pub fn step(state: &mut BoardState, config: &CascadeConfig) -> Option<StepOutcome> {
    let mut cascade = state.cascade.take()?;

    if cascade.pass >= config.max_passes {
        warn!(passes = cascade.pass, "cascade pass limit reached, settling early");
        return Some(StepOutcome::Settled(settle(state, cascade)));
    }

    let preferred = cascade.preferred.take();
    let result = detect(&state.grid, preferred, &mut state.rng);
    if result.is_empty() {
        return Some(StepOutcome::Settled(settle(state, cascade)));
    }

    cascade.pass += 1;
    let pass = cascade.pass;
    let base = pass_base(result.destroyed.len(), result.damaged.len());
    let award = ScoreAward {
        source: AwardSource::Pass(pass),
        base,
        points: scale_score(base, pass, cascade.streak_level),
    };

    state.push_event(GameEvent::pass_started(
        state.actions,
        pass,
        result.destroyed.iter().copied().collect(),
        result.damaged.iter().copied().collect(),
    ));
    cascade.record(award);
    state.push_event(GameEvent::score_awarded(state.actions, pass, award));

    let cleared = clear_cells(state, &result.destroyed, &result.damaged, pass);
    cascade.cleared.extend(cleared.iter().copied());
    let spawned = spawn_specials(state, &result.spawns, pass);
    let gravity = settle_gravity(state, config, pass);

    debug!(
        pass,
        destroyed = result.destroyed.len(),
        damaged = result.damaged.len(),
        points = award.points,
        "cascade pass"
    );

    state.cascade = Some(cascade);
    Some(StepOutcome::Pass(PassSummary {
        pass,
        destroyed: result.destroyed.len(),
        damaged: result.damaged.len(),
        points: award.points,
        cleared,
        spawned,
        refilled: gravity.refilled.len(),
    }))
}

/// Resolve every remaining pass. Returns None when nothing is in flight.
pub fn run_to_rest(state: &mut BoardState, config: &CascadeConfig) -> Option<MoveReport> {
    loop {
        match step(state, config)? {
            StepOutcome::Pass(_) => continue,
            StepOutcome::Settled(report) => return Some(report),
        }
    }
}

/// Leave `Resolving`: bump the streak if anything cleared, report.
fn settle(state: &mut BoardState, cascade: CascadeState) -> MoveReport {
    if cascade.pass > 0 || cascade.direct_clear {
        let old_level = state.streak.level();
        let new_level = state.streak.bump();
        if new_level != old_level {
            state.push_event(GameEvent::streak_changed(state.actions, cascade.pass, old_level, new_level));
        }
    }
    state.push_event(GameEvent::settled(state.actions, cascade.pass, cascade.score));
    state.phase = Phase::Idle;

    if cascade.action.is_some() {
        info!(
            action = state.actions,
            passes = cascade.pass,
            score = cascade.score,
            streak = state.streak.level(),
            "action settled"
        );
    }

    MoveReport {
        action: cascade.action,
        move_consumed: cascade.move_consumed,
        passes: cascade.pass,
        score: cascade.score,
        awards: cascade.awards,
        cleared: cascade.cleared,
        streak_level: state.streak.level(),
        events: state.take_events(),
    }
}

// =============================================================================
// SHARED SUB-STEPS
// =============================================================================

/// Remove destroyed tokens and hit damaged obstacles.
///
/// Jelly in the destroyed set and rocks in the damaged set lose one
/// durability point and stay unless depleted. Returns what left the board.
pub(crate) fn clear_cells(
    state: &mut BoardState,
    destroyed: &BTreeSet<Position>,
    damaged: &BTreeSet<Position>,
    pass: u32,
) -> Vec<ClearedToken> {
    let mut cleared = Vec::new();
    let mut hits = Vec::new();

    let needs_hit = |kind: TokenKind, in_damaged: bool| in_damaged || kind == TokenKind::Jelly;

    for (pos, in_damaged) in destroyed.iter().map(|p| (*p, false)).chain(damaged.iter().map(|p| (*p, true))) {
        let Some(token) = state.grid.get_mut(pos) else {
            continue;
        };
        if needs_hit(token.kind, in_damaged) && !token.hit() {
            hits.push((pos, token.durability));
            continue;
        }
        if let Some(token) = state.grid.take(pos) {
            cleared.push(token.cleared());
        }
    }

    for (position, remaining) in hits {
        state.push_event(GameEvent::new(
            state.actions,
            pass,
            GameEventData::ObstacleHit { position, remaining },
        ));
    }
    if !cleared.is_empty() {
        state.push_event(GameEvent::new(
            state.actions,
            pass,
            GameEventData::TokensCleared { tokens: cleared.clone() },
        ));
    }

    cleared
}

/// Place specials into their target cells if those are still empty.
pub(crate) fn spawn_specials(state: &mut BoardState, spawns: &[SpecialSpawn], pass: u32) -> Vec<SpecialSpawn> {
    let mut placed = Vec::new();
    for spawn in spawns {
        if !state.grid.is_empty_at(spawn.position) {
            continue;
        }
        state.grid.place(spawn.position, spawn.color, spawn.kind, 0);
        state.push_event(GameEvent::new(
            state.actions,
            pass,
            GameEventData::SpecialSpawned {
                position: spawn.position,
                color: spawn.color,
                kind: spawn.kind,
            },
        ));
        placed.push(*spawn);
    }
    placed
}

/// Gravity plus refill, with the event.
pub(crate) fn settle_gravity(state: &mut BoardState, config: &CascadeConfig, pass: u32) -> GravityOutcome {
    let outcome = apply_gravity(&mut state.grid, &mut state.rng);
    let snapshot = config.publish_snapshots.then(|| state.grid.clone());
    state.push_event(GameEvent::new(
        state.actions,
        pass,
        GameEventData::GravityApplied {
            moved: outcome.moved.len(),
            refilled: outcome.refilled.clone(),
            snapshot,
        },
    ));
    outcome
}

/// Apply a combo or power-up clear before the loop starts.
pub(crate) fn apply_direct_clear(
    state: &mut BoardState,
    config: &CascadeConfig,
    destroyed: BTreeSet<Position>,
    damaged: BTreeSet<Position>,
    scoring: DirectScoring,
    spawns: &[SpecialSpawn],
) {
    let Some(mut cascade) = state.cascade.take() else {
        return;
    };

    let cells = (destroyed.len() + damaged.len()) as u32;
    let award = match scoring {
        DirectScoring::PerCell => {
            let base = cells * POINTS_PER_DIRECT_CELL;
            ScoreAward {
                source: AwardSource::DirectClear,
                base,
                points: scale_score(base, 1, cascade.streak_level),
            }
        }
        DirectScoring::Hammer => ScoreAward {
            source: AwardSource::Hammer,
            base: HAMMER_POINTS,
            points: HAMMER_POINTS,
        },
        DirectScoring::Party => {
            let base = destroyed.len() as u32 * PARTY_POINTS_PER_TOKEN;
            ScoreAward { source: AwardSource::Party, base, points: base }
        }
    };

    state.push_event(GameEvent::new(
        state.actions,
        0,
        GameEventData::DirectClear {
            destroyed: destroyed.iter().copied().collect(),
            damaged: damaged.iter().copied().collect(),
        },
    ));
    cascade.record(award);
    state.push_event(GameEvent::score_awarded(state.actions, 0, award));

    let cleared = clear_cells(state, &destroyed, &damaged, 0);
    cascade.cleared.extend(cleared);
    spawn_specials(state, spawns, 0);
    settle_gravity(state, config, 0);

    cascade.direct_clear = true;
    state.cascade = Some(cascade);
}

// =============================================================================
// TESTS
// =============================================================================
