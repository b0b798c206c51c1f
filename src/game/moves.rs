//! Move and Power-up Executor
//!
//! Validates player actions against the board and applies their direct
//! effect, then hands the board to the resolution loop. A rejected action
//! leaves the state untouched (grid, RNG, counters).

use std::collections::BTreeSet;

use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::debug;

use crate::core::grid::{all_positions, is_adjacent, Grid, Position};
use crate::core::rng::{DeterministicRng, RandomSource};
use crate::core::token::{Color, Token, TokenKind};
use crate::game::cascade::{self, CascadeConfig, DirectScoring, MoveReport};
use crate::game::detector::{
    detect, expand_chain, finalize, has_run_through, matchable_of_color, rows_and_cols, square,
    SpecialSpawn,
};
use crate::game::events::{GameEvent, GameEventData};
use crate::game::level::PowerUp;
use crate::game::state::BoardState;

// =============================================================================
// ACTIONS
// =============================================================================

/// A player action against the board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Adjacent swap that must produce a match
    Swap { from: Position, to: Position },
    /// Hit one cell
    Hammer { target: Position },
    /// Adjacent swap with no match requirement
    FreeSwitch { from: Position, to: Position },
    /// Turn a few regular tokens into line clearers and detonate them
    Ufo,
    /// Clear one random color
    Party,
}

impl Action {
    /// Power-up this action spends, if any.
    pub fn power_up(&self) -> Option<PowerUp> {
        match self {
            Action::Swap { .. } => None,
            Action::Hammer { .. } => Some(PowerUp::Hammer),
            Action::FreeSwitch { .. } => Some(PowerUp::FreeSwitch),
            Action::Ufo => Some(PowerUp::Ufo),
            Action::Party => Some(PowerUp::Party),
        }
    }

    /// Does this action use up one of the level's moves?
    pub fn consumes_move(&self) -> bool {
        matches!(self, Action::Swap { .. })
    }
}

/// Special-with-special swap outcomes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Combo {
    /// Two color clearers: whole board
    ColorColor,
    /// Color clearer with an area clearer
    ColorArea,
    /// Color clearer with a line clearer
    ColorLine,
    /// Color clearer with a regular or jelly token
    ColorRegular,
    /// Two area clearers: 5x5
    AreaArea,
    /// Area clearer with a line clearer: three rows and three columns
    AreaLine,
    /// Two line clearers: row and column
    LineLine,
}

/// Which combo two swapped kinds trigger, if any.
pub fn classify_combo(a: TokenKind, b: TokenKind) -> Option<Combo> {
    use TokenKind::*;

    match (a, b) {
        (ColorClearer, ColorClearer) => Some(Combo::ColorColor),
        (ColorClearer, AreaClearer) | (AreaClearer, ColorClearer) => Some(Combo::ColorArea),
        (ColorClearer, k) | (k, ColorClearer) if k.is_line() => Some(Combo::ColorLine),
        (ColorClearer, Regular | Jelly) | (Regular | Jelly, ColorClearer) => Some(Combo::ColorRegular),
        (AreaClearer, AreaClearer) => Some(Combo::AreaArea),
        (AreaClearer, k) | (k, AreaClearer) if k.is_line() => Some(Combo::AreaLine),
        (x, y) if x.is_line() && y.is_line() => Some(Combo::LineLine),
        _ => None,
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Why an action was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveError {
    /// A cascade is still resolving
    #[error("board is resolving, input rejected")]
    Busy,

    /// Position outside the board
    #[error("position {0} is out of bounds")]
    OutOfBounds(Position),

    /// Swap cells are not orthogonally adjacent
    #[error("{from} and {to} are not adjacent")]
    NotAdjacent { from: Position, to: Position },

    /// Swap with itself
    #[error("cannot swap a cell with itself")]
    SameCell,

    /// Rocks cannot be swapped
    #[error("rock at {0} cannot be moved")]
    ObstacleBlocked(Position),

    /// Swap would not create a run
    #[error("swap does not create a match")]
    NoMatch,

    /// No token at the position
    #[error("no token at {0}")]
    EmptyCell(Position),

    /// Power-up has nothing to act on
    #[error("no eligible cells for this power-up")]
    NoEligibleCells,
}

// =============================================================================
// ENTRY POINTS
// =============================================================================

/// Validate and apply an action, leaving the board in `Resolving`.
///
/// Drive the remaining passes with [`cascade::step`] or
/// [`cascade::run_to_rest`].
pub fn perform(state: &mut BoardState, action: Action, config: &CascadeConfig) -> Result<(), MoveError> {
    if !state.is_idle() {
        return Err(MoveError::Busy);
    }

    match action {
        Action::Swap { from, to } => swap(state, action, from, to, config),
        Action::Hammer { target } => hammer(state, action, target, config),
        Action::FreeSwitch { from, to } => free_switch(state, action, from, to),
        Action::Ufo => ufo(state, action, config),
        Action::Party => party(state, action, config),
    }
}

/// Apply an action and resolve the board to rest.
pub fn play(state: &mut BoardState, action: Action, config: &CascadeConfig) -> Result<MoveReport, MoveError> {
    perform(state, action, config)?;
    Ok(cascade::run_to_rest(state, config).unwrap_or_else(|| MoveReport {
        action: Some(action),
        move_consumed: action.consumes_move(),
        passes: 0,
        score: 0,
        awards: Vec::new(),
        cleared: Vec::new(),
        streak_level: state.streak.level(),
        events: state.take_events(),
    }))
}

/// Every basic swap the board would accept, right and down neighbors only.
pub fn legal_swaps(grid: &Grid) -> Vec<(Position, Position)> {
    let mut probe = grid.clone();
    let mut swaps = Vec::new();

    for from in all_positions() {
        for to in [from.offset(0, 1), from.offset(1, 0)].into_iter().flatten() {
            let (Some(a), Some(b)) = (grid.get(from), grid.get(to)) else {
                continue;
            };
            if a.kind == TokenKind::Rock || b.kind == TokenKind::Rock {
                continue;
            }
            if classify_combo(a.kind, b.kind).is_some() {
                swaps.push((from, to));
                continue;
            }
            probe.swap(from, to);
            if has_run_through(&probe, from) || has_run_through(&probe, to) {
                swaps.push((from, to));
            }
            probe.swap(from, to);
        }
    }

    swaps
}

// =============================================================================
// VALIDATION
// =============================================================================

fn check_pair(grid: &Grid, from: Position, to: Position) -> Result<(Token, Token), MoveError> {
    for pos in [from, to] {
        if !pos.in_bounds() {
            return Err(MoveError::OutOfBounds(pos));
        }
    }
    if from == to {
        return Err(MoveError::SameCell);
    }
    if !is_adjacent(from, to) {
        return Err(MoveError::NotAdjacent { from, to });
    }
    let a = *grid.get(from).ok_or(MoveError::EmptyCell(from))?;
    let b = *grid.get(to).ok_or(MoveError::EmptyCell(to))?;
    Ok((a, b))
}

// =============================================================================
// SWAPS
// =============================================================================

fn swap(state: &mut BoardState, action: Action, from: Position, to: Position, config: &CascadeConfig) -> Result<(), MoveError> {
    let (a, b) = check_pair(&state.grid, from, to)?;
    for (pos, token) in [(from, a), (to, b)] {
        if token.kind == TokenKind::Rock {
            return Err(MoveError::ObstacleBlocked(pos));
        }
    }

    if let Some(combo) = classify_combo(a.kind, b.kind) {
        cascade::begin(state, Some(action), None, true);
        run_combo(state, combo, from, to, a, b, config);
        return Ok(());
    }

    state.grid.swap(from, to);
    if !has_run_through(&state.grid, from) && !has_run_through(&state.grid, to) {
        state.grid.swap(from, to);
        return Err(MoveError::NoMatch);
    }

    cascade::begin(state, Some(action), Some(to), true);
    Ok(())
}

fn free_switch(state: &mut BoardState, action: Action, from: Position, to: Position) -> Result<(), MoveError> {
    check_pair(&state.grid, from, to)?;
    state.grid.swap(from, to);
    cascade::begin(state, Some(action), Some(to), false);
    Ok(())
}

/// Resolve a special swap as a direct clear. The two tokens stay in place.
fn run_combo(
    state: &mut BoardState,
    combo: Combo,
    from: Position,
    to: Position,
    a: Token,
    b: Token,
    config: &CascadeConfig,
) {
    state.push_event(GameEvent::new(
        state.actions,
        0,
        GameEventData::ComboTriggered { combo, destination: to },
    ));

    let (row, col) = (to.row as i32, to.col as i32);
    let partner = if a.kind == TokenKind::ColorClearer { b } else { a };

    let mut seeds: BTreeSet<Position> = match combo {
        Combo::ColorColor => all_positions().collect(),
        Combo::ColorArea => convert_color(state, partner.color, |_| TokenKind::AreaClearer),
        Combo::ColorLine => convert_color(state, partner.color, line_kind::<DeterministicRng>),
        Combo::ColorRegular => matchable_of_color(&state.grid, partner.color).into_iter().collect(),
        Combo::AreaArea => square(to, 2).into_iter().collect(),
        Combo::AreaLine => rows_and_cols(&[row - 1, row, row + 1], &[col - 1, col, col + 1]),
        Combo::LineLine => rows_and_cols(&[row], &[col]),
    };
    seeds.insert(from);
    seeds.insert(to);

    let skip: BTreeSet<Position> = [from, to].into_iter().collect();
    let mut marked = expand_chain(&state.grid, seeds, &skip, &mut state.rng);

    // One detection pass over the untouched board; its spawns are dropped
    let extra = detect(&state.grid, None, &mut state.rng);
    marked.extend(extra.destroyed);
    marked.extend(extra.damaged);

    let (destroyed, damaged) = finalize(&state.grid, &marked);
    debug!(?combo, destroyed = destroyed.len(), damaged = damaged.len(), "combo");
    cascade::apply_direct_clear(state, config, destroyed, damaged, DirectScoring::PerCell, &[]);
}

fn line_kind<R: RandomSource>(rng: &mut R) -> TokenKind {
    if rng.next_bool() {
        TokenKind::HorizontalClearer
    } else {
        TokenKind::VerticalClearer
    }
}

/// Turn regular tokens of a color into specials. Returns every matchable
/// cell of that color.
fn convert_color<F>(state: &mut BoardState, color: Color, mut kind_for: F) -> BTreeSet<Position>
where
    F: FnMut(&mut DeterministicRng) -> TokenKind,
{
    let targets = matchable_of_color(&state.grid, color);
    for &pos in &targets {
        let kind = match state.grid.get(pos) {
            Some(token) if token.kind == TokenKind::Regular => kind_for(&mut state.rng),
            _ => continue,
        };
        if let Some(token) = state.grid.get_mut(pos) {
            token.kind = kind;
        }
    }
    targets.into_iter().collect()
}

// =============================================================================
// POWER-UPS
// =============================================================================

fn hammer(state: &mut BoardState, action: Action, target: Position, config: &CascadeConfig) -> Result<(), MoveError> {
    if !target.in_bounds() {
        return Err(MoveError::OutOfBounds(target));
    }
    let token = *state.grid.get(target).ok_or(MoveError::EmptyCell(target))?;

    cascade::begin(state, Some(action), None, false);

    let (destroyed, damaged) = if token.durability > 1 {
        (BTreeSet::new(), [target].into_iter().collect())
    } else {
        let marked = expand_chain(&state.grid, [target], &BTreeSet::new(), &mut state.rng);
        finalize(&state.grid, &marked)
    };

    cascade::apply_direct_clear(state, config, destroyed, damaged, DirectScoring::Hammer, &[]);
    Ok(())
}

fn ufo(state: &mut BoardState, action: Action, config: &CascadeConfig) -> Result<(), MoveError> {
    let mut eligible: Vec<Position> = state
        .grid
        .tokens()
        .filter(|(_, t)| t.kind == TokenKind::Regular)
        .map(|(pos, _)| pos)
        .collect();
    if eligible.is_empty() {
        return Err(MoveError::NoEligibleCells);
    }

    cascade::begin(state, Some(action), None, false);

    let count = (state.rng.next_int_range(2, 3) as usize).min(eligible.len());
    state.rng.shuffle(&mut eligible);
    eligible.truncate(count);

    for &pos in &eligible {
        let kind = line_kind(&mut state.rng);
        let Some(token) = state.grid.get_mut(pos) else {
            continue;
        };
        token.kind = kind;
        let color = token.color;
        state.push_event(GameEvent::new(
            state.actions,
            0,
            GameEventData::SpecialSpawned { position: pos, color, kind },
        ));
    }

    let marked = expand_chain(&state.grid, eligible, &BTreeSet::new(), &mut state.rng);
    let (destroyed, damaged) = finalize(&state.grid, &marked);
    cascade::apply_direct_clear(state, config, destroyed, damaged, DirectScoring::PerCell, &[]);
    Ok(())
}

/// Specials a party can leave behind.
const PARTY_SPAWN_KINDS: [TokenKind; 3] = [
    TokenKind::HorizontalClearer,
    TokenKind::VerticalClearer,
    TokenKind::AreaClearer,
];

/// Most specials a party spawns.
const PARTY_MAX_SPAWNS: usize = 3;

fn party(state: &mut BoardState, action: Action, config: &CascadeConfig) -> Result<(), MoveError> {
    // Draw on a copy so a rejection leaves the RNG untouched
    let mut rng = state.rng.clone();
    let color = Color::random(&mut rng);
    let targets = matchable_of_color(&state.grid, color);
    if targets.is_empty() {
        return Err(MoveError::NoEligibleCells);
    }
    state.rng = rng;

    cascade::begin(state, Some(action), None, false);

    let mut spots = targets.clone();
    state.rng.shuffle(&mut spots);
    let spawns: Vec<SpecialSpawn> = spots
        .into_iter()
        .take(PARTY_MAX_SPAWNS)
        .map(|position| SpecialSpawn {
            position,
            color,
            kind: PARTY_SPAWN_KINDS[state.rng.next_int(PARTY_SPAWN_KINDS.len() as u32) as usize],
        })
        .collect();

    let marked = expand_chain(&state.grid, targets, &BTreeSet::new(), &mut state.rng);
    let (destroyed, damaged) = finalize(&state.grid, &marked);
    debug!(?color, destroyed = destroyed.len(), "party");
    cascade::apply_direct_clear(state, config, destroyed, damaged, DirectScoring::Party, &spawns);
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::token::ClearedToken;
    use crate::game::cascade::{step, AwardSource, StepOutcome};
    use crate::game::test_support::{base_grid, paint, set_kind};

    fn pos(row: u8, col: u8) -> Position {
        Position::new(row, col)
    }

    fn direct_clear(events: &[GameEvent]) -> (Vec<Position>, Vec<Position>) {
        events
            .iter()
            .find_map(|e| match &e.data {
                GameEventData::DirectClear { destroyed, damaged } => Some((destroyed.clone(), damaged.clone())),
                _ => None,
            })
            .unwrap()
    }

    /// Tokens removed by the first clear of the action.
    fn first_cleared(events: &[GameEvent]) -> Vec<ClearedToken> {
        events
            .iter()
            .find_map(|e| match &e.data {
                GameEventData::TokensCleared { tokens } => Some(tokens.clone()),
                _ => None,
            })
            .unwrap()
    }

    fn swap_specials(grid: Grid, from: Position, to: Position) -> MoveReport {
        let mut state = BoardState::from_grid(1, 3, grid);
        play(&mut state, Action::Swap { from, to }, &CascadeConfig::default()).unwrap()
    }

    #[test]
    fn test_classify_combo() {
        use TokenKind::*;
        assert_eq!(classify_combo(ColorClearer, ColorClearer), Some(Combo::ColorColor));
        assert_eq!(classify_combo(AreaClearer, ColorClearer), Some(Combo::ColorArea));
        assert_eq!(classify_combo(ColorClearer, VerticalClearer), Some(Combo::ColorLine));
        assert_eq!(classify_combo(Jelly, ColorClearer), Some(Combo::ColorRegular));
        assert_eq!(classify_combo(AreaClearer, AreaClearer), Some(Combo::AreaArea));
        assert_eq!(classify_combo(HorizontalClearer, AreaClearer), Some(Combo::AreaLine));
        assert_eq!(classify_combo(HorizontalClearer, VerticalClearer), Some(Combo::LineLine));
        assert_eq!(classify_combo(HorizontalClearer, Regular), None);
        assert_eq!(classify_combo(Regular, Regular), None);
    }

    #[test]
    fn test_legal_swaps() {
        assert!(legal_swaps(&base_grid()).is_empty());

        let mut grid = base_grid();
        paint(&mut grid, pos(0, 1), Color::Red);
        paint(&mut grid, pos(1, 2), Color::Red);
        assert_eq!(
            legal_swaps(&grid),
            vec![(pos(0, 1), pos(0, 2)), (pos(0, 2), pos(0, 3)), (pos(0, 2), pos(1, 2))]
        );
    }

    #[test]
    fn test_rejected_swaps_leave_state_untouched() {
        let mut grid = base_grid();
        grid.place(pos(4, 4), Color::Red, TokenKind::Rock, 2);
        let mut state = BoardState::from_grid(1, 3, grid);
        let before = state.compute_hash();
        let config = CascadeConfig::default();

        let cases = [
            (Action::Swap { from: pos(0, 0), to: pos(0, 0) }, MoveError::SameCell),
            (Action::Swap { from: pos(0, 0), to: pos(2, 0) }, MoveError::NotAdjacent { from: pos(0, 0), to: pos(2, 0) }),
            (Action::Swap { from: pos(0, 0), to: pos(1, 1) }, MoveError::NotAdjacent { from: pos(0, 0), to: pos(1, 1) }),
            (Action::Swap { from: pos(7, 7), to: pos(8, 7) }, MoveError::OutOfBounds(pos(8, 7))),
            (Action::Swap { from: pos(0, 0), to: pos(0, 1) }, MoveError::NoMatch),
            (Action::Swap { from: pos(4, 3), to: pos(4, 4) }, MoveError::ObstacleBlocked(pos(4, 4))),
            (Action::Hammer { target: pos(9, 0) }, MoveError::OutOfBounds(pos(9, 0))),
        ];
        for (action, expected) in cases {
            assert_eq!(play(&mut state, action, &config), Err(expected));
        }

        assert_eq!(state.compute_hash(), before);
        assert_eq!(state.actions, 0);
        assert!(state.take_events().is_empty());
    }

    #[test]
    fn test_busy_while_resolving() {
        let mut grid = base_grid();
        paint(&mut grid, pos(0, 1), Color::Red);
        paint(&mut grid, pos(1, 2), Color::Red);
        let mut state = BoardState::from_grid(1, 3, grid);
        let config = CascadeConfig::default();

        perform(&mut state, Action::Swap { from: pos(1, 2), to: pos(0, 2) }, &config).unwrap();
        assert_eq!(
            perform(&mut state, Action::Hammer { target: pos(5, 5) }, &config),
            Err(MoveError::Busy)
        );
        cascade::run_to_rest(&mut state, &config).unwrap();
        assert!(state.is_idle());
    }

    #[test]
    fn test_run_of_four_spawns_vertical_clearer_at_destination() {
        // Row 0 becomes R R R R after moving (1,1) up into (0,1)
        let mut grid = base_grid();
        paint(&mut grid, pos(0, 2), Color::Red);
        paint(&mut grid, pos(1, 1), Color::Red);
        let mut state = BoardState::from_grid(1, 3, grid);
        let config = CascadeConfig::default();

        perform(&mut state, Action::Swap { from: pos(1, 1), to: pos(0, 1) }, &config).unwrap();
        let Some(StepOutcome::Pass(summary)) = step(&mut state, &config) else {
            panic!("expected a pass");
        };

        assert_eq!(summary.destroyed, 4);
        assert_eq!(summary.cleared.len(), 4);
        assert!(summary.cleared.iter().all(|t| t.color == Color::Red));
        assert_eq!(
            summary.spawned,
            vec![SpecialSpawn { position: pos(0, 1), color: Color::Red, kind: TokenKind::VerticalClearer }]
        );
        let special = state.grid.get(pos(0, 1)).unwrap();
        assert_eq!(special.kind, TokenKind::VerticalClearer);
        assert_eq!(special.color, Color::Red);

        let report = cascade::run_to_rest(&mut state, &config).unwrap();
        assert!(report.move_consumed);
    }

    #[test]
    fn test_triggered_vertical_clearer_sweeps_column() {
        let mut grid = base_grid();
        set_kind(&mut grid, pos(0, 1), TokenKind::VerticalClearer);
        let mut state = BoardState::from_grid(1, 3, grid);

        let report = play(&mut state, Action::Hammer { target: pos(0, 1) }, &CascadeConfig::default()).unwrap();
        let (destroyed, damaged) = direct_clear(&report.events);
        let column: Vec<Position> = (0..8).map(|r| pos(r, 1)).collect();
        assert_eq!(destroyed, column);
        assert!(damaged.is_empty());
        assert!(!report.move_consumed);
        assert_eq!(report.awards[0].source, AwardSource::Hammer);
        assert_eq!(report.awards[0].points, 50);
    }

    #[test]
    fn test_line_line_combo_clears_row_and_column() {
        let mut grid = base_grid();
        set_kind(&mut grid, pos(3, 3), TokenKind::HorizontalClearer);
        set_kind(&mut grid, pos(3, 4), TokenKind::VerticalClearer);
        let mut state = BoardState::from_grid(1, 3, grid);

        let report = play(
            &mut state,
            Action::Swap { from: pos(3, 3), to: pos(3, 4) },
            &CascadeConfig::default(),
        )
        .unwrap();

        assert!(report.events.iter().any(|e| e.data
            == GameEventData::ComboTriggered { combo: Combo::LineLine, destination: pos(3, 4) }));
        let (destroyed, _) = direct_clear(&report.events);
        let expected: Vec<Position> = rows_and_cols(&[3], &[4]).into_iter().collect();
        assert_eq!(destroyed.len(), 15);
        assert_eq!(destroyed, expected);
        assert_eq!(report.awards[0].source, AwardSource::DirectClear);
        assert_eq!(report.awards[0].points, 300);
        assert!(report.move_consumed);
    }

    #[test]
    fn test_area_area_combo_clears_five_by_five() {
        let mut grid = base_grid();
        set_kind(&mut grid, pos(3, 3), TokenKind::AreaClearer);
        set_kind(&mut grid, pos(3, 4), TokenKind::AreaClearer);

        let report = swap_specials(grid, pos(3, 3), pos(3, 4));
        let (destroyed, damaged) = direct_clear(&report.events);
        let expected: BTreeSet<Position> = square(pos(3, 4), 2).into_iter().collect();
        assert_eq!(destroyed.len(), 25);
        assert_eq!(destroyed, expected.into_iter().collect::<Vec<_>>());
        assert!(damaged.is_empty());
        assert_eq!(report.awards[0].points, 500);
    }

    #[test]
    fn test_area_line_combo_clears_three_rows_and_columns() {
        let mut grid = base_grid();
        set_kind(&mut grid, pos(3, 3), TokenKind::HorizontalClearer);
        set_kind(&mut grid, pos(3, 4), TokenKind::AreaClearer);

        let report = swap_specials(grid, pos(3, 3), pos(3, 4));
        let (destroyed, _) = direct_clear(&report.events);
        let expected: Vec<Position> = rows_and_cols(&[2, 3, 4], &[3, 4, 5]).into_iter().collect();
        assert_eq!(destroyed.len(), 39);
        assert_eq!(destroyed, expected);
    }

    #[test]
    fn test_color_color_combo_clears_board_and_damages_rocks() {
        let mut grid = base_grid();
        set_kind(&mut grid, pos(3, 3), TokenKind::ColorClearer);
        set_kind(&mut grid, pos(3, 4), TokenKind::ColorClearer);
        grid.place(pos(6, 6), Color::Red, TokenKind::Rock, 2);
        let mut state = BoardState::from_grid(1, 3, grid);

        perform(&mut state, Action::Swap { from: pos(3, 3), to: pos(3, 4) }, &CascadeConfig::default()).unwrap();
        let (destroyed, damaged) = direct_clear(&state.take_events());
        assert_eq!(destroyed.len(), 63);
        assert!(!destroyed.contains(&pos(6, 6)));
        assert_eq!(damaged, vec![pos(6, 6)]);

        let rocks: Vec<_> = state.grid.tokens().filter(|(_, t)| t.kind == TokenKind::Rock).collect();
        assert_eq!(rocks.len(), 1);
        assert_eq!(rocks[0].1.durability, 1);
    }

    #[test]
    fn test_color_area_combo_converts_then_clears() {
        // (0,0) is red, its partner (0,1) is green
        let mut grid = base_grid();
        set_kind(&mut grid, pos(0, 0), TokenKind::ColorClearer);
        set_kind(&mut grid, pos(0, 1), TokenKind::AreaClearer);
        let greens = matchable_of_color(&grid, Color::Green);
        assert_eq!(greens.len(), 11);

        let report = swap_specials(grid, pos(0, 0), pos(0, 1));
        let (destroyed, _) = direct_clear(&report.events);
        assert_eq!(destroyed.len(), 61);
        assert!(greens.iter().all(|p| destroyed.contains(p)));
        // Only the swapped area clearer could have reached (0,2)
        assert!(!destroyed.contains(&pos(0, 2)));
        assert!(!destroyed.contains(&pos(4, 0)));
        assert!(!destroyed.contains(&pos(4, 7)));

        let cleared = first_cleared(&report.events);
        let green_kinds: Vec<TokenKind> = cleared.iter().filter(|t| t.color == Color::Green).map(|t| t.kind).collect();
        assert_eq!(green_kinds.len(), 11);
        assert!(green_kinds.iter().all(|k| *k == TokenKind::AreaClearer));
    }

    #[test]
    fn test_color_line_combo_converts_then_clears() {
        let mut grid = base_grid();
        set_kind(&mut grid, pos(0, 0), TokenKind::ColorClearer);
        set_kind(&mut grid, pos(0, 1), TokenKind::VerticalClearer);
        let greens = matchable_of_color(&grid, Color::Green);

        let report = swap_specials(grid, pos(0, 0), pos(0, 1));
        let (destroyed, _) = direct_clear(&report.events);
        let destroyed: BTreeSet<Position> = destroyed.into_iter().collect();

        // Every converted green fired its full row or its full column
        for &p in greens.iter().filter(|p| **p != pos(0, 1)) {
            let row = (0..8).all(|c| destroyed.contains(&pos(p.row, c)));
            let col = (0..8).all(|r| destroyed.contains(&pos(r, p.col)));
            assert!(row || col, "{:?} did not fire", p);
        }

        let cleared = first_cleared(&report.events);
        let greens_cleared: Vec<&ClearedToken> = cleared.iter().filter(|t| t.color == Color::Green).collect();
        assert_eq!(greens_cleared.len(), greens.len());
        assert!(greens_cleared
            .iter()
            .all(|t| matches!(t.kind, TokenKind::HorizontalClearer | TokenKind::VerticalClearer)));
    }

    #[test]
    fn test_color_clearer_with_regular() {
        let mut grid = base_grid();
        set_kind(&mut grid, pos(0, 0), TokenKind::ColorClearer);
        let greens: Vec<Position> = grid
            .tokens()
            .filter(|(_, t)| t.color == Color::Green)
            .map(|(p, _)| p)
            .collect();
        let mut state = BoardState::from_grid(1, 3, grid);

        let report = play(
            &mut state,
            Action::Swap { from: pos(0, 0), to: pos(0, 1) },
            &CascadeConfig::default(),
        )
        .unwrap();

        let (destroyed, _) = direct_clear(&report.events);
        let mut expected: BTreeSet<Position> = greens.into_iter().collect();
        expected.insert(pos(0, 0));
        assert_eq!(destroyed, expected.into_iter().collect::<Vec<_>>());
    }

    #[test]
    fn test_hammer_on_durable_rock() {
        let mut grid = base_grid();
        grid.place(pos(3, 3), Color::Red, TokenKind::Rock, 2);
        let mut state = BoardState::from_grid(1, 3, grid);

        let report = play(&mut state, Action::Hammer { target: pos(3, 3) }, &CascadeConfig::default()).unwrap();
        let rock = state.grid.get(pos(3, 3)).unwrap();
        assert_eq!(rock.kind, TokenKind::Rock);
        assert_eq!(rock.durability, 1);
        assert_eq!(report.score, 50);
        assert_eq!(report.passes, 0);
        assert!(report.cleared.is_empty());
        // The hit counts as a clearing action
        assert_eq!(state.streak.level(), 2);
    }

    #[test]
    fn test_free_switch_without_match() {
        let mut state = BoardState::from_grid(1, 3, base_grid());
        let report = play(
            &mut state,
            Action::FreeSwitch { from: pos(0, 0), to: pos(0, 1) },
            &CascadeConfig::default(),
        )
        .unwrap();

        assert_eq!(report.passes, 0);
        assert_eq!(report.score, 0);
        assert!(!report.move_consumed);
        assert_eq!(state.streak.level(), 1);
        assert_eq!(state.grid.get(pos(0, 0)).unwrap().color, Color::Green);
        assert_eq!(state.actions, 1);
    }

    #[test]
    fn test_ufo_detonates_two_or_three_lines() {
        let mut state = BoardState::from_grid(1, 3, base_grid());
        let report = play(&mut state, Action::Ufo, &CascadeConfig::default()).unwrap();

        let converted = report
            .events
            .iter()
            .filter(|e| e.pass == 0 && matches!(e.data, GameEventData::SpecialSpawned { .. }))
            .count();
        assert!((2..=3).contains(&converted));
        let (destroyed, _) = direct_clear(&report.events);
        assert!(destroyed.len() >= 8);
        assert!(!report.move_consumed);
    }

    #[test]
    fn test_party_scores_per_token() {
        let mut state = BoardState::from_grid(1, 3, base_grid());
        let report = play(&mut state, Action::Party, &CascadeConfig::default()).unwrap();

        let (destroyed, _) = direct_clear(&report.events);
        let party = report.awards.iter().find(|a| a.source == AwardSource::Party).unwrap();
        assert_eq!(party.points, 15 * destroyed.len() as u32);
        assert!(!destroyed.is_empty());
    }

    #[test]
    fn test_party_without_targets_rejected() {
        let mut grid = Grid::new();
        for p in all_positions() {
            grid.place(p, Color::Red, TokenKind::Rock, 1);
        }
        let mut state = BoardState::from_grid(1, 3, grid);
        let rng_before = state.rng.clone();
        assert_eq!(
            play(&mut state, Action::Party, &CascadeConfig::default()),
            Err(MoveError::NoEligibleCells)
        );
        assert_eq!(state.rng, rng_before);
        assert_eq!(
            play(&mut state, Action::Ufo, &CascadeConfig::default()),
            Err(MoveError::NoEligibleCells)
        );
    }

    #[test]
    fn test_action_power_up_mapping() {
        assert_eq!(Action::Ufo.power_up(), Some(PowerUp::Ufo));
        assert_eq!(Action::Swap { from: pos(0, 0), to: pos(0, 1) }.power_up(), None);
        assert!(Action::Swap { from: pos(0, 0), to: pos(0, 1) }.consumes_move());
        assert!(!Action::Party.consumes_move());
    }
}
