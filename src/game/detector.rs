//! Match Detector
//!
//! Finds runs of three or more same-colored tokens, resolves L/T
//! intersections, decides which specials to spawn, and expands chain
//! reactions from destroyed specials. Pure with respect to the grid: the
//! only state it touches is the injected random source.

use std::collections::{BTreeSet, VecDeque};

use serde::{Serialize, Deserialize};
#[cfg(feature = "debug-tracing")]
use tracing::debug;

use crate::core::grid::{all_positions, Grid, Position};
use crate::core::rng::RandomSource;
use crate::core::token::{Color, TokenKind};
use crate::GRID_SIZE;

/// Minimum run length that counts as a match
pub const MIN_RUN: usize = 3;

// =============================================================================
// TYPES
// =============================================================================

/// Run direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    /// Along a row
    Horizontal,
    /// Along a column
    Vertical,
}

/// A maximal run of same-colored matchable tokens.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    /// Direction of the run
    pub orientation: Orientation,
    /// Shared color
    pub color: Color,
    /// Cells from the top/left end to the bottom/right end
    pub cells: Vec<Position>,
}

impl Run {
    /// Number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Does the run have no cells?
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Does the run contain a position?
    pub fn contains(&self, pos: Position) -> bool {
        self.cells.contains(&pos)
    }

    /// Middle cell, counted `len / 2` back from the far end.
    pub fn middle(&self) -> Position {
        let len = self.cells.len();
        self.cells[len - 1 - len / 2]
    }

    /// Special earned by this run when it is not part of an intersection.
    pub fn special_kind(&self) -> Option<TokenKind> {
        match (self.len(), self.orientation) {
            (n, _) if n >= 5 => Some(TokenKind::ColorClearer),
            (4, Orientation::Horizontal) => Some(TokenKind::VerticalClearer),
            (4, Orientation::Vertical) => Some(TokenKind::HorizontalClearer),
            _ => None,
        }
    }
}

/// A special token to place after a pass clears.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialSpawn {
    /// Target cell
    pub position: Position,
    /// Color of the new special
    pub color: Color,
    /// Special kind
    pub kind: TokenKind,
}

/// Outcome of one detection pass.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Cells destroyed this pass (after chain expansion)
    pub destroyed: BTreeSet<Position>,
    /// Rocks damaged this pass
    pub damaged: BTreeSet<Position>,
    /// Specials to spawn, in detection order
    pub spawns: Vec<SpecialSpawn>,
}

impl MatchResult {
    /// Nothing destroyed and nothing damaged: the board is at rest.
    pub fn is_empty(&self) -> bool {
        self.destroyed.is_empty() && self.damaged.is_empty()
    }
}

// =============================================================================
// RUN SCANNING
// =============================================================================

fn scan_line<F>(orientation: Orientation, line: u8, color_at: F, runs: &mut Vec<Run>)
where
    F: Fn(u8) -> Option<Color>,
{
    let make_pos = |i: u8| match orientation {
        Orientation::Horizontal => Position::new(line, i),
        Orientation::Vertical => Position::new(i, line),
    };

    let mut start = 0u8;
    while (start as usize) < GRID_SIZE {
        let Some(color) = color_at(start) else {
            start += 1;
            continue;
        };
        let mut end = start + 1;
        while (end as usize) < GRID_SIZE && color_at(end) == Some(color) {
            end += 1;
        }
        if (end - start) as usize >= MIN_RUN {
            runs.push(Run {
                orientation,
                color,
                cells: (start..end).map(make_pos).collect(),
            });
        }
        start = end;
    }
}

/// Find every horizontal and vertical run.
///
/// Horizontal runs are listed row by row, vertical runs column by column.
pub fn find_runs(grid: &Grid) -> (Vec<Run>, Vec<Run>) {
    let mut horizontal = Vec::new();
    let mut vertical = Vec::new();

    for line in 0..GRID_SIZE as u8 {
        scan_line(
            Orientation::Horizontal,
            line,
            |col| grid.get(Position::new(line, col)).and_then(|t| t.match_color()),
            &mut horizontal,
        );
        scan_line(
            Orientation::Vertical,
            line,
            |row| grid.get(Position::new(row, line)).and_then(|t| t.match_color()),
            &mut vertical,
        );
    }

    (horizontal, vertical)
}

/// Length of the horizontal and vertical runs through `pos`.
fn run_lengths_through(grid: &Grid, pos: Position) -> (usize, usize) {
    let Some(color) = grid.get(pos).and_then(|t| t.match_color()) else {
        return (0, 0);
    };
    let same = |r: i32, c: i32| grid.get_at(r, c).and_then(|t| t.match_color()) == Some(color);
    let count = |dr: i32, dc: i32| {
        let mut n = 0;
        let (mut r, mut c) = (pos.row as i32 + dr, pos.col as i32 + dc);
        while same(r, c) {
            n += 1;
            r += dr;
            c += dc;
        }
        n
    };
    (1 + count(0, -1) + count(0, 1), 1 + count(-1, 0) + count(1, 0))
}

/// Is `pos` part of a run of three or more?
pub fn has_run_through(grid: &Grid, pos: Position) -> bool {
    let (h, v) = run_lengths_through(grid, pos);
    h >= MIN_RUN || v >= MIN_RUN
}

/// Does any run exist on the board?
pub fn has_any_run(grid: &Grid) -> bool {
    let (horizontal, vertical) = find_runs(grid);
    !horizontal.is_empty() || !vertical.is_empty()
}

// =============================================================================
// DETECTION
// =============================================================================

/// Run one detection pass.
///
/// `preferred` is the move destination; a 4/5-run containing it spawns its
/// special there instead of at the run's middle.
pub fn detect<R: RandomSource>(grid: &Grid, preferred: Option<Position>, rng: &mut R) -> MatchResult {
    let (horizontal, vertical) = find_runs(grid);
    if horizontal.is_empty() && vertical.is_empty() {
        return MatchResult::default();
    }

    let mut matched = BTreeSet::new();
    let mut spawns = Vec::new();
    let mut used_h = vec![false; horizontal.len()];
    let mut used_v = vec![false; vertical.len()];

    // L/T shapes: every crossing pair becomes an area clearer
    for (hi, h_run) in horizontal.iter().enumerate() {
        for (vi, v_run) in vertical.iter().enumerate() {
            let Some(&shared) = h_run.cells.iter().rev().find(|p| v_run.contains(**p)) else {
                continue;
            };
            matched.extend(h_run.cells.iter().copied());
            matched.extend(v_run.cells.iter().copied());
            spawns.push(SpecialSpawn {
                position: shared,
                color: grid.get(shared).map(|t| t.color).unwrap_or(h_run.color),
                kind: TokenKind::AreaClearer,
            });
            used_h[hi] = true;
            used_v[vi] = true;
        }
    }

    let remaining = horizontal
        .iter()
        .zip(used_h)
        .chain(vertical.iter().zip(used_v))
        .filter(|(_, used)| !used)
        .map(|(run, _)| run);

    for run in remaining {
        matched.extend(run.cells.iter().copied());
        if let Some(kind) = run.special_kind() {
            let position = preferred.filter(|p| run.contains(*p)).unwrap_or_else(|| run.middle());
            spawns.push(SpecialSpawn { position, color: run.color, kind });
        }
    }

    #[cfg(feature = "debug-tracing")]
    debug!(
        horizontal = horizontal.len(),
        vertical = vertical.len(),
        matched = matched.len(),
        "runs found"
    );

    let marked = expand_chain(grid, matched, &BTreeSet::new(), rng);
    let (destroyed, damaged) = finalize(grid, &marked);

    MatchResult { destroyed, damaged, spawns }
}

/// Cells a destroyed special marks, before deduplication.
fn blast_cells<R: RandomSource>(grid: &Grid, pos: Position, kind: TokenKind, rng: &mut R) -> Vec<Position> {
    let n = GRID_SIZE as u8;
    match kind {
        TokenKind::HorizontalClearer => (0..n).map(|c| Position::new(pos.row, c)).collect(),
        TokenKind::VerticalClearer => (0..n).map(|r| Position::new(r, pos.col)).collect(),
        TokenKind::AreaClearer => square(pos, 1),
        TokenKind::ColorClearer => {
            let color = Color::random(rng);
            cells_of_color(grid, color)
        }
        _ => Vec::new(),
    }
}

/// Chain expansion from a seed set.
///
/// Every seed and every newly marked cell is processed once; specials among
/// them fire. Cells in `skip` are marked but never fire.
pub fn expand_chain<R, I>(grid: &Grid, seeds: I, skip: &BTreeSet<Position>, rng: &mut R) -> BTreeSet<Position>
where
    R: RandomSource,
    I: IntoIterator<Item = Position>,
{
    let mut marked: BTreeSet<Position> = seeds.into_iter().filter(|p| p.in_bounds()).collect();
    let mut queue: VecDeque<Position> = marked.iter().copied().collect();
    let mut processed = BTreeSet::new();

    while let Some(pos) = queue.pop_front() {
        if !processed.insert(pos) || skip.contains(&pos) {
            continue;
        }
        let Some(token) = grid.get(pos) else {
            continue;
        };
        for hit in blast_cells(grid, pos, token.kind, rng) {
            if marked.insert(hit) {
                queue.push_back(hit);
            }
        }
    }

    marked
}

/// Split marked cells into destroyed and damaged.
///
/// Rocks are never destroyed outright: a marked rock is damaged, and so is
/// every rock next to a destroyed cell. Empty cells drop out.
pub fn finalize(grid: &Grid, marked: &BTreeSet<Position>) -> (BTreeSet<Position>, BTreeSet<Position>) {
    let mut destroyed = BTreeSet::new();
    let mut damaged = BTreeSet::new();

    for &pos in marked {
        match grid.get(pos).map(|t| t.kind) {
            Some(TokenKind::Rock) => {
                damaged.insert(pos);
            }
            Some(_) => {
                destroyed.insert(pos);
            }
            None => {}
        }
    }

    for pos in &destroyed {
        for neighbor in pos.neighbors4() {
            if grid.get(neighbor).map(|t| t.kind) == Some(TokenKind::Rock) {
                damaged.insert(neighbor);
            }
        }
    }

    (destroyed, damaged)
}

// =============================================================================
// CELL SETS
// =============================================================================

/// Cells within Chebyshev distance `radius` of `center`, clipped to the board.
pub fn square(center: Position, radius: i32) -> Vec<Position> {
    let mut cells = Vec::new();
    for dr in -radius..=radius {
        for dc in -radius..=radius {
            if let Some(pos) = center.offset(dr, dc) {
                cells.push(pos);
            }
        }
    }
    cells
}

/// Every non-rock token of a color.
pub fn cells_of_color(grid: &Grid, color: Color) -> Vec<Position> {
    grid.tokens()
        .filter(|(_, t)| t.kind != TokenKind::Rock && t.color == color)
        .map(|(pos, _)| pos)
        .collect()
}

/// Every token that can match by color and has the given color.
pub fn matchable_of_color(grid: &Grid, color: Color) -> Vec<Position> {
    grid.tokens()
        .filter(|(_, t)| t.match_color() == Some(color))
        .map(|(pos, _)| pos)
        .collect()
}

/// Full rows `rows` and full columns `cols`.
pub fn rows_and_cols(rows: &[i32], cols: &[i32]) -> BTreeSet<Position> {
    let mut cells = BTreeSet::new();
    for pos in all_positions() {
        if rows.contains(&(pos.row as i32)) || cols.contains(&(pos.col as i32)) {
            cells.insert(pos);
        }
    }
    cells
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rng::DeterministicRng;
    use crate::game::test_support::{base_grid, paint, set_kind};
    use proptest::prelude::*;

    fn pos(row: u8, col: u8) -> Position {
        Position::new(row, col)
    }

    /// Row 0 becomes R R R B G P R G: one run of exactly three.
    fn red_three(grid: &mut Grid) {
        paint(grid, pos(0, 1), Color::Red);
        paint(grid, pos(0, 2), Color::Red);
        paint(grid, pos(0, 3), Color::Blue);
    }

    #[test]
    fn test_base_grid_has_no_runs() {
        let grid = base_grid();
        assert!(!has_any_run(&grid));
        let mut rng = DeterministicRng::new(1);
        assert!(detect(&grid, None, &mut rng).is_empty());
    }

    #[test]
    fn test_run_of_three_spawns_nothing() {
        let mut grid = base_grid();
        red_three(&mut grid);

        let mut rng = DeterministicRng::new(1);
        let result = detect(&grid, None, &mut rng);
        assert_eq!(result.destroyed.len(), 3);
        assert!(result.spawns.is_empty());
        assert!(result.damaged.is_empty());
    }

    #[test]
    fn test_run_of_four_prefers_destination() {
        let mut grid = base_grid();
        for col in 0..4 {
            paint(&mut grid, pos(0, col), Color::Red);
        }
        // (0,4) is G, so the run is exactly four long
        let mut rng = DeterministicRng::new(1);
        let result = detect(&grid, Some(pos(0, 1)), &mut rng);

        assert_eq!(result.destroyed, (0..4).map(|c| pos(0, c)).collect::<BTreeSet<_>>());
        assert_eq!(
            result.spawns,
            vec![SpecialSpawn { position: pos(0, 1), color: Color::Red, kind: TokenKind::VerticalClearer }]
        );

        // Without a preferred cell the middle is end - len/2
        let result = detect(&grid, None, &mut rng);
        assert_eq!(result.spawns[0].position, pos(0, 1));
        let result = detect(&grid, Some(pos(5, 5)), &mut rng);
        assert_eq!(result.spawns[0].position, pos(0, 1));
    }

    #[test]
    fn test_vertical_run_of_four_spawns_horizontal_clearer() {
        let mut grid = base_grid();
        for row in 2..6 {
            paint(&mut grid, pos(row, 7), Color::Blue);
        }
        // Column 7 is G Y P O R B G Y; rows 1 and 6 stay Y and G
        let mut rng = DeterministicRng::new(1);
        let result = detect(&grid, None, &mut rng);
        assert_eq!(result.spawns.len(), 1);
        assert_eq!(result.spawns[0].kind, TokenKind::HorizontalClearer);
        assert_eq!(result.spawns[0].position, pos(3, 7));
    }

    #[test]
    fn test_run_of_five_spawns_color_clearer() {
        let mut grid = base_grid();
        for col in 0..5 {
            paint(&mut grid, pos(4, col), Color::Yellow);
        }
        let mut rng = DeterministicRng::new(1);
        let result = detect(&grid, None, &mut rng);
        assert_eq!(result.destroyed.len(), 5);
        assert_eq!(
            result.spawns,
            vec![SpecialSpawn { position: pos(4, 2), color: Color::Yellow, kind: TokenKind::ColorClearer }]
        );
    }

    #[test]
    fn test_l_shape_spawns_single_area_clearer() {
        let mut grid = base_grid();
        // Horizontal (6,0..=2) and vertical (4..=6, 0) share (6,0)
        for cell in [pos(6, 0), pos(6, 1), pos(6, 2), pos(5, 0), pos(4, 0)] {
            paint(&mut grid, cell, Color::Orange);
        }
        let mut rng = DeterministicRng::new(1);
        let result = detect(&grid, None, &mut rng);

        assert_eq!(result.destroyed.len(), 5);
        assert_eq!(
            result.spawns,
            vec![SpecialSpawn { position: pos(6, 0), color: Color::Orange, kind: TokenKind::AreaClearer }]
        );
    }

    #[test]
    fn test_color_clearer_never_extends_run() {
        let mut grid = base_grid();
        paint(&mut grid, pos(0, 1), Color::Red);
        paint(&mut grid, pos(0, 2), Color::Red);
        set_kind(&mut grid, pos(0, 1), TokenKind::ColorClearer);
        assert!(!has_any_run(&grid));
    }

    #[test]
    fn test_destroyed_clearer_sweeps_column() {
        let mut grid = base_grid();
        red_three(&mut grid);
        set_kind(&mut grid, pos(0, 1), TokenKind::VerticalClearer);

        let mut rng = DeterministicRng::new(1);
        let result = detect(&grid, None, &mut rng);
        // Row 0 cols 0..=2 plus the rest of column 1
        assert_eq!(result.destroyed.len(), 3 + 7);
        for row in 0..8 {
            assert!(result.destroyed.contains(&pos(row, 1)));
        }
    }

    #[test]
    fn test_chain_reaction_fires_hit_specials() {
        let mut grid = base_grid();
        red_three(&mut grid);
        set_kind(&mut grid, pos(0, 1), TokenKind::VerticalClearer);
        set_kind(&mut grid, pos(5, 1), TokenKind::HorizontalClearer);

        let mut rng = DeterministicRng::new(1);
        let result = detect(&grid, None, &mut rng);
        for col in 0..8 {
            assert!(result.destroyed.contains(&pos(5, col)));
        }
        // Spawns only at originally computed positions
        assert!(result.spawns.is_empty());
    }

    #[test]
    fn test_rocks_damaged_not_destroyed() {
        let mut grid = base_grid();
        red_three(&mut grid);
        grid.place(pos(1, 1), Color::Red, TokenKind::Rock, 2);

        let mut rng = DeterministicRng::new(1);
        let result = detect(&grid, None, &mut rng);
        assert_eq!(result.damaged, BTreeSet::from([pos(1, 1)]));
        assert!(!result.destroyed.contains(&pos(1, 1)));
    }

    #[test]
    fn test_swept_rock_becomes_damage() {
        let mut grid = base_grid();
        red_three(&mut grid);
        set_kind(&mut grid, pos(0, 1), TokenKind::VerticalClearer);
        grid.place(pos(6, 1), Color::Red, TokenKind::Rock, 2);

        let mut rng = DeterministicRng::new(1);
        let result = detect(&grid, None, &mut rng);
        assert!(result.damaged.contains(&pos(6, 1)));
        assert!(!result.destroyed.contains(&pos(6, 1)));
    }

    #[test]
    fn test_out_of_bounds_seeds_ignored() {
        let grid = base_grid();
        let mut rng = DeterministicRng::new(1);
        let marked = expand_chain(&grid, [pos(9, 9), pos(0, 0)], &BTreeSet::new(), &mut rng);
        assert_eq!(marked, BTreeSet::from([pos(0, 0)]));
    }

    #[test]
    fn test_rows_and_cols() {
        assert_eq!(rows_and_cols(&[3], &[4]).len(), 15);
        assert_eq!(rows_and_cols(&[2, 3, 4], &[3, 4, 5]).len(), 24 + 24 - 9);
        assert_eq!(square(pos(0, 0), 2).len(), 9);
    }

    proptest! {
        #[test]
        fn prop_detection_is_idempotent(seed in any::<u64>()) {
            let mut grid = base_grid();
            let mut fill = DeterministicRng::new(seed);
            // Random board with random specials: runs and chains are likely
            for (pos, kind) in all_positions().map(|p| (p, fill.next_int(10))).collect::<Vec<_>>() {
                let color = Color::random(&mut fill);
                let kind = match kind {
                    0 => TokenKind::HorizontalClearer,
                    1 => TokenKind::VerticalClearer,
                    2 => TokenKind::ColorClearer,
                    _ => TokenKind::Regular,
                };
                grid.place(pos, color, kind, 0);
            }

            let rng = DeterministicRng::new(seed ^ 0xABCD);
            let first = detect(&grid, None, &mut rng.clone());
            let second = detect(&grid, None, &mut rng.clone());
            prop_assert_eq!(first, second);
        }
    }
}
