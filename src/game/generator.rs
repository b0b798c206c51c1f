//! Board Generator
//!
//! Builds the starting grid for a level attempt: obstacles first, then
//! colors in row-major order with run rejection, then a playability check.

use tracing::{debug, warn};

use crate::core::grid::{all_positions, Grid, Position, CELL_COUNT};
use crate::core::rng::RandomSource;
use crate::core::token::{Color, TokenKind};
use crate::game::level::LevelConfig;
use crate::game::moves::legal_swaps;

/// Boards generated before giving up on finding a playable one
pub const MAX_GENERATION_ATTEMPTS: u32 = 32;

/// Random color draws per cell before falling back to the first safe color
const MAX_COLOR_RETRIES: u32 = 64;

/// Obstacle plan for one cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct CellPlan {
    kind: TokenKind,
    durability: u8,
}

const REGULAR: CellPlan = CellPlan { kind: TokenKind::Regular, durability: 0 };

fn plan_index(pos: Position) -> usize {
    pos.row as usize * crate::GRID_SIZE + pos.col as usize
}

/// Decide obstacle cells for a level.
fn plan_obstacles<R: RandomSource>(level: &LevelConfig, rng: &mut R) -> Vec<CellPlan> {
    let mut plan = vec![REGULAR; CELL_COUNT];
    let obstacles = &level.obstacles;

    if level.has_rocks() && obstacles.rock_block_fits() {
        let (origin_row, origin_col) = obstacles.rock_origin;
        let (height, width) = obstacles.rock_size;
        for row in origin_row..origin_row + height {
            for col in origin_col..origin_col + width {
                plan[plan_index(Position::new(row, col))] = CellPlan {
                    kind: TokenKind::Rock,
                    durability: obstacles.rock_durability,
                };
            }
        }
    }

    if level.has_jelly() {
        let mut candidates: Vec<Position> = all_positions()
            .filter(|pos| plan[plan_index(*pos)].kind != TokenKind::Rock)
            .collect();
        rng.shuffle(&mut candidates);
        for pos in candidates.into_iter().take(obstacles.jelly_count as usize) {
            plan[plan_index(pos)] = CellPlan {
                kind: TokenKind::Jelly,
                durability: obstacles.jelly_durability,
            };
        }
    }

    plan
}

/// Would placing `color` at `pos` complete a run with the cells left of or above it?
fn completes_run(grid: &Grid, pos: Position, color: Color) -> bool {
    let same = |dr: i32, dc: i32| {
        pos.offset(dr, dc)
            .and_then(|p| grid.get(p))
            .and_then(|t| t.match_color())
            == Some(color)
    };
    (same(0, -1) && same(0, -2)) || (same(-1, 0) && same(-2, 0))
}

/// Pick a color for a matchable cell that does not complete a run.
fn pick_color<R: RandomSource>(grid: &Grid, pos: Position, rng: &mut R) -> Color {
    for _ in 0..MAX_COLOR_RETRIES {
        let color = Color::random(rng);
        if !completes_run(grid, pos, color) {
            return color;
        }
    }
    // At most two colors can be rejected, so a safe one always exists
    Color::PALETTE
        .into_iter()
        .find(|c| !completes_run(grid, pos, *c))
        .unwrap_or(Color::Red)
}

/// Generate one board without the playability check.
pub fn generate_unchecked<R: RandomSource>(level: &LevelConfig, rng: &mut R) -> Grid {
    let plan = plan_obstacles(level, rng);
    let mut grid = Grid::new();

    for pos in all_positions() {
        let cell = plan[plan_index(pos)];
        let color = if cell.kind.is_color_matchable() {
            pick_color(&grid, pos, rng)
        } else {
            Color::random(rng)
        };
        grid.place(pos, color, cell.kind, cell.durability);
    }

    grid
}

/// Generate a starting board with no runs and at least one legal swap.
///
/// Retries up to [`MAX_GENERATION_ATTEMPTS`] times; if every attempt is
/// stuck the last board is returned anyway.
pub fn generate<R: RandomSource>(level: &LevelConfig, rng: &mut R) -> Grid {
    let mut grid = generate_unchecked(level, rng);
    for attempt in 1..MAX_GENERATION_ATTEMPTS {
        if !legal_swaps(&grid).is_empty() {
            debug!(level = level.id, attempt, "board generated");
            return grid;
        }
        grid = generate_unchecked(level, rng);
    }

    if legal_swaps(&grid).is_empty() {
        warn!(
            level = level.id,
            attempts = MAX_GENERATION_ATTEMPTS,
            "no playable board found, using last attempt"
        );
    }
    grid
}

// =============================================================================
// TESTS
// =============================================================================
