//! Gravity and Refill
//!
//! Column-wise, bottom-anchored, order-preserving compaction followed by a
//! refill of the vacated top cells with fresh regular tokens. Refills are
//! not filtered for matches; those feed the next cascade pass.

use serde::{Serialize, Deserialize};

use crate::core::grid::{Grid, Position};
use crate::core::rng::RandomSource;
use crate::core::token::{Color, TokenKind};
use crate::GRID_SIZE;

/// What gravity did to the board.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GravityOutcome {
    /// Tokens that fell: (from, to)
    pub moved: Vec<(Position, Position)>,
    /// Cells filled with new tokens, column by column, bottom-up
    pub refilled: Vec<Position>,
}

/// Compact one column toward the bottom. Returns how many top cells are empty.
pub fn compact_column(grid: &mut Grid, col: u8, moved: &mut Vec<(Position, Position)>) -> usize {
    let mut write = GRID_SIZE as i32 - 1;
    for row in (0..GRID_SIZE as u8).rev() {
        let from = Position::new(row, col);
        let Some(token) = grid.take(from) else {
            continue;
        };
        let to = Position::new(write as u8, col);
        grid.set(to, Some(token));
        if to != from {
            moved.push((from, to));
        }
        write -= 1;
    }
    (write + 1) as usize
}

/// Apply gravity to every column and refill.
pub fn apply_gravity<R: RandomSource>(grid: &mut Grid, rng: &mut R) -> GravityOutcome {
    let mut outcome = GravityOutcome::default();

    for col in 0..GRID_SIZE as u8 {
        let empty = compact_column(grid, col, &mut outcome.moved);
        for row in (0..empty as u8).rev() {
            let pos = Position::new(row, col);
            let color = Color::random(rng);
            grid.place(pos, color, TokenKind::Regular, 0);
            outcome.refilled.push(pos);
        }
    }

    outcome
}
