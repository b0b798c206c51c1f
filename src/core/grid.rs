//! Grid Model
//!
//! Fixed 8x8 board stored as a flat row-major array of optional tokens.
//! All reads tolerate out-of-bounds coordinates and return `None`, because
//! the detector and cascade probe neighbors near the edges all the time.

use std::fmt;

use serde::{Serialize, Deserialize};
use thiserror::Error;

use super::token::{Color, Token, TokenKind};
use crate::GRID_SIZE;

/// Total number of cells on the board
pub const CELL_COUNT: usize = GRID_SIZE * GRID_SIZE;

// =============================================================================
// POSITION
// =============================================================================

/// Row/column pair, 0-indexed from the top-left.
///
/// Ordered row-major so ordered sets of positions iterate deterministically.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Row (0 = top)
    pub row: u8,
    /// Column (0 = left)
    pub col: u8,
}

impl Position {
    /// Create a position (not bounds-checked).
    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }

    /// Create a position from signed coordinates, if in bounds.
    pub fn checked(row: i32, col: i32) -> Option<Self> {
        let n = GRID_SIZE as i32;
        if row < 0 || col < 0 || row >= n || col >= n {
            None
        } else {
            Some(Self::new(row as u8, col as u8))
        }
    }

    /// Is this position on the board?
    #[inline]
    pub fn in_bounds(self) -> bool {
        (self.row as usize) < GRID_SIZE && (self.col as usize) < GRID_SIZE
    }

    /// Offset by a signed delta, if the result is on the board.
    pub fn offset(self, d_row: i32, d_col: i32) -> Option<Self> {
        Self::checked(self.row as i32 + d_row, self.col as i32 + d_col)
    }

    /// The up-to-four orthogonal neighbors on the board.
    pub fn neighbors4(self) -> impl Iterator<Item = Position> {
        [(-1, 0), (1, 0), (0, -1), (0, 1)]
            .into_iter()
            .filter_map(move |(dr, dc)| self.offset(dr, dc))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// True iff the Manhattan distance between `a` and `b` is exactly 1.
pub fn is_adjacent(a: Position, b: Position) -> bool {
    let dr = (a.row as i32 - b.row as i32).abs();
    let dc = (a.col as i32 - b.col as i32).abs();
    dr + dc == 1
}

/// Every on-board position in row-major order.
pub fn all_positions() -> impl Iterator<Item = Position> {
    (0..GRID_SIZE as u8).flat_map(|row| (0..GRID_SIZE as u8).map(move |col| Position::new(row, col)))
}

// =============================================================================
// GRID
// =============================================================================

/// A cell: a token or transiently empty.
pub type Cell = Option<Token>;

/// The board.
///
/// Also owns the token id counter so every token minted onto it is unique.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawGrid")]
pub struct Grid {
    /// Flat array of cells, row-major order (row * GRID_SIZE + col)
    cells: Vec<Cell>,
    /// Next token id to mint
    next_id: u32,
}

/// Wire shape of [`Grid`], checked before it becomes one.
#[derive(Deserialize)]
struct RawGrid {
    cells: Vec<Cell>,
    next_id: u32,
}

impl TryFrom<RawGrid> for Grid {
    type Error = GridParseError;

    fn try_from(raw: RawGrid) -> Result<Self, Self::Error> {
        if raw.cells.len() != CELL_COUNT {
            return Err(GridParseError::CellCount(raw.cells.len()));
        }
        Ok(Self { cells: raw.cells, next_id: raw.next_id })
    }
}

impl Grid {
    /// Create an empty grid.
    pub fn new() -> Self {
        Self {
            cells: vec![None; CELL_COUNT],
            next_id: 1,
        }
    }

    #[inline(always)]
    fn index(pos: Position) -> Option<usize> {
        if pos.in_bounds() {
            Some(pos.row as usize * GRID_SIZE + pos.col as usize)
        } else {
            None
        }
    }

    /// Side length.
    pub fn size(&self) -> usize {
        GRID_SIZE
    }

    /// Token at a position. Out-of-bounds and empty cells read as `None`.
    #[inline]
    pub fn get(&self, pos: Position) -> Option<&Token> {
        Self::index(pos).and_then(|idx| self.cells[idx].as_ref())
    }

    /// Token at signed coordinates, `None` when off the board.
    pub fn get_at(&self, row: i32, col: i32) -> Option<&Token> {
        Position::checked(row, col).and_then(|pos| self.get(pos))
    }

    /// Mutable token at a position.
    pub fn get_mut(&mut self, pos: Position) -> Option<&mut Token> {
        Self::index(pos).and_then(move |idx| self.cells[idx].as_mut())
    }

    /// Replace a cell. Returns false if out of bounds.
    pub fn set(&mut self, pos: Position, cell: Cell) -> bool {
        match Self::index(pos) {
            Some(idx) => {
                self.cells[idx] = cell;
                true
            }
            None => false,
        }
    }

    /// Remove and return the token at a position.
    pub fn take(&mut self, pos: Position) -> Option<Token> {
        Self::index(pos).and_then(|idx| self.cells[idx].take())
    }

    /// Is this cell on the board and empty?
    pub fn is_empty_at(&self, pos: Position) -> bool {
        matches!(Self::index(pos).map(|idx| self.cells[idx].is_none()), Some(true))
    }

    /// Swap two cells. Returns false if either is out of bounds.
    pub fn swap(&mut self, a: Position, b: Position) -> bool {
        match (Self::index(a), Self::index(b)) {
            (Some(ia), Some(ib)) => {
                self.cells.swap(ia, ib);
                true
            }
            _ => false,
        }
    }

    /// Mint a new token with a fresh id (not placed).
    pub fn mint(&mut self, color: Color, kind: TokenKind, durability: u8) -> Token {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        Token::new(id, color, kind, durability)
    }

    /// Mint a token and place it.
    pub fn place(&mut self, pos: Position, color: Color, kind: TokenKind, durability: u8) -> bool {
        if !pos.in_bounds() {
            return false;
        }
        let token = self.mint(color, kind, durability);
        self.set(pos, Some(token))
    }

    /// Does every cell hold a token?
    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|cell| cell.is_some())
    }

    /// Count of empty cells.
    pub fn empty_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_none()).count()
    }

    /// Next id that will be minted.
    pub fn next_id(&self) -> u32 {
        self.next_id
    }

    /// Iterate `(position, token)` over occupied cells in row-major order.
    pub fn tokens(&self) -> impl Iterator<Item = (Position, &Token)> {
        all_positions().filter_map(move |pos| self.get(pos).map(|token| (pos, token)))
    }

    /// Raw cell slice (row-major).
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Check structural validity after deserialization.
    pub fn is_well_formed(&self) -> bool {
        self.cells.len() == CELL_COUNT
    }

    /// Feed the grid into a state hasher.
    pub fn hash_into(&self, hasher: &mut crate::core::hash::StateHasher) {
        for cell in &self.cells {
            match cell {
                Some(token) => {
                    hasher.update_bool(true);
                    hasher.update_u32(token.id);
                    hasher.update_u8(token.color as u8);
                    hasher.update_u8(token.kind as u8);
                    hasher.update_u8(token.durability);
                }
                None => hasher.update_bool(false),
            }
        }
        hasher.update_u32(self.next_id);
    }

    // =========================================================================
    // Text encoding
    // =========================================================================

    /// Encode the grid as text: one line per row, cells separated by spaces.
    ///
    /// Each cell is a color letter plus kind suffix (`-`, `|`, `*`, `@`, `~`)
    /// and, for tokens with more than one hit left, a durability digit.
    /// Rocks are `#`, empty cells `.`.
    pub fn encode(&self) -> String {
        let mut rows = Vec::with_capacity(GRID_SIZE);
        for row in 0..GRID_SIZE as u8 {
            let cells: Vec<String> = (0..GRID_SIZE as u8)
                .map(|col| encode_cell(self.get(Position::new(row, col))))
                .collect();
            rows.push(cells.join(" "));
        }
        rows.join("\n")
    }

    /// Parse the text encoding produced by [`Grid::encode`].
    pub fn parse(text: &str) -> Result<Self, GridParseError> {
        let rows: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        if rows.len() != GRID_SIZE {
            return Err(GridParseError::RowCount(rows.len()));
        }

        let mut grid = Grid::new();
        for (row, line) in rows.iter().enumerate() {
            let cells: Vec<&str> = line.split_whitespace().collect();
            if cells.len() != GRID_SIZE {
                return Err(GridParseError::ColumnCount { row, found: cells.len() });
            }
            for (col, raw) in cells.iter().enumerate() {
                let pos = Position::new(row as u8, col as u8);
                if let Some((color, kind, durability)) = decode_cell(raw)? {
                    grid.place(pos, color, kind, durability);
                }
            }
        }
        Ok(grid)
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

fn encode_cell(cell: Option<&Token>) -> String {
    let Some(token) = cell else {
        return ".".to_string();
    };
    let mut out = String::with_capacity(3);
    if token.kind == TokenKind::Rock {
        out.push('#');
    } else {
        out.push(token.color.letter());
        out.push_str(token.kind.suffix());
    }
    if token.durability > 1 {
        out.push_str(&token.durability.to_string());
    }
    out
}

fn decode_cell(raw: &str) -> Result<Option<(Color, TokenKind, u8)>, GridParseError> {
    let mut chars = raw.chars().peekable();
    let head = chars.next().ok_or_else(|| GridParseError::BadCell(raw.to_string()))?;

    let (color, mut kind) = match head {
        '.' => return Ok(None),
        '#' => (Color::Red, TokenKind::Rock),
        c => {
            let color = Color::from_letter(c).ok_or_else(|| GridParseError::BadCell(raw.to_string()))?;
            (color, TokenKind::Regular)
        }
    };

    if kind == TokenKind::Regular {
        if let Some(&c) = chars.peek() {
            if let Some(parsed) = TokenKind::from_suffix(c) {
                kind = parsed;
                chars.next();
            }
        }
    }

    let rest: String = chars.collect();
    let durability = if rest.is_empty() {
        if kind.is_obstacle() { 1 } else { 0 }
    } else {
        rest.parse::<u8>().map_err(|_| GridParseError::BadCell(raw.to_string()))?
    };

    Ok(Some((color, kind, durability)))
}

/// Errors from [`Grid::parse`] and grid deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridParseError {
    /// Wrong number of rows
    #[error("expected {} rows, found {0}", GRID_SIZE)]
    RowCount(usize),
    /// Wrong number of cells in a row
    #[error("row {row}: expected {} cells, found {found}", GRID_SIZE)]
    ColumnCount {
        /// Offending row
        row: usize,
        /// Cells found
        found: usize,
    },
    /// Unrecognized cell text
    #[error("unrecognized cell: {0:?}")]
    BadCell(String),
    /// Serialized cell array of the wrong length
    #[error("expected {} cells, found {0}", CELL_COUNT)]
    CellCount(usize),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const LAYOUT: &str = "
        R G P R G P R G
        B Y O B Y O B Y
        G P R G P R G P
        Y O B # O B Y O
        P R G P R G P R
        O B Y O B- Y O B
        R G P R G P R~2 G
        B Y O B Y O B Y@
    ";

    #[test]
    fn test_is_adjacent() {
        let a = Position::new(3, 3);
        assert!(is_adjacent(a, Position::new(2, 3)));
        assert!(is_adjacent(a, Position::new(3, 4)));
        assert!(!is_adjacent(a, Position::new(4, 4)));
        assert!(!is_adjacent(a, a));
        assert!(!is_adjacent(a, Position::new(3, 5)));
    }

    #[test]
    fn test_out_of_bounds_reads_are_absent() {
        let grid = Grid::parse(LAYOUT).unwrap();
        assert!(grid.get_at(-1, 0).is_none());
        assert!(grid.get_at(0, 8).is_none());
        assert!(grid.get(Position::new(8, 8)).is_none());
        assert!(grid.get_at(0, 0).is_some());
    }

    #[test]
    fn test_parse_kinds_and_durability() {
        let grid = Grid::parse(LAYOUT).unwrap();

        let rock = grid.get(Position::new(3, 3)).unwrap();
        assert_eq!(rock.kind, TokenKind::Rock);
        assert_eq!(rock.durability, 1);

        let jelly = grid.get(Position::new(6, 6)).unwrap();
        assert_eq!(jelly.kind, TokenKind::Jelly);
        assert_eq!(jelly.color, Color::Red);
        assert_eq!(jelly.durability, 2);

        let stripe = grid.get(Position::new(5, 4)).unwrap();
        assert_eq!(stripe.kind, TokenKind::HorizontalClearer);
        assert_eq!(stripe.color, Color::Blue);

        assert_eq!(grid.get(Position::new(7, 7)).unwrap().kind, TokenKind::ColorClearer);
        assert!(grid.is_full());
    }

    #[test]
    fn test_encode_parse_roundtrip() {
        let grid = Grid::parse(LAYOUT).unwrap();
        let reparsed = Grid::parse(&grid.encode()).unwrap();
        assert_eq!(grid.encode(), reparsed.encode());
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(Grid::parse("R G"), Err(GridParseError::RowCount(1)));
        let bad = LAYOUT.replace("Y@", "Z");
        assert!(matches!(Grid::parse(&bad), Err(GridParseError::BadCell(_))));
    }

    #[test]
    fn test_deserialize_rejects_short_cell_array() {
        let grid = Grid::parse(LAYOUT).unwrap();
        let json = serde_json::to_string(&grid).unwrap();
        assert_eq!(serde_json::from_str::<Grid>(&json).unwrap(), grid);

        let short = r#"{"cells":[null,null,null],"next_id":1}"#;
        let err = serde_json::from_str::<Grid>(short).unwrap_err();
        assert!(err.to_string().contains("expected 64 cells, found 3"));
    }

    #[test]
    fn test_unique_ids() {
        let grid = Grid::parse(LAYOUT).unwrap();
        let mut ids: Vec<u32> = grid.tokens().map(|(_, t)| t.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), CELL_COUNT);
    }

    #[test]
    fn test_neighbors_at_corner() {
        let corner: Vec<_> = Position::new(0, 0).neighbors4().collect();
        assert_eq!(corner.len(), 2);
    }
}
