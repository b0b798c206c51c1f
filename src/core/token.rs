//! Tokens
//!
//! The occupant of a single grid cell: a colored candy, a special clearer,
//! or an obstacle.

use serde::{Serialize, Deserialize};

use super::rng::RandomSource;

// =============================================================================
// COLOR
// =============================================================================

/// Token color. The palette is fixed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Color {
    /// Red
    Red = 0,
    /// Blue
    Blue = 1,
    /// Green
    Green = 2,
    /// Yellow
    Yellow = 3,
    /// Purple
    Purple = 4,
    /// Orange
    Orange = 5,
}

impl Color {
    /// Full palette in index order.
    pub const PALETTE: [Color; 6] = [
        Color::Red,
        Color::Blue,
        Color::Green,
        Color::Yellow,
        Color::Purple,
        Color::Orange,
    ];

    /// Get color from palette index.
    pub fn from_index(index: u8) -> Option<Color> {
        Self::PALETTE.get(index as usize).copied()
    }

    /// Draw a color uniformly from the palette.
    pub fn random<R: RandomSource>(rng: &mut R) -> Color {
        Self::PALETTE[rng.next_int(Self::PALETTE.len() as u32) as usize]
    }

    /// Single-letter code used by the text encoding.
    pub fn letter(self) -> char {
        match self {
            Color::Red => 'R',
            Color::Blue => 'B',
            Color::Green => 'G',
            Color::Yellow => 'Y',
            Color::Purple => 'P',
            Color::Orange => 'O',
        }
    }

    /// Parse a color letter (case-insensitive).
    pub fn from_letter(letter: char) -> Option<Color> {
        match letter.to_ascii_uppercase() {
            'R' => Some(Color::Red),
            'B' => Some(Color::Blue),
            'G' => Some(Color::Green),
            'Y' => Some(Color::Yellow),
            'P' => Some(Color::Purple),
            'O' => Some(Color::Orange),
            _ => None,
        }
    }
}

// =============================================================================
// TOKEN KIND
// =============================================================================

/// What a token does when it is destroyed (or how it resists).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
#[derive(Default)]
pub enum TokenKind {
    /// Plain candy
    #[default]
    Regular = 0,
    /// Clears its whole row when destroyed
    HorizontalClearer = 1,
    /// Clears its whole column when destroyed
    VerticalClearer = 2,
    /// Clears its 3x3 neighborhood when destroyed
    AreaClearer = 3,
    /// Clears every token of one color; never matches by color
    ColorClearer = 4,
    /// Blocker: never matches, only damaged by adjacent clears
    Rock = 5,
    /// Multi-hit overlay on a colored candy; matches normally
    Jelly = 6,
}

impl TokenKind {
    /// Does this kind continue a same-color run?
    #[inline]
    pub fn is_color_matchable(self) -> bool {
        !matches!(self, TokenKind::Rock | TokenKind::ColorClearer)
    }

    /// Is this one of the four clearer specials?
    #[inline]
    pub fn is_special(self) -> bool {
        matches!(
            self,
            TokenKind::HorizontalClearer
                | TokenKind::VerticalClearer
                | TokenKind::AreaClearer
                | TokenKind::ColorClearer
        )
    }

    /// Is this a horizontal or vertical clearer?
    #[inline]
    pub fn is_line(self) -> bool {
        matches!(self, TokenKind::HorizontalClearer | TokenKind::VerticalClearer)
    }

    /// Is this an obstacle (rock or jelly)?
    #[inline]
    pub fn is_obstacle(self) -> bool {
        matches!(self, TokenKind::Rock | TokenKind::Jelly)
    }

    /// Suffix used by the text encoding (empty for regular candies).
    pub fn suffix(self) -> &'static str {
        match self {
            TokenKind::Regular => "",
            TokenKind::HorizontalClearer => "-",
            TokenKind::VerticalClearer => "|",
            TokenKind::AreaClearer => "*",
            TokenKind::ColorClearer => "@",
            TokenKind::Rock => "#",
            TokenKind::Jelly => "~",
        }
    }

    /// Parse a kind suffix character.
    pub fn from_suffix(c: char) -> Option<TokenKind> {
        match c {
            '-' => Some(TokenKind::HorizontalClearer),
            '|' => Some(TokenKind::VerticalClearer),
            '*' => Some(TokenKind::AreaClearer),
            '@' => Some(TokenKind::ColorClearer),
            '~' => Some(TokenKind::Jelly),
            _ => None,
        }
    }
}

// =============================================================================
// TOKEN
// =============================================================================

/// A single cell occupant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    /// Unique identity, minted by the grid
    pub id: u32,
    /// Palette color (ignored for rocks)
    pub color: Color,
    /// Token kind
    pub kind: TokenKind,
    /// Remaining hits before destruction (0 = destroyed on first hit)
    pub durability: u8,
}

impl Token {
    /// Create a token.
    pub const fn new(id: u32, color: Color, kind: TokenKind, durability: u8) -> Self {
        Self { id, color, kind, durability }
    }

    /// Color used for run detection, if this token takes part in runs.
    #[inline]
    pub fn match_color(&self) -> Option<Color> {
        if self.kind.is_color_matchable() {
            Some(self.color)
        } else {
            None
        }
    }

    /// Register one hit. Returns true if the token is destroyed.
    pub fn hit(&mut self) -> bool {
        if self.durability <= 1 {
            self.durability = 0;
            true
        } else {
            self.durability -= 1;
            false
        }
    }

    /// Same token with a different kind (used by special upgrades).
    pub fn with_kind(self, kind: TokenKind) -> Self {
        Self { kind, ..self }
    }

    /// The (color, kind) pair reported to goal tracking.
    pub fn cleared(&self) -> ClearedToken {
        ClearedToken { color: self.color, kind: self.kind }
    }
}

/// A token that left the board, as reported to the score/goal owner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClearedToken {
    /// Color of the cleared token
    pub color: Color,
    /// Kind of the cleared token
    pub kind: TokenKind,
}
