//! Hint Oracle Boundary
//!
//! The hint oracle is an external advisor: it gets a text prompt with the
//! encoded board and answers with a JSON swap suggestion. Its reasoning is
//! opaque. Every failure (transport, parse, validation, timeout) collapses
//! to "no hint" at this boundary; the board never depends on it.

use std::future::Future;
use std::time::Duration;

use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::grid::{is_adjacent, Grid, Position};
use crate::game::moves::legal_swaps;

/// Instructions sent ahead of the board.
pub const HINT_PROMPT: &str = "\
You are a match-3 coach. Below is an 8x8 board, one line per row, cells separated by spaces.
Letters are colors: R(ed), B(lue), G(reen), Y(ellow), P(urple), O(range).
Suffixes mark specials: - row clearer, | column clearer, * area clearer, @ color clearer, ~ jelly.
# is a rock and cannot be moved. A trailing digit is remaining durability.

Find a swap of two adjacent cells that creates a run of three or more.
Answer with JSON only: {\"from\":{\"row\":r,\"col\":c},\"to\":{\"row\":r,\"col\":c},\"explanation\":\"...\"}
Coordinates are 0-indexed.";

// =============================================================================
// REQUEST / RESPONSE
// =============================================================================

/// A hint request: instructions plus the encoded board.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HintRequest {
    /// Instructions
    pub prompt: String,
    /// Board in the grid text encoding
    pub board: String,
}

impl HintRequest {
    /// Build a request for a board.
    pub fn for_grid(grid: &Grid) -> Self {
        Self {
            prompt: HINT_PROMPT.to_string(),
            board: grid.encode(),
        }
    }

    /// Full text sent to the oracle.
    pub fn render(&self) -> String {
        format!("{}\n\nBoard:\n{}\n", self.prompt, self.board)
    }
}

#[derive(Deserialize)]
struct RawCell {
    row: i64,
    col: i64,
}

#[derive(Deserialize)]
struct RawHint {
    from: RawCell,
    to: RawCell,
    #[serde(default)]
    explanation: String,
}

/// A validated swap suggestion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hint {
    /// First cell
    pub from: Position,
    /// Second cell
    pub to: Position,
    /// Oracle's rationale
    pub explanation: String,
}

/// Why a hint could not be produced.
#[derive(Debug, Error)]
pub enum HintError {
    /// Oracle transport failed
    #[error("oracle unavailable: {0}")]
    Unavailable(String),

    /// Response was not the expected JSON
    #[error("malformed hint response: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Suggested cell off the board
    #[error("hint cell ({row}, {col}) is off the board")]
    OutOfBounds {
        /// Row as sent
        row: i64,
        /// Column as sent
        col: i64,
    },

    /// Suggested cells are not neighbors
    #[error("hint cells {from} and {to} are not adjacent")]
    NotAdjacent {
        /// First cell
        from: Position,
        /// Second cell
        to: Position,
    },

    /// No answer in time
    #[error("oracle timed out after {0:?}")]
    Timeout(Duration),
}

fn checked_cell(cell: &RawCell) -> Result<Position, HintError> {
    let out_of_bounds = || HintError::OutOfBounds { row: cell.row, col: cell.col };
    let row = i32::try_from(cell.row).map_err(|_| out_of_bounds())?;
    let col = i32::try_from(cell.col).map_err(|_| out_of_bounds())?;
    Position::checked(row, col).ok_or_else(out_of_bounds)
}

/// Parse and validate an oracle response.
pub fn parse_hint(text: &str) -> Result<Hint, HintError> {
    let raw: RawHint = serde_json::from_str(text.trim())?;
    let from = checked_cell(&raw.from)?;
    let to = checked_cell(&raw.to)?;
    if !is_adjacent(from, to) {
        return Err(HintError::NotAdjacent { from, to });
    }
    Ok(Hint { from, to, explanation: raw.explanation })
}

// =============================================================================
// ORACLE
// =============================================================================

/// An external hint advisor.
pub trait HintOracle {
    /// Answer a request with raw response text.
    fn suggest(&self, request: &HintRequest) -> impl Future<Output = Result<String, HintError>> + Send;
}

/// Hint request configuration.
#[derive(Clone, Debug)]
pub struct HintConfig {
    /// How long to wait for the oracle
    pub timeout: Duration,
}

impl Default for HintConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
        }
    }
}

async fn ask<O: HintOracle>(oracle: &O, request: &HintRequest, config: &HintConfig) -> Result<Hint, HintError> {
    let text = tokio::time::timeout(config.timeout, oracle.suggest(request))
        .await
        .map_err(|_| HintError::Timeout(config.timeout))??;
    parse_hint(&text)
}

/// Ask the oracle for a hint on this board. Any failure is `None`.
pub async fn request_hint<O: HintOracle>(oracle: &O, grid: &Grid, config: &HintConfig) -> Option<Hint> {
    let request = HintRequest::for_grid(grid);
    match ask(oracle, &request, config).await {
        Ok(hint) => {
            debug!(from = %hint.from, to = %hint.to, "hint received");
            Some(hint)
        }
        Err(err) => {
            warn!(error = %err, "hint unavailable");
            None
        }
    }
}

/// Offline oracle that answers with the first legal swap it finds.
#[derive(Clone, Copy, Debug, Default)]
pub struct SolverOracle;

impl HintOracle for SolverOracle {
    fn suggest(&self, request: &HintRequest) -> impl Future<Output = Result<String, HintError>> + Send {
        let answer = Grid::parse(&request.board)
            .map_err(|e| HintError::Unavailable(e.to_string()))
            .and_then(|grid| {
                let (from, to) = legal_swaps(&grid)
                    .first()
                    .copied()
                    .ok_or_else(|| HintError::Unavailable("no legal swap".into()))?;
                Ok(serde_json::json!({
                    "from": { "row": from.row, "col": from.col },
                    "to": { "row": to.row, "col": to.col },
                    "explanation": "This swap completes a run.",
                })
                .to_string())
            });
        async move { answer }
    }
}

// =============================================================================
// TESTS
// =============================================================================
