//! External collaborators.
//!
//! Everything around the board that is not deterministic board logic:
//! the hint oracle, score/goal bookkeeping, save games and the session
//! facade. None of it feeds back into how the board resolves.

pub mod hint;
pub mod progress;
pub mod persistence;
pub mod session;

pub use hint::{request_hint, Hint, HintConfig, HintError, HintOracle, HintRequest};
pub use progress::{GameProgress, ProgressDelta, ScorePolicy};
pub use persistence::{PersistenceError, Restored, SaveGame};
pub use session::{GameSession, SessionError, SessionStatus};
