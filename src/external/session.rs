//! Game Session
//!
//! Facade the presentation layer talks to. Owns the board, the progress
//! and the level; gates input on status; forwards streak ticks; records
//! accepted actions for replay; builds hint requests and save files.

use std::fmt;

use thiserror::Error;
use tracing::info;

use crate::external::hint::{request_hint, Hint, HintConfig, HintOracle, HintRequest};
use crate::external::persistence::{restore_or_generate, to_json, PersistenceError, Restored, SaveGame};
use crate::external::progress::{GameProgress, ProgressDelta, ScorePolicy};
use crate::game::cascade::{CascadeConfig, MoveReport};
use crate::game::level::{LevelConfig, PowerUp};
use crate::game::moves::{play, Action, MoveError};
use crate::game::replay::ActionLog;
use crate::game::state::BoardState;

/// Session status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    /// Accepting input
    Playing,
    /// Input blocked, streak frozen
    Paused,
    /// Score target and goals met
    LevelComplete,
    /// Out of moves short of the target
    GameOver,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionStatus::Playing => "playing",
            SessionStatus::Paused => "paused",
            SessionStatus::LevelComplete => "level complete",
            SessionStatus::GameOver => "game over",
        };
        f.write_str(name)
    }
}

/// Session-level errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Input outside `Playing`
    #[error("session is {0}, input rejected")]
    NotPlaying(SessionStatus),

    /// Power-up inventory empty
    #[error("no {0:?} left")]
    NoPowerUp(PowerUp),

    /// Board rejected the action
    #[error(transparent)]
    Move(#[from] MoveError),

    /// Save failed
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// Board is mid-cascade
    #[error("board is not at rest")]
    NotAtRest,
}

/// One level attempt.
pub struct GameSession {
    level: LevelConfig,
    board: BoardState,
    progress: GameProgress,
    status: SessionStatus,
    policy: ScorePolicy,
    config: CascadeConfig,
    log: ActionLog,
}

impl GameSession {
    /// Start a level with a freshly generated board.
    pub fn new(level: LevelConfig, seed: u64) -> Self {
        let fresh = Restored::generate(&level, seed);
        Self::assemble(level, fresh)
    }

    /// Resume from a JSON save, or start fresh if the save is unusable.
    ///
    /// The restored log still starts at the generated board, so the whole
    /// attempt keeps replaying.
    pub fn resume(level: LevelConfig, seed: u64, saved: Option<&str>) -> Self {
        let restored = restore_or_generate(&level, seed, saved);
        Self::assemble(level, restored)
    }

    fn assemble(level: LevelConfig, restored: Restored) -> Self {
        let Restored { state: board, progress, log, .. } = restored;
        let mut session = Self {
            level,
            board,
            progress,
            status: SessionStatus::Playing,
            policy: ScorePolicy::default(),
            config: CascadeConfig::default(),
            log,
        };
        session.update_status();
        session
    }

    /// Replace the cascade configuration.
    pub fn with_config(mut self, config: CascadeConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the score policy.
    pub fn with_policy(mut self, policy: ScorePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Level being played.
    pub fn level(&self) -> &LevelConfig {
        &self.level
    }

    /// Board state (read-only).
    pub fn board(&self) -> &BoardState {
        &self.board
    }

    /// Score, moves, goals, inventory.
    pub fn progress(&self) -> &GameProgress {
        &self.progress
    }

    /// Current status.
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Actions accepted this session.
    pub fn log(&self) -> &ActionLog {
        &self.log
    }

    /// Play one action to rest and fold it into progress.
    pub fn play(&mut self, action: Action) -> Result<(MoveReport, ProgressDelta), SessionError> {
        if self.status != SessionStatus::Playing {
            return Err(SessionError::NotPlaying(self.status));
        }
        if let Some(power_up) = action.power_up() {
            if !self.progress.has_power_up(power_up) {
                return Err(SessionError::NoPowerUp(power_up));
            }
        }

        let report = play(&mut self.board, action, &self.config)?;
        self.log.record(action);
        let delta = self.progress.apply(&self.level, &report, &self.policy);
        self.update_status();
        Ok((report, delta))
    }

    /// Pause: blocks input and freezes streak decay.
    pub fn pause(&mut self) {
        if self.status == SessionStatus::Playing {
            self.status = SessionStatus::Paused;
        }
    }

    /// Resume from pause.
    pub fn resume_play(&mut self) {
        if self.status == SessionStatus::Paused {
            self.status = SessionStatus::Playing;
        }
    }

    /// Forward wall-clock time to streak decay. Returns true if it reset.
    pub fn tick(&mut self, elapsed_ms: u32) -> bool {
        let paused = self.status != SessionStatus::Playing;
        if !paused {
            self.log.record_idle(elapsed_ms);
        }
        self.board.tick_streak(elapsed_ms, paused)
    }

    /// Hint request for the current board.
    pub fn hint_request(&self) -> HintRequest {
        HintRequest::for_grid(&self.board.grid)
    }

    /// Ask an oracle for a hint. `None` on any failure.
    pub async fn hint<O: HintOracle>(&self, oracle: &O, config: &HintConfig) -> Option<Hint> {
        request_hint(oracle, &self.board.grid, config).await
    }

    /// JSON save of the current attempt.
    pub fn save(&self) -> Result<String, SessionError> {
        let save = SaveGame::capture(&self.board, &self.progress, &self.log).ok_or(SessionError::NotAtRest)?;
        Ok(to_json(&save)?)
    }

    fn update_status(&mut self) {
        let next = if self.progress.is_complete(&self.level) {
            SessionStatus::LevelComplete
        } else if self.progress.out_of_moves() {
            SessionStatus::GameOver
        } else {
            return;
        };
        if next != self.status {
            info!(level = self.level.id, score = self.progress.score, status = %next, "session status changed");
            self.status = next;
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::hint::SolverOracle;
    use crate::game::level::default_levels;
    use crate::core::grid::Position;
    use crate::game::moves::legal_swaps;
    use crate::game::replay::verify_log;

    /// Target high enough that one move never completes it.
    fn long_level() -> LevelConfig {
        LevelConfig::new(1, "Long", 1_000_000, 25)
    }

    fn first_swap(session: &GameSession) -> Action {
        let (from, to) = legal_swaps(&session.board().grid)[0];
        Action::Swap { from, to }
    }

    #[test]
    fn test_level_complete_on_target() {
        let level = LevelConfig::new(1, "Tiny", 1, 10);
        let mut session = GameSession::new(level, 3);
        let action = first_swap(&session);

        let (report, delta) = session.play(action).unwrap();
        assert!(report.score > 0);
        assert_eq!(delta.accepted, report.score);
        assert_eq!(session.status(), SessionStatus::LevelComplete);
        assert!(matches!(session.play(action), Err(SessionError::NotPlaying(SessionStatus::LevelComplete))));
    }

    #[test]
    fn test_game_over_when_moves_run_out() {
        let level = LevelConfig::new(1, "Hard", 1_000_000, 1);
        let mut session = GameSession::new(level, 3);
        let action = first_swap(&session);

        session.play(action).unwrap();
        assert_eq!(session.progress().moves_left, 0);
        assert_eq!(session.status(), SessionStatus::GameOver);
    }

    #[test]
    fn test_pause_blocks_input_and_streak() {
        let mut session = GameSession::new(long_level(), 8);
        let action = first_swap(&session);
        session.play(action).unwrap();
        let level = session.board().streak.level();
        assert!(level > 1);

        session.pause();
        assert_eq!(session.status(), SessionStatus::Paused);
        assert!(!session.tick(60_000));
        assert_eq!(session.board().streak.level(), level);
        assert!(matches!(session.play(Action::Party), Err(SessionError::NotPlaying(SessionStatus::Paused))));

        session.resume_play();
        assert!(session.tick(60_000));
        assert_eq!(session.board().streak.level(), 1);
    }

    #[test]
    fn test_power_up_inventory_gate() {
        let level = default_levels().remove(0);
        let mut session = GameSession::new(level, 11);
        session.play(Action::Party).unwrap();
        assert_eq!(session.progress().inventory.party, 0);
        assert!(matches!(session.play(Action::Party), Err(SessionError::NoPowerUp(PowerUp::Party))));
        assert_eq!(session.log().action_count(), 1);
    }

    #[test]
    fn test_rejected_move_not_logged() {
        let mut session = GameSession::new(LevelConfig::default(), 4);
        let from = crate::core::grid::Position::new(0, 0);
        let to = crate::core::grid::Position::new(5, 5);
        assert!(matches!(session.play(Action::Swap { from, to }), Err(SessionError::Move(MoveError::NotAdjacent { .. }))));
        assert_eq!(session.log().action_count(), 0);
        assert_eq!(session.progress().moves_left, LevelConfig::default().moves);
    }

    #[test]
    fn test_save_and_resume() {
        let mut session = GameSession::new(long_level(), 21);
        let action = first_swap(&session);
        session.play(action).unwrap();
        let text = session.save().unwrap();

        let resumed = GameSession::resume(long_level(), 999, Some(&text));
        assert_eq!(resumed.board().compute_hash(), session.board().compute_hash());
        assert_eq!(resumed.progress(), session.progress());
        assert_eq!(resumed.status(), SessionStatus::Playing);
        assert_eq!(resumed.log(), session.log());
    }

    #[test]
    fn test_resumed_session_replays_whole_attempt() {
        let config = CascadeConfig::default();
        let mut level = long_level();
        level.power_ups.hammer = 1;
        let mut session = GameSession::new(level.clone(), 21);
        let action = first_swap(&session);
        session.play(action).unwrap();
        session.tick(2_000);
        let text = session.save().unwrap();

        let mut resumed = GameSession::resume(level, 999, Some(&text));
        resumed.play(Action::Hammer { target: Position::new(3, 3) }).unwrap();
        resumed.tick(500);

        let hash = resumed.board().compute_hash();
        assert_eq!(resumed.log().action_count(), 2);
        assert_eq!(resumed.log().seed, 21);
        assert!(verify_log(resumed.level(), resumed.log(), &hash, &config));
    }

    #[tokio::test]
    async fn test_hint_through_session() {
        let session = GameSession::new(LevelConfig::default(), 5);
        let hint = session.hint(&SolverOracle, &HintConfig::default()).await.unwrap();
        assert!(legal_swaps(&session.board().grid).contains(&(hint.from, hint.to)));
        assert_eq!(session.hint_request().board, session.board().grid.encode());
    }
}
