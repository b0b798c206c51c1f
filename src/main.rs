//! Candy Cascade demo driver
//!
//! Plays the built-in levels headlessly with the offline solver as the
//! hint source, then replays the recorded actions to verify determinism.

use anyhow::{bail, Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use candy_cascade::{
    VERSION,
    core::{hash::to_hex, rng::derive_level_seed},
    external::{
        hint::{HintConfig, SolverOracle},
        session::{GameSession, SessionStatus},
    },
    game::{
        cascade::CascadeConfig,
        level::default_levels,
        moves::{legal_swaps, Action},
        replay::replay_log,
    },
};

/// Time between moves fed to streak decay
const THINK_TIME_MS: u32 = 1_200;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Candy Cascade v{}", VERSION);

    let seed = std::env::args()
        .nth(1)
        .map(|arg| arg.parse::<u64>().context("seed must be an unsigned integer"))
        .transpose()?
        .unwrap_or(12345);

    for level in default_levels() {
        let level_seed = derive_level_seed(seed, level.id, 0);
        demo_level(level, level_seed).await?;
    }
    Ok(())
}

/// Play one level to completion or game over, then verify by replay.
async fn demo_level(level: candy_cascade::game::level::LevelConfig, seed: u64) -> Result<()> {
    info!("=== Level {}: {} (seed {}) ===", level.id, level.title, seed);
    let mut session = GameSession::new(level.clone(), seed);
    info!("Starting board:\n{}", session.board().grid);

    while session.status() == SessionStatus::Playing {
        let action = match session.hint(&SolverOracle, &HintConfig::default()).await {
            Some(hint) => Action::Swap { from: hint.from, to: hint.to },
            None if session.progress().has_power_up(candy_cascade::game::level::PowerUp::Ufo) => Action::Ufo,
            None => {
                warn!("no legal swap and no power-up left, stopping");
                break;
            }
        };

        let (report, delta) = session.play(action).context("demo action rejected")?;
        info!(
            passes = report.passes,
            score = report.score,
            accepted = delta.accepted,
            streak = report.streak_level,
            moves_left = session.progress().moves_left,
            "move resolved"
        );
        session.tick(THINK_TIME_MS);
    }

    info!(
        "Level {} ended: {} with score {}",
        level.id,
        session.status(),
        session.progress().score
    );
    if legal_swaps(&session.board().grid).is_empty() {
        info!("Final board has no legal swaps");
    }

    let hash = session.board().compute_hash();
    info!("Final State Hash: {}", to_hex(&hash));

    let (replayed, reports) = replay_log(&level, session.log(), &CascadeConfig::default());
    let replay_hash = replayed.compute_hash();
    info!("Replay State Hash: {} ({} actions)", hex::encode(replay_hash), reports.len());

    if hash != replay_hash {
        bail!("determinism failure on level {}", level.id);
    }
    info!("DETERMINISM VERIFIED: Hashes match!");
    Ok(())
}
