//! The tick driver: periodic timer plus the shared per-tick pipeline.
//!
//! One tick locks the game, advances the simulation, persists any players
//! the inactivity sweep retired, and lets the snapshot listener decide
//! whether to save. The internal timer re-arms after each run and feeds
//! the simulation the wall-clock time since the previous firing, so
//! scheduler jitter stretches a tick instead of being lost. Failures are
//! logged and never stop the next tick.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{error, info};
use tokio::time::sleep;

use crate::AppState;

/// Runs one full tick: simulation, scoreboard writes, snapshot hook.
pub async fn run_game_tick(state: &AppState, delta_ms: u64) {
    let mut game = state.game.lock().await;
    let retired = game.tick(delta_ms);

    for record in retired {
        if let Err(e) = state
            .db
            .save_record(&record.name, record.score, record.play_ms)
            .await
        {
            error!("failed to save record for {}: {}", record.name, e);
        }
    }

    if let Some(listener) = &state.snapshot {
        let mut listener = listener.lock().await;
        if let Err(e) = listener.on_tick(delta_ms, &game) {
            error!("periodic state save failed: {}", e);
        }
    }
}

/// Spawns the internal ticker task. Each firing sleeps the configured
/// period, then ticks with the measured wall-clock delta.
pub fn start(state: Arc<AppState>, period: Duration) {
    info!("internal ticker enabled, period {:?}", period);
    tokio::spawn(async move {
        let mut last_tick = Instant::now();
        loop {
            sleep(period).await;
            let now = Instant::now();
            let delta = now.duration_since(last_tick);
            last_tick = now;
            run_game_tick(&state, delta.as_millis() as u64).await;
        }
    });
}
