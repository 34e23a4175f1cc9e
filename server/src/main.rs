//! Game server binary: CLI parsing, bootstrap and shutdown.
//!
//! Boot order matters: config first, then the scoreboard database (its
//! schema must exist before any player can retire), then the snapshot
//! restore, and only then the ticker and the listening socket. On
//! SIGINT/SIGTERM the accept loop stops and a final state save runs
//! before exit.

mod api;
mod db;
mod files;
mod http;
mod ticker;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use log::{error, info};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use game::config::load_game;
use game::snapshot::SnapshotListener;
use game::Game;

use db::Scoreboard;

const DB_URL_ENV: &str = "GAME_DB_URL";
const LISTEN_ADDR: &str = "0.0.0.0:8080";

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "Authoritative dog-walking game server")]
struct Args {
    /// Game config JSON path
    #[arg(short = 'c', long = "config-file", value_name = "file")]
    config_file: PathBuf,

    /// Static content root
    #[arg(short = 'w', long = "www-root", value_name = "dir")]
    www_root: PathBuf,

    /// Internal tick period in milliseconds; omit to drive ticks via the API
    #[arg(short = 't', long = "tick-period", value_name = "milliseconds")]
    tick_period: Option<u64>,

    /// Spawn dogs at random road positions instead of road starts
    #[arg(long = "randomize-spawn-points", value_name = "bool")]
    randomize_spawn_points: Option<bool>,

    /// Snapshot path; enables restore on start and save on shutdown
    #[arg(long = "state-file", value_name = "file")]
    state_file: Option<PathBuf>,

    /// Periodic snapshot interval in milliseconds (0 disables)
    #[arg(long = "save-state-period", value_name = "milliseconds")]
    save_state_period: Option<u64>,
}

/// Everything the request handlers share. The game mutex is the single
/// serial context all world mutations flow through.
pub struct AppState {
    pub game: Mutex<Game>,
    pub db: Scoreboard,
    pub snapshot: Option<Mutex<SnapshotListener>>,
    pub www_root: PathBuf,
}

#[tokio::main]
async fn main() {
    env_logger::init();
    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Warning: RUST_LOG environment variable not set. Set it to display logs!");
        eprintln!("Recommended: RUST_LOG=info");
    }

    let args = Args::parse();
    if let Err(e) = run(args).await {
        error!("server exited: {}", e);
        std::process::exit(1);
    }
    info!("server exited cleanly");
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut game = load_game(&args.config_file)?;
    if args.randomize_spawn_points.unwrap_or(false) {
        game.set_random_spawn();
    }
    if args.tick_period.is_some() {
        game.set_internal_ticker();
    }

    let db_url =
        std::env::var(DB_URL_ENV).map_err(|_| format!("{} is not specified", DB_URL_ENV))?;
    let workers = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let db = Scoreboard::connect(&db_url, workers as u32).await?;

    let snapshot = args
        .state_file
        .map(|path| SnapshotListener::new(path, args.save_state_period.unwrap_or(0)));
    if let Some(listener) = &snapshot {
        // A malformed state file is fatal; a missing one is a cold start.
        listener.restore(&mut game)?;
    }

    let www_root = tokio::fs::canonicalize(&args.www_root)
        .await
        .map_err(|e| format!("www root {} is unusable: {}", args.www_root.display(), e))?;

    let state = Arc::new(AppState {
        game: Mutex::new(game),
        db,
        snapshot: snapshot.map(Mutex::new),
        www_root,
    });

    if let Some(period_ms) = args.tick_period {
        ticker::start(Arc::clone(&state), Duration::from_millis(period_ms));
    }

    let listener = TcpListener::bind(LISTEN_ADDR).await?;
    info!("server started on {}", LISTEN_ADDR);

    tokio::select! {
        result = http::serve(listener, Arc::clone(&state)) => {
            result?;
        }
        result = shutdown_signal() => {
            result?;
            info!("shutdown signal received");
        }
    }

    if let Some(listener) = &state.snapshot {
        let game = state.game.lock().await;
        listener.lock().await.save_now(&game)?;
        info!("final state saved");
    }
    Ok(())
}

async fn shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    tokio::select! {
        _ = interrupt.recv() => {}
        _ = terminate.recv() => {}
    }
    Ok(())
}
