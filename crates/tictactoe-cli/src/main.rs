//! Tic-Tac-Toe Session Demo
//!
//! Runs an in-process devnet ledger and two synchronized players that create,
//! join and play one session to its end. Every view change either player
//! observes is logged.

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use ledger_client::{DevnetLedger, KeypairSigner, LedgerClient};
use ledger_types::Identity;
use session_sync::{GameSessionSynchronizer, LocalView, Phase, Position};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::{sync::broadcast, task::JoinHandle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;

use config::AppConfig;

/// Run mode
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    /// Two players play one session against the devnet ledger
    Selfplay,
    /// Print the effective configuration as JSON and exit
    Config,
}

/// Ledger-backed tic-tac-toe demo
#[derive(Parser, Debug)]
#[command(name = "tictactoe")]
#[command(about = "Play tic-tac-toe through a session synchronizer against an in-process ledger", long_about = None)]
struct Args {
    /// Run mode
    #[arg(long, value_enum, default_value = "selfplay")]
    mode: Mode,

    /// JSON config file (`sync` and `devnet` sections)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Poll interval in milliseconds (overrides the config file)
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Block time in milliseconds (overrides the config file)
    #[arg(long)]
    block_time_ms: Option<u64>,

    /// Scripted moves as flat cell indices (0-8), alternating X and O.
    /// Invalid entries are skipped; the first free cell is used once exhausted.
    #[arg(long, value_delimiter = ',')]
    moves: Vec<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// One player at the table
struct Seat {
    name: &'static str,
    identity: Identity,
    sync: GameSessionSynchronizer,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(poll_interval_ms) = args.poll_interval_ms {
        config.sync.poll_interval_ms = poll_interval_ms;
    }
    if let Some(block_time_ms) = args.block_time_ms {
        config.devnet.block_time_ms = block_time_ms;
    }

    match args.mode {
        Mode::Selfplay => run_selfplay(config, args.moves).await,
        Mode::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

/// Run one full game between two local players
async fn run_selfplay(config: AppConfig, moves: Vec<usize>) -> Result<()> {
    tracing::info!("Starting tic-tac-toe selfplay");
    tracing::info!("  Block time: {}ms", config.devnet.block_time_ms);
    tracing::info!("  Poll interval: {}ms", config.sync.poll_interval_ms);

    let ledger = DevnetLedger::new(config.devnet.clone());
    let block_producer_handle = ledger.spawn();
    let client: Arc<dyn LedgerClient> = Arc::new(ledger.clone());

    let seats = ["alice", "bob"].map(|name| {
        let signer = Arc::new(KeypairSigner::generate());
        Seat {
            name,
            identity: signer.identity(),
            sync: GameSessionSynchronizer::new(signer, client.clone(), config.sync.clone()),
        }
    });
    let loggers: Vec<JoinHandle<()>> = seats
        .iter()
        .map(|seat| spawn_event_log(seat.name, seat.sync.subscribe()))
        .collect();

    let [x, o] = &seats;
    tracing::info!("  X: {} ({})", x.name, x.identity);
    tracing::info!("  O: {} ({})", o.name, o.identity);

    let session_id = x.sync.create_session(x.identity, o.identity).await?;
    o.sync.join_session(session_id).await?;
    tracing::info!("Session {} ready. Press Ctrl+C to stop.", session_id);

    let outcome = tokio::select! {
        result = play_game(&seats, moves, config.sync.poll_interval()) => Some(result?),
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, shutting down...");
            None
        }
    };

    if let Some(view) = outcome {
        report(&seats, &view);
    }

    for seat in &seats {
        seat.sync.detach();
    }
    ledger.stop();
    block_producer_handle.abort();
    for logger in loggers {
        logger.abort();
    }

    tracing::info!("Selfplay stopped at slot {}", ledger.current_slot());

    Ok(())
}

/// Alternate turns until a seat observes a finished session
async fn play_game(
    seats: &[Seat; 2],
    moves: Vec<usize>,
    poll_interval: std::time::Duration,
) -> Result<LocalView> {
    let mut script = moves.into_iter();
    loop {
        for seat in seats {
            let view = await_turn(seat, poll_interval).await;
            if view.phase == Phase::Finished {
                return Ok(view);
            }
            let Some(position) = next_position(&view, &mut script) else {
                bail!("board is full but the session is still in progress");
            };
            seat.sync
                .submit_move(position.row(), position.col())
                .await
                .with_context(|| format!("{} playing {}", seat.name, position))?;
        }
    }
}

/// Wait until the seat's view shows its turn or a finished session.
/// Falls back to a manual poll when no event arrives within one interval.
async fn await_turn(seat: &Seat, poll_interval: std::time::Duration) -> LocalView {
    let mut events = seat.sync.subscribe();
    loop {
        let view = seat.sync.current_view();
        let my_turn = view.phase.accepts_moves()
            && !view.is_optimistic()
            && view
                .participants
                .is_some_and(|p| p.plays(&seat.identity, view.turn));
        if my_turn || view.phase == Phase::Finished {
            return view;
        }

        match tokio::time::timeout(poll_interval, events.recv()).await {
            Ok(Ok(_)) | Ok(Err(broadcast::error::RecvError::Lagged(_))) => {}
            Ok(Err(broadcast::error::RecvError::Closed)) => return view,
            Err(_) => {
                seat.sync.poll_once().await;
            }
        }
    }
}

/// Next scripted cell that is free, else the first free cell
fn next_position(view: &LocalView, script: &mut impl Iterator<Item = usize>) -> Option<Position> {
    for index in script.by_ref() {
        match Position::from_index(index) {
            Some(position) if view.board.get(position).is_empty() => return Some(position),
            _ => tracing::warn!("Skipping scripted move {}", index),
        }
    }
    view.board.first_empty()
}

/// Log every view event a seat receives
fn spawn_event_log(name: &'static str, mut events: broadcast::Receiver<session_sync::ViewEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    tracing::info!(
                        "[{}] {:?} | {:?} | turn {} | {} cells",
                        name,
                        event.cause,
                        event.view.status,
                        event.view.turn,
                        event.view.board.occupied()
                    );
                    tracing::debug!("[{}] board:\n{}", name, event.view.board.display());
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("[{}] event log lagged {} events", name, n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

/// Log the final board and outcome
fn report(seats: &[Seat; 2], view: &LocalView) {
    tracing::info!("Final board:\n{}", view.board.display());
    match view.winner() {
        Some(winner) => {
            let name = seats
                .iter()
                .find(|seat| seat.identity == winner)
                .map_or("unknown", |seat| seat.name);
            tracing::info!("Outcome: {:?}, {} wins", view.status, name);
        }
        None => tracing::info!("Outcome: {:?}", view.status),
    }
}
