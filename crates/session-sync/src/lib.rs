//! Session Sync - ledger-backed tic-tac-toe sessions
//!
//! Architecture:
//! - The ledger holds the authoritative session object; it is only observable
//!   by fetching full snapshots
//! - `GameSessionSynchronizer` creates/joins sessions, submits signed moves and
//!   polls the ledger
//! - `SessionCache` owns the single `LocalView`, which may carry one optimistic
//!   move that has not been confirmed yet
//! - `reconcile` folds each fetched snapshot into the view; the snapshot
//!   always wins over local guesses
//! - `Phase` tracks the session lifecycle and never leaves `Finished` except
//!   by detaching

pub mod cache;
pub mod config;
pub mod decode;
pub mod error;
pub mod events;
pub mod model;
pub mod poller;
pub mod reconcile;
pub mod state_machine;
pub mod synchronizer;

#[cfg(test)]
mod tests;

pub use cache::SessionCache;
pub use config::SyncConfig;
pub use decode::decode_session;
pub use error::{DecodeError, MoveRejection, SyncError};
pub use events::{ChangeCause, ViewEvent};
pub use model::{Board, Cell, GameStatus, LocalView, Mark, Participants, PendingMove, Position, Session};
pub use reconcile::{reconcile, Reconciliation};
pub use state_machine::{Phase, PhaseEvent, TransitionError};
pub use synchronizer::GameSessionSynchronizer;

pub use ledger_types::{Identity, SessionId};

/// Default poll interval in milliseconds
pub const POLL_INTERVAL_MS: u64 = 2_000;

/// Default capacity of the view event channel
pub const EVENT_CAPACITY: usize = 64;
