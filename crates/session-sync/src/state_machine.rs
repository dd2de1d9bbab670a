//! Session lifecycle
//!
//! `Uninitialized -> Bound -> InProgress -> Finished`. `Finished` is absorbing
//! apart from detaching, which returns any phase to `Uninitialized`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle phase of the bound session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Phase {
    /// No session bound
    #[default]
    Uninitialized,
    /// Session created or joined, board not yet known
    Bound,
    /// Board known and the game accepts moves
    InProgress,
    /// Ledger reported a terminal status
    Finished,
}

/// Inputs that drive the lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhaseEvent {
    /// Create or join succeeded
    Bound,
    /// A snapshot reported `InProgress`
    SnapshotInProgress,
    /// A snapshot reported a terminal status
    SnapshotTerminal,
    /// Client detached from the session
    Detached,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Illegal transition from {from:?} on {event:?}")]
pub struct TransitionError {
    pub from: Phase,
    pub event: PhaseEvent,
}

impl Phase {
    /// Next phase for `event`
    pub fn apply(self, event: PhaseEvent) -> Result<Phase, TransitionError> {
        use Phase::*;

        let next = match (self, event) {
            (_, PhaseEvent::Detached) => Uninitialized,
            (Uninitialized, PhaseEvent::Bound) => Bound,
            (Bound | InProgress, PhaseEvent::SnapshotInProgress) => InProgress,
            (Bound | InProgress | Finished, PhaseEvent::SnapshotTerminal) => Finished,
            (from, event) => return Err(TransitionError { from, event }),
        };
        Ok(next)
    }

    pub fn accepts_moves(self) -> bool {
        self == Phase::InProgress
    }

    pub fn is_bound(self) -> bool {
        self != Phase::Uninitialized
    }

    pub fn is_terminal(self) -> bool {
        self == Phase::Finished
    }
}
