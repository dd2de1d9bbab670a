//! Synchronizer errors

use ledger_client::LedgerError;
use ledger_types::{Identity, SessionId};
use thiserror::Error;

use crate::model::{Mark, Position};

/// Errors surfaced to callers of the synchronizer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("No signing identity is connected")]
    NotConnected,

    #[error("Identity {given} does not match the connected identity {active}")]
    IdentityMismatch { given: Identity, active: Identity },

    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),

    #[error("Invalid move: {0}")]
    InvalidMove(MoveRejection),

    #[error("A move is already awaiting confirmation")]
    MoveInFlight,

    #[error("Submission failed: {0}")]
    SubmissionFailed(String),

    #[error("Fetch failed: {0}")]
    TransientFetch(LedgerError),
}

/// Local precondition that rejected a move before any network call
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveRejection {
    #[error("position ({row}, {col}) is off the board")]
    OutOfBounds { row: usize, col: usize },

    #[error("game is not in progress")]
    NotInProgress,

    #[error("cell {0} is occupied")]
    CellOccupied(Position),

    #[error("it is {turn}'s turn")]
    NotYourTurn { turn: Mark },

    #[error("identity is not a participant in this session")]
    NotAParticipant,
}

impl From<MoveRejection> for SyncError {
    fn from(rejection: MoveRejection) -> Self {
        SyncError::InvalidMove(rejection)
    }
}

/// Fetched object content that is not a valid session
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Invalid session length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Invalid cell code {code} at index {index}")]
    InvalidCell { index: usize, code: u8 },

    #[error("Invalid status code {0}")]
    InvalidStatus(u8),

    #[error("Impossible board: {x} X marks and {o} O marks")]
    ImpossibleBoard { x: usize, o: usize },
}
