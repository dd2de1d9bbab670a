//! Tic-Tac-Toe Program Errors

use thiserror::Error;

/// Program errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramError {
    #[error("Session not found")]
    SessionNotFound,

    #[error("Game already finished")]
    GameFinished,

    #[error("Invalid position")]
    InvalidPosition,

    #[error("Cell already occupied")]
    CellOccupied,

    #[error("Not the sender's turn")]
    NotYourTurn,

    #[error("Invalid instruction data")]
    InvalidInstructionData,

    #[error("Invalid account data")]
    InvalidAccountData,

    #[error("Session already exists")]
    SessionExists,
}

impl ProgramError {
    /// Numeric code reported in failed effects
    pub fn code(self) -> u32 {
        self as u32
    }
}
