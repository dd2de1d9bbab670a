//! Ledger client errors

use thiserror::Error;

/// Errors surfaced by signing providers and ledger clients
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("No active signing identity")]
    Disconnected,

    #[error("Call rejected: {0}")]
    Rejected(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unknown receipt")]
    UnknownReceipt,

    #[error("Signing failed: {0}")]
    Signing(String),
}
