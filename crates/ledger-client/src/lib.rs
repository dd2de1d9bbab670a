//! Ledger Client - the Synchronizer's external collaborators
//!
//! Defines the two seams a game client talks through:
//! - `SigningProvider`: holds the active account and signs calls
//! - `LedgerClient`: submits signed calls, waits for confirmation, fetches objects
//!
//! `DevnetLedger` is an in-process ledger that runs the tic-tac-toe program
//! with real signature checks and block-based confirmation. It backs the
//! demo binary and the test suites.

pub mod client;
pub mod devnet;
pub mod error;
pub mod object_store;
pub mod signer;
pub mod types;

pub use client::LedgerClient;
pub use devnet::{BlockUpdate, DevnetConfig, DevnetLedger};
pub use error::LedgerError;
pub use object_store::ObjectStore;
pub use signer::{sign_call, KeypairSigner, Signature, SigningProvider};
pub use types::{Confirmation, Effects, RawObject, Receipt, SignedCall};

/// Default block time in milliseconds
pub const BLOCK_TIME_MS: u64 = 400;

/// Maximum calls executed per block
pub const MAX_CALLS_PER_BLOCK: usize = 64;

/// Slots a confirmation is kept after its block
pub const RETENTION_SLOTS: u64 = 1_024;
