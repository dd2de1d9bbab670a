//! Signing provider - holds the active account identity
//!
//! Stands in for a connected wallet: it can be connected or disconnected and
//! signs call payloads on demand.

use ed25519_dalek::{Signer, SigningKey};
use ledger_types::Identity;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::{error::LedgerError, types::SignedCall};

pub use ed25519_dalek::Signature;

/// Source of the active identity and its signatures
pub trait SigningProvider: Send + Sync {
    /// Identity currently connected, if any
    fn active_identity(&self) -> Option<Identity>;

    /// Sign `message` with the active identity
    fn sign(&self, message: &[u8]) -> Result<Signature, LedgerError>;
}

/// Sign an encoded call payload with the provider's active identity
pub fn sign_call(
    signer: &dyn SigningProvider,
    payload: Vec<u8>,
) -> Result<SignedCall, LedgerError> {
    let sender = signer.active_identity().ok_or(LedgerError::Disconnected)?;
    let nonce = rand::random::<u64>();
    let signature = signer.sign(&SignedCall::signing_message(&payload, nonce))?;
    Ok(SignedCall {
        sender,
        payload,
        nonce,
        signature,
    })
}

/// Signing provider backed by a local ed25519 keypair
pub struct KeypairSigner {
    /// Signing key
    key: SigningKey,
    /// Whether the key is currently exposed
    connected: AtomicBool,
}

impl KeypairSigner {
    /// Create a connected signer with a fresh random key
    pub fn generate() -> Self {
        Self::from_seed(rand::random::<[u8; 32]>())
    }

    /// Create a connected signer from a fixed seed
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            key: SigningKey::from_bytes(&seed),
            connected: AtomicBool::new(true),
        }
    }

    /// Identity of the key, regardless of connection state
    pub fn identity(&self) -> Identity {
        Identity::new_from_array(self.key.verifying_key().to_bytes())
    }

    /// Expose the identity to callers
    pub fn connect(&self) {
        self.connected.store(true, Ordering::SeqCst);
        tracing::info!("Signer {} connected", self.identity().short());
    }

    /// Hide the identity; signing fails until reconnected
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
        tracing::info!("Signer {} disconnected", self.identity().short());
    }

    /// Check if the signer is connected
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

impl SigningProvider for KeypairSigner {
    fn active_identity(&self) -> Option<Identity> {
        self.is_connected().then(|| self.identity())
    }

    fn sign(&self, message: &[u8]) -> Result<Signature, LedgerError> {
        if !self.is_connected() {
            return Err(LedgerError::Disconnected);
        }
        Ok(self.key.sign(message))
    }
}

/// Verify that `call` was signed by its declared sender
pub fn verify_call(call: &SignedCall) -> Result<(), LedgerError> {
    let key = ed25519_dalek::VerifyingKey::from_bytes(&call.sender.to_bytes())
        .map_err(|e| LedgerError::Rejected(format!("Invalid sender key: {}", e)))?;
    let message = SignedCall::signing_message(&call.payload, call.nonce);
    key.verify_strict(&message, &call.signature)
        .map_err(|_| LedgerError::Rejected("Invalid signature".to_string()))
}
