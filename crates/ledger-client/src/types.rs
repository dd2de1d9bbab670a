//! Core types exchanged with the ledger

use ed25519_dalek::Signature;
use ledger_types::{Identity, ObjectId, Slot, TxDigest};
use serde::Serialize;

/// A call payload signed by its sender
#[derive(Debug, Clone)]
pub struct SignedCall {
    /// Account that signed the payload
    pub sender: Identity,
    /// Encoded program call
    pub payload: Vec<u8>,
    /// Replay nonce; identical payloads with different nonces are distinct calls
    pub nonce: u64,
    /// Signature over `signing_message(payload, nonce)`
    pub signature: Signature,
}

impl SignedCall {
    /// Bytes covered by the signature
    pub fn signing_message(payload: &[u8], nonce: u64) -> Vec<u8> {
        let mut message = Vec::with_capacity(payload.len() + 8);
        message.extend_from_slice(payload);
        message.extend_from_slice(&nonce.to_le_bytes());
        message
    }

    /// Digest identifying this call on the ledger
    pub fn digest(&self) -> TxDigest {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.sender.as_ref());
        hasher.update(&self.payload);
        hasher.update(&self.nonce.to_le_bytes());
        hasher.update(&self.signature.to_bytes());
        TxDigest::new_from_array(*hasher.finalize().as_bytes())
    }
}

/// Handle returned when a call is accepted for inclusion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Receipt {
    /// Digest of the submitted call
    pub digest: TxDigest,
    /// Slot at which the call was accepted
    pub submitted_slot: Slot,
}

/// Outcome of executing a call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Effects {
    /// Call executed; lists objects it created and mutated
    Success {
        created: Vec<ObjectId>,
        mutated: Vec<ObjectId>,
    },
    /// Call was included but the program rejected it
    Failure { reason: String },
}

impl Effects {
    /// Whether the call executed successfully
    pub fn is_success(&self) -> bool {
        matches!(self, Effects::Success { .. })
    }
}

/// Observable inclusion of a call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Confirmation {
    /// Digest of the confirmed call
    pub digest: TxDigest,
    /// Slot that included the call
    pub slot: Slot,
    /// Execution outcome
    pub effects: Effects,
}

impl Confirmation {
    /// First object created by the call, if any
    pub fn created_object(&self) -> Option<ObjectId> {
        match &self.effects {
            Effects::Success { created, .. } => created.first().copied(),
            Effects::Failure { .. } => None,
        }
    }
}

/// Stored object contents as returned by a fetch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawObject {
    /// Object id
    pub id: ObjectId,
    /// Number of writes applied to the object
    pub version: u64,
    /// Opaque stored bytes
    pub data: Vec<u8>,
}
