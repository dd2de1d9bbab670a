//! Tic-Tac-Toe Program Instructions

use borsh::{BorshDeserialize, BorshSerialize};
use ledger_types::{Identity, SessionId};

use crate::error::ProgramError;

/// Calls accepted by the program
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub enum GameCall {
    /// Create a new session
    ///
    /// Creates one shared object holding an empty board. The sender does not
    /// need to be one of the players.
    CreateSession {
        /// Player moving first
        player_x: Identity,
        /// Player moving second
        player_o: Identity,
    },

    /// Place the sender's mark
    ///
    /// Mutates the session object. The sender must be the participant whose
    /// turn it is.
    SubmitMove {
        /// Session object
        session: SessionId,
        /// Flat cell index (`row * 3 + col`)
        position: u8,
    },
}

impl GameCall {
    /// Encode for signing and submission
    pub fn to_bytes(&self) -> Vec<u8> {
        borsh::to_vec(self).expect("GameCall serialization should not fail")
    }

    /// Decode a submitted payload
    pub fn from_bytes(data: &[u8]) -> Result<Self, ProgramError> {
        borsh::from_slice(data).map_err(|_| ProgramError::InvalidInstructionData)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncated_payload_rejected() {
        let call = GameCall::SubmitMove {
            session: SessionId::new_from_array([4u8; 32]),
            position: 4,
        };
        let bytes = call.to_bytes();
        assert_eq!(GameCall::from_bytes(&bytes), Ok(call));
        assert_eq!(
            GameCall::from_bytes(&bytes[..bytes.len() - 1]),
            Err(ProgramError::InvalidInstructionData)
        );
    }
}
