//! Shared types for ledger integration
//!
//! Identifiers that cross the boundary between the ledger, the on-ledger
//! tic-tac-toe program, and clients. All of them are 32 bytes and render as
//! base58 strings, matching how wallets and explorers show them.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};

/// Length in bytes of every identifier in this crate
pub const ID_LEN: usize = 32;

/// Errors produced when parsing identifiers from text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeError {
    #[error("Invalid base58 string: {0}")]
    InvalidBase58(String),

    #[error("Invalid identifier length: expected {ID_LEN} bytes, got {0}")]
    InvalidLength(usize),
}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            BorshSerialize, BorshDeserialize, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord,
            Hash,
        )]
        pub struct $name([u8; ID_LEN]);

        impl $name {
            /// Wrap raw bytes
            pub const fn new_from_array(bytes: [u8; ID_LEN]) -> Self {
                Self(bytes)
            }

            /// Build from a slice, checking the length
            pub fn try_from_bytes(bytes: &[u8]) -> Result<Self, TypeError> {
                let arr: [u8; ID_LEN] = bytes
                    .try_into()
                    .map_err(|_| TypeError::InvalidLength(bytes.len()))?;
                Ok(Self(arr))
            }

            /// Raw bytes
            pub fn to_bytes(self) -> [u8; ID_LEN] {
                self.0
            }

            /// Short form for log lines (first 8 base58 characters)
            pub fn short(&self) -> String {
                self.to_string().chars().take(8).collect()
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&bs58::encode(self.0).into_string())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }

        impl FromStr for $name {
            type Err = TypeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let bytes = bs58::decode(s)
                    .into_vec()
                    .map_err(|e| TypeError::InvalidBase58(e.to_string()))?;
                Self::try_from_bytes(&bytes)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = <String as Deserialize>::deserialize(deserializer)?;
                s.parse().map_err(de::Error::custom)
            }
        }
    };
}

define_id!(
    /// Account identity (an ed25519 public key)
    Identity
);

define_id!(
    /// Identifier of an object stored on the ledger
    ObjectId
);

define_id!(
    /// Digest of a submitted call
    TxDigest
);

/// Sessions are ledger objects; the id is assigned at creation
pub type SessionId = ObjectId;

/// Ledger slot (block height)
pub type Slot = u64;
