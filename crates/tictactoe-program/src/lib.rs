//! Tic-Tac-Toe Program - on-ledger game rules
//!
//! The ledger runs this program; clients only build calls for it and decode
//! the objects it stores.
//!
//! Object Structure:
//! - RawGameState: one object per session (cells, status code, participants)

use ledger_types::{ObjectId, TxDigest};

pub mod error;
pub mod instruction;
pub mod processor;
pub mod state;

pub use error::ProgramError;
pub use instruction::GameCall;
pub use processor::{execute, Execution};
pub use state::RawGameState;

/// Constants
pub mod constants {
    /// Cells on the board
    pub const BOARD_CELLS: usize = 9;
    /// Cells per row
    pub const BOARD_WIDTH: usize = 3;

    // Cell codes
    /// Empty cell
    pub const CELL_EMPTY: u8 = 0;
    /// Cell held by X
    pub const CELL_X: u8 = 1;
    /// Cell held by O
    pub const CELL_O: u8 = 2;

    // Status codes
    /// Game still accepting moves
    pub const STATUS_IN_PROGRESS: u8 = 0;
    /// X completed a line
    pub const STATUS_X_WINS: u8 = 1;
    /// O completed a line
    pub const STATUS_O_WINS: u8 = 2;
    /// Board full with no line
    pub const STATUS_DRAW: u8 = 3;

    /// Seed for deriving session object ids
    pub const SESSION_SEED: &[u8] = b"tictactoe_session";

    /// The eight winning lines as flat indices
    pub const WIN_LINES: [[usize; 3]; 8] = [
        // Rows
        [0, 1, 2],
        [3, 4, 5],
        [6, 7, 8],
        // Columns
        [0, 3, 6],
        [1, 4, 7],
        [2, 5, 8],
        // Diagonals
        [0, 4, 8],
        [2, 4, 6],
    ];
}

/// Derive the id of the session object created by the call with `digest`
pub fn derive_session_id(digest: &TxDigest) -> ObjectId {
    let mut hasher = blake3::Hasher::new();
    hasher.update(constants::SESSION_SEED);
    hasher.update(digest.as_ref());
    ObjectId::new_from_array(*hasher.finalize().as_bytes())
}
