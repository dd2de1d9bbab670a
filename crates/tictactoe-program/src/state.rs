//! Tic-Tac-Toe Program State
//!
//! Layout of the session object as stored on the ledger.

use borsh::{BorshDeserialize, BorshSerialize};
use ledger_types::{Identity, ID_LEN};

use crate::constants::*;
use crate::error::ProgramError;

/// Session object - one per game
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct RawGameState {
    /// Cells in row-major order (`0=Empty, 1=X, 2=O`)
    pub cells: [u8; BOARD_CELLS],
    /// Status code (`0=InProgress, 1=XWins, 2=OWins, 3=Draw`)
    pub status: u8,
    /// Player moving first
    pub player_x: Identity,
    /// Player moving second
    pub player_o: Identity,
}

impl RawGameState {
    /// Account size: 9 + 1 + 32 + 32 = 74
    pub const LEN: usize = BOARD_CELLS + 1 + ID_LEN + ID_LEN;

    /// Fresh session with an empty board
    pub fn new(player_x: Identity, player_o: Identity) -> Self {
        Self {
            cells: [CELL_EMPTY; BOARD_CELLS],
            status: STATUS_IN_PROGRESS,
            player_x,
            player_o,
        }
    }

    /// Encode for storage
    pub fn to_bytes(&self) -> Vec<u8> {
        borsh::to_vec(self).expect("RawGameState serialization should not fail")
    }

    /// Decode stored bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self, ProgramError> {
        if data.len() != Self::LEN {
            return Err(ProgramError::InvalidAccountData);
        }
        borsh::from_slice(data).map_err(|_| ProgramError::InvalidAccountData)
    }

    /// Number of cells holding `code`
    pub fn count(&self, code: u8) -> usize {
        self.cells.iter().filter(|&&c| c == code).count()
    }

    /// Cell code of the side to move (X moves whenever the counts are equal)
    pub fn turn(&self) -> u8 {
        if self.count(CELL_X) == self.count(CELL_O) {
            CELL_X
        } else {
            CELL_O
        }
    }

    /// Identity expected to make the next move
    pub fn player_to_move(&self) -> Identity {
        if self.turn() == CELL_X {
            self.player_x
        } else {
            self.player_o
        }
    }

    /// Whether the game still accepts moves
    pub fn is_in_progress(&self) -> bool {
        self.status == STATUS_IN_PROGRESS
    }

    /// Cell code owning a complete line, if any
    pub fn line_owner(&self) -> Option<u8> {
        WIN_LINES.iter().find_map(|&[a, b, c]| {
            let occ = self.cells[a];
            (occ != CELL_EMPTY && occ == self.cells[b] && occ == self.cells[c]).then_some(occ)
        })
    }

    /// Status implied by the current cells
    pub fn evaluate_status(&self) -> u8 {
        match self.line_owner() {
            Some(CELL_X) => STATUS_X_WINS,
            Some(_) => STATUS_O_WINS,
            None if self.count(CELL_EMPTY) == 0 => STATUS_DRAW,
            None => STATUS_IN_PROGRESS,
        }
    }
}
