//! Raw session decoding
//!
//! Turns the fetched object bytes into a `Session`. The status code and the
//! stored participants are the only source of the outcome.

use ledger_client::RawObject;
use tictactoe_program::constants::*;
use tictactoe_program::RawGameState;

use crate::error::DecodeError;
use crate::model::{Board, Cell, GameStatus, Mark, Participants, Session};

fn decode_cell(index: usize, code: u8) -> Result<Cell, DecodeError> {
    match code {
        CELL_EMPTY => Ok(Cell::Empty),
        CELL_X => Ok(Cell::X),
        CELL_O => Ok(Cell::O),
        code => Err(DecodeError::InvalidCell { index, code }),
    }
}

fn decode_status(code: u8) -> Result<GameStatus, DecodeError> {
    match code {
        STATUS_IN_PROGRESS => Ok(GameStatus::InProgress),
        STATUS_X_WINS => Ok(GameStatus::XWins),
        STATUS_O_WINS => Ok(GameStatus::OWins),
        STATUS_DRAW => Ok(GameStatus::Draw),
        code => Err(DecodeError::InvalidStatus(code)),
    }
}

/// Decode a fetched session object
pub fn decode_session(object: &RawObject) -> Result<Session, DecodeError> {
    let raw = RawGameState::from_bytes(&object.data).map_err(|_| DecodeError::InvalidLength {
        expected: RawGameState::LEN,
        actual: object.data.len(),
    })?;

    let mut cells = [Cell::Empty; BOARD_CELLS];
    for (index, (slot, &code)) in cells.iter_mut().zip(raw.cells.iter()).enumerate() {
        *slot = decode_cell(index, code)?;
    }
    let board = Board::from_cells(cells);

    // X always moves first, so X leads O by zero or one
    let x = board.count(Mark::X);
    let o = board.count(Mark::O);
    if o > x || x - o > 1 {
        return Err(DecodeError::ImpossibleBoard { x, o });
    }

    Ok(Session {
        id: object.id,
        participants: Participants::new(raw.player_x, raw.player_o),
        board,
        status: decode_status(raw.status)?,
    })
}
