//! Tic-Tac-Toe Program Processor
//!
//! Validates and applies calls against stored session objects.

use ledger_types::{Identity, ObjectId, TxDigest};

use crate::{
    constants::*, derive_session_id, error::ProgramError, instruction::GameCall,
    state::RawGameState,
};

/// Result of a successfully executed call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    /// Object written by the call
    pub object: ObjectId,
    /// New object contents
    pub state: RawGameState,
    /// True when the object did not exist before
    pub created: bool,
}

/// Execute a call sent by `sender`
///
/// `load` returns the current contents of a stored session object.
pub fn execute<F>(
    sender: &Identity,
    digest: &TxDigest,
    call: GameCall,
    load: F,
) -> Result<Execution, ProgramError>
where
    F: Fn(&ObjectId) -> Option<RawGameState>,
{
    match call {
        GameCall::CreateSession { player_x, player_o } => {
            let object = derive_session_id(digest);
            if load(&object).is_some() {
                return Err(ProgramError::SessionExists);
            }
            Ok(process_create_session(object, player_x, player_o))
        }

        GameCall::SubmitMove { session, position } => {
            let state = load(&session).ok_or(ProgramError::SessionNotFound)?;
            process_submit_move(sender, session, state, position)
        }
    }
}

/// Create a new session object
fn process_create_session(object: ObjectId, player_x: Identity, player_o: Identity) -> Execution {
    tracing::debug!(
        "Creating session {} (X={}, O={})",
        object.short(),
        player_x.short(),
        player_o.short()
    );

    Execution {
        object,
        state: RawGameState::new(player_x, player_o),
        created: true,
    }
}

/// Place the sender's mark and re-evaluate the status
fn process_submit_move(
    sender: &Identity,
    session: ObjectId,
    mut state: RawGameState,
    position: u8,
) -> Result<Execution, ProgramError> {
    if !state.is_in_progress() {
        return Err(ProgramError::GameFinished);
    }

    let index = position as usize;
    if index >= BOARD_CELLS {
        return Err(ProgramError::InvalidPosition);
    }

    if state.cells[index] != CELL_EMPTY {
        return Err(ProgramError::CellOccupied);
    }

    if state.player_to_move() != *sender {
        return Err(ProgramError::NotYourTurn);
    }

    state.cells[index] = state.turn();
    state.status = state.evaluate_status();

    tracing::debug!(
        "Session {}: cell {} taken, status {}",
        session.short(),
        index,
        state.status
    );

    Ok(Execution {
        object: session,
        state,
        created: false,
    })
}
