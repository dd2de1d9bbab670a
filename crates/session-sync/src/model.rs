//! Session model
//!
//! Decoded, strongly typed projection of the session object plus the
//! client-side `LocalView` that the cache owns.

use ledger_types::{Identity, SessionId};
use serde::{Deserialize, Serialize};
use std::fmt;
use tictactoe_program::constants::{BOARD_CELLS, BOARD_WIDTH};

use crate::state_machine::{Phase, PhaseEvent, TransitionError};

/// A player's mark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mark {
    X,
    O,
}

impl Mark {
    /// The other mark
    pub fn opponent(self) -> Self {
        match self {
            Mark::X => Mark::O,
            Mark::O => Mark::X,
        }
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mark::X => write!(f, "X"),
            Mark::O => write!(f, "O"),
        }
    }
}

/// Contents of a single square
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Cell {
    #[default]
    Empty,
    X,
    O,
}

impl Cell {
    pub fn is_empty(self) -> bool {
        self == Cell::Empty
    }

    /// Mark occupying the cell, if any
    pub fn mark(self) -> Option<Mark> {
        match self {
            Cell::Empty => None,
            Cell::X => Some(Mark::X),
            Cell::O => Some(Mark::O),
        }
    }
}

impl From<Mark> for Cell {
    fn from(mark: Mark) -> Self {
        match mark {
            Mark::X => Cell::X,
            Mark::O => Cell::O,
        }
    }
}

/// Board coordinate, always within the 3x3 grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    row: u8,
    col: u8,
}

impl Position {
    /// Checked constructor; `None` when either coordinate is off the board
    pub fn new(row: usize, col: usize) -> Option<Self> {
        (row < BOARD_WIDTH && col < BOARD_WIDTH).then_some(Self {
            row: row as u8,
            col: col as u8,
        })
    }

    /// Position for a row-major flat index
    pub fn from_index(index: usize) -> Option<Self> {
        (index < BOARD_CELLS).then(|| Self {
            row: (index / BOARD_WIDTH) as u8,
            col: (index % BOARD_WIDTH) as u8,
        })
    }

    pub fn row(self) -> usize {
        self.row as usize
    }

    pub fn col(self) -> usize {
        self.col as usize
    }

    /// Row-major flat index (`row * 3 + col`), the encoding used by move calls
    pub fn index(self) -> usize {
        self.row() * BOARD_WIDTH + self.col()
    }

    /// All nine positions in row-major order
    pub fn all() -> impl Iterator<Item = Position> {
        (0..BOARD_CELLS).filter_map(Position::from_index)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// 3x3 grid of cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Board {
    cells: [Cell; BOARD_CELLS],
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_cells(cells: [Cell; BOARD_CELLS]) -> Self {
        Self { cells }
    }

    pub fn cells(&self) -> &[Cell; BOARD_CELLS] {
        &self.cells
    }

    pub fn get(&self, pos: Position) -> Cell {
        self.cells[pos.index()]
    }

    pub(crate) fn set(&mut self, pos: Position, cell: Cell) {
        self.cells[pos.index()] = cell;
    }

    /// Number of cells holding `mark`
    pub fn count(&self, mark: Mark) -> usize {
        let cell = Cell::from(mark);
        self.cells.iter().filter(|&&c| c == cell).count()
    }

    /// Number of non-empty cells
    pub fn occupied(&self) -> usize {
        self.cells.iter().filter(|c| !c.is_empty()).count()
    }

    pub fn is_full(&self) -> bool {
        self.occupied() == BOARD_CELLS
    }

    /// First empty cell in row-major order
    pub fn first_empty(&self) -> Option<Position> {
        Position::all().find(|&pos| self.get(pos).is_empty())
    }

    /// Side to move under strict X-first alternation
    pub fn turn(&self) -> Mark {
        if self.count(Mark::X) == self.count(Mark::O) {
            Mark::X
        } else {
            Mark::O
        }
    }

    /// Grid rendering for logs
    pub fn display(&self) -> String {
        let mut out = String::new();
        for row in 0..BOARD_WIDTH {
            if row > 0 {
                out.push_str("\n-+-+-\n");
            }
            for col in 0..BOARD_WIDTH {
                if col > 0 {
                    out.push('|');
                }
                let c = match self.cells[row * BOARD_WIDTH + col] {
                    Cell::Empty => ' ',
                    Cell::X => 'X',
                    Cell::O => 'O',
                };
                out.push(c);
            }
        }
        out
    }
}

/// Ledger-reported game status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GameStatus {
    #[default]
    InProgress,
    XWins,
    OWins,
    Draw,
}

impl GameStatus {
    pub fn is_terminal(self) -> bool {
        self != GameStatus::InProgress
    }

    /// Winning mark for a won game
    pub fn winning_mark(self) -> Option<Mark> {
        match self {
            GameStatus::XWins => Some(Mark::X),
            GameStatus::OWins => Some(Mark::O),
            GameStatus::InProgress | GameStatus::Draw => None,
        }
    }
}

/// The two accounts bound to a session at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Participants {
    pub player_x: Identity,
    pub player_o: Identity,
}

impl Participants {
    pub fn new(player_x: Identity, player_o: Identity) -> Self {
        Self { player_x, player_o }
    }

    /// Identity playing `mark`
    pub fn player(&self, mark: Mark) -> Identity {
        match mark {
            Mark::X => self.player_x,
            Mark::O => self.player_o,
        }
    }

    pub fn is_participant(&self, identity: &Identity) -> bool {
        self.player_x == *identity || self.player_o == *identity
    }

    /// Whether `identity` may place `mark`. In self-play one identity holds both.
    pub fn plays(&self, identity: &Identity, mark: Mark) -> bool {
        self.player(mark) == *identity
    }
}

/// Authoritative snapshot decoded from a ledger fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub participants: Participants,
    pub board: Board,
    pub status: GameStatus,
}

impl Session {
    /// Side to move; derived from the board, never stored
    pub fn turn(&self) -> Mark {
        self.board.turn()
    }

    /// Winner identity, read from the status code and stored participants
    pub fn winner(&self) -> Option<Identity> {
        self.status
            .winning_mark()
            .map(|mark| self.participants.player(mark))
    }
}

/// A move applied locally but not yet confirmed by the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingMove {
    pub position: Position,
    pub mark: Mark,
    /// Submission ticket, unique per cache
    pub ticket: u64,
}

/// Best-known projection of the bound session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalView {
    /// Bound session, `None` while detached
    pub session_id: Option<SessionId>,
    /// Known once created or after the first fetch
    pub participants: Option<Participants>,
    pub board: Board,
    pub turn: Mark,
    pub status: GameStatus,
    pub phase: Phase,
    /// Optimistic move reflected in `board`/`turn`, if any
    pub pending: Option<PendingMove>,
}

impl Default for LocalView {
    fn default() -> Self {
        Self::detached()
    }
}

impl LocalView {
    /// View with no session bound
    pub fn detached() -> Self {
        Self {
            session_id: None,
            participants: None,
            board: Board::new(),
            turn: Mark::X,
            status: GameStatus::InProgress,
            phase: Phase::Uninitialized,
            pending: None,
        }
    }

    /// This view bound to `session_id`, board not yet fetched
    pub fn bind(
        &self,
        session_id: SessionId,
        participants: Option<Participants>,
    ) -> Result<Self, TransitionError> {
        let phase = self.phase.apply(PhaseEvent::Bound)?;
        Ok(Self {
            session_id: Some(session_id),
            participants,
            phase,
            ..Self::detached()
        })
    }

    /// This view released from its session
    pub fn detach(&self) -> Result<Self, TransitionError> {
        let phase = self.phase.apply(PhaseEvent::Detached)?;
        Ok(Self {
            phase,
            ..Self::detached()
        })
    }

    /// Wholesale adoption of a snapshot; drops any optimistic move
    pub fn adopt(session: &Session, phase: Phase) -> Self {
        Self {
            session_id: Some(session.id),
            participants: Some(session.participants),
            board: session.board,
            turn: session.turn(),
            status: session.status,
            phase,
            pending: None,
        }
    }

    pub fn is_optimistic(&self) -> bool {
        self.pending.is_some()
    }

    /// Occupied cells excluding the optimistic move
    pub fn confirmed_occupied(&self) -> usize {
        self.board.occupied() - usize::from(self.pending.is_some())
    }

    /// Whether the board, status and participants equal the snapshot's
    pub fn matches(&self, session: &Session) -> bool {
        self.session_id == Some(session.id)
            && self.participants == Some(session.participants)
            && self.board == session.board
            && self.status == session.status
    }

    /// Winner identity, once the status is terminal
    pub fn winner(&self) -> Option<Identity> {
        let mark = self.status.winning_mark()?;
        self.participants.map(|p| p.player(mark))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_index_mapping() {
        let pos = Position::new(1, 2).unwrap();
        assert_eq!(pos.index(), 5);
        assert_eq!(Position::from_index(5), Some(pos));
        assert_eq!(Position::new(3, 0), None);
        assert_eq!(Position::new(0, 3), None);
        assert_eq!(Position::from_index(9), None);
        assert_eq!(Position::all().count(), 9);
    }

    #[test]
    fn test_board_counts_and_turn() {
        let mut board = Board::new();
        assert_eq!(board.turn(), Mark::X);
        board.set(Position::new(0, 0).unwrap(), Cell::X);
        assert_eq!(board.turn(), Mark::O);
        board.set(Position::new(1, 1).unwrap(), Cell::O);
        assert_eq!(board.turn(), Mark::X);
        assert_eq!(board.occupied(), 2);
        assert_eq!(board.first_empty(), Position::new(0, 1));
        assert!(!board.is_full());
    }

    #[test]
    fn test_board_display() {
        let mut board = Board::new();
        board.set(Position::new(0, 0).unwrap(), Cell::X);
        board.set(Position::new(2, 2).unwrap(), Cell::O);
        assert_eq!(board.display(), "X| | \n-+-+-\n | | \n-+-+-\n | |O");
    }

    #[test]
    fn test_winner_from_status_and_participants() {
        let a = Identity::new_from_array([1u8; 32]);
        let b = Identity::new_from_array([2u8; 32]);
        let mut session = Session {
            id: SessionId::new_from_array([9u8; 32]),
            participants: Participants::new(a, b),
            board: Board::new(),
            status: GameStatus::OWins,
        };
        assert_eq!(session.winner(), Some(b));
        session.status = GameStatus::Draw;
        assert_eq!(session.winner(), None);
    }

    #[test]
    fn test_self_play_participant_holds_both_marks() {
        let a = Identity::new_from_array([1u8; 32]);
        let p = Participants::new(a, a);
        assert!(p.plays(&a, Mark::X));
        assert!(p.plays(&a, Mark::O));
        assert!(!p.is_participant(&Identity::new_from_array([5u8; 32])));
    }

    #[test]
    fn test_bind_and_detach_follow_lifecycle() {
        let id = SessionId::new_from_array([9u8; 32]);
        let bound = LocalView::detached().bind(id, None).unwrap();
        assert_eq!(bound.phase, Phase::Bound);
        assert_eq!(bound.session_id, Some(id));

        // Binding over a bound view must go through detach first
        assert_eq!(
            bound.bind(id, None),
            Err(TransitionError {
                from: Phase::Bound,
                event: PhaseEvent::Bound,
            })
        );

        let detached = bound.detach().unwrap();
        assert_eq!(detached, LocalView::detached());
    }
}
