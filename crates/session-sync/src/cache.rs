//! Session State Cache
//!
//! Owns the single `LocalView`, the last confirmed view, the binding
//! generation and the in-flight move ticket. Every method is synchronous;
//! callers hold the cache lock only for the duration of one call.

use ledger_types::{Identity, SessionId};
use tracing::{debug, warn};

use crate::error::{MoveRejection, SyncError};
use crate::model::{LocalView, Participants, PendingMove, Position, Session};
use crate::reconcile::{reconcile, Reconciliation};

/// Cached view of the bound session
#[derive(Debug, Default)]
pub struct SessionCache {
    /// View handed to readers, possibly optimistic
    view: LocalView,
    /// Last view reconciled from the ledger; rollback target
    confirmed: LocalView,
    /// Incremented on every bind and detach
    generation: u64,
    /// Ticket of the unconfirmed submission, if any
    in_flight: Option<u64>,
    next_ticket: u64,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> &LocalView {
        &self.view
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether `generation` still names the current binding
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation && self.view.phase.is_bound()
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.view.session_id
    }

    pub fn move_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Bind a session, replacing whatever was bound before.
    ///
    /// Returns the generation of the binding. Binding the session that is
    /// already bound keeps its view and in-flight move and returns the
    /// current generation unchanged.
    pub fn bind(&mut self, session_id: SessionId, participants: Option<Participants>) -> u64 {
        if self.view.session_id == Some(session_id) {
            return self.generation;
        }
        self.detach();
        let view = match self.view.bind(session_id, participants) {
            Ok(view) => view,
            Err(e) => {
                warn!("Cannot bind {}: {}", session_id.short(), e);
                return self.generation;
            }
        };
        self.generation += 1;
        self.view = view;
        self.confirmed = view;
        debug!(
            "Cache bound to {} (generation {})",
            session_id.short(),
            self.generation
        );
        self.generation
    }

    /// Release the bound session. Returns false if nothing was bound.
    pub fn detach(&mut self) -> bool {
        if !self.view.phase.is_bound() {
            return false;
        }
        let Ok(view) = self.view.detach() else {
            return false;
        };
        self.generation += 1;
        self.view = view;
        self.confirmed = view;
        self.in_flight = None;
        true
    }

    /// Check local preconditions and apply the move optimistically.
    ///
    /// Order: phase, in-flight, identity, participant, turn, cell. Nothing
    /// is mutated unless every check passes.
    pub fn begin_move(
        &mut self,
        identity: Option<Identity>,
        position: Position,
    ) -> Result<PendingMove, SyncError> {
        if !self.view.phase.accepts_moves() {
            return Err(MoveRejection::NotInProgress.into());
        }
        // A confirmed move stays pending until a snapshot shows it
        if self.in_flight.is_some() || self.view.pending.is_some() {
            return Err(SyncError::MoveInFlight);
        }
        let identity = identity.ok_or(SyncError::NotConnected)?;
        let participants = self
            .view
            .participants
            .filter(|p| p.is_participant(&identity))
            .ok_or(MoveRejection::NotAParticipant)?;
        let mark = self.view.turn;
        if !participants.plays(&identity, mark) {
            return Err(MoveRejection::NotYourTurn { turn: mark }.into());
        }
        if !self.view.board.get(position).is_empty() {
            return Err(MoveRejection::CellOccupied(position).into());
        }

        self.next_ticket += 1;
        let pending = PendingMove {
            position,
            mark,
            ticket: self.next_ticket,
        };
        self.view.board.set(position, mark.into());
        self.view.turn = mark.opponent();
        self.view.pending = Some(pending);
        self.in_flight = Some(pending.ticket);
        Ok(pending)
    }

    /// Restore the last confirmed view if `ticket`'s optimistic move is
    /// still shown, and release the in-flight slot. Returns whether the view changed.
    pub fn rollback_move(&mut self, generation: u64, ticket: u64) -> bool {
        if self.generation != generation {
            return false;
        }
        self.release_move(ticket);
        match self.view.pending {
            Some(pending) if pending.ticket == ticket => {
                self.view = self.confirmed;
                true
            }
            _ => false,
        }
    }

    /// Release the in-flight slot held by `ticket`
    pub fn release_move(&mut self, ticket: u64) {
        if self.in_flight == Some(ticket) {
            self.in_flight = None;
        }
    }

    /// Reconcile a snapshot fetched under `generation`
    pub fn apply_snapshot(&mut self, generation: u64, remote: &Session) -> Reconciliation {
        if !self.is_current(generation) {
            return Reconciliation::Stale;
        }
        let (view, result) = reconcile(&self.view, remote);
        if result.changed() {
            self.view = view;
            self.confirmed = view;
        }
        result
    }
}
