//! Reconciliation
//!
//! Folds a fetched snapshot into the local view. The snapshot is authoritative:
//! an optimistic move is either confirmed by it or discarded, never merged.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::model::{Cell, LocalView, Session};
use crate::state_machine::PhaseEvent;

/// Outcome of reconciling one snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reconciliation {
    /// View left as it was
    Unchanged,
    /// Snapshot replaced the view (no optimistic move involved)
    Adopted,
    /// Snapshot contained the optimistic move
    Confirmed,
    /// Snapshot contradicted the optimistic move, which was dropped
    Discarded,
    /// Snapshot reported a terminal status
    Finished,
    /// Snapshot belongs to a session that is no longer bound
    Stale,
}

impl Reconciliation {
    /// Whether the view was replaced
    pub fn changed(self) -> bool {
        !matches!(self, Reconciliation::Unchanged | Reconciliation::Stale)
    }
}

/// Reconcile `remote` into `local`, returning the new view and what happened
pub fn reconcile(local: &LocalView, remote: &Session) -> (LocalView, Reconciliation) {
    if local.session_id != Some(remote.id) {
        return (*local, Reconciliation::Stale);
    }

    if local.phase.is_terminal() {
        if !remote.status.is_terminal() {
            warn!(
                "Ignoring in-progress snapshot for finished session {}",
                remote.id.short()
            );
            return (*local, Reconciliation::Unchanged);
        }
        if local.matches(remote) {
            return (*local, Reconciliation::Unchanged);
        }
        return (
            LocalView::adopt(remote, local.phase),
            Reconciliation::Adopted,
        );
    }

    let event = if remote.status.is_terminal() {
        PhaseEvent::SnapshotTerminal
    } else {
        PhaseEvent::SnapshotInProgress
    };
    let phase = match local.phase.apply(event) {
        Ok(phase) => phase,
        Err(e) => {
            warn!("Snapshot for {} not applied: {}", remote.id.short(), e);
            return (*local, Reconciliation::Unchanged);
        }
    };

    if remote.status.is_terminal() {
        debug!(
            "Session {} finished with {:?}",
            remote.id.short(),
            remote.status
        );
        return (LocalView::adopt(remote, phase), Reconciliation::Finished);
    }

    // A snapshot behind the last confirmed board was served by a lagging read
    if remote.board.occupied() < local.confirmed_occupied() {
        debug!(
            "Snapshot for {} is older than the cache ({} < {} cells)",
            remote.id.short(),
            remote.board.occupied(),
            local.confirmed_occupied()
        );
        return (*local, Reconciliation::Unchanged);
    }

    let adopted = LocalView::adopt(remote, phase);
    match local.pending {
        None if adopted == *local => (*local, Reconciliation::Unchanged),
        None => (adopted, Reconciliation::Adopted),
        Some(pending) if remote.board.get(pending.position) == Cell::from(pending.mark) => {
            debug!("Move at {} confirmed", pending.position);
            (adopted, Reconciliation::Confirmed)
        }
        Some(pending) => {
            debug!(
                "Discarding optimistic move at {}; snapshot holds {:?}",
                pending.position,
                remote.board.get(pending.position)
            );
            (adopted, Reconciliation::Discarded)
        }
    }
}
