//! View change notifications

use serde::{Deserialize, Serialize};

use crate::model::LocalView;
use crate::reconcile::Reconciliation;

/// What changed the view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeCause {
    /// A session was created or joined
    Bound,
    /// A move was applied locally ahead of confirmation
    Optimistic,
    /// A fetched snapshot replaced the view
    Reconciled(Reconciliation),
    /// A failed submission restored the last confirmed view
    RolledBack,
    /// The session was released
    Detached,
}

/// Published after every change to the view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewEvent {
    /// View after the change
    pub view: LocalView,
    pub cause: ChangeCause,
}
