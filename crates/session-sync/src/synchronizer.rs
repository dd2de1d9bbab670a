//! Game Session Synchronizer
//!
//! Entry point for clients. Creates or joins one session at a time, submits
//! moves as signed calls, and keeps the cached view in line with the ledger
//! through reconciliation.
//!
//! The cache lock is taken only in short synchronous sections and released
//! before every call into the signer or ledger. View events are sent while
//! the lock is held, so subscribers see changes in the order the cache
//! applied them.

use ledger_client::{sign_call, Confirmation, Effects, LedgerClient, LedgerError, SigningProvider};
use ledger_types::{Identity, SessionId};
use parking_lot::Mutex;
use std::sync::Arc;
use tictactoe_program::GameCall;
use tokio::sync::broadcast;

use crate::cache::SessionCache;
use crate::config::SyncConfig;
use crate::decode::decode_session;
use crate::error::{MoveRejection, SyncError};
use crate::events::{ChangeCause, ViewEvent};
use crate::model::{LocalView, Participants, Position, Session};
use crate::poller::PollerHandle;
use crate::reconcile::Reconciliation;

/// Shared synchronizer state
pub(crate) struct SyncInner {
    signer: Arc<dyn SigningProvider>,
    ledger: Arc<dyn LedgerClient>,
    cache: Mutex<SessionCache>,
    events: broadcast::Sender<ViewEvent>,
    poller: Mutex<Option<PollerHandle>>,
    config: SyncConfig,
}

/// Handle to a synchronizer; clones share the same session
#[derive(Clone)]
pub struct GameSessionSynchronizer {
    inner: Arc<SyncInner>,
}

impl GameSessionSynchronizer {
    pub fn new(
        signer: Arc<dyn SigningProvider>,
        ledger: Arc<dyn LedgerClient>,
        config: SyncConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            inner: Arc::new(SyncInner {
                signer,
                ledger,
                cache: Mutex::new(SessionCache::new()),
                events,
                poller: Mutex::new(None),
                config,
            }),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    /// Identity the signer currently exposes
    pub fn active_identity(&self) -> Option<Identity> {
        self.inner.signer.active_identity()
    }

    /// Create a session with `self_id` as X and `opponent_id` as O, then bind it.
    ///
    /// `self_id` must be the connected identity. Passing the same identity
    /// twice creates a self-play session.
    pub async fn create_session(
        &self,
        self_id: Identity,
        opponent_id: Identity,
    ) -> Result<SessionId, SyncError> {
        let active = self
            .inner
            .signer
            .active_identity()
            .ok_or(SyncError::NotConnected)?;
        if active != self_id {
            return Err(SyncError::IdentityMismatch {
                given: self_id,
                active,
            });
        }

        let call = GameCall::CreateSession {
            player_x: self_id,
            player_o: opponent_id,
        };
        let confirmation = self.inner.submit_and_confirm(call).await?;
        let session_id = confirmation.created_object().ok_or_else(|| {
            SyncError::SubmissionFailed("confirmation lists no created session".to_string())
        })?;

        tracing::info!(
            "Created session {} (X={}, O={}) in slot {}",
            session_id.short(),
            self_id.short(),
            opponent_id.short(),
            confirmation.slot
        );

        let generation = self.bind(session_id, Some(Participants::new(self_id, opponent_id)));
        self.inner.refresh(generation, session_id).await;
        Ok(session_id)
    }

    /// Attach to an existing session after verifying it with a fetch
    pub async fn join_session(&self, session_id: SessionId) -> Result<(), SyncError> {
        let object = self
            .inner
            .ledger
            .fetch_object(&session_id)
            .await
            .map_err(SyncError::TransientFetch)?
            .ok_or(SyncError::SessionNotFound(session_id))?;
        let session = decode_session(&object).map_err(|e| {
            tracing::warn!("Session {} is malformed: {}", session_id.short(), e);
            SyncError::SessionNotFound(session_id)
        })?;

        let generation = self.bind(session_id, Some(session.participants));
        let result = self.inner.apply(generation, &session);
        tracing::info!(
            "Joined session {} ({:?}, status {:?})",
            session_id.short(),
            result,
            session.status
        );
        Ok(())
    }

    /// Submit a move for the connected identity.
    ///
    /// The move is shown optimistically right away. On a failed submission
    /// the last confirmed view is restored and the error returned; the move
    /// is not retried.
    pub async fn submit_move(&self, row: usize, col: usize) -> Result<(), SyncError> {
        let position =
            Position::new(row, col).ok_or(MoveRejection::OutOfBounds { row, col })?;
        let identity = self.inner.signer.active_identity();

        let (generation, session_id, pending) = {
            let mut cache = self.inner.cache.lock();
            let session_id = cache
                .session_id()
                .ok_or(MoveRejection::NotInProgress)?;
            let pending = cache.begin_move(identity, position)?;
            self.inner.publish(*cache.view(), ChangeCause::Optimistic);
            (cache.generation(), session_id, pending)
        };

        tracing::info!(
            "Submitting {} at {} in session {}",
            pending.mark,
            position,
            session_id.short()
        );

        let call = GameCall::SubmitMove {
            session: session_id,
            position: position.index() as u8,
        };
        match self.inner.submit_and_confirm(call).await {
            Ok(confirmation) => {
                tracing::debug!(
                    "Move at {} confirmed in slot {}",
                    position,
                    confirmation.slot
                );
                // If this fetch fails the pending move stays until a poll confirms it
                self.inner.refresh(generation, session_id).await;
                self.inner.cache.lock().release_move(pending.ticket);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Move at {} failed: {}", position, e);
                self.inner.roll_back(generation, pending.ticket);
                Err(e)
            }
        }
    }

    /// Fetch the bound session once and reconcile it into the cache
    pub async fn poll_once(&self) -> Reconciliation {
        self.inner.poll_once().await
    }

    /// Snapshot of the cached view
    pub fn current_view(&self) -> LocalView {
        *self.inner.cache.lock().view()
    }

    /// Whether a submitted move is still awaiting its outcome
    pub fn move_in_flight(&self) -> bool {
        self.inner.cache.lock().move_in_flight()
    }

    /// Receive a `ViewEvent` for every change to the view
    pub fn subscribe(&self) -> broadcast::Receiver<ViewEvent> {
        self.inner.events.subscribe()
    }

    /// Release the bound session and stop polling
    pub fn detach(&self) {
        self.inner.stop_poller();
        let released = {
            let mut cache = self.inner.cache.lock();
            let session_id = cache.session_id();
            if cache.detach() {
                self.inner.publish(*cache.view(), ChangeCause::Detached);
                session_id
            } else {
                None
            }
        };
        if let Some(session_id) = released {
            tracing::info!("Detached from session {}", session_id.short());
        }
    }

    /// Start the background poller for the bound session.
    ///
    /// Returns false when nothing is bound, the session is finished, or no
    /// tokio runtime is available.
    pub fn start_polling(&self) -> bool {
        let binding = {
            let cache = self.inner.cache.lock();
            let view = cache.view();
            view.session_id
                .filter(|_| !view.phase.is_terminal())
                .map(|id| (cache.generation(), id))
        };
        match binding {
            Some((generation, session_id)) => self.inner.start_poller(generation, session_id),
            None => false,
        }
    }

    /// Stop the background poller, if running
    pub fn stop_polling(&self) {
        self.inner.stop_poller();
    }

    /// Whether a poller is running for the current binding
    pub fn is_polling(&self) -> bool {
        let generation = self.inner.cache.lock().generation();
        self.inner
            .poller
            .lock()
            .as_ref()
            .is_some_and(|p| p.generation() == generation && !p.is_finished())
    }

    /// Bind `session_id` in place of the current session.
    /// Binding the session already bound leaves the cache and poller as they are.
    fn bind(&self, session_id: SessionId, participants: Option<Participants>) -> u64 {
        let (generation, rebound) = {
            let mut cache = self.inner.cache.lock();
            let previous = cache.generation();
            let generation = cache.bind(session_id, participants);
            let rebound = generation != previous;
            if rebound {
                self.inner.publish(*cache.view(), ChangeCause::Bound);
            }
            (generation, rebound)
        };
        if !rebound {
            tracing::debug!("Session {} already bound", session_id.short());
            return generation;
        }
        if self.inner.config.auto_poll {
            self.inner.start_poller(generation, session_id);
        } else {
            self.inner.stop_poller();
        }
        generation
    }
}

impl SyncInner {
    /// Sign, submit and wait for `call`; a failed execution is an error
    async fn submit_and_confirm(&self, call: GameCall) -> Result<Confirmation, SyncError> {
        let signed = sign_call(self.signer.as_ref(), call.to_bytes()).map_err(|e| match e {
            LedgerError::Disconnected => SyncError::NotConnected,
            e => SyncError::SubmissionFailed(e.to_string()),
        })?;
        let receipt = self
            .ledger
            .submit(signed)
            .await
            .map_err(|e| SyncError::SubmissionFailed(e.to_string()))?;
        let confirmation = self
            .ledger
            .await_confirmation(&receipt)
            .await
            .map_err(|e| SyncError::SubmissionFailed(e.to_string()))?;

        match &confirmation.effects {
            Effects::Success { .. } => Ok(confirmation),
            Effects::Failure { reason } => Err(SyncError::SubmissionFailed(reason.clone())),
        }
    }

    pub(crate) async fn poll_once(&self) -> Reconciliation {
        let binding = {
            let cache = self.cache.lock();
            cache.session_id().map(|id| (cache.generation(), id))
        };
        match binding {
            Some((generation, session_id)) => self.refresh(generation, session_id).await,
            None => Reconciliation::Unchanged,
        }
    }

    /// Fetch `session_id` and reconcile it under `generation`.
    /// Fetch and decode failures are logged and reported as `Unchanged`.
    pub(crate) async fn refresh(&self, generation: u64, session_id: SessionId) -> Reconciliation {
        let object = match self.ledger.fetch_object(&session_id).await {
            Ok(Some(object)) => object,
            Ok(None) => {
                tracing::warn!("Session {} not found on fetch", session_id.short());
                return Reconciliation::Unchanged;
            }
            Err(e) => {
                tracing::warn!("Fetch of session {} failed: {}", session_id.short(), e);
                return Reconciliation::Unchanged;
            }
        };
        match decode_session(&object) {
            Ok(session) => self.apply(generation, &session),
            Err(e) => {
                tracing::warn!("Ignoring malformed session {}: {}", session_id.short(), e);
                Reconciliation::Unchanged
            }
        }
    }

    /// Reconcile a decoded snapshot and publish the change, if any
    fn apply(&self, generation: u64, session: &Session) -> Reconciliation {
        let result = {
            let mut cache = self.cache.lock();
            let result = cache.apply_snapshot(generation, session);
            if result.changed() {
                self.publish(*cache.view(), ChangeCause::Reconciled(result));
            }
            result
        };
        match result {
            Reconciliation::Stale => {
                tracing::debug!("Dropped stale snapshot of {}", session.id.short());
            }
            Reconciliation::Finished => {
                tracing::info!(
                    "Session {} finished: {:?}\n{}",
                    session.id.short(),
                    session.status,
                    session.board.display()
                );
            }
            _ => {}
        }
        result
    }

    fn roll_back(&self, generation: u64, ticket: u64) {
        let mut cache = self.cache.lock();
        if cache.rollback_move(generation, ticket) {
            self.publish(*cache.view(), ChangeCause::RolledBack);
        }
    }

    /// Whether the poller for `generation` should keep running
    pub(crate) fn should_poll(&self, generation: u64) -> bool {
        let cache = self.cache.lock();
        cache.is_current(generation) && !cache.view().phase.is_terminal()
    }

    fn start_poller(self: &Arc<Self>, generation: u64, session_id: SessionId) -> bool {
        if tokio::runtime::Handle::try_current().is_err() {
            tracing::warn!("No tokio runtime; polling not started");
            return false;
        }
        let handle = PollerHandle::spawn(
            Arc::downgrade(self),
            generation,
            session_id,
            self.config.poll_interval(),
        );
        // Replacing the handle aborts the previous poller
        *self.poller.lock() = Some(handle);
        true
    }

    fn stop_poller(&self) {
        self.poller.lock().take();
    }

    /// Send a view event; callers hold the cache lock
    fn publish(&self, view: LocalView, cause: ChangeCause) {
        tracing::trace!("View event {:?}", cause);
        // Ignore errors if no subscribers
        let _ = self.events.send(ViewEvent { view, cause });
    }
}
