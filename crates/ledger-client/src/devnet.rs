//! Devnet Ledger - in-process ledger running the tic-tac-toe program
//!
//! Calls are queued on submit and executed when a block is produced, either
//! on a fixed block time (`run_async`) or manually (`produce_block`). Each
//! block publishes its confirmations on a broadcast channel, which is what
//! `await_confirmation` waits on.

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use ledger_types::{ObjectId, Slot, TxDigest};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};
use tictactoe_program::{GameCall, RawGameState};
use tokio::{sync::broadcast, task::JoinHandle};

use crate::{
    client::LedgerClient,
    error::LedgerError,
    object_store::ObjectStore,
    signer::verify_call,
    types::{Confirmation, Effects, RawObject, Receipt, SignedCall},
    BLOCK_TIME_MS, MAX_CALLS_PER_BLOCK, RETENTION_SLOTS,
};

/// Block update event sent to subscribers
#[derive(Clone, Debug)]
pub struct BlockUpdate {
    /// Slot (block height)
    pub slot: Slot,
    /// Confirmations of the calls included in this block
    pub confirmations: Vec<Confirmation>,
}

/// Devnet configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DevnetConfig {
    /// Block time in milliseconds
    pub block_time_ms: u64,
    /// Maximum calls executed per block
    pub max_calls_per_block: usize,
    /// Slots a confirmation stays queryable after its block
    pub retention_slots: u64,
}

impl DevnetConfig {
    /// Block time as a duration, at least one millisecond
    pub fn block_time(&self) -> Duration {
        Duration::from_millis(self.block_time_ms.max(1))
    }
}

impl Default for DevnetConfig {
    fn default() -> Self {
        Self {
            block_time_ms: BLOCK_TIME_MS,
            max_calls_per_block: MAX_CALLS_PER_BLOCK,
            retention_slots: RETENTION_SLOTS,
        }
    }
}

struct DevnetInner {
    /// Stored session objects
    store: ObjectStore,
    /// Calls waiting for the next block
    pending: Mutex<VecDeque<SignedCall>>,
    /// Digests queued or confirmed within the retention window
    accepted: DashSet<TxDigest>,
    /// Confirmations by digest, pruned after `retention_slots`
    confirmations: DashMap<TxDigest, Confirmation>,
    /// Current slot
    slot: AtomicU64,
    /// Block update broadcaster
    update_sender: broadcast::Sender<BlockUpdate>,
    /// Injected submit failures still to hand out
    failing_submits: AtomicUsize,
    /// Injected fetch failures still to hand out
    failing_fetches: AtomicUsize,
    /// Running flag
    running: AtomicBool,
    /// Configuration
    config: DevnetConfig,
}

/// In-process ledger
#[derive(Clone)]
pub struct DevnetLedger {
    inner: Arc<DevnetInner>,
}

impl DevnetLedger {
    /// Create a new devnet ledger
    pub fn new(config: DevnetConfig) -> Self {
        let (update_sender, _) = broadcast::channel(64);

        Self {
            inner: Arc::new(DevnetInner {
                store: ObjectStore::new(),
                pending: Mutex::new(VecDeque::new()),
                accepted: DashSet::new(),
                confirmations: DashMap::new(),
                slot: AtomicU64::new(0),
                update_sender,
                failing_submits: AtomicUsize::new(0),
                failing_fetches: AtomicUsize::new(0),
                running: AtomicBool::new(false),
                config,
            }),
        }
    }

    /// Subscribe to block updates
    pub fn subscribe(&self) -> broadcast::Receiver<BlockUpdate> {
        self.inner.update_sender.subscribe()
    }

    /// Get current slot
    pub fn current_slot(&self) -> Slot {
        self.inner.slot.load(Ordering::SeqCst)
    }

    /// Number of calls waiting for a block
    pub fn pending_calls(&self) -> usize {
        self.inner.pending.lock().len()
    }

    /// Read-only view of the object store
    pub fn store(&self) -> &ObjectStore {
        &self.inner.store
    }

    /// Make the next `count` submits fail with a transport error
    pub fn fail_next_submits(&self, count: usize) {
        self.inner.failing_submits.store(count, Ordering::SeqCst);
    }

    /// Make the next `count` fetches fail with a transport error
    pub fn fail_next_fetches(&self, count: usize) {
        self.inner.failing_fetches.store(count, Ordering::SeqCst);
    }

    /// Check if the block loop is running
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Stop the block loop after its current tick
    pub fn stop(&self) {
        self.inner.running.store(false, Ordering::SeqCst);
    }

    /// Execute queued calls and publish one block
    pub fn produce_block(&self) -> BlockUpdate {
        let batch: Vec<SignedCall> = {
            let mut pending = self.inner.pending.lock();
            let take = pending.len().min(self.inner.config.max_calls_per_block);
            pending.drain(..take).collect()
        };

        let slot = self.inner.slot.fetch_add(1, Ordering::SeqCst) + 1;
        let mut confirmations = Vec::with_capacity(batch.len());

        for call in batch {
            let digest = call.digest();
            let effects = self.execute_call(&call, digest, slot);

            if let Effects::Failure { reason } = &effects {
                tracing::debug!("Call {} failed in slot {}: {}", digest.short(), slot, reason);
            }

            let confirmation = Confirmation {
                digest,
                slot,
                effects,
            };
            self.inner
                .confirmations
                .insert(digest, confirmation.clone());
            confirmations.push(confirmation);
        }

        if !confirmations.is_empty() {
            tracing::debug!("Slot {} | {} calls", slot, confirmations.len());
        }

        self.prune_confirmations(slot);

        let update = BlockUpdate {
            slot,
            confirmations,
        };

        // Ignore errors if no subscribers
        let _ = self.inner.update_sender.send(update.clone());

        update
    }

    /// Forget confirmations older than the retention window.
    ///
    /// A replayed call whose digest was forgotten is re-executed; the
    /// program rejects it because its session exists or its cell is taken.
    fn prune_confirmations(&self, slot: Slot) {
        let Some(cutoff) = slot.checked_sub(self.inner.config.retention_slots) else {
            return;
        };
        let accepted = &self.inner.accepted;
        let before = self.inner.confirmations.len();
        self.inner.confirmations.retain(|digest, confirmation| {
            let keep = confirmation.slot > cutoff;
            if !keep {
                accepted.remove(digest);
            }
            keep
        });
        let pruned = before.saturating_sub(self.inner.confirmations.len());
        if pruned > 0 {
            tracing::trace!("Pruned {} confirmations at slot {}", pruned, slot);
        }
    }

    /// Number of confirmations still held
    pub fn retained_confirmations(&self) -> usize {
        self.inner.confirmations.len()
    }

    /// Run one call against the program and store its writes
    fn execute_call(&self, call: &SignedCall, digest: TxDigest, slot: Slot) -> Effects {
        let game_call = match GameCall::from_bytes(&call.payload) {
            Ok(game_call) => game_call,
            Err(e) => {
                return Effects::Failure {
                    reason: e.to_string(),
                }
            }
        };

        let store = &self.inner.store;
        let result = tictactoe_program::execute(&call.sender, &digest, game_call, |id| {
            store
                .get_object(id)
                .and_then(|object| RawGameState::from_bytes(&object.data).ok())
        });

        match result {
            Ok(execution) => {
                store.store_object(execution.object, execution.state.to_bytes(), slot);
                if execution.created {
                    Effects::Success {
                        created: vec![execution.object],
                        mutated: Vec::new(),
                    }
                } else {
                    Effects::Success {
                        created: Vec::new(),
                        mutated: vec![execution.object],
                    }
                }
            }
            Err(e) => Effects::Failure {
                reason: e.to_string(),
            },
        }
    }

    /// Run the block loop on a fixed block time (tokio)
    pub async fn run_async(self) {
        self.inner.running.store(true, Ordering::SeqCst);

        let mut interval = tokio::time::interval(self.inner.config.block_time());
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        tracing::info!(
            "Devnet block producer started ({}ms blocks)",
            self.inner.config.block_time().as_millis()
        );

        while self.inner.running.load(Ordering::SeqCst) {
            interval.tick().await;
            self.produce_block();
        }

        tracing::info!("Devnet block producer stopped at slot {}", self.current_slot());
    }

    /// Spawn the block loop onto the current runtime
    pub fn spawn(&self) -> JoinHandle<()> {
        let ledger = self.clone();
        tokio::spawn(ledger.run_async())
    }

    /// Take one injected failure from `counter`, if any are left
    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl Default for DevnetLedger {
    fn default() -> Self {
        Self::new(DevnetConfig::default())
    }
}

#[async_trait]
impl LedgerClient for DevnetLedger {
    async fn submit(&self, call: SignedCall) -> Result<Receipt, LedgerError> {
        if Self::take_failure(&self.inner.failing_submits) {
            return Err(LedgerError::Transport("injected submit failure".to_string()));
        }

        verify_call(&call)?;

        let digest = call.digest();
        if !self.inner.accepted.insert(digest) {
            return Err(LedgerError::Rejected(format!(
                "Duplicate call {}",
                digest.short()
            )));
        }

        self.inner.pending.lock().push_back(call);
        tracing::trace!("Accepted call {}", digest.short());

        Ok(Receipt {
            digest,
            submitted_slot: self.current_slot(),
        })
    }

    async fn await_confirmation(&self, receipt: &Receipt) -> Result<Confirmation, LedgerError> {
        // Subscribe before checking so a block produced in between is not missed
        let mut updates = self.subscribe();

        if !self.inner.accepted.contains(&receipt.digest) {
            return Err(LedgerError::UnknownReceipt);
        }

        loop {
            if let Some(confirmation) = self.inner.confirmations.get(&receipt.digest) {
                return Ok(confirmation.clone());
            }

            match updates.recv().await {
                Ok(update) => {
                    if let Some(confirmation) = update
                        .confirmations
                        .into_iter()
                        .find(|c| c.digest == receipt.digest)
                    {
                        return Ok(confirmation);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("Confirmation waiter lagged {} blocks", n);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(LedgerError::Transport("block stream closed".to_string()));
                }
            }
        }
    }

    async fn fetch_object(&self, id: &ObjectId) -> Result<Option<RawObject>, LedgerError> {
        if Self::take_failure(&self.inner.failing_fetches) {
            return Err(LedgerError::Transport("injected fetch failure".to_string()));
        }

        Ok(self.inner.store.get_object(id))
    }
}
