//! Synchronizer scenario tests against an in-process devnet ledger

mod poller_test;
mod race_test;

use std::{future::Future, sync::Arc};

use ledger_client::{DevnetLedger, KeypairSigner};
use ledger_types::Identity;
use tokio::sync::broadcast;

use crate::{ChangeCause, GameSessionSynchronizer, SyncConfig, ViewEvent};

/// Config with background polling off, so tests decide when to fetch
pub(crate) fn manual_config() -> SyncConfig {
    SyncConfig {
        auto_poll: false,
        ..Default::default()
    }
}

/// A signer plus the synchronizer acting for it
pub(crate) struct Player {
    pub signer: Arc<KeypairSigner>,
    pub sync: GameSessionSynchronizer,
}

impl Player {
    pub fn new(seed: u8, ledger: &DevnetLedger, config: SyncConfig) -> Self {
        Self::with_signer(Arc::new(KeypairSigner::from_seed([seed; 32])), ledger, config)
    }

    /// Another device for an existing signer
    pub fn with_signer(signer: Arc<KeypairSigner>, ledger: &DevnetLedger, config: SyncConfig) -> Self {
        let sync = GameSessionSynchronizer::new(signer.clone(), Arc::new(ledger.clone()), config);
        Self { signer, sync }
    }

    pub fn id(&self) -> Identity {
        self.signer.identity()
    }
}

/// Yield until at least `count` calls wait for the next block
pub(crate) async fn wait_queued(ledger: &DevnetLedger, count: usize) {
    for _ in 0..1_000 {
        if ledger.pending_calls() >= count {
            return;
        }
        tokio::task::yield_now().await;
        // On a multi-thread runtime the call is queued by another worker, so yielding
        // alone does not let it progress; give it real time instead
        if tokio::runtime::Handle::current().runtime_flavor() == tokio::runtime::RuntimeFlavor::MultiThread {
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        }
    }
    panic!("call was never queued");
}

/// Run `fut`, producing one block as soon as its call is queued
pub(crate) async fn with_block<T, F>(ledger: &DevnetLedger, fut: F) -> T
where
    T: Send + 'static,
    F: Future<Output = T> + Send + 'static,
{
    let handle = tokio::spawn(fut);
    wait_queued(ledger, 1).await;
    ledger.produce_block();
    handle.await.unwrap()
}

/// Create a session from `creator` against `opponent`
pub(crate) async fn create(ledger: &DevnetLedger, creator: &Player, opponent: Identity) -> ledger_types::SessionId {
    let sync = creator.sync.clone();
    let me = creator.id();
    with_block(ledger, async move { sync.create_session(me, opponent).await })
        .await
        .unwrap()
}

/// Play a move that is expected to confirm
pub(crate) async fn play(ledger: &DevnetLedger, player: &Player, row: usize, col: usize) {
    let sync = player.sync.clone();
    with_block(ledger, async move { sync.submit_move(row, col).await })
        .await
        .unwrap()
}

/// Causes of every event received so far
pub(crate) fn drain(rx: &mut broadcast::Receiver<ViewEvent>) -> Vec<ChangeCause> {
    let mut causes = Vec::new();
    while let Ok(event) = rx.try_recv() {
        causes.push(event.cause);
    }
    causes
}
