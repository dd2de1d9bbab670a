//! Interleavings between polls, submissions and rebinding

use async_trait::async_trait;
use ledger_client::{
    Confirmation, DevnetLedger, LedgerClient, LedgerError, RawObject, Receipt, SignedCall,
};
use ledger_types::{Identity, ObjectId};
use parking_lot::Mutex;
use std::{collections::VecDeque, sync::Arc, time::Duration};
use tokio::sync::oneshot;

use super::*;
use crate::{Cell, ChangeCause, Mark, Position, Reconciliation, SyncError};

fn pos(row: usize, col: usize) -> Position {
    Position::new(row, col).unwrap()
}

/// Devnet wrapper that can serve old snapshots and hold fetches open
struct ScriptedLedger {
    devnet: DevnetLedger,
    /// Served instead of the real object, oldest first
    lagging: Mutex<VecDeque<RawObject>>,
    /// Next fetch waits for this before reading
    gate: Mutex<Option<oneshot::Receiver<()>>>,
}

impl ScriptedLedger {
    fn new(devnet: DevnetLedger) -> Self {
        Self {
            devnet,
            lagging: Mutex::new(VecDeque::new()),
            gate: Mutex::new(None),
        }
    }

    fn serve_lagging(&self, object: RawObject) {
        self.lagging.lock().push_back(object);
    }

    fn hold_next_fetch(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.gate.lock() = Some(rx);
        tx
    }
}

#[async_trait]
impl LedgerClient for ScriptedLedger {
    async fn submit(&self, call: SignedCall) -> Result<Receipt, LedgerError> {
        self.devnet.submit(call).await
    }

    async fn await_confirmation(&self, receipt: &Receipt) -> Result<Confirmation, LedgerError> {
        self.devnet.await_confirmation(receipt).await
    }

    async fn fetch_object(&self, id: &ObjectId) -> Result<Option<RawObject>, LedgerError> {
        let gate = self.gate.lock().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        let lagging = self.lagging.lock().pop_front();
        match lagging {
            Some(object) => Ok(Some(object)),
            None => self.devnet.fetch_object(id).await,
        }
    }
}

fn scripted_player(seed: u8, ledger: Arc<ScriptedLedger>) -> (Arc<KeypairSigner>, GameSessionSynchronizer) {
    let signer = Arc::new(KeypairSigner::from_seed([seed; 32]));
    let sync = GameSessionSynchronizer::new(signer.clone(), ledger, manual_config());
    (signer, sync)
}

#[tokio::test]
async fn test_poll_during_flight_discards_then_confirmation_reconciles() {
    let ledger = DevnetLedger::default();
    let phone = Player::new(1, &ledger, manual_config());
    let laptop = Player::with_signer(phone.signer.clone(), &ledger, manual_config());

    let session_id = create(&ledger, &phone, phone.id()).await;
    play(&ledger, &phone, 2, 2).await;
    laptop.sync.join_session(session_id).await.unwrap();

    // The phone places O at (0,0); the laptop has not seen it and plays (1,1)
    play(&ledger, &phone, 0, 0).await;
    let sync = laptop.sync.clone();
    let handle = tokio::spawn(async move { sync.submit_move(1, 1).await });
    wait_queued(&ledger, 1).await;
    assert_eq!(
        laptop.sync.current_view().pending.map(|p| p.mark),
        Some(Mark::O)
    );

    // A poll lands before the block: the snapshot has (0,0) but not (1,1)
    assert_eq!(laptop.sync.poll_once().await, Reconciliation::Discarded);
    let view = laptop.sync.current_view();
    let fetched = crate::decode_session(&ledger.store().get_object(&session_id).unwrap()).unwrap();
    assert_eq!(view.board, fetched.board);
    assert_eq!(view.board.get(pos(1, 1)), Cell::Empty);
    assert_eq!(view.pending, None);
    assert!(laptop.sync.move_in_flight());

    // The ledger still executes the call; its confirmation re-reconciles
    ledger.produce_block();
    handle.await.unwrap().unwrap();
    let view = laptop.sync.current_view();
    assert_eq!(view.board.occupied(), 3);
    assert!(!view.board.get(pos(1, 1)).is_empty());
    assert!(!laptop.sync.move_in_flight());
}

#[tokio::test]
async fn test_lagging_snapshot_does_not_regress_board() {
    let devnet = DevnetLedger::default();
    let scripted = Arc::new(ScriptedLedger::new(devnet.clone()));
    let (_signer, sync) = scripted_player(1, scripted.clone());
    let me = sync.active_identity().unwrap();
    let opponent = Identity::new_from_array([2u8; 32]);

    let creator = sync.clone();
    let session_id = with_block(&devnet, async move {
        creator.create_session(me, opponent).await
    })
    .await
    .unwrap();
    let empty = devnet.store().get_object(&session_id).unwrap();

    let mover = sync.clone();
    with_block(&devnet, async move { mover.submit_move(0, 0).await })
        .await
        .unwrap();
    let confirmed = sync.current_view();
    assert_eq!(confirmed.board.get(pos(0, 0)), Cell::X);

    scripted.serve_lagging(empty);
    assert_eq!(sync.poll_once().await, Reconciliation::Unchanged);
    assert_eq!(sync.current_view(), confirmed);
}

#[tokio::test]
async fn test_poll_response_for_old_binding_is_stale() {
    let devnet = DevnetLedger::default();
    let scripted = Arc::new(ScriptedLedger::new(devnet.clone()));
    let (_signer, sync) = scripted_player(1, scripted.clone());
    let me = sync.active_identity().unwrap();

    let creator = sync.clone();
    let first = with_block(&devnet, async move {
        creator.create_session(me, me).await
    })
    .await
    .unwrap();

    let release = scripted.hold_next_fetch();
    let poller = sync.clone();
    let poll = tokio::spawn(async move { poller.poll_once().await });
    tokio::task::yield_now().await;

    // Rebind while the fetch for the first session is outstanding
    let creator = sync.clone();
    let second = with_block(&devnet, async move {
        creator.create_session(me, me).await
    })
    .await
    .unwrap();
    assert_ne!(first, second);

    let mut events = sync.subscribe();
    release.send(()).unwrap();
    assert_eq!(poll.await.unwrap(), Reconciliation::Stale);
    assert_eq!(sync.current_view().session_id, Some(second));
    assert!(drain(&mut events).is_empty());
}

#[tokio::test]
async fn test_confirmation_after_rebind_leaves_new_session_alone() {
    let ledger = DevnetLedger::default();
    let alice = Player::new(1, &ledger, manual_config());
    let bob = Player::new(2, &ledger, manual_config());

    let first = create(&ledger, &alice, bob.id()).await;
    let second = create(&ledger, &bob, alice.id()).await;

    let sync = alice.sync.clone();
    let handle = tokio::spawn(async move { sync.submit_move(1, 1).await });
    wait_queued(&ledger, 1).await;

    alice.sync.join_session(second).await.unwrap();
    let joined = alice.sync.current_view();
    let mut events = alice.sync.subscribe();

    ledger.produce_block();
    handle.await.unwrap().unwrap();

    assert_eq!(alice.sync.current_view(), joined);
    assert!(drain(&mut events).is_empty());
    assert!(!alice.sync.move_in_flight());

    // The move did land on the first session
    let session = crate::decode_session(&ledger.store().get_object(&first).unwrap()).unwrap();
    assert_eq!(session.board.get(pos(1, 1)), Cell::X);
}

#[tokio::test]
async fn test_rejoining_bound_session_keeps_move_in_flight() {
    let ledger = DevnetLedger::default();
    let solo = Player::new(1, &ledger, manual_config());
    let session_id = create(&ledger, &solo, solo.id()).await;

    let sync = solo.sync.clone();
    let handle = tokio::spawn(async move { sync.submit_move(0, 0).await });
    wait_queued(&ledger, 1).await;

    let mut events = solo.sync.subscribe();
    solo.sync.join_session(session_id).await.unwrap();
    assert!(solo.sync.move_in_flight());
    assert!(!drain(&mut events).contains(&ChangeCause::Bound));

    assert_eq!(solo.sync.submit_move(1, 1).await, Err(SyncError::MoveInFlight));
    assert_eq!(ledger.pending_calls(), 1);

    ledger.produce_block();
    handle.await.unwrap().unwrap();
    let view = solo.sync.current_view();
    assert_eq!(view.board.get(pos(0, 0)), Cell::X);
    assert_eq!(view.board.occupied(), 1);
    assert!(!solo.sync.move_in_flight());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_last_event_matches_cache_under_concurrent_polls() {
    let ledger = DevnetLedger::default();
    let phone = Player::new(1, &ledger, manual_config());
    let laptop = Player::with_signer(phone.signer.clone(), &ledger, manual_config());

    let session_id = create(&ledger, &phone, phone.id()).await;
    laptop.sync.join_session(session_id).await.unwrap();
    play(&ledger, &phone, 0, 0).await;

    let mut events = laptop.sync.subscribe();
    let sync = laptop.sync.clone();
    let submit = tokio::spawn(async move { sync.submit_move(1, 1).await });
    let polls: Vec<_> = (0..8)
        .map(|_| {
            let sync = laptop.sync.clone();
            tokio::spawn(async move {
                for _ in 0..4 {
                    sync.poll_once().await;
                }
            })
        })
        .collect();

    tokio::time::timeout(Duration::from_secs(5), async {
        while ledger.pending_calls() == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .unwrap();
    ledger.produce_block();
    submit.await.unwrap().unwrap();
    for poll in polls {
        poll.await.unwrap();
    }

    let mut last = None;
    loop {
        match events.try_recv() {
            Ok(event) => last = Some(event.view),
            Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
    assert_eq!(last, Some(laptop.sync.current_view()));
    assert_eq!(laptop.sync.current_view().board.occupied(), 2);
}
