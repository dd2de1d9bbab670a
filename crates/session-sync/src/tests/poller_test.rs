//! Background polling

use ledger_client::DevnetLedger;
use std::time::Duration;

use super::*;
use crate::{Cell, ChangeCause, GameStatus, Position, Reconciliation, SyncConfig};

fn polling_config() -> SyncConfig {
    SyncConfig {
        poll_interval_ms: 100,
        auto_poll: true,
        ..Default::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_poller_picks_up_opponent_move() {
    let ledger = DevnetLedger::default();
    let alice = Player::new(1, &ledger, manual_config());
    let bob = Player::new(2, &ledger, polling_config());

    let session_id = create(&ledger, &alice, bob.id()).await;
    bob.sync.join_session(session_id).await.unwrap();
    assert!(bob.sync.is_polling());
    let mut events = bob.sync.subscribe();

    play(&ledger, &alice, 0, 0).await;

    let view = tokio::time::timeout(Duration::from_secs(1), async {
        loop {
            let event = events.recv().await.unwrap();
            if event.cause == ChangeCause::Reconciled(Reconciliation::Adopted) {
                return event.view;
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(view.board.get(Position::new(0, 0).unwrap()), Cell::X);
    assert_eq!(bob.sync.current_view(), view);

    bob.sync.detach();
    assert!(!bob.sync.is_polling());
}

#[tokio::test(start_paused = true)]
async fn test_poller_absorbs_fetch_errors() {
    let ledger = DevnetLedger::default();
    let alice = Player::new(1, &ledger, manual_config());
    let bob = Player::new(2, &ledger, polling_config());

    let session_id = create(&ledger, &alice, bob.id()).await;
    bob.sync.join_session(session_id).await.unwrap();
    play(&ledger, &alice, 1, 1).await;

    ledger.fail_next_fetches(3);
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(bob.sync.current_view().board.occupied(), 0);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(bob.sync.current_view().board.occupied(), 1);
    assert!(bob.sync.is_polling());
}

#[tokio::test(start_paused = true)]
async fn test_poller_exits_after_finish() {
    let ledger = DevnetLedger::default();
    let solo = Player::new(1, &ledger, polling_config());
    create(&ledger, &solo, solo.id()).await;
    assert!(solo.sync.is_polling());

    for (row, col) in [(0, 0), (1, 0), (0, 1), (1, 1), (0, 2)] {
        play(&ledger, &solo, row, col).await;
    }
    assert_eq!(solo.sync.current_view().status, GameStatus::XWins);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!solo.sync.is_polling());
    assert!(!solo.sync.start_polling());
}

#[tokio::test(start_paused = true)]
async fn test_manual_start_and_stop() {
    let ledger = DevnetLedger::default();
    let alice = Player::new(1, &ledger, manual_config());
    assert!(!alice.sync.start_polling());

    create(&ledger, &alice, alice.id()).await;
    assert!(!alice.sync.is_polling());
    assert!(alice.sync.start_polling());
    assert!(alice.sync.is_polling());

    alice.sync.stop_polling();
    assert!(!alice.sync.is_polling());
}
