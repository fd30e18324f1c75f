//! Background sweeps and wallet events.
//!
//! Run with:
//! ```bash
//! cargo test --package orchestrator --test scheduler
//! ```


use alloy_primitives::Address;
use orchestrator::{
    events::{self, WalletEvent},
    scheduler::Scheduler,
    SweepIntervals, SweepReport,
};
use setup::{FakeRemote, Harness, ARBITRUM_ONE, OP_MAINNET};
use std::{sync::Arc, time::Duration};
use store::{RemoteStore, WithdrawalStore};
use withdrawal::{ProbeSignal, RecordId, WithdrawalStatus};

async fn status_of(harness: &Harness, id: RecordId) -> WithdrawalStatus {
    harness.store.get(id).await.unwrap().unwrap().status
}

#[tokio::test]
async fn test_sweep_only_probes_waiting_records() {
    let harness = Harness::new();
    let waiting = harness.track(OP_MAINNET, 0x01).await;
    let ready = harness.track(ARBITRUM_ONE, 0x02).await;
    let ready = harness
        .probe_with(&ready, ProbeSignal::ChallengeElapsed)
        .await;
    assert_eq!(ready.status, WithdrawalStatus::ReadyToExecute);
    harness.status.set(Some(ProbeSignal::NotReady));
    let calls = harness.status.calls();

    let report = harness.orchestrator.probe_sweep().await.unwrap();
    assert_eq!(
        report,
        SweepReport {
            checked: 1,
            transitioned: 1,
            failed: 0,
        }
    );
    assert_eq!(harness.status.calls(), calls + 1);
    assert_eq!(
        status_of(&harness, waiting.id).await,
        WithdrawalStatus::WaitingStateRoot
    );
    assert_eq!(
        status_of(&harness, ready.id).await,
        WithdrawalStatus::ReadyToExecute
    );
}

#[tokio::test]
async fn test_sweep_counts_failures_per_record() {
    let harness = Harness::new();
    let record = harness.track(OP_MAINNET, 0x01).await;
    harness.track(ARBITRUM_ONE, 0x02).await;

    // Backend down: the heuristic still answers for the Arbitrum record, not
    // for a proven record without a deadline.
    harness.status.set(None);
    let mut proven = record.clone();
    proven.status = WithdrawalStatus::Proven;
    proven.current_step = 4;
    harness.store.upsert(proven).await.unwrap();

    let report = harness.orchestrator.probe_sweep().await.unwrap();
    assert_eq!(report.checked, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.transitioned, 1);
}

#[tokio::test(start_paused = true)]
async fn test_probe_loop_runs_every_minute() {
    let harness = Harness::new();
    let record = harness.track(OP_MAINNET, 0x01).await;
    let (_events, events_rx) = events::channel();
    let scheduler = Scheduler::new(Arc::clone(&harness.orchestrator), SweepIntervals::default())
        .spawn(events_rx);

    // Both loops fire once on start.
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(
        status_of(&harness, record.id).await,
        WithdrawalStatus::WaitingStateRoot
    );

    harness.status.set(Some(ProbeSignal::ReadyForNextStep));
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(
        status_of(&harness, record.id).await,
        WithdrawalStatus::WaitingStateRoot
    );

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(
        status_of(&harness, record.id).await,
        WithdrawalStatus::ReadyToProve
    );

    scheduler.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_refresh_probes_immediately() {
    let harness = Harness::new();
    let record = harness.track(ARBITRUM_ONE, 0x02).await;
    let (events, events_rx) = events::channel();
    let scheduler = Scheduler::new(Arc::clone(&harness.orchestrator), SweepIntervals::default())
        .spawn(events_rx);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(
        status_of(&harness, record.id).await,
        WithdrawalStatus::WaitingChallenge
    );

    harness.status.set(Some(ProbeSignal::ChallengeElapsed));
    events.send(WalletEvent::Refresh).await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(
        status_of(&harness, record.id).await,
        WithdrawalStatus::ReadyToExecute
    );

    scheduler.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_account_change_loads_new_owner() {
    let other = Address::repeat_byte(0x22);
    let seed = Harness::new();
    let foreign = seed
        .orchestrator
        .create_withdrawal(withdrawal::NewWithdrawal {
            from: other,
            ..setup::new_withdrawal(OP_MAINNET, 0x05)
        })
        .await
        .unwrap();
    let remote = FakeRemote::with_records(vec![foreign.clone()]);

    let harness = Harness::with_remote(Some(remote as Arc<dyn RemoteStore>));
    let (events, events_rx) = events::channel();
    let scheduler = Scheduler::new(Arc::clone(&harness.orchestrator), SweepIntervals::default())
        .spawn(events_rx);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(harness.store.get(foreign.id).await.unwrap().is_none());

    events
        .send(WalletEvent::AccountChanged(other))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(harness.orchestrator.owner().await, other);
    // Synced in and probed straight away.
    assert_eq!(
        status_of(&harness, foreign.id).await,
        WithdrawalStatus::WaitingStateRoot
    );

    scheduler.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_sweeps() {
    let harness = Harness::new();
    let record = harness.track(OP_MAINNET, 0x01).await;
    let (_events, events_rx) = events::channel();
    let scheduler = Scheduler::new(Arc::clone(&harness.orchestrator), SweepIntervals::default())
        .spawn(events_rx);
    tokio::time::sleep(Duration::from_secs(1)).await;
    scheduler.shutdown().await;

    let calls = harness.status.calls();
    harness.status.set(Some(ProbeSignal::ReadyForNextStep));
    tokio::time::sleep(Duration::from_secs(300)).await;

    assert_eq!(harness.status.calls(), calls);
    assert_eq!(
        status_of(&harness, record.id).await,
        WithdrawalStatus::WaitingStateRoot
    );
}
