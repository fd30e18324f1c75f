//! Status checks and step execution through the orchestrator.
//!
//! Run with:
//! ```bash
//! cargo test --package orchestrator --test lifecycle
//! ```


use setup::{Harness, ProofBehavior, SubmitOutcome, ARBITRUM_ONE, BROADCAST_HASH, OP_MAINNET};
use store::WithdrawalStore;
use withdrawal::{
    FlowError, ProbeSignal, RollupFamily, StepId, ValidationError, WithdrawalStatus,
};

#[tokio::test]
async fn test_create_captures_registry_addresses() {
    let harness = Harness::new();
    let record = harness.track(OP_MAINNET, 0x01).await;

    let rollup = harness.orchestrator.network().rollup(OP_MAINNET).unwrap();
    assert_eq!(record.rollup_family, RollupFamily::OpStack);
    assert_eq!(record.status, WithdrawalStatus::Initiated);
    assert_eq!(record.current_step, 1);
    assert_eq!(record.bridge_address, rollup.bridge);
    assert_eq!(record.portal_or_outbox_address, rollup.portal_or_outbox);
    assert_eq!(harness.store.get(record.id).await.unwrap(), Some(record));
}

#[tokio::test]
async fn test_create_rejects_invalid_input() {
    let harness = Harness::new();

    let mut request = setup::new_withdrawal(OP_MAINNET, 0x01);
    request.amount = "0".to_string();
    let err = harness.orchestrator.create_withdrawal(request).await.unwrap_err();
    assert!(matches!(
        err,
        FlowError::Validation(ValidationError::NonPositiveAmount)
    ));

    let mut request = setup::new_withdrawal(OP_MAINNET, 0x01);
    request.destination_chain_id = 11155111;
    let err = harness.orchestrator.create_withdrawal(request).await.unwrap_err();
    assert!(matches!(
        err,
        FlowError::Validation(ValidationError::DestinationMismatch { .. })
    ));

    assert!(harness.store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_saving_twice_keeps_one_record() {
    let harness = Harness::new();
    let first = harness.track(OP_MAINNET, 0x01).await;
    let advanced = harness.probe_with(&first, ProbeSignal::NotReady).await;

    // Same transaction, reported again later.
    let mut again = setup::new_withdrawal(OP_MAINNET, 0x01);
    again.initiated_at += 60;
    let second = harness.orchestrator.create_withdrawal(again).await.unwrap();

    assert_eq!(second, advanced);
    assert_eq!(harness.store.list().await.unwrap().len(), 1);

    // Same hash on another chain is another withdrawal.
    harness.track(ARBITRUM_ONE, 0x01).await;
    assert_eq!(harness.store.list().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_op_stack_probe_sequence() {
    let harness = Harness::new();
    let record = harness.track(OP_MAINNET, 0x01).await;

    let outcome = harness.orchestrator.check_status(record.id).await.unwrap();
    assert!(outcome.transitioned);
    assert_eq!(outcome.record.status, WithdrawalStatus::WaitingStateRoot);
    assert_eq!(outcome.record.current_step, 2);

    // NotReady again is not an exit condition of waiting_state_root.
    let outcome = harness.orchestrator.check_status(record.id).await.unwrap();
    assert!(!outcome.transitioned);
    assert_eq!(outcome.record.current_step, 2);

    let ready = harness.probe_with(&record, ProbeSignal::ReadyForNextStep).await;
    assert_eq!(ready.status, WithdrawalStatus::ReadyToProve);
    assert_eq!(ready.current_step, 3);
    assert!(ready.state_root_published_at.is_some());
}

#[tokio::test]
async fn test_arbitrum_heuristic_threshold() {
    let harness = Harness::new();
    let record = harness.track(ARBITRUM_ONE, 0x02).await;
    // Backend down: the block heuristic decides.
    harness.status.set(None);

    harness.blocks.advance_to(46_522);
    let outcome = harness.orchestrator.check_status(record.id).await.unwrap();
    let probe = outcome.probe.unwrap();
    assert_eq!(probe.signal, ProbeSignal::NotReady);
    assert_eq!(probe.source, "heuristic");
    assert_eq!(outcome.record.status, WithdrawalStatus::WaitingChallenge);

    harness.blocks.advance_to(46_524);
    let outcome = harness.orchestrator.check_status(record.id).await.unwrap();
    assert_eq!(outcome.probe.unwrap().signal, ProbeSignal::ChallengeElapsed);
    assert_eq!(outcome.record.status, WithdrawalStatus::ReadyToExecute);
    assert_eq!(outcome.record.current_step, 3);
}

#[tokio::test]
async fn test_failed_signal_is_side_terminal() {
    let harness = Harness::new();
    let record = harness.track(OP_MAINNET, 0x01).await;

    let failed = harness.probe_with(&record, ProbeSignal::Failed).await;
    assert_eq!(failed.status, WithdrawalStatus::Failed);
    assert_eq!(failed.current_step, 8);

    // Terminal records are not probed again.
    let calls = harness.status.calls();
    let outcome = harness.orchestrator.check_status(record.id).await.unwrap();
    assert!(outcome.probe.is_none());
    assert_eq!(harness.status.calls(), calls);
}

#[tokio::test]
async fn test_exhausted_probe_sets_last_error_only() {
    let harness = Harness::new();
    let record = harness.track(OP_MAINNET, 0x01).await;

    // Proven without a recorded deadline: the heuristic has nothing to go on.
    let mut proven = record.clone();
    proven.status = WithdrawalStatus::Proven;
    proven.current_step = 4;
    harness.store.upsert(proven).await.unwrap();
    harness.status.set(None);

    let err = harness.orchestrator.check_status(record.id).await.unwrap_err();
    assert!(matches!(err, FlowError::SourcesExhausted(_)));

    let stored = harness.store.get(record.id).await.unwrap().unwrap();
    assert_eq!(stored.status, WithdrawalStatus::Proven);
    assert_eq!(stored.current_step, 4);
    assert!(stored.last_error.unwrap().starts_with("all sources failed"));
    assert!(stored.last_error_at.is_some());
}

#[tokio::test]
async fn test_illegal_step_is_rejected_without_io() {
    let harness = Harness::new();
    let record = harness.track(OP_MAINNET, 0x01).await;

    for step in [StepId::Prove, StepId::Finalize, StepId::Execute] {
        let err = harness
            .orchestrator
            .execute_step(record.id, step)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FlowError::IllegalStep {
                status: WithdrawalStatus::Initiated,
                ..
            }
        ));
    }

    assert_eq!(harness.backend_proof.calls(), 0);
    assert_eq!(harness.explorer_proof.calls(), 0);
    assert_eq!(harness.submitter.submits(), 0);
    assert_eq!(harness.store.get(record.id).await.unwrap(), Some(record));
}

#[tokio::test]
async fn test_prove_then_finalize() {
    let harness = Harness::new();
    let record = harness.track(OP_MAINNET, 0x01).await;
    let record = harness.probe_with(&record, ProbeSignal::ReadyForNextStep).await;
    assert_eq!(record.status, WithdrawalStatus::ReadyToProve);

    let proven = harness
        .orchestrator
        .execute_step(record.id, StepId::Prove)
        .await
        .unwrap();
    assert_eq!(proven.status, WithdrawalStatus::Proven);
    assert_eq!(proven.current_step, 4);
    assert_eq!(proven.prove_tx_hash, Some(BROADCAST_HASH));
    let proven_at = proven.proven_at.unwrap();
    assert_eq!(proven.challenge_period_ends_at, Some(proven_at + 7 * 24 * 60 * 60));

    let waiting = harness.probe_with(&proven, ProbeSignal::NotReady).await;
    assert_eq!(waiting.status, WithdrawalStatus::WaitingChallenge);
    let ready = harness.probe_with(&proven, ProbeSignal::ChallengeElapsed).await;
    assert_eq!(ready.status, WithdrawalStatus::ReadyToFinalize);

    let finalized = harness
        .orchestrator
        .execute_step(record.id, StepId::Finalize)
        .await
        .unwrap();
    assert_eq!(finalized.status, WithdrawalStatus::Finalized);
    assert_eq!(finalized.current_step, 7);
    assert_eq!(finalized.finalize_tx_hash, Some(BROADCAST_HASH));
    assert!(finalized.finalized_at.is_some());
    assert_eq!(harness.submitter.submits(), 2);
    assert_eq!(harness.submitter.confirms(), 2);
}

#[tokio::test]
async fn test_arbitrum_execute_reaches_completed() {
    let harness = Harness::new();
    let record = harness.track(ARBITRUM_ONE, 0x02).await;
    let record = harness.probe_with(&record, ProbeSignal::ChallengeElapsed).await;
    assert_eq!(record.status, WithdrawalStatus::ReadyToExecute);

    let completed = harness
        .orchestrator
        .execute_step(record.id, StepId::Execute)
        .await
        .unwrap();
    assert_eq!(completed.status, WithdrawalStatus::Completed);
    assert_eq!(completed.current_step, 5);
    assert_eq!(completed.finalize_tx_hash, Some(BROADCAST_HASH));
}

#[tokio::test]
async fn test_reverted_execution_stays_executing() {
    let harness = Harness::new();
    let record = harness.track(ARBITRUM_ONE, 0x02).await;
    let record = harness.probe_with(&record, ProbeSignal::ChallengeElapsed).await;
    harness.submitter.set(SubmitOutcome::Reverted);

    let err = harness
        .orchestrator
        .execute_step(record.id, StepId::Execute)
        .await
        .unwrap_err();
    assert!(matches!(err, FlowError::Reverted(hash) if hash == BROADCAST_HASH));

    // The broadcast was recorded before the receipt arrived.
    let stored = harness.store.get(record.id).await.unwrap().unwrap();
    assert_eq!(stored.status, WithdrawalStatus::Executing);
    assert_eq!(stored.finalize_tx_hash, Some(BROADCAST_HASH));
    assert!(stored.last_error.unwrap().contains("reverted"));
}

#[tokio::test(start_paused = true)]
async fn test_proof_timeout_then_explorer_404() {
    let harness = Harness::new();
    let record = harness.track(OP_MAINNET, 0x01).await;
    let record = harness.probe_with(&record, ProbeSignal::ReadyForNextStep).await;

    harness.backend_proof.set(ProofBehavior::Hang);
    harness
        .explorer_proof
        .set(ProofBehavior::Fail("returned 404: not found"));

    let err = harness
        .orchestrator
        .execute_step(record.id, StepId::Prove)
        .await
        .unwrap_err();
    assert!(matches!(err, FlowError::SourcesExhausted(ref attempts) if attempts.len() == 2));

    let stored = harness.store.get(record.id).await.unwrap().unwrap();
    assert_eq!(stored.status, WithdrawalStatus::ReadyToProve);
    assert_eq!(stored.current_step, 3);
    assert_eq!(stored.prove_tx_hash, None);
    assert_eq!(
        stored.last_error.as_deref(),
        Some(
            "all sources failed: backend: backend unavailable: timed out; \
             explorer: explorer unavailable: returned 404: not found"
        )
    );
    assert_eq!(harness.submitter.submits(), 0);
}

#[tokio::test]
async fn test_explorer_fallback_supplies_proof() {
    let harness = Harness::new();
    let record = harness.track(ARBITRUM_ONE, 0x02).await;
    let record = harness.probe_with(&record, ProbeSignal::ChallengeElapsed).await;
    harness.backend_proof.set(ProofBehavior::Fail("returned 503: unavailable"));

    let completed = harness
        .orchestrator
        .execute_step(record.id, StepId::Execute)
        .await
        .unwrap();
    assert_eq!(completed.status, WithdrawalStatus::Completed);
    assert_eq!(harness.explorer_proof.calls(), 1);
}

#[tokio::test]
async fn test_user_rejection_changes_nothing() {
    let harness = Harness::new();
    let record = harness.track(OP_MAINNET, 0x01).await;
    let record = harness.probe_with(&record, ProbeSignal::ReadyForNextStep).await;
    harness.submitter.set(SubmitOutcome::Rejected);

    let err = harness
        .orchestrator
        .execute_step(record.id, StepId::Prove)
        .await
        .unwrap_err();
    assert!(matches!(err, FlowError::UserRejected));
    assert_eq!(harness.store.get(record.id).await.unwrap(), Some(record));
}

#[tokio::test]
async fn test_already_executed_advances_without_retry() {
    let harness = Harness::new();
    let record = harness.track(OP_MAINNET, 0x01).await;
    let record = harness.probe_with(&record, ProbeSignal::ReadyForNextStep).await;
    harness.submitter.set(SubmitOutcome::AlreadyExecuted);

    let err = harness
        .orchestrator
        .execute_step(record.id, StepId::Prove)
        .await
        .unwrap_err();
    assert!(err.is_terminal());

    let stored = harness.store.get(record.id).await.unwrap().unwrap();
    assert_eq!(stored.status, WithdrawalStatus::Proven);
    assert_eq!(harness.submitter.confirms(), 0);

    // Proving again is no longer a legal step.
    let err = harness
        .orchestrator
        .execute_step(record.id, StepId::Prove)
        .await
        .unwrap_err();
    assert!(matches!(err, FlowError::IllegalStep { .. }));
    assert_eq!(harness.submitter.submits(), 1);
}

#[tokio::test]
async fn test_unknown_record() {
    let harness = Harness::new();
    let id = withdrawal::RecordId::repeat_byte(0x99);

    assert!(matches!(
        harness.orchestrator.check_status(id).await,
        Err(FlowError::NotFound(_))
    ));
    assert!(matches!(
        harness.orchestrator.execute_step(id, StepId::Prove).await,
        Err(FlowError::NotFound(_))
    ));
}
