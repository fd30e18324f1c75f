//! Withdrawal flow orchestrator.
//!
//! [`Orchestrator`] owns the local view of the tracked withdrawals and drives
//! each one through its rollup family's flow: probe, transition, persist, and
//! on demand fetch a proof and submit the next L1 step. Every status change
//! goes through the transition engine and is written to the local store before
//! being mirrored remotely.

pub mod config;
pub mod events;
pub mod metrics;
pub mod scheduler;
pub mod wiring;

use crate::metrics::Metrics;
use ::config::NetworkConfig;
use alloy_primitives::Address;
use rollup::FlowRegistry;
use std::{
    sync::Arc,
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};
use store::{StoreError, SyncService, WithdrawalStore};
use tokio::{
    sync::RwLock,
    task::JoinSet,
};
use tracing::{debug, error, info, warn};
use withdrawal::{
    transition, FlowError, NewWithdrawal, ProbeResult, ProbeSignal, RecordId, StepId, Trigger,
    TransitionContext, WithdrawalPatch, WithdrawalRecord, WithdrawalStatus,
};

/// Challenge period assumed for records of chains missing from the registry.
const DEFAULT_CHALLENGE_PERIOD_SECS: u64 = 7 * 24 * 60 * 60;

/// Current unix time in seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

fn store_error(e: StoreError) -> FlowError {
    FlowError::Store(e.to_string())
}

/// Result of a single status check.
#[derive(Debug, Clone)]
pub struct CheckOutcome {
    /// The record after the check.
    pub record: WithdrawalRecord,
    /// What the status chain answered; `None` for terminal records.
    pub probe: Option<ProbeResult>,
    /// Whether the check moved the record forward.
    pub transitioned: bool,
}

/// Counts of one probe sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub checked: usize,
    pub transitioned: usize,
    pub failed: usize,
}

pub struct Orchestrator {
    sync: SyncService,
    flows: FlowRegistry,
    network: Arc<NetworkConfig>,
    metrics: Metrics,
    owner: RwLock<Address>,
}

impl Orchestrator {
    pub fn new(
        sync: SyncService,
        flows: FlowRegistry,
        network: Arc<NetworkConfig>,
        owner: Address,
    ) -> Self {
        Self {
            sync,
            flows,
            network,
            metrics: Metrics::new(),
            owner: RwLock::new(owner),
        }
    }

    fn local(&self) -> &Arc<dyn WithdrawalStore> {
        self.sync.local()
    }

    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    pub async fn owner(&self) -> Address {
        *self.owner.read().await
    }

    /// Switch the address whose withdrawals are loaded and swept.
    pub async fn set_owner(&self, owner: Address) {
        let mut current = self.owner.write().await;
        if *current != owner {
            info!(from = %*current, to = %owner, "Switched owner");
            *current = owner;
        }
    }

    pub async fn get(&self, id: RecordId) -> Result<WithdrawalRecord, FlowError> {
        self.local()
            .get(id)
            .await
            .map_err(store_error)?
            .ok_or(FlowError::NotFound(id))
    }

    /// The current owner's records.
    pub async fn list(&self) -> Result<Vec<WithdrawalRecord>, FlowError> {
        let owner = self.owner().await;
        self.local()
            .list_by_owner(owner)
            .await
            .map_err(store_error)
    }

    /// Validate and store a newly initiated withdrawal.
    ///
    /// Saving a withdrawal that is already tracked returns the stored record
    /// untouched.
    pub async fn create_withdrawal(
        &self,
        request: NewWithdrawal,
    ) -> Result<WithdrawalRecord, FlowError> {
        let record = request.into_record(&self.network)?;

        let _guard = self.sync.write_lock().lock().await;
        if let Some(existing) = self.local().find(record.key()).await.map_err(store_error)? {
            debug!(withdrawal_id = %existing.id, "Withdrawal already tracked");
            return Ok(existing);
        }

        self.local()
            .upsert(record.clone())
            .await
            .map_err(store_error)?;
        self.sync.mirror(record.clone());

        info!(
            withdrawal_id = %record.id,
            tx_hash = %record.transaction_hash,
            family = record.rollup_family.as_str(),
            chain_id = record.source_chain_id,
            "Tracking new withdrawal"
        );
        self.metrics.record_transition(record.status);

        Ok(record)
    }

    /// Probe a withdrawal and persist the transition the answer implies.
    ///
    /// An exhausted status chain only sets `lastError`.
    pub async fn check_status(&self, id: RecordId) -> Result<CheckOutcome, FlowError> {
        let record = self.get(id).await?;
        if record.status.is_terminal() {
            return Ok(CheckOutcome {
                record,
                probe: None,
                transitioned: false,
            });
        }

        let flow = self.flows.get(record.rollup_family)?;
        let probe = match flow.probe(&record, unix_now()).await {
            Ok(probe) => probe,
            Err(e) => {
                self.metrics.record_probe_exhausted();
                error!(withdrawal_id = %id, error = %e, "Status check failed");
                self.record_error(id, &e).await?;
                return Err(e);
            }
        };
        self.metrics.record_probe(&probe.source, probe.signal);

        let updated = self
            .apply(id, Some(record.status), Trigger::Probe(probe.signal))
            .await?;

        Ok(match updated {
            Some(record) => CheckOutcome {
                record,
                probe: Some(probe),
                transitioned: true,
            },
            None => CheckOutcome {
                record: self.get(id).await?,
                probe: Some(probe),
                transitioned: false,
            },
        })
    }

    /// Execute a user-triggered L1 step.
    ///
    /// The step is checked against the current status before any network
    /// call. A failure leaves the status untouched and sets `lastError`,
    /// except a signer rejection which changes nothing.
    pub async fn execute_step(
        &self,
        id: RecordId,
        step: StepId,
    ) -> Result<WithdrawalRecord, FlowError> {
        let record = self.get(id).await?;
        if !step.is_legal(record.rollup_family, record.status) {
            return Err(FlowError::IllegalStep {
                step,
                status: record.status,
            });
        }
        let flow = self.flows.get(record.rollup_family)?;

        let submitted = async {
            let proof = flow.fetch_proof(&record, step).await?;
            let tx_hash = flow.submit(&record, step, &proof).await?;
            info!(withdrawal_id = %id, step = step.as_str(), %tx_hash, "Broadcast L1 transaction");

            self.apply(id, None, Trigger::Broadcast { step, tx_hash })
                .await?;
            flow.confirm(&record, step, tx_hash).await
        }
        .await;

        let tx_hash = match submitted {
            Ok(tx_hash) => tx_hash,
            Err(e) => return Err(self.fail_step(id, step, e).await),
        };

        self.apply(id, None, Trigger::Submitted { step, tx_hash })
            .await?;
        self.metrics.record_step_success(step);
        info!(withdrawal_id = %id, step = step.as_str(), %tx_hash, "Step confirmed");

        self.get(id).await
    }

    async fn fail_step(&self, id: RecordId, step: StepId, err: FlowError) -> FlowError {
        let bookkeeping = match &err {
            FlowError::UserRejected => {
                warn!(withdrawal_id = %id, step = step.as_str(), "Signer rejected the step");
                self.metrics.record_step_failure(step, "rejected");
                Ok(())
            }
            FlowError::AlreadyExecuted(_) => {
                warn!(withdrawal_id = %id, step = step.as_str(), "Step already executed on L1");
                self.metrics.record_step_failure(step, "already_executed");
                self.apply(id, None, Trigger::Probe(ProbeSignal::AlreadyExecuted))
                    .await
                    .map(|_| ())
            }
            e => {
                error!(withdrawal_id = %id, step = step.as_str(), error = %e, "Step failed");
                self.metrics.record_step_failure(step, "error");
                self.record_error(id, e).await
            }
        };

        if let Err(e) = bookkeeping {
            warn!(withdrawal_id = %id, error = %e, "Failed to record step failure");
        }
        err
    }

    /// Re-read the record and apply whatever `trigger` implies for it now.
    ///
    /// With `observed` set, the trigger is dropped when the status moved since
    /// the observation was made.
    async fn apply(
        &self,
        id: RecordId,
        observed: Option<WithdrawalStatus>,
        trigger: Trigger,
    ) -> Result<Option<WithdrawalRecord>, FlowError> {
        let _guard = self.sync.write_lock().lock().await;
        let current = self.get(id).await?;

        if observed.is_some_and(|status| status != current.status) {
            debug!(
                withdrawal_id = %id,
                status = current.status.as_str(),
                "Status moved while probing, discarding result"
            );
            return Ok(None);
        }

        let ctx = TransitionContext {
            now: unix_now(),
            challenge_period_secs: self
                .network
                .rollup(current.source_chain_id)
                .map_or(DEFAULT_CHALLENGE_PERIOD_SECS, |r| r.challenge_period_secs),
        };
        let Some(patch) = transition(&current, trigger, ctx) else {
            return Ok(None);
        };

        let next = current.apply(&patch);
        self.local()
            .upsert(next.clone())
            .await
            .map_err(store_error)?;
        self.sync.mirror(next.clone());
        self.metrics.record_transition(next.status);

        info!(
            withdrawal_id = %id,
            from = current.status.as_str(),
            to = next.status.as_str(),
            step = next.current_step,
            "Withdrawal advanced"
        );
        Ok(Some(next))
    }

    async fn record_error(&self, id: RecordId, err: &FlowError) -> Result<(), FlowError> {
        let _guard = self.sync.write_lock().lock().await;
        let current = self.get(id).await?;
        let next = current.apply(&WithdrawalPatch::error(err.to_string(), unix_now()));

        self.local()
            .upsert(next.clone())
            .await
            .map_err(store_error)?;
        self.sync.mirror(next);
        Ok(())
    }

    /// Stop tracking a withdrawal, here and on the remote mirror.
    pub async fn delete(&self, id: RecordId) -> Result<Option<WithdrawalRecord>, FlowError> {
        let removed = self.sync.delete(id).await.map_err(store_error)?;
        if removed.is_some() {
            info!(withdrawal_id = %id, "Deleted withdrawal");
        }
        Ok(removed)
    }

    /// Merge the owner's local and remote records and refresh the local view.
    pub async fn sync(&self) -> Result<Vec<WithdrawalRecord>, FlowError> {
        let started = Instant::now();
        let owner = self.owner().await;

        let report = match self.sync.sync(owner).await {
            Ok(report) => report,
            Err(e) => {
                self.metrics.record_sync_failure();
                warn!(%owner, error = %e, "Sync failed");
                return Err(store_error(e));
            }
        };

        self.record_status_counts(&report.merged);
        self.metrics.record_sweep("sync", started.elapsed());
        Ok(report.merged)
    }

    /// Check every record of the owner that is waiting on the protocol, one
    /// task per record.
    pub async fn probe_sweep(self: &Arc<Self>) -> Result<SweepReport, FlowError> {
        let started = Instant::now();
        let records = self.list().await?;
        self.record_status_counts(&records);

        let mut tasks = JoinSet::new();
        for record in records.into_iter().filter(|r| r.status.is_waiting()) {
            let orchestrator = Arc::clone(self);
            tasks.spawn(async move { orchestrator.check_status(record.id).await });
        }

        let mut report = SweepReport::default();
        while let Some(joined) = tasks.join_next().await {
            report.checked += 1;
            match joined {
                Ok(Ok(outcome)) if outcome.transitioned => report.transitioned += 1,
                Ok(Ok(_)) => {}
                Ok(Err(_)) => report.failed += 1,
                Err(e) => {
                    report.failed += 1;
                    error!(error = %e, "Status check task panicked");
                }
            }
        }

        let elapsed = started.elapsed();
        self.metrics.record_sweep("probe", elapsed);
        debug!(
            checked = report.checked,
            transitioned = report.transitioned,
            failed = report.failed,
            elapsed_ms = elapsed.as_millis() as u64,
            "Probe sweep done"
        );
        Ok(report)
    }

    fn record_status_counts(&self, records: &[WithdrawalRecord]) {
        self.metrics.set_status_counts(records);
    }
}

/// Intervals of the two background loops.
#[derive(Debug, Clone, Copy)]
pub struct SweepIntervals {
    pub sync: Duration,
    pub probe: Duration,
}

impl Default for SweepIntervals {
    fn default() -> Self {
        Self {
            sync: Duration::from_secs(30),
            probe: Duration::from_secs(60),
        }
    }
}
