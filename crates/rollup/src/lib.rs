//! Per-family withdrawal strategies.
//!
//! Each rollup family answers three questions through a [`RollupFlow`]: what
//! state is a withdrawal in ([`ProbeChain`]), what proof does the next L1 step
//! need ([`ProofChain`]), and how is that step submitted ([`Submitter`]).
//! [`FlowRegistry`] maps a record's family to its flow.

pub mod arbitrum;
pub mod chain;
pub mod heuristic;
pub mod opstack;
pub mod sources;

use action::ActionError;
use alloy_primitives::TxHash;
use alloy_provider::Provider;
use alloy_rpc_types_eth::TransactionReceipt;
use async_trait::async_trait;
pub use chain::{Observation, ProbeChain, ProofChain, ProofSource, StatusSource};
use client::SignerError;
pub use heuristic::{HeuristicStatus, L2Blocks, RpcL2Blocks};
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio_retry::{strategy::ExponentialBackoff, Retry};
use tracing::warn;
use withdrawal::{FlowError, ProbeResult, ProofBlob, RollupFamily, StepId, WithdrawalRecord};

/// The `{probe, fetch proof, submit}` strategy of one rollup family.
#[async_trait]
pub trait RollupFlow: Send + Sync {
    fn family(&self) -> RollupFamily;

    async fn probe(&self, record: &WithdrawalRecord, now: u64) -> Result<ProbeResult, FlowError>;

    async fn fetch_proof(
        &self,
        record: &WithdrawalRecord,
        step: StepId,
    ) -> Result<ProofBlob, FlowError>;

    /// Broadcast the step's L1 transaction, returning its hash.
    async fn submit(
        &self,
        record: &WithdrawalRecord,
        step: StepId,
        proof: &ProofBlob,
    ) -> Result<TxHash, FlowError>;

    /// Wait for a broadcast transaction to be included successfully.
    async fn confirm(
        &self,
        record: &WithdrawalRecord,
        step: StepId,
        tx_hash: TxHash,
    ) -> Result<TxHash, FlowError>;
}

/// L1 submission half of a flow.
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(
        &self,
        record: &WithdrawalRecord,
        step: StepId,
        proof: &ProofBlob,
    ) -> Result<TxHash, FlowError>;

    async fn confirm(&self, step: StepId, tx_hash: TxHash) -> Result<TxHash, FlowError>;
}

/// A flow assembled from a status chain, a proof chain and a submitter.
pub struct StrategyFlow {
    family: RollupFamily,
    status: ProbeChain,
    proofs: ProofChain,
    submitter: Arc<dyn Submitter>,
}

impl StrategyFlow {
    pub fn new(
        family: RollupFamily,
        status: ProbeChain,
        proofs: ProofChain,
        submitter: Arc<dyn Submitter>,
    ) -> Self {
        Self {
            family,
            status,
            proofs,
            submitter,
        }
    }
}

#[async_trait]
impl RollupFlow for StrategyFlow {
    fn family(&self) -> RollupFamily {
        self.family
    }

    async fn probe(&self, record: &WithdrawalRecord, now: u64) -> Result<ProbeResult, FlowError> {
        self.status.probe(record, now).await
    }

    async fn fetch_proof(
        &self,
        record: &WithdrawalRecord,
        step: StepId,
    ) -> Result<ProofBlob, FlowError> {
        self.proofs.fetch(record, step).await
    }

    async fn submit(
        &self,
        record: &WithdrawalRecord,
        step: StepId,
        proof: &ProofBlob,
    ) -> Result<TxHash, FlowError> {
        self.submitter.submit(record, step, proof).await
    }

    async fn confirm(
        &self,
        _record: &WithdrawalRecord,
        step: StepId,
        tx_hash: TxHash,
    ) -> Result<TxHash, FlowError> {
        self.submitter.confirm(step, tx_hash).await
    }
}

/// Lookup table from rollup family to its flow.
#[derive(Clone, Default)]
pub struct FlowRegistry {
    flows: HashMap<RollupFamily, Arc<dyn RollupFlow>>,
}

impl FlowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `flow` for its family, replacing any previous one.
    pub fn with(mut self, flow: Arc<dyn RollupFlow>) -> Self {
        self.flows.insert(flow.family(), flow);
        self
    }

    pub fn get(&self, family: RollupFamily) -> Result<Arc<dyn RollupFlow>, FlowError> {
        self.flows
            .get(&family)
            .cloned()
            .ok_or(FlowError::UnsupportedFamily(family))
    }

    pub fn families(&self) -> Vec<RollupFamily> {
        let mut families: Vec<_> = self.flows.keys().copied().collect();
        families.sort();
        families
    }
}

/// L1 and per-chain L2 RPC providers.
#[derive(Clone)]
pub struct Providers<P> {
    pub l1: P,
    pub l2: HashMap<u64, P>,
}

impl<P> Providers<P> {
    pub fn l2(&self, chain_id: u64, origin: &'static str) -> Result<&P, FlowError> {
        self.l2.get(&chain_id).ok_or_else(|| {
            FlowError::transient(origin, format!("no RPC configured for chain {chain_id}"))
        })
    }
}

/// Map a submission failure onto the error taxonomy.
pub fn classify_submission(step: StepId, report: eyre::Report) -> FlowError {
    if SignerError::is_user_rejection(&report) {
        return FlowError::UserRejected;
    }
    match report.downcast_ref::<ActionError>() {
        Some(ActionError::AlreadyCompleted) => FlowError::AlreadyExecuted(step),
        Some(ActionError::Reverted(tx_hash)) => FlowError::Reverted(*tx_hash),
        None => FlowError::Submission(format!("{report:#}")),
    }
}

/// Receipt of the initiating L2 transaction, with a few short retries.
pub(crate) async fn l2_receipt<P>(
    provider: &P,
    tx_hash: TxHash,
    origin: &'static str,
) -> Result<TransactionReceipt, FlowError>
where
    P: Provider,
{
    // 100ms, 200ms, 400ms
    let retry_strategy = ExponentialBackoff::from_millis(100)
        .max_delay(Duration::from_secs(1))
        .take(3);

    Retry::spawn(retry_strategy, || async {
        provider.get_transaction_receipt(tx_hash).await.map_err(|e| {
            warn!(%tx_hash, error = %e, "Receipt read failed, will retry");
            e
        })
    })
    .await
    .map_err(|e| FlowError::transient(origin, e))?
    .ok_or_else(|| FlowError::transient(origin, format!("no receipt for {tx_hash}")))
}
