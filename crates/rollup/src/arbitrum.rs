//! Arbitrum strategy: assertion confirmation, then outbox execution.

use crate::{
    chain::{Observation, ProbeChain, ProofChain, StatusSource},
    classify_submission, l2_receipt, Providers, StrategyFlow, Submitter,
};
use action::{
    execute::{Execute, ExecuteAction},
    Action, SignerFn,
};
use alloy_primitives::{Address, TxHash, U256};
use alloy_provider::Provider;
use alloy_rpc_types_eth::TransactionReceipt;
use alloy_sol_types::SolEvent;
use async_trait::async_trait;
use backend::StatusResponse;
use binding::arbitrum::{IArbSys, IOutbox, IRollupCore};
use config::{NetworkConfig, ProposalRegistry};
use std::{sync::Arc, time::Duration};
use tracing::debug;
use withdrawal::{
    proof::ProofError, Confidence, FlowError, ProbeSignal, ProofBlob, RollupFamily, StepId,
    WithdrawalRecord, WithdrawalStatus,
};

const RPC: &str = "rpc";

/// Outbox message status as reported by the Arbitrum SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MessageStatus {
    Unconfirmed,
    Confirmed,
    Executed,
}

impl MessageStatus {
    fn from_response(response: &StatusResponse) -> Option<Self> {
        match response.status_code {
            Some(0) => return Some(Self::Unconfirmed),
            Some(1) => return Some(Self::Confirmed),
            Some(2) => return Some(Self::Executed),
            _ => {}
        }
        match response.status.as_deref()? {
            "unconfirmed" => Some(Self::Unconfirmed),
            "confirmed" => Some(Self::Confirmed),
            "executed" => Some(Self::Executed),
            _ => None,
        }
    }
}

/// Interpret the backend's `/api/arbitrum/status` answer for a record in `status`.
pub fn status_observation(status: WithdrawalStatus, response: &StatusResponse) -> Observation {
    use WithdrawalStatus::*;

    if matches!(response.status.as_deref(), Some("failed" | "reverted")) {
        return Observation::new(ProbeSignal::Failed, "backend reports the withdrawal failed");
    }

    let message = MessageStatus::from_response(response).or_else(|| {
        // Readiness flag only: ready means confirmed.
        response.ready.then_some(MessageStatus::Confirmed)
    });

    let signal = match (status, message) {
        (Initiated | WaitingChallenge, Some(MessageStatus::Confirmed | MessageStatus::Executed)) => {
            ProbeSignal::ChallengeElapsed
        }
        (ReadyToExecute | Executing, Some(MessageStatus::Executed)) => ProbeSignal::AlreadyExecuted,
        _ => ProbeSignal::NotReady,
    };

    Observation::new(signal, format!("backend reports {message:?}"))
}

/// Direct L1 reads. Medium confidence.
///
/// The `L2ToL1Tx` event of the initiating receipt gives the outbox position
/// and the L1 block the message was sent at; the message is executable once
/// the rollup's confirm period has passed on L1, and spent once the outbox
/// marks its position.
pub struct ArbitrumRpcStatus<P> {
    providers: Providers<P>,
    network: Arc<NetworkConfig>,
}

impl<P> ArbitrumRpcStatus<P>
where
    P: Provider + Clone,
{
    pub const fn new(providers: Providers<P>, network: Arc<NetworkConfig>) -> Self {
        Self { providers, network }
    }

    async fn confirm_period_blocks(&self, chain_id: u64) -> Result<u64, FlowError> {
        let rollup = self
            .network
            .rollup(chain_id)
            .ok_or_else(|| FlowError::transient(RPC, format!("unknown chain {chain_id}")))?;
        let ProposalRegistry::RollupCore { address } = rollup.proposals else {
            return Err(FlowError::transient(
                RPC,
                format!("{} has no rollup core", rollup.name),
            ));
        };

        IRollupCore::new(address, &self.providers.l1)
            .confirmPeriodBlocks()
            .call()
            .await
            .map_err(|e| FlowError::transient(RPC, e))
    }

    async fn is_spent(&self, outbox: Address, position: U256) -> Result<bool, FlowError> {
        IOutbox::new(outbox, &self.providers.l1)
            .isSpent(position)
            .call()
            .await
            .map_err(|e| FlowError::transient(RPC, e))
    }
}

/// `(position, ethBlockNum)` of the first `L2ToL1Tx` in the receipt.
fn l2_to_l1_message(receipt: &TransactionReceipt) -> Option<(U256, u64)> {
    receipt.logs().iter().find_map(|log| {
        IArbSys::L2ToL1Tx::decode_log(&log.inner).ok().map(|event| {
            (
                event.position,
                u64::try_from(event.ethBlockNum).unwrap_or(u64::MAX),
            )
        })
    })
}

#[async_trait]
impl<P> StatusSource for ArbitrumRpcStatus<P>
where
    P: Provider + Clone,
{
    fn name(&self) -> &'static str {
        RPC
    }

    fn confidence(&self) -> Confidence {
        Confidence::Medium
    }

    async fn probe(&self, record: &WithdrawalRecord, _now: u64) -> Result<Observation, FlowError> {
        use WithdrawalStatus::*;

        if record.status.is_terminal() {
            return Ok(Observation::new(ProbeSignal::NotReady, "terminal"));
        }

        let l2 = self.providers.l2(record.source_chain_id, RPC)?;
        let receipt = l2_receipt(l2, record.transaction_hash, RPC).await?;
        if !receipt.status() {
            return Ok(Observation::new(
                ProbeSignal::Failed,
                "initiating L2 transaction reverted",
            ));
        }

        let (position, sent_at) = l2_to_l1_message(&receipt)
            .ok_or_else(|| FlowError::transient(RPC, "no L2ToL1Tx event"))?;
        let spent = self
            .is_spent(record.portal_or_outbox_address, position)
            .await?;

        match record.status {
            Initiated | WaitingChallenge => {
                if spent {
                    return Ok(Observation::new(
                        ProbeSignal::ChallengeElapsed,
                        "already executed",
                    ));
                }

                let confirm_period = self.confirm_period_blocks(record.source_chain_id).await?;
                let l1_block = self
                    .providers
                    .l1
                    .get_block_number()
                    .await
                    .map_err(|e| FlowError::transient(RPC, e))?;
                let confirmable_at = sent_at.saturating_add(confirm_period);
                debug!(withdrawal_id = %record.id, l1_block, confirmable_at, "Compared confirm period");

                if l1_block >= confirmable_at {
                    Ok(Observation::new(
                        ProbeSignal::ChallengeElapsed,
                        format!("confirm period passed at L1 block {confirmable_at}"),
                    ))
                } else {
                    Ok(Observation::new(
                        ProbeSignal::NotReady,
                        format!("{} L1 blocks left in confirm period", confirmable_at - l1_block),
                    ))
                }
            }
            ReadyToExecute | Executing => {
                if spent {
                    Ok(Observation::new(
                        ProbeSignal::AlreadyExecuted,
                        format!("outbox position {position} spent"),
                    ))
                } else {
                    Ok(Observation::new(ProbeSignal::NotReady, "not executed yet"))
                }
            }
            _ => Ok(Observation::new(
                ProbeSignal::NotReady,
                format!("{} is not an Arbitrum status", record.status),
            )),
        }
    }
}

/// Outbox execution.
pub struct ArbitrumSubmitter<P> {
    l1: P,
    signer: SignerFn,
    from: Address,
    confirm_timeout: Duration,
}

impl<P> ArbitrumSubmitter<P>
where
    P: Provider + Clone,
{
    pub fn new(l1: P, signer: SignerFn, from: Address, confirm_timeout: Duration) -> Self {
        Self {
            l1,
            signer,
            from,
            confirm_timeout,
        }
    }
}

#[async_trait]
impl<P> Submitter for ArbitrumSubmitter<P>
where
    P: Provider + Clone + 'static,
{
    async fn submit(
        &self,
        record: &WithdrawalRecord,
        step: StepId,
        proof: &ProofBlob,
    ) -> Result<TxHash, FlowError> {
        if step != StepId::Execute {
            return Err(FlowError::IllegalStep {
                step,
                status: record.status,
            });
        }
        let ProofBlob::Arbitrum(proof) = proof else {
            return Err(FlowError::MalformedProof {
                origin: "submit",
                source: ProofError::WrongFamily {
                    expected: RollupFamily::Arbitrum,
                    got: proof.family(),
                },
            });
        };

        ExecuteAction::new(
            self.l1.clone(),
            self.signer.clone(),
            Execute {
                outbox_address: record.portal_or_outbox_address,
                proof: proof.clone(),
                from: self.from,
            },
        )
        .broadcast()
        .await
        .map_err(|e| classify_submission(step, e))
    }

    async fn confirm(&self, step: StepId, tx_hash: TxHash) -> Result<TxHash, FlowError> {
        action::confirm(&self.l1, tx_hash, self.confirm_timeout)
            .await
            .map(|result| result.tx_hash)
            .map_err(|e| classify_submission(step, e))
    }
}

/// Assemble the Arbitrum flow.
pub fn flow(status: ProbeChain, proofs: ProofChain, submitter: Arc<dyn Submitter>) -> StrategyFlow {
    StrategyFlow::new(RollupFamily::Arbitrum, status, proofs, submitter)
}
