//! OP Stack strategy: output-root proposals, prove, challenge window, finalize.

use crate::{
    chain::{Observation, ProbeChain, ProofChain, StatusSource},
    classify_submission, l2_receipt, Providers, StrategyFlow, Submitter,
};
use action::{
    finalize::{Finalize, FinalizeAction},
    prove::{Prove, ProveAction},
    Action, SignerFn,
};
use alloy_primitives::{Address, TxHash, U256};
use alloy_provider::Provider;
use alloy_rpc_types_eth::{BlockNumberOrTag, TransactionReceipt};
use alloy_sol_types::SolEvent;
use async_trait::async_trait;
use backend::StatusResponse;
use binding::opstack::{
    game_proxy_address, IDisputeGameFactory, IFaultDisputeGame, IL2OutputOracle,
    IL2ToL1MessagePasser, IOptimismPortal2,
};
use config::{NetworkConfig, ProposalRegistry, RollupConfig};
use std::{sync::Arc, time::Duration};
use tracing::debug;
use withdrawal::{
    proof::ProofError, types::WithdrawalHash, Confidence, FlowError, ProbeSignal, ProofBlob,
    RollupFamily, StepId, WithdrawalRecord, WithdrawalStatus,
};

const RPC: &str = "rpc";

/// SDK status strings in lifecycle order.
const SDK_STATUSES: &[&str] = &[
    "waiting-to-prove",
    "ready-to-prove",
    "waiting-to-finalize",
    "ready-to-finalize",
    "finalized",
];

/// Interpret the backend's `/api/opstack/status` answer for a record in `status`.
pub fn status_observation(status: WithdrawalStatus, response: &StatusResponse) -> Observation {
    use WithdrawalStatus::*;

    let reported = response.status.as_deref().unwrap_or_default();
    if matches!(reported, "failed" | "reverted") {
        return Observation::new(ProbeSignal::Failed, format!("backend reports {reported}"));
    }

    let Some(rank) = SDK_STATUSES.iter().position(|s| *s == reported) else {
        // Unknown status string, only the readiness flag is usable.
        let signal = match (status, response.ready) {
            (Initiated | WaitingStateRoot, true) => ProbeSignal::ReadyForNextStep,
            _ => ProbeSignal::NotReady,
        };
        return Observation::new(signal, format!("backend ready={}", response.ready));
    };

    // Rank the SDK must report before the record may leave `status`.
    let (needed, signal) = match status {
        Initiated | WaitingStateRoot => (1, ProbeSignal::ReadyForNextStep),
        ReadyToProve => (2, ProbeSignal::AlreadyExecuted),
        Proven | WaitingChallenge => (3, ProbeSignal::ChallengeElapsed),
        ReadyToFinalize => (4, ProbeSignal::AlreadyExecuted),
        _ => (usize::MAX, ProbeSignal::NotReady),
    };

    if rank >= needed {
        Observation::new(signal, format!("backend reports {reported}"))
    } else {
        Observation::new(ProbeSignal::NotReady, format!("backend reports {reported}"))
    }
}

/// Interpret `/api/opstack/finalization-status` for a proven record.
pub fn finalization_observation(ready: bool) -> Observation {
    if ready {
        Observation::new(ProbeSignal::ChallengeElapsed, "challenge period elapsed")
    } else {
        Observation::new(ProbeSignal::NotReady, "challenge period running")
    }
}

/// Direct L1 contract reads. Medium confidence.
///
/// Readiness to prove compares the latest proposed L2 block (dispute game
/// factory or output oracle) with the block that included the withdrawal.
/// The challenge window is read from the portal's proof timestamp and
/// maturity delay against the latest L1 block time.
pub struct OpStackRpcStatus<P> {
    providers: Providers<P>,
    network: Arc<NetworkConfig>,
}

impl<P> OpStackRpcStatus<P>
where
    P: Provider + Clone,
{
    pub const fn new(providers: Providers<P>, network: Arc<NetworkConfig>) -> Self {
        Self { providers, network }
    }

    fn rollup(&self, chain_id: u64) -> Result<&RollupConfig, FlowError> {
        self.network
            .rollup(chain_id)
            .ok_or_else(|| FlowError::transient(RPC, format!("unknown chain {chain_id}")))
    }

    /// Highest L2 block covered by a proposal on L1.
    async fn latest_proposed_block(
        &self,
        rollup: &RollupConfig,
        portal_address: Address,
    ) -> Result<u64, FlowError> {
        let l1 = &self.providers.l1;
        let block = match rollup.proposals {
            ProposalRegistry::OutputOracle { address } => IL2OutputOracle::new(address, l1)
                .latestBlockNumber()
                .call()
                .await
                .map_err(|e| FlowError::transient(RPC, e))?,
            ProposalRegistry::DisputeGameFactory { address } => {
                let portal = IOptimismPortal2::new(portal_address, l1);
                let game_type = portal
                    .respectedGameType()
                    .call()
                    .await
                    .map_err(|e| FlowError::transient(RPC, e))?;

                let factory = IDisputeGameFactory::new(address, l1);
                let count = factory
                    .gameCount()
                    .call()
                    .await
                    .map_err(|e| FlowError::transient(RPC, e))?;
                if count.is_zero() {
                    return Ok(0);
                }

                let games = factory
                    .findLatestGames(game_type, count - U256::from(1), U256::from(1))
                    .call()
                    .await
                    .map_err(|e| FlowError::transient(RPC, e))?;
                let Some(game) = games.first() else {
                    return Ok(0);
                };

                IFaultDisputeGame::new(game_proxy_address(game.metadata), l1)
                    .l2BlockNumber()
                    .call()
                    .await
                    .map_err(|e| FlowError::transient(RPC, e))?
            }
            ProposalRegistry::RollupCore { .. } => {
                return Err(FlowError::transient(
                    RPC,
                    format!("{} has no output proposals", rollup.name),
                ))
            }
        };

        Ok(u64::try_from(block).unwrap_or(u64::MAX))
    }

    /// Seconds a proof must age before finalization.
    async fn maturity_delay(
        &self,
        rollup: &RollupConfig,
        portal_address: Address,
    ) -> Result<u64, FlowError> {
        let l1 = &self.providers.l1;
        let delay = match rollup.proposals {
            ProposalRegistry::OutputOracle { address } => IL2OutputOracle::new(address, l1)
                .FINALIZATION_PERIOD_SECONDS()
                .call()
                .await,
            _ => IOptimismPortal2::new(portal_address, l1)
                .proofMaturityDelaySeconds()
                .call()
                .await,
        }
        .map_err(|e| FlowError::transient(RPC, e))?;

        Ok(u64::try_from(delay).unwrap_or(u64::MAX))
    }

    async fn l1_timestamp(&self) -> Result<u64, FlowError> {
        let block = self
            .providers
            .l1
            .get_block_by_number(BlockNumberOrTag::Latest)
            .await
            .map_err(|e| FlowError::transient(RPC, e))?
            .ok_or_else(|| FlowError::transient(RPC, "latest L1 block unavailable"))?;
        Ok(block.header.timestamp)
    }

    async fn proven_at(
        &self,
        portal: Address,
        hash: WithdrawalHash,
        submitter: Address,
    ) -> Result<Option<u64>, FlowError> {
        let proven = IOptimismPortal2::new(portal, &self.providers.l1)
            .provenWithdrawals(hash, submitter)
            .call()
            .await
            .map_err(|e| FlowError::transient(RPC, e))?;
        Ok((proven.timestamp != 0).then_some(proven.timestamp))
    }

    async fn is_finalized(&self, portal: Address, hash: WithdrawalHash) -> Result<bool, FlowError> {
        IOptimismPortal2::new(portal, &self.providers.l1)
            .finalizedWithdrawals(hash)
            .call()
            .await
            .map_err(|e| FlowError::transient(RPC, e))
    }
}

/// Withdrawal hash from the `MessagePassed` event of the initiating receipt.
fn message_passed_hash(receipt: &TransactionReceipt) -> Option<WithdrawalHash> {
    receipt.logs().iter().find_map(|log| {
        IL2ToL1MessagePasser::MessagePassed::decode_log(&log.inner)
            .ok()
            .map(|event| event.withdrawalHash)
    })
}

#[async_trait]
impl<P> StatusSource for OpStackRpcStatus<P>
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

        let rollup = self.rollup(record.source_chain_id)?;
        let l2 = self.providers.l2(record.source_chain_id, RPC)?;
        let receipt = l2_receipt(l2, record.transaction_hash, RPC).await?;
        if !receipt.status() {
            return Ok(Observation::new(
                ProbeSignal::Failed,
                "initiating L2 transaction reverted",
            ));
        }

        let portal = record.portal_or_outbox_address;

        match record.status {
            Initiated | WaitingStateRoot => {
                let included = receipt
                    .block_number
                    .ok_or_else(|| FlowError::transient(RPC, "receipt has no block number"))?;
                let proposed = self.latest_proposed_block(rollup, portal).await?;
                debug!(withdrawal_id = %record.id, included, proposed, "Compared proposal height");

                if proposed >= included {
                    Ok(Observation::new(
                        ProbeSignal::ReadyForNextStep,
                        format!("L2 block {included} covered by proposal at {proposed}"),
                    ))
                } else {
                    Ok(Observation::new(
                        ProbeSignal::NotReady,
                        format!("latest proposal at L2 block {proposed}, need {included}"),
                    ))
                }
            }
            ReadyToProve => {
                let hash = message_passed_hash(&receipt)
                    .ok_or_else(|| FlowError::transient(RPC, "no MessagePassed event"))?;
                match self.proven_at(portal, hash, record.from_address).await? {
                    Some(at) => Ok(Observation::new(
                        ProbeSignal::AlreadyExecuted,
                        format!("proven on L1 at {at}"),
                    )),
                    None => Ok(Observation::new(ProbeSignal::NotReady, "not proven yet")),
                }
            }
            Proven | WaitingChallenge => {
                let hash = message_passed_hash(&receipt)
                    .ok_or_else(|| FlowError::transient(RPC, "no MessagePassed event"))?;
                if self.is_finalized(portal, hash).await? {
                    return Ok(Observation::new(ProbeSignal::ChallengeElapsed, "already finalized"));
                }

                let proven_at = match self.proven_at(portal, hash, record.from_address).await? {
                    Some(at) => at,
                    None => record
                        .proven_at
                        .ok_or_else(|| FlowError::transient(RPC, "no proof found on L1"))?,
                };
                let delay = self.maturity_delay(rollup, portal).await?;
                let l1_now = self.l1_timestamp().await?;
                let matures_at = proven_at.saturating_add(delay);

                if l1_now >= matures_at {
                    Ok(Observation::new(
                        ProbeSignal::ChallengeElapsed,
                        format!("proof matured at {matures_at}"),
                    ))
                } else {
                    Ok(Observation::new(
                        ProbeSignal::NotReady,
                        format!("proof matures in {}s", matures_at - l1_now),
                    ))
                }
            }
            ReadyToFinalize => {
                let hash = message_passed_hash(&receipt)
                    .ok_or_else(|| FlowError::transient(RPC, "no MessagePassed event"))?;
                if self.is_finalized(portal, hash).await? {
                    Ok(Observation::new(ProbeSignal::AlreadyExecuted, "finalized on L1"))
                } else {
                    Ok(Observation::new(ProbeSignal::NotReady, "not finalized yet"))
                }
            }
            _ => Ok(Observation::new(
                ProbeSignal::NotReady,
                format!("{} is not an OP Stack status", record.status),
            )),
        }
    }
}

/// Prove and finalize through the OptimismPortal.
pub struct OpStackSubmitter<P> {
    l1: P,
    signer: SignerFn,
    from: Address,
    confirm_timeout: Duration,
}

impl<P> OpStackSubmitter<P>
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
impl<P> Submitter for OpStackSubmitter<P>
where
    P: Provider + Clone + 'static,
{
    async fn submit(
        &self,
        record: &WithdrawalRecord,
        step: StepId,
        proof: &ProofBlob,
    ) -> Result<TxHash, FlowError> {
        let ProofBlob::OpStack(proof) = proof else {
            return Err(FlowError::MalformedProof {
                origin: "submit",
                source: ProofError::WrongFamily {
                    expected: RollupFamily::OpStack,
                    got: proof.family(),
                },
            });
        };

        let portal_address = record.portal_or_outbox_address;
        let result = match step {
            StepId::Prove => {
                ProveAction::new(
                    self.l1.clone(),
                    self.signer.clone(),
                    Prove {
                        portal_address,
                        proof: proof.clone(),
                        from: self.from,
                    },
                )
                .broadcast()
                .await
            }
            StepId::Finalize => {
                FinalizeAction::new(
                    self.l1.clone(),
                    self.signer.clone(),
                    Finalize {
                        portal_address,
                        withdrawal: (&proof.withdrawal).into(),
                        from: self.from,
                    },
                )
                .broadcast()
                .await
            }
            StepId::Execute => {
                return Err(FlowError::IllegalStep {
                    step,
                    status: record.status,
                })
            }
        };

        result.map_err(|e| classify_submission(step, e))
    }

    async fn confirm(&self, step: StepId, tx_hash: TxHash) -> Result<TxHash, FlowError> {
        action::confirm(&self.l1, tx_hash, self.confirm_timeout)
            .await
            .map(|result| result.tx_hash)
            .map_err(|e| classify_submission(step, e))
    }
}

/// Assemble the OP Stack flow.
pub fn flow(status: ProbeChain, proofs: ProofChain, submitter: Arc<dyn Submitter>) -> StrategyFlow {
    StrategyFlow::new(RollupFamily::OpStack, status, proofs, submitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: &str) -> StatusResponse {
        StatusResponse {
            success: true,
            ready: false,
            status: Some(status.to_string()),
            status_code: None,
            error: None,
        }
    }

    #[test]
    fn test_status_mapping_before_prove() {
        let waiting = status_observation(WithdrawalStatus::Initiated, &response("waiting-to-prove"));
        assert_eq!(waiting.signal, ProbeSignal::NotReady);

        let ready =
            status_observation(WithdrawalStatus::WaitingStateRoot, &response("ready-to-prove"));
        assert_eq!(ready.signal, ProbeSignal::ReadyForNextStep);

        // Proven elsewhere still only moves one step forward.
        let ahead = status_observation(WithdrawalStatus::Initiated, &response("finalized"));
        assert_eq!(ahead.signal, ProbeSignal::ReadyForNextStep);
    }

    #[test]
    fn test_status_mapping_for_action_statuses() {
        assert_eq!(
            status_observation(WithdrawalStatus::ReadyToProve, &response("ready-to-prove")).signal,
            ProbeSignal::NotReady
        );
        assert_eq!(
            status_observation(WithdrawalStatus::ReadyToProve, &response("waiting-to-finalize"))
                .signal,
            ProbeSignal::AlreadyExecuted
        );
        assert_eq!(
            status_observation(WithdrawalStatus::ReadyToFinalize, &response("ready-to-finalize"))
                .signal,
            ProbeSignal::NotReady
        );
        assert_eq!(
            status_observation(WithdrawalStatus::ReadyToFinalize, &response("finalized")).signal,
            ProbeSignal::AlreadyExecuted
        );
    }

    #[test]
    fn test_status_mapping_failure_and_unknown() {
        assert_eq!(
            status_observation(WithdrawalStatus::WaitingStateRoot, &response("reverted")).signal,
            ProbeSignal::Failed
        );

        let mut unknown = response("something-new");
        unknown.ready = true;
        assert_eq!(
            status_observation(WithdrawalStatus::Initiated, &unknown).signal,
            ProbeSignal::ReadyForNextStep
        );
        assert_eq!(
            status_observation(WithdrawalStatus::ReadyToProve, &unknown).signal,
            ProbeSignal::NotReady
        );
    }

    #[test]
    fn test_finalization_observation() {
        assert_eq!(
            finalization_observation(true).signal,
            ProbeSignal::ChallengeElapsed
        );
        assert_eq!(finalization_observation(false).signal, ProbeSignal::NotReady);
    }
}
