//! Last-resort status estimate from elapsed L2 blocks and recorded deadlines.

use crate::{
    chain::{Observation, StatusSource},
    l2_receipt,
};
use alloy_primitives::TxHash;
use alloy_provider::Provider;
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::debug;
use withdrawal::{Confidence, FlowError, ProbeSignal, RollupFamily, WithdrawalRecord, WithdrawalStatus};

const HEURISTIC: &str = "heuristic";

/// L2 block numbers needed by the block-count heuristic.
#[async_trait]
pub trait L2Blocks: Send + Sync {
    /// Block that included the initiating transaction.
    async fn inclusion_block(&self, chain_id: u64, tx_hash: TxHash) -> Result<u64, FlowError>;

    async fn latest_block(&self, chain_id: u64) -> Result<u64, FlowError>;
}

/// [`L2Blocks`] over per-chain RPC providers.
#[derive(Clone)]
pub struct RpcL2Blocks<P> {
    providers: HashMap<u64, P>,
}

impl<P> RpcL2Blocks<P>
where
    P: Provider + Clone,
{
    pub const fn new(providers: HashMap<u64, P>) -> Self {
        Self { providers }
    }

    fn provider(&self, chain_id: u64) -> Result<&P, FlowError> {
        self.providers.get(&chain_id).ok_or_else(|| {
            FlowError::transient(HEURISTIC, format!("no RPC configured for chain {chain_id}"))
        })
    }
}

#[async_trait]
impl<P> L2Blocks for RpcL2Blocks<P>
where
    P: Provider + Clone,
{
    async fn inclusion_block(&self, chain_id: u64, tx_hash: TxHash) -> Result<u64, FlowError> {
        let receipt = l2_receipt(self.provider(chain_id)?, tx_hash, HEURISTIC).await?;

        receipt
            .block_number
            .ok_or_else(|| FlowError::transient(HEURISTIC, format!("{tx_hash} is pending")))
    }

    async fn latest_block(&self, chain_id: u64) -> Result<u64, FlowError> {
        self.provider(chain_id)?
            .get_block_number()
            .await
            .map_err(|e| FlowError::transient(HEURISTIC, e))
    }
}

/// Block-count and deadline heuristic. Lowest confidence.
///
/// Before the first L1 milestone it compares the L2 blocks elapsed since the
/// withdrawal against [`RollupFamily::heuristic_block_threshold`]. While an
/// OP Stack challenge window runs it compares `now` against the recorded
/// `challengePeriodEndsAt`. It never claims an L1 step was already executed.
pub struct HeuristicStatus<B> {
    blocks: B,
}

impl<B> HeuristicStatus<B>
where
    B: L2Blocks,
{
    pub const fn new(blocks: B) -> Self {
        Self { blocks }
    }

    async fn elapsed_blocks(&self, record: &WithdrawalRecord) -> Result<u64, FlowError> {
        let included = self
            .blocks
            .inclusion_block(record.source_chain_id, record.transaction_hash)
            .await?;
        let latest = self.blocks.latest_block(record.source_chain_id).await?;
        Ok(latest.saturating_sub(included))
    }

    async fn by_blocks(
        &self,
        record: &WithdrawalRecord,
        ready: ProbeSignal,
    ) -> Result<Observation, FlowError> {
        let threshold = record.rollup_family.heuristic_block_threshold();
        let elapsed = self.elapsed_blocks(record).await?;
        debug!(withdrawal_id = %record.id, elapsed, threshold, "Heuristic block count");

        if elapsed >= threshold {
            Ok(Observation::new(
                ready,
                format!("{elapsed} L2 blocks elapsed, threshold {threshold}"),
            ))
        } else {
            Ok(Observation::new(
                ProbeSignal::NotReady,
                format!("{elapsed} of {threshold} L2 blocks elapsed"),
            ))
        }
    }
}

#[async_trait]
impl<B> StatusSource for HeuristicStatus<B>
where
    B: L2Blocks,
{
    fn name(&self) -> &'static str {
        HEURISTIC
    }

    fn confidence(&self) -> Confidence {
        Confidence::Low
    }

    async fn probe(&self, record: &WithdrawalRecord, now: u64) -> Result<Observation, FlowError> {
        use WithdrawalStatus::*;

        match (record.rollup_family, record.status) {
            (RollupFamily::OpStack, Initiated | WaitingStateRoot) => {
                self.by_blocks(record, ProbeSignal::ReadyForNextStep).await
            }
            (RollupFamily::OpStack, Proven | WaitingChallenge) => {
                match record.challenge_period_ends_at {
                    Some(ends_at) if now >= ends_at => Ok(Observation::new(
                        ProbeSignal::ChallengeElapsed,
                        format!("challenge period ended at {ends_at}"),
                    )),
                    Some(ends_at) => Ok(Observation::new(
                        ProbeSignal::NotReady,
                        format!("challenge period ends in {}s", ends_at - now),
                    )),
                    None => Err(FlowError::transient(
                        HEURISTIC,
                        "no challenge deadline recorded",
                    )),
                }
            }
            (RollupFamily::Arbitrum, Initiated | WaitingChallenge) => {
                self.by_blocks(record, ProbeSignal::ChallengeElapsed).await
            }
            _ => Ok(Observation::new(
                ProbeSignal::NotReady,
                "no heuristic for this status",
            )),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::test_utils::record;

    /// Fixed block numbers: the withdrawal at `included`, the head at `latest`.
    pub(crate) struct FixedBlocks {
        pub included: u64,
        pub latest: u64,
    }

    #[async_trait]
    impl L2Blocks for FixedBlocks {
        async fn inclusion_block(&self, _: u64, _: TxHash) -> Result<u64, FlowError> {
            Ok(self.included)
        }

        async fn latest_block(&self, _: u64) -> Result<u64, FlowError> {
            Ok(self.latest)
        }
    }

    fn heuristic(elapsed: u64) -> HeuristicStatus<FixedBlocks> {
        HeuristicStatus::new(FixedBlocks {
            included: 1_000_000,
            latest: 1_000_000 + elapsed,
        })
    }

    #[tokio::test]
    async fn test_arbitrum_block_threshold() {
        let r = record(RollupFamily::Arbitrum, WithdrawalStatus::Initiated);

        let below = heuristic(46_522).probe(&r, 0).await.unwrap();
        assert_eq!(below.signal, ProbeSignal::NotReady);

        let at = heuristic(46_523).probe(&r, 0).await.unwrap();
        assert_eq!(at.signal, ProbeSignal::ChallengeElapsed);

        let waiting = record(RollupFamily::Arbitrum, WithdrawalStatus::WaitingChallenge);
        let above = heuristic(50_000).probe(&waiting, 0).await.unwrap();
        assert_eq!(above.signal, ProbeSignal::ChallengeElapsed);
    }

    #[tokio::test]
    async fn test_op_stack_block_threshold() {
        let r = record(RollupFamily::OpStack, WithdrawalStatus::WaitingStateRoot);
        assert_eq!(
            heuristic(1_999).probe(&r, 0).await.unwrap().signal,
            ProbeSignal::NotReady
        );
        assert_eq!(
            heuristic(2_000).probe(&r, 0).await.unwrap().signal,
            ProbeSignal::ReadyForNextStep
        );
    }

    #[tokio::test]
    async fn test_op_stack_challenge_deadline() {
        let mut r = record(RollupFamily::OpStack, WithdrawalStatus::Proven);
        r.challenge_period_ends_at = Some(1_700_604_800);

        let source = heuristic(0);
        assert_eq!(
            source.probe(&r, 1_700_604_799).await.unwrap().signal,
            ProbeSignal::NotReady
        );
        assert_eq!(
            source.probe(&r, 1_700_604_800).await.unwrap().signal,
            ProbeSignal::ChallengeElapsed
        );

        r.challenge_period_ends_at = None;
        assert!(source.probe(&r, 1_700_604_800).await.is_err());
    }

    #[tokio::test]
    async fn test_never_claims_execution() {
        for (family, status) in [
            (RollupFamily::OpStack, WithdrawalStatus::ReadyToProve),
            (RollupFamily::OpStack, WithdrawalStatus::ReadyToFinalize),
            (RollupFamily::Arbitrum, WithdrawalStatus::ReadyToExecute),
            (RollupFamily::Arbitrum, WithdrawalStatus::Executing),
        ] {
            let observation = heuristic(1_000_000)
                .probe(&record(family, status), u64::MAX)
                .await
                .unwrap();
            assert_eq!(observation.signal, ProbeSignal::NotReady);
        }
    }
}
