//! Prove withdrawal action.
//!
//! Submits a proof to L1 that a withdrawal was initiated on L2.

use crate::{sign_and_send, Action, ActionError, SignerFn};
use alloy_primitives::{Address, TxHash};
use alloy_provider::Provider;
use binding::opstack::{IOptimismPortal2, WithdrawalTransaction};
use tracing::info;
use withdrawal::{hash::compute_withdrawal_hash, proof::OpStackProof, types::WithdrawalHash};

/// Input data for proving a withdrawal on L1.
#[derive(Clone, Debug)]
pub struct Prove {
    /// OptimismPortal2 contract address on L1
    pub portal_address: Address,
    /// Proof bundle from the proof fetcher
    pub proof: OpStackProof,
    /// Address that will submit the proof transaction
    pub from: Address,
}

/// Action to prove a withdrawal on L1.
pub struct ProveAction<P> {
    l1_provider: P,
    signer: SignerFn,
    action: Prove,
    withdrawal_hash: WithdrawalHash,
}

impl<P> ProveAction<P>
where
    P: Provider + Clone,
{
    pub fn new(l1_provider: P, signer: SignerFn, action: Prove) -> Self {
        let withdrawal_hash = compute_withdrawal_hash(&(&action.proof.withdrawal).into());
        Self {
            l1_provider,
            signer,
            action,
            withdrawal_hash,
        }
    }

    /// Get the withdrawal hash for this action.
    pub const fn withdrawal_hash(&self) -> WithdrawalHash {
        self.withdrawal_hash
    }
}

impl<P> Action for ProveAction<P>
where
    P: Provider + Clone,
{
    /// Proven if the portal holds a proof for this withdrawal from `from`.
    async fn is_completed(&self) -> eyre::Result<bool> {
        let portal = IOptimismPortal2::new(self.action.portal_address, &self.l1_provider);
        let proven = portal
            .provenWithdrawals(self.withdrawal_hash, self.action.from)
            .call()
            .await?;
        Ok(proven.timestamp != 0)
    }

    async fn broadcast(&self) -> eyre::Result<TxHash> {
        if self.is_completed().await? {
            return Err(ActionError::AlreadyCompleted.into());
        }

        let proof = &self.action.proof;
        info!(
            withdrawal_hash = %self.withdrawal_hash,
            l2_output_index = %proof.l2_output_index,
            proof_nodes = proof.withdrawal_proof.len(),
            "Submitting withdrawal proof to L1"
        );

        let portal = IOptimismPortal2::new(self.action.portal_address, &self.l1_provider);
        let withdrawal: WithdrawalTransaction = (&proof.withdrawal).into();
        let call = portal.proveWithdrawalTransaction(
            withdrawal,
            proof.l2_output_index,
            (&proof.output_root_proof).into(),
            proof.withdrawal_proof.clone(),
        );
        let tx_request = call.into_transaction_request().from(self.action.from);

        let tx_hash = sign_and_send(&self.l1_provider, &self.signer, tx_request).await?;

        info!(
            %tx_hash,
            withdrawal_hash = %self.withdrawal_hash,
            "Prove transaction broadcast"
        );

        Ok(tx_hash)
    }

    fn description(&self) -> String {
        format!("Proving withdrawal {} on L1", self.withdrawal_hash)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::test_utils::{mock_signer, MockProvider};
    use alloy_primitives::{address, b256, hex, Bytes, B256, U256};
    use withdrawal::proof::{OutputRootProofData, WithdrawalTuple};

    /// Unichain mainnet withdrawal 0x91b3…dc4a.
    pub(crate) fn unichain_proof() -> OpStackProof {
        OpStackProof {
            withdrawal: WithdrawalTuple {
                nonce: U256::from_be_bytes(hex!(
                    "0001000000000000000000000000000000000000000000000000000000000818"
                )),
                sender: address!("000040D6c85A13a1AA74565FDe87e499dC023C6f"),
                target: address!("B03eEF386A61b5b462051636001485FFfdD3d843"),
                value: U256::ZERO,
                gas_limit: U256::from(200_000),
                data: Bytes::from(hex!(
                    "095ea7b3000000000000000000000000000040d6c85a13a1aa74565fde87e499dc023c6fffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff"
                )),
            },
            l2_output_index: U256::from(4242),
            output_root_proof: OutputRootProofData {
                version: B256::ZERO,
                state_root: B256::repeat_byte(1),
                message_passer_storage_root: B256::repeat_byte(2),
                latest_blockhash: B256::repeat_byte(3),
            },
            withdrawal_proof: vec![Bytes::from_static(&[0xde, 0xad])],
        }
    }

    fn create_test_prove_action() -> ProveAction<MockProvider> {
        let prove = Prove {
            portal_address: address!("0bd48f6B86a26D3a217d0Fa6FfE2B491B956A7a2"),
            proof: unichain_proof(),
            from: address!("5CFFA347b0aE99cc01E5c01714cA5658e54a23D1"),
        };

        ProveAction::new(MockProvider, mock_signer(), prove)
    }

    #[test]
    fn test_prove_action_withdrawal_hash() {
        let action = create_test_prove_action();
        assert_eq!(
            action.withdrawal_hash(),
            b256!("49c43b60ec99e99046b54aec4c90419ff194300e567de63423c3b974ae46bd28")
        );
    }

    #[test]
    fn test_prove_action_description() {
        let action = create_test_prove_action();
        let desc = action.description();
        assert!(desc.contains("Proving withdrawal"));
        assert!(desc.contains("49c43b60ec99e99046b54aec4c90419ff194300e567de63423c3b974ae46bd28"));
    }
}
