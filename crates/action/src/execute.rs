//! Execute an Arbitrum L2→L1 message through the outbox.

use crate::{sign_and_send, Action, ActionError, SignerFn};
use alloy_primitives::{Address, TxHash};
use alloy_provider::Provider;
use binding::arbitrum::IOutbox;
use tracing::info;
use withdrawal::proof::ArbitrumProof;

/// Input data for executing an outbox message on L1.
#[derive(Clone, Debug)]
pub struct Execute {
    /// Outbox contract address on L1
    pub outbox_address: Address,
    pub proof: ArbitrumProof,
    /// Address that will submit the execution transaction
    pub from: Address,
}

pub struct ExecuteAction<P> {
    l1_provider: P,
    signer: SignerFn,
    action: Execute,
}

impl<P> ExecuteAction<P>
where
    P: Provider + Clone,
{
    pub const fn new(l1_provider: P, signer: SignerFn, action: Execute) -> Self {
        Self {
            l1_provider,
            signer,
            action,
        }
    }
}

impl<P> Action for ExecuteAction<P>
where
    P: Provider + Clone,
{
    /// The outbox marks each message position as spent once executed.
    async fn is_completed(&self) -> eyre::Result<bool> {
        let outbox = IOutbox::new(self.action.outbox_address, &self.l1_provider);
        Ok(outbox.isSpent(self.action.proof.index).call().await?)
    }

    async fn broadcast(&self) -> eyre::Result<TxHash> {
        if self.is_completed().await? {
            return Err(ActionError::AlreadyCompleted.into());
        }

        let proof = &self.action.proof;
        info!(
            index = %proof.index,
            proof_nodes = proof.proof.len(),
            to = %proof.to,
            "Submitting outbox execution to L1"
        );

        let outbox = IOutbox::new(self.action.outbox_address, &self.l1_provider);
        let call = outbox.executeTransaction(
            proof.proof.clone(),
            proof.index,
            proof.l2_sender,
            proof.to,
            proof.l2_block,
            proof.l1_block,
            proof.l2_timestamp,
            proof.value,
            proof.data.clone(),
        );
        let tx_request = call.into_transaction_request().from(self.action.from);

        let tx_hash = sign_and_send(&self.l1_provider, &self.signer, tx_request).await?;

        info!(%tx_hash, index = %proof.index, "Outbox execution broadcast");

        Ok(tx_hash)
    }

    fn description(&self) -> String {
        format!(
            "Executing outbox message {} to {} on L1",
            self.action.proof.index, self.action.proof.to
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{mock_signer, MockProvider};
    use alloy_primitives::{address, Bytes, B256, U256};

    #[test]
    fn test_execute_action_description() {
        let action = ExecuteAction::new(
            MockProvider,
            mock_signer(),
            Execute {
                outbox_address: address!("0B9857ae2D4A3DBe74ffE1d7DF045bb7F96E4840"),
                proof: ArbitrumProof {
                    proof: vec![B256::repeat_byte(7)],
                    index: U256::from(151_203),
                    l2_sender: address!("5CFFA347b0aE99cc01E5c01714cA5658e54a23D1"),
                    to: address!("5CFFA347b0aE99cc01E5c01714cA5658e54a23D1"),
                    l2_block: U256::from(190_000_000u64),
                    l1_block: U256::from(19_000_000u64),
                    l2_timestamp: U256::from(1_700_000_000u64),
                    value: U256::from(10u64).pow(U256::from(17)),
                    data: Bytes::new(),
                },
                from: address!("5CFFA347b0aE99cc01E5c01714cA5658e54a23D1"),
            },
        );

        let desc = action.description();
        assert!(desc.starts_with("Executing outbox message 151203"));
        assert!(desc.ends_with(&format!("to {} on L1", action.action.proof.to)));
    }
}
