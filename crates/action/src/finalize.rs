//! Finalize withdrawal action.
//!
//! Finalizes a proven withdrawal on L1, executing the withdrawal transaction
//! and sending ETH to the recipient.

use crate::{sign_and_send, Action, ActionError, SignerFn};
use alloy_primitives::{Address, TxHash};
use alloy_provider::Provider;
use binding::opstack::{IOptimismPortal2, WithdrawalTransaction};
use tracing::info;
use withdrawal::{hash::compute_withdrawal_hash, types::WithdrawalHash};

/// Input data for finalizing a withdrawal on L1.
#[derive(Clone, Debug)]
pub struct Finalize {
    /// OptimismPortal2 contract address on L1
    pub portal_address: Address,
    /// The withdrawal transaction details
    pub withdrawal: WithdrawalTransaction,
    /// Address that will submit the finalize transaction
    pub from: Address,
}

/// Action to finalize a proven withdrawal on L1.
pub struct FinalizeAction<P> {
    l1_provider: P,
    signer: SignerFn,
    action: Finalize,
    withdrawal_hash: WithdrawalHash,
}

impl<P> FinalizeAction<P>
where
    P: Provider + Clone,
{
    pub fn new(l1_provider: P, signer: SignerFn, action: Finalize) -> Self {
        let withdrawal_hash = compute_withdrawal_hash(&action.withdrawal);
        Self {
            l1_provider,
            signer,
            action,
            withdrawal_hash,
        }
    }

    pub const fn withdrawal_hash(&self) -> WithdrawalHash {
        self.withdrawal_hash
    }
}

impl<P> Action for FinalizeAction<P>
where
    P: Provider + Clone,
{
    async fn is_completed(&self) -> eyre::Result<bool> {
        let portal = IOptimismPortal2::new(self.action.portal_address, &self.l1_provider);
        Ok(portal
            .finalizedWithdrawals(self.withdrawal_hash)
            .call()
            .await?)
    }

    async fn broadcast(&self) -> eyre::Result<TxHash> {
        if self.is_completed().await? {
            return Err(ActionError::AlreadyCompleted.into());
        }

        info!(
            withdrawal_hash = %self.withdrawal_hash,
            "Submitting finalize transaction to L1"
        );

        let portal = IOptimismPortal2::new(self.action.portal_address, &self.l1_provider);
        let call = portal.finalizeWithdrawalTransaction(self.action.withdrawal.clone());
        let tx_request = call.into_transaction_request().from(self.action.from);

        let tx_hash = sign_and_send(&self.l1_provider, &self.signer, tx_request).await?;

        info!(
            %tx_hash,
            withdrawal_hash = %self.withdrawal_hash,
            "Finalize transaction broadcast"
        );

        Ok(tx_hash)
    }

    fn description(&self) -> String {
        format!("Finalizing withdrawal {} on L1", self.withdrawal_hash)
    }
}
