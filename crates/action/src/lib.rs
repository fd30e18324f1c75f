//! L1 submission actions.
//!
//! Every action is submitted in two phases: [`Action::broadcast`] signs and
//! sends the transaction, returning its hash as soon as the node accepts it,
//! and [`confirm`] waits for the receipt. Callers persist the hash in between.

pub mod execute;
pub mod finalize;
pub mod prove;

use alloy_primitives::{TxHash, U256};
use alloy_provider::{PendingTransactionBuilder, Provider};
use alloy_rpc_types::TransactionRequest;
pub use client::SignerFn;
use std::{future::Future, time::Duration};
use thiserror::Error;
use tracing::info;

/// Trait for executable onchain actions.
pub trait Action: Send + Sync {
    /// Check if the action has already been completed on L1.
    ///
    /// Returns true if the step was already executed, by anyone.
    fn is_completed(&self) -> impl Future<Output = eyre::Result<bool>> + Send;

    /// Sign and broadcast the action's transaction.
    ///
    /// Fails with [`ActionError::AlreadyCompleted`] without submitting when
    /// [`Action::is_completed`] holds.
    fn broadcast(&self) -> impl Future<Output = eyre::Result<TxHash>> + Send;

    /// Get a human-readable description of this action.
    fn description(&self) -> String;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error("action already completed on L1")]
    AlreadyCompleted,

    #[error("transaction {0} reverted")]
    Reverted(TxHash),
}

/// Result of a confirmed action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Result {
    /// Transaction hash
    pub tx_hash: TxHash,
    /// Block number where transaction was included
    pub block_number: Option<u64>,
    /// Gas used
    pub gas_used: Option<U256>,
}

/// Sign `tx` externally and broadcast it, returning the transaction hash.
pub(crate) async fn sign_and_send<P>(
    provider: &P,
    signer: &SignerFn,
    tx: TransactionRequest,
) -> eyre::Result<TxHash>
where
    P: Provider,
{
    let signed_tx = (signer)(tx).await?;
    let pending = provider.send_raw_transaction(&signed_tx).await?;
    Ok(*pending.tx_hash())
}

/// Wait for the receipt of a broadcast transaction.
///
/// A reverted receipt is an [`ActionError::Reverted`].
pub async fn confirm<P>(provider: &P, tx_hash: TxHash, timeout: Duration) -> eyre::Result<Result>
where
    P: Provider,
{
    let receipt = PendingTransactionBuilder::new(provider.root().clone(), tx_hash)
        .with_timeout(Some(timeout))
        .get_receipt()
        .await?;

    if !receipt.status() {
        return Err(ActionError::Reverted(tx_hash).into());
    }

    info!(
        %tx_hash,
        block_number = receipt.block_number,
        gas_used = receipt.gas_used,
        "Transaction confirmed"
    );

    Ok(Result {
        tx_hash,
        block_number: receipt.block_number,
        gas_used: Some(U256::from(receipt.gas_used)),
    })
}
