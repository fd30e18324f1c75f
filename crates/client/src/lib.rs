mod remote_signer;

use alloy_consensus::TxEnvelope;
use alloy_network::{eip2718::Encodable2718, EthereumWallet, TransactionBuilder};
use alloy_primitives::{Address, Bytes};
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types::TransactionRequest;
use alloy_signer_local::PrivateKeySigner;
pub use remote_signer::RemoteSigner;
use std::{future::Future, pin::Pin, sync::Arc};
use thiserror::Error;

/// A function that signs a transaction request and returns signed bytes.
///
/// Signing failures are `eyre` reports; a declined request carries a
/// [`SignerError::UserRejected`] that callers recover with
/// [`SignerError::is_user_rejection`].
pub type SignerFn = Arc<
    dyn Fn(TransactionRequest) -> Pin<Box<dyn Future<Output = eyre::Result<Bytes>> + Send>>
        + Send
        + Sync,
>;

#[derive(Error, Debug)]
pub enum ClientError {
    /// Error parsing or validating URLs
    #[error("Invalid RPC URL: {0}")]
    InvalidUrl(String),

    /// Error with private key
    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("HTTP client: {0}")]
    Http(String),
}

/// Why a signer did not produce a signature.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignerError {
    /// The signer declined (EIP-1193 code 4001).
    #[error("user rejected the request")]
    UserRejected,

    #[error("signer returned JSON-RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
}

impl SignerError {
    /// EIP-1193 "User Rejected Request".
    pub const USER_REJECTED_CODE: i64 = 4001;

    pub fn from_rpc(code: i64, message: String) -> Self {
        if code == Self::USER_REJECTED_CODE {
            Self::UserRejected
        } else {
            Self::Rpc { code, message }
        }
    }

    /// Whether `report` was caused by the signer declining.
    pub fn is_user_rejection(report: &eyre::Report) -> bool {
        report
            .chain()
            .any(|cause| matches!(cause.downcast_ref::<Self>(), Some(Self::UserRejected)))
    }
}

/// Convenience function to create an ethereum rpc provider from url.
pub fn create_provider(rpc_url: &str) -> Result<impl Provider + Clone, ClientError> {
    let url = rpc_url
        .parse()
        .map_err(|e| ClientError::InvalidUrl(format!("{}", e)))?;
    let provider = ProviderBuilder::new().connect_http(url);

    Ok(provider)
}

/// Create a SignerFn from a RemoteSigner and provider.
///
/// The provider is used to fill transaction fields (nonce, gas, fees) before
/// sending to the remote signer-proxy for signing.
pub fn remote_signer_fn<P>(remote: RemoteSigner, provider: P) -> SignerFn
where
    P: Provider + Clone + 'static,
{
    let from_address = remote.address();
    let chain_id = remote.chain_id();

    Arc::new(move |tx| {
        let remote = remote.clone();
        let provider = provider.clone();
        Box::pin(async move {
            let filled_tx = fill_transaction(tx, &provider, from_address, chain_id).await?;
            remote.sign_transaction(filled_tx).await
        })
    })
}

/// Create a SignerFn from a local private key and provider.
///
/// Returns the signer's address alongside, which is the owner of the
/// withdrawals it executes.
pub fn local_signer_fn<P>(
    private_key: &str,
    chain_id: u64,
    provider: P,
) -> Result<(Address, SignerFn), ClientError>
where
    P: Provider + Clone + 'static,
{
    let signer: PrivateKeySigner = private_key
        .parse()
        .map_err(|e| ClientError::InvalidPrivateKey(format!("{}", e)))?;
    let from_address = signer.address();
    let wallet = EthereumWallet::from(signer);

    let sign: SignerFn = Arc::new(move |tx: TransactionRequest| {
        let wallet = wallet.clone();
        let provider = provider.clone();
        Box::pin(async move {
            let filled_tx = fill_transaction(tx, &provider, from_address, chain_id).await?;

            let tx_envelope: TxEnvelope = filled_tx
                .build(&wallet)
                .await
                .map_err(|e| eyre::eyre!("{}", e))?;

            let mut encoded = Vec::new();
            tx_envelope.encode_2718(&mut encoded);
            Ok(Bytes::from(encoded))
        })
    });

    Ok((from_address, sign))
}

/// Fill missing transaction fields using the provider.
async fn fill_transaction<P>(
    mut tx: TransactionRequest,
    provider: &P,
    from: Address,
    chain_id: u64,
) -> eyre::Result<TransactionRequest>
where
    P: Provider,
{
    if tx.from.is_none() {
        tx.from = Some(from);
    }

    if tx.chain_id.is_none() {
        tx.chain_id = Some(chain_id);
    }

    if tx.nonce.is_none() {
        let nonce = provider.get_transaction_count(from).await?;
        tx.nonce = Some(nonce);
    }

    // Fees first, gas estimation may depend on them
    if tx.max_fee_per_gas.is_none() || tx.max_priority_fee_per_gas.is_none() {
        let fee_estimate = provider.estimate_eip1559_fees().await?;
        if tx.max_fee_per_gas.is_none() {
            tx.max_fee_per_gas = Some(fee_estimate.max_fee_per_gas);
        }
        if tx.max_priority_fee_per_gas.is_none() {
            tx.max_priority_fee_per_gas = Some(fee_estimate.max_priority_fee_per_gas);
        }
    }

    if tx.gas.is_none() {
        let gas_estimate = provider.estimate_gas(tx.clone()).await?;
        // Proof verification gas varies with the trie depth, keep 20% headroom.
        tx.gas = Some(gas_estimate + gas_estimate / 5);
    }

    Ok(tx)
}
