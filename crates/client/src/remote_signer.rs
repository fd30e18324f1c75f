//! Signing through a signer-proxy speaking `eth_signTransaction`.
//!
//! The proxy may front an HSM or a wallet that asks its user for approval, so
//! a request can take as long as the user does. A declined request surfaces
//! as [`SignerError::UserRejected`].

use crate::{ClientError, SignerError};
use alloy_primitives::{Address, Bytes};
use alloy_rpc_types::eth::TransactionRequest;
use eyre::{bail, Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Signer for one address on one chain, backed by a signer-proxy.
#[derive(Debug, Clone)]
pub struct RemoteSigner {
    http: reqwest::Client,
    url: String,
    address: Address,
    chain_id: u64,
}

impl RemoteSigner {
    /// `approval_timeout` bounds a single signing round trip, user approval
    /// included.
    pub fn new(
        url: impl Into<String>,
        address: Address,
        chain_id: u64,
        approval_timeout: Duration,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(approval_timeout)
            .build()
            .map_err(|e| ClientError::Http(e.to_string()))?;
        Ok(Self::with_client(http, url, address, chain_id))
    }

    pub fn with_client(
        http: reqwest::Client,
        url: impl Into<String>,
        address: Address,
        chain_id: u64,
    ) -> Self {
        Self {
            http,
            url: url.into(),
            address,
            chain_id,
        }
    }

    pub const fn address(&self) -> Address {
        self.address
    }

    pub const fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Sign a filled transaction, returning the raw EIP-2718 bytes.
    pub async fn sign_transaction(&self, tx: TransactionRequest) -> Result<Bytes> {
        let request = SignRequest {
            jsonrpc: "2.0",
            id: 1,
            method: "eth_signTransaction",
            params: [tx],
        };

        let response = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .wrap_err("signer-proxy unreachable")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("signer-proxy returned {status}: {body}");
        }

        let reply: SignReply = response
            .json()
            .await
            .wrap_err("malformed signer-proxy reply")?;
        reply.into_raw()
    }
}

#[derive(Serialize)]
struct SignRequest {
    jsonrpc: &'static str,
    id: u32,
    method: &'static str,
    params: [TransactionRequest; 1],
}

#[derive(Debug, Deserialize)]
struct SignReply {
    result: Option<Signed>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct Signed {
    raw: Bytes,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

impl SignReply {
    fn into_raw(self) -> Result<Bytes> {
        match (self.result, self.error) {
            (_, Some(error)) => Err(SignerError::from_rpc(error.code, error.message).into()),
            (Some(signed), None) => Ok(signed.raw),
            (None, None) => bail!("signer-proxy reply has neither result nor error"),
        }
    }
}
