use crate::{check, BackendError, ProofResponse};
use alloy_primitives::TxHash;
use std::time::Duration;
use tracing::debug;

/// Block-explorer proof API for one L2 chain.
///
/// `GET {base}/withdrawals/{txHash}/proof` answers with the same
/// `{proofData}` body as the backend proof endpoint.
#[derive(Debug, Clone)]
pub struct ExplorerClient {
    client: reqwest::Client,
    base_url: String,
}

impl ExplorerClient {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

    pub fn new(base_url: impl Into<String>) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(Self::DEFAULT_TIMEOUT)
            .build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn proof_url(&self, tx_hash: TxHash) -> String {
        format!("{}/withdrawals/{tx_hash}/proof", self.base_url)
    }

    pub async fn proof(&self, tx_hash: TxHash) -> Result<serde_json::Value, BackendError> {
        let url = self.proof_url(tx_hash);
        debug!(%url, "Explorer proof request");
        let response = self.client.get(url).send().await?;
        let response: ProofResponse = check(response).await?.json().await?;
        response.into_proof_data()
    }
}
