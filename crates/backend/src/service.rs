use crate::{check, BackendError};
use alloy_primitives::TxHash;
use config::RollupFamily;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Body shared by every backend POST endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRequest {
    pub tx_hash: TxHash,
    pub l2_chain_id: u64,
    pub l1_chain_id: u64,
}

/// `/api/{family}/status` response.
///
/// `status` carries the SDK's textual status (e.g. `ready-to-prove`) and
/// `statusCode` the numeric one where the SDK has it (Arbitrum message status).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub success: bool,
    #[serde(default)]
    pub ready: bool,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub status_code: Option<u32>,
    #[serde(default)]
    pub error: Option<String>,
}

/// `/api/opstack/finalization-status` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizationResponse {
    pub success: bool,
    #[serde(default)]
    pub ready: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// `/api/{family}/proof` response. `proofData` stays untyped here; the caller
/// decodes and validates it against the record's family.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofResponse {
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub proof_data: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

const fn default_success() -> bool {
    true
}

impl ProofResponse {
    pub fn into_proof_data(self) -> Result<serde_json::Value, BackendError> {
        if !self.success {
            return Err(BackendError::Rejected(
                self.error.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }
        match self.proof_data {
            Some(serde_json::Value::Null) | None => Err(BackendError::MissingProof),
            Some(data) => Ok(data),
        }
    }
}

/// Client for the backend service.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
    health_timeout: Duration,
}

impl BackendClient {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
    pub const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(3);

    pub fn new(base_url: impl Into<String>) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(Self::DEFAULT_TIMEOUT)
            .build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Creates a backend client with a custom HTTP client.
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            health_timeout: Self::DEFAULT_HEALTH_TIMEOUT,
        }
    }

    pub const fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// `GET /health` with the short health timeout.
    pub async fn health(&self) -> Result<(), BackendError> {
        let response = self
            .client
            .get(self.url("/health"))
            .timeout(self.health_timeout)
            .send()
            .await?;
        if !response.status().is_success() {
            debug!(status = %response.status(), "Backend health check failed");
            return Err(BackendError::Unhealthy);
        }
        Ok(())
    }

    pub async fn status(
        &self,
        family: RollupFamily,
        request: &StatusRequest,
    ) -> Result<StatusResponse, BackendError> {
        let response: StatusResponse = self
            .post(&format!("/api/{}/status", family.as_str()), request)
            .await?;
        if !response.success {
            return Err(BackendError::Rejected(
                response
                    .error
                    .unwrap_or_else(|| "unknown error".to_string()),
            ));
        }
        Ok(response)
    }

    /// OP Stack only: whether the proven withdrawal may be finalized.
    pub async fn finalization_status(
        &self,
        request: &StatusRequest,
    ) -> Result<FinalizationResponse, BackendError> {
        let response: FinalizationResponse = self
            .post("/api/opstack/finalization-status", request)
            .await?;
        if !response.success {
            return Err(BackendError::Rejected(
                response
                    .error
                    .unwrap_or_else(|| "unknown error".to_string()),
            ));
        }
        Ok(response)
    }

    pub async fn proof(
        &self,
        family: RollupFamily,
        request: &StatusRequest,
    ) -> Result<serde_json::Value, BackendError> {
        let response: ProofResponse = self
            .post(&format!("/api/{}/proof", family.as_str()), request)
            .await?;
        response.into_proof_data()
    }

    async fn post<T>(&self, path: &str, request: &StatusRequest) -> Result<T, BackendError>
    where
        T: serde::de::DeserializeOwned,
    {
        debug!(path, tx_hash = %request.tx_hash, "Backend request");
        let response = self
            .client
            .post(self.url(path))
            .json(request)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }
}
