//! HTTP clients for the off-chain information sources.
//!
//! - [`BackendClient`]: the authoritative backend embedding the rollup SDKs
//! - [`ExplorerClient`]: public block-explorer proof API, the last resort for proofs

mod explorer;
mod service;

pub use explorer::ExplorerClient;
pub use service::{
    BackendClient, FinalizationResponse, ProofResponse, StatusRequest, StatusResponse,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The service answered but reported `success: false`.
    #[error("rejected request: {0}")]
    Rejected(String),

    #[error("health check failed")]
    Unhealthy,

    #[error("response carried no proof data")]
    MissingProof,
}

impl BackendError {
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "unknown".to_string());
    Err(BackendError::Status { status, body })
}
