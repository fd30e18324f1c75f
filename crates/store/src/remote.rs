//! Remote mirror of the record set.
//!
//! The remote is only ever read during [`crate::SyncService::sync`] and written
//! in the background; the local store stays authoritative for every read.

use crate::StoreError;
use alloy_primitives::Address;
use async_trait::async_trait;
use std::time::Duration;
use withdrawal::{NaturalKey, WithdrawalRecord};

#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Every record the remote holds for `owner`.
    async fn list(&self, owner: Address) -> Result<Vec<WithdrawalRecord>, StoreError>;

    async fn upsert(&self, record: &WithdrawalRecord) -> Result<(), StoreError>;

    async fn delete(&self, key: NaturalKey) -> Result<(), StoreError>;
}

/// REST client for the remote record service.
///
/// - `GET {base}/withdrawals?fromAddress=0x…`
/// - `PUT {base}/withdrawals/{id}`
/// - `DELETE {base}/withdrawals/{sourceChainId}/{transactionHash}`
#[derive(Debug, Clone)]
pub struct HttpRemoteStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRemoteStore {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(base_url: impl Into<String>) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(Self::DEFAULT_TIMEOUT)
            .build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Creates a remote store with a custom HTTP client.
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/withdrawals{path}", self.base_url)
    }
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "unknown".to_string());
    Err(StoreError::Status { status, body })
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn list(&self, owner: Address) -> Result<Vec<WithdrawalRecord>, StoreError> {
        let response = self
            .client
            .get(self.url(""))
            .query(&[("fromAddress", owner.to_string())])
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    async fn upsert(&self, record: &WithdrawalRecord) -> Result<(), StoreError> {
        let response = self
            .client
            .put(self.url(&format!("/{}", record.id)))
            .json(record)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn delete(&self, key: NaturalKey) -> Result<(), StoreError> {
        let response = self
            .client
            .delete(self.url(&format!(
                "/{}/{}",
                key.source_chain_id, key.transaction_hash
            )))
            .send()
            .await?;

        // Already gone counts as deleted.
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        check(response).await?;
        Ok(())
    }
}
