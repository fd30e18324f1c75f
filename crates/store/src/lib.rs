//! Persistence for withdrawal records.
//!
//! - [`WithdrawalStore`]: the local record set, single source of truth for reads
//! - [`RemoteStore`]: best-effort mirror used for cross-device recovery
//! - [`SyncService`]: merges both on load and mirrors local changes outwards

pub mod file;
pub mod memory;
mod records;
pub mod remote;
pub mod sync;

use alloy_primitives::Address;
use async_trait::async_trait;
pub use file::FileStore;
pub use memory::MemoryStore;
pub use remote::{HttpRemoteStore, RemoteStore};
pub use sync::{SyncReport, SyncService};
use thiserror::Error;
use withdrawal::{NaturalKey, RecordId, WithdrawalRecord};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store io: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed store contents: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("remote store request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("remote store returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Local record store.
///
/// Writes are upsert-by-id, last-write-wins. An upsert also replaces any other
/// record sharing the same `(sourceChainId, transactionHash)`, so one
/// withdrawal is never stored twice.
#[async_trait]
pub trait WithdrawalStore: Send + Sync {
    async fn get(&self, id: RecordId) -> Result<Option<WithdrawalRecord>, StoreError>;

    async fn find(&self, key: NaturalKey) -> Result<Option<WithdrawalRecord>, StoreError>;

    async fn upsert(&self, record: WithdrawalRecord) -> Result<(), StoreError>;

    /// Remove a record, returning it if it existed.
    async fn delete(&self, id: RecordId) -> Result<Option<WithdrawalRecord>, StoreError>;

    async fn list(&self) -> Result<Vec<WithdrawalRecord>, StoreError>;

    /// Records initiated by `owner`.
    async fn list_by_owner(&self, owner: Address) -> Result<Vec<WithdrawalRecord>, StoreError> {
        let mut records = self.list().await?;
        records.retain(|r| r.from_address == owner);
        Ok(records)
    }
}
