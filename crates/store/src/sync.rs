//! Reconciliation between the local store and the remote mirror.

use crate::{RemoteStore, StoreError, WithdrawalStore};
use alloy_primitives::Address;
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};
use tokio::{sync::Mutex, task::JoinHandle};
use tracing::{debug, info, warn};
use withdrawal::{
    reconcile::{merge, remote_updates},
    NaturalKey, RecordId, WithdrawalRecord,
};

/// Outcome of one [`SyncService::sync`] pass.
#[derive(Debug)]
pub struct SyncReport {
    /// The owner's records after merging, ordered by natural key.
    pub merged: Vec<WithdrawalRecord>,
    /// Local records replaced or added by the merge.
    pub written_locally: usize,
    /// Background task pushing merged records the remote lacks.
    pub push: Option<JoinHandle<()>>,
}

/// Keeps the local store and the optional remote mirror converged.
///
/// Local writes always land first. Remote failures are logged and never
/// propagated; the next sync pass retries.
#[derive(Clone)]
pub struct SyncService {
    local: Arc<dyn WithdrawalStore>,
    remote: Option<Arc<dyn RemoteStore>>,
    pending_deletes: Arc<Mutex<BTreeSet<NaturalKey>>>,
    write_lock: Arc<Mutex<()>>,
}

impl SyncService {
    pub fn new(local: Arc<dyn WithdrawalStore>, remote: Option<Arc<dyn RemoteStore>>) -> Self {
        Self {
            local,
            remote,
            pending_deletes: Arc::default(),
            write_lock: Arc::default(),
        }
    }

    /// Serializes read-modify-write cycles on the local store.
    ///
    /// Held by the sync write-back and by local deletes; callers patching
    /// records must hold it across their re-read and upsert.
    pub fn write_lock(&self) -> &Mutex<()> {
        &self.write_lock
    }

    pub fn local(&self) -> &Arc<dyn WithdrawalStore> {
        &self.local
    }

    pub const fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Keys deleted locally whose remote deletion has not been confirmed.
    pub async fn pending_deletes(&self) -> Vec<NaturalKey> {
        self.pending_deletes.lock().await.iter().copied().collect()
    }

    /// Merge the owner's local and remote records and write the result back.
    ///
    /// Records whose merged version differs from the local copy are upserted
    /// locally; records the remote lacks or holds older are pushed in the
    /// background.
    pub async fn sync(&self, owner: Address) -> Result<SyncReport, StoreError> {
        let local = self.local.list_by_owner(owner).await?;

        let Some(remote_store) = self.remote.clone() else {
            return Ok(SyncReport {
                merged: merge(&local, &[]),
                written_locally: 0,
                push: None,
            });
        };

        self.flush_deletes().await;

        let mut remote = match remote_store.list(owner).await {
            Ok(records) => records,
            Err(e) => {
                warn!(%owner, error = %e, "Remote load failed, using local records only");
                return Ok(SyncReport {
                    merged: merge(&local, &[]),
                    written_locally: 0,
                    push: None,
                });
            }
        };

        // Local records may have advanced or been deleted while the remote
        // answered; merge against a fresh read taken under the write lock.
        let guard = self.write_lock.lock().await;
        let local = self.local.list_by_owner(owner).await?;
        {
            let pending = self.pending_deletes.lock().await;
            remote.retain(|r| !pending.contains(&r.key()) && r.from_address == owner);
        }

        let merged = merge(&local, &remote);

        let local_by_key: BTreeMap<NaturalKey, &WithdrawalRecord> =
            local.iter().map(|r| (r.key(), r)).collect();
        let mut written_locally = 0;
        for record in &merged {
            if local_by_key.get(&record.key()) != Some(&record) {
                self.local.upsert(record.clone()).await?;
                written_locally += 1;
            }
        }
        drop(guard);

        let updates = remote_updates(&merged, &remote);
        let push = (!updates.is_empty()).then(|| {
            let remote_store = remote_store.clone();
            tokio::spawn(async move {
                for record in updates {
                    if let Err(e) = remote_store.upsert(&record).await {
                        warn!(id = %record.id, error = %e, "Failed to push withdrawal to remote");
                    }
                }
            })
        });

        info!(
            %owner,
            local = local.len(),
            remote = remote.len(),
            merged = merged.len(),
            written_locally,
            "Synchronized withdrawals"
        );

        Ok(SyncReport {
            merged,
            written_locally,
            push,
        })
    }

    /// Mirror one locally written record to the remote in the background.
    pub fn mirror(&self, record: WithdrawalRecord) -> Option<JoinHandle<()>> {
        let remote = self.remote.clone()?;
        Some(tokio::spawn(async move {
            match remote.upsert(&record).await {
                Ok(()) => debug!(id = %record.id, "Mirrored withdrawal"),
                Err(e) => warn!(id = %record.id, error = %e, "Failed to mirror withdrawal"),
            }
        }))
    }

    /// Delete a record locally and queue its remote deletion.
    ///
    /// The remote deletion runs in the background; a failure leaves the key
    /// queued for the next sync pass.
    pub async fn delete(&self, id: RecordId) -> Result<Option<WithdrawalRecord>, StoreError> {
        let removed = {
            let _guard = self.write_lock.lock().await;
            let removed = self.local.delete(id).await?;
            if let (Some(record), Some(_)) = (&removed, &self.remote) {
                self.pending_deletes.lock().await.insert(record.key());
            }
            removed
        };

        if removed.is_some() && self.remote.is_some() {
            let this = self.clone();
            tokio::spawn(async move { this.flush_deletes().await });
        }

        Ok(removed)
    }

    /// Retry every queued remote deletion, keeping the ones that fail.
    async fn flush_deletes(&self) {
        let Some(remote) = &self.remote else {
            return;
        };

        let keys: Vec<NaturalKey> = self.pending_deletes.lock().await.iter().copied().collect();
        for key in keys {
            match remote.delete(key).await {
                Ok(()) => {
                    self.pending_deletes.lock().await.remove(&key);
                }
                Err(e) => warn!(
                    chain_id = key.source_chain_id,
                    tx = %key.transaction_hash,
                    error = %e,
                    "Remote delete failed, will retry"
                ),
            }
        }
    }
}
