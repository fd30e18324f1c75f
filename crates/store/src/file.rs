//! JSON file backed local store.
//!
//! The file holds one JSON object keyed by record id. Every mutation rewrites
//! the file through a temporary sibling and an atomic rename, so a crash never
//! leaves a half-written record set behind.

use crate::{records::RecordSet, StoreError, WithdrawalStore};
use async_trait::async_trait;
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};
use tokio::sync::Mutex;
use tracing::debug;
use withdrawal::{NaturalKey, RecordId, WithdrawalRecord};

#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    records: Mutex<RecordSet>,
}

impl FileStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let records = match tokio::fs::read(&path).await {
            Ok(contents) => {
                let by_id: BTreeMap<RecordId, WithdrawalRecord> =
                    serde_json::from_slice(&contents)?;
                RecordSet::from_records(by_id.into_values().collect())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => RecordSet::default(),
            Err(e) => return Err(e.into()),
        };

        debug!(path = %path.display(), "Opened withdrawal store");

        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, records: &RecordSet) -> Result<(), StoreError> {
        let by_id: BTreeMap<RecordId, WithdrawalRecord> =
            records.to_vec().into_iter().map(|r| (r.id, r)).collect();
        let contents = serde_json::to_vec_pretty(&by_id)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, contents).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl WithdrawalStore for FileStore {
    async fn get(&self, id: RecordId) -> Result<Option<WithdrawalRecord>, StoreError> {
        Ok(self.records.lock().await.get(&id).cloned())
    }

    async fn find(&self, key: NaturalKey) -> Result<Option<WithdrawalRecord>, StoreError> {
        Ok(self.records.lock().await.find(&key).cloned())
    }

    async fn upsert(&self, record: WithdrawalRecord) -> Result<(), StoreError> {
        let mut records = self.records.lock().await;
        let mut next = records.clone();
        next.upsert(record);
        self.persist(&next).await?;
        *records = next;
        Ok(())
    }

    async fn delete(&self, id: RecordId) -> Result<Option<WithdrawalRecord>, StoreError> {
        let mut records = self.records.lock().await;
        let mut next = records.clone();
        let removed = next.remove(&id);
        if removed.is_some() {
            self.persist(&next).await?;
            *records = next;
        }
        Ok(removed)
    }

    async fn list(&self) -> Result<Vec<WithdrawalRecord>, StoreError> {
        Ok(self.records.lock().await.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::tests::record;
    use withdrawal::WithdrawalStatus;

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("withdrawals.json");

        let store = FileStore::open(&path).await.unwrap();
        store
            .upsert(record(1, 1, WithdrawalStatus::ReadyToProve))
            .await
            .unwrap();
        store
            .upsert(record(2, 2, WithdrawalStatus::Initiated))
            .await
            .unwrap();
        store.delete(RecordId::repeat_byte(2)).await.unwrap();
        drop(store);

        let reopened = FileStore::open(&path).await.unwrap();
        let all = reopened.list().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].status, WithdrawalStatus::ReadyToProve);
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("nested/none.json"))
            .await
            .unwrap();
        assert!(store.list().await.unwrap().is_empty());

        // First write creates the parent directory.
        store
            .upsert(record(1, 1, WithdrawalStatus::Initiated))
            .await
            .unwrap();
        assert!(store.path().exists());
    }

    #[tokio::test]
    async fn test_file_is_keyed_by_id_with_camel_case_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("withdrawals.json");
        let store = FileStore::open(&path).await.unwrap();
        let r = record(1, 1, WithdrawalStatus::Initiated);
        store.upsert(r.clone()).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        let entry = &raw[r.id.to_string()];
        assert_eq!(entry["transactionHash"], r.transaction_hash.to_string());
        assert_eq!(entry["rollupFamily"], "op_stack");
        assert_eq!(entry["currentStep"], 1);
        assert!(entry.get("provenAt").is_none());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("withdrawals.json");
        std::fs::write(&path, b"not json").unwrap();

        assert!(matches!(
            FileStore::open(&path).await,
            Err(StoreError::Serde(_))
        ));
    }
}
