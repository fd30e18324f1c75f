use crate::{records::RecordSet, StoreError, WithdrawalStore};
use async_trait::async_trait;
use tokio::sync::RwLock;
use withdrawal::{NaturalKey, RecordId, WithdrawalRecord};

/// Volatile store, used in tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<RecordSet>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<WithdrawalRecord>) -> Self {
        Self {
            records: RwLock::new(RecordSet::from_records(records)),
        }
    }
}

#[async_trait]
impl WithdrawalStore for MemoryStore {
    async fn get(&self, id: RecordId) -> Result<Option<WithdrawalRecord>, StoreError> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn find(&self, key: NaturalKey) -> Result<Option<WithdrawalRecord>, StoreError> {
        Ok(self.records.read().await.find(&key).cloned())
    }

    async fn upsert(&self, record: WithdrawalRecord) -> Result<(), StoreError> {
        self.records.write().await.upsert(record);
        Ok(())
    }

    async fn delete(&self, id: RecordId) -> Result<Option<WithdrawalRecord>, StoreError> {
        Ok(self.records.write().await.remove(&id))
    }

    async fn list(&self) -> Result<Vec<WithdrawalRecord>, StoreError> {
        Ok(self.records.read().await.to_vec())
    }
}
