use std::collections::BTreeMap;
use withdrawal::{NaturalKey, RecordId, WithdrawalRecord};

/// In-memory record set shared by the local store implementations.
#[derive(Debug, Default, Clone)]
pub(crate) struct RecordSet {
    records: BTreeMap<RecordId, WithdrawalRecord>,
}

impl RecordSet {
    pub(crate) fn from_records(records: Vec<WithdrawalRecord>) -> Self {
        let mut set = Self::default();
        for record in records {
            set.upsert(record);
        }
        set
    }

    pub(crate) fn get(&self, id: &RecordId) -> Option<&WithdrawalRecord> {
        self.records.get(id)
    }

    pub(crate) fn find(&self, key: &NaturalKey) -> Option<&WithdrawalRecord> {
        self.records.values().find(|r| r.key() == *key)
    }

    pub(crate) fn upsert(&mut self, record: WithdrawalRecord) {
        let key = record.key();
        self.records
            .retain(|id, existing| *id == record.id || existing.key() != key);
        self.records.insert(record.id, record);
    }

    pub(crate) fn remove(&mut self, id: &RecordId) -> Option<WithdrawalRecord> {
        self.records.remove(id)
    }

    pub(crate) fn to_vec(&self) -> Vec<WithdrawalRecord> {
        self.records.values().cloned().collect()
    }
}
