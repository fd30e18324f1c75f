//! Merge of local and remote record sets.
//!
//! Last-writer-progress-wins: for each natural key the record with the higher
//! `currentStep` wins, then the later initiation, then the later activity.
//! Remaining ties are broken on the id and finally on the serialized record,
//! which makes the merge a total, commutative and associative choice.

use crate::types::{NaturalKey, WithdrawalRecord};
use std::{cmp::Ordering, collections::BTreeMap};

fn precedence(a: &WithdrawalRecord, b: &WithdrawalRecord) -> Ordering {
    a.current_step
        .cmp(&b.current_step)
        .then(a.initiated_at.cmp(&b.initiated_at))
        .then(a.last_activity().cmp(&b.last_activity()))
        .then(a.id.cmp(&b.id))
        .then_with(|| {
            let a = serde_json::to_vec(a).unwrap_or_default();
            let b = serde_json::to_vec(b).unwrap_or_default();
            a.cmp(&b)
        })
}

/// Pick the preferred of two records sharing a natural key.
pub fn prefer<'a>(a: &'a WithdrawalRecord, b: &'a WithdrawalRecord) -> &'a WithdrawalRecord {
    if precedence(a, b) == Ordering::Less {
        b
    } else {
        a
    }
}

/// Merge two record sets keyed by `(sourceChainId, transactionHash)`.
///
/// The result holds one record per key, ordered by key.
pub fn merge(local: &[WithdrawalRecord], remote: &[WithdrawalRecord]) -> Vec<WithdrawalRecord> {
    let mut merged: BTreeMap<NaturalKey, &WithdrawalRecord> = BTreeMap::new();

    for record in local.iter().chain(remote) {
        merged
            .entry(record.key())
            .and_modify(|current| *current = prefer(current, record))
            .or_insert(record);
    }

    merged.into_values().cloned().collect()
}

/// Records of `merged` the remote store is missing or holds an older version of.
pub fn remote_updates(
    merged: &[WithdrawalRecord],
    remote: &[WithdrawalRecord],
) -> Vec<WithdrawalRecord> {
    let remote: BTreeMap<NaturalKey, &WithdrawalRecord> =
        remote.iter().map(|r| (r.key(), r)).collect();

    merged
        .iter()
        .filter(|record| remote.get(&record.key()) != Some(record))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RecordId, RollupFamily, WithdrawalStatus};
    use alloy_primitives::{Address, B256};

    fn record(tx: u8, status: WithdrawalStatus, initiated_at: u64) -> WithdrawalRecord {
        let family = RollupFamily::OpStack;
        WithdrawalRecord {
            id: RecordId::repeat_byte(tx),
            transaction_hash: B256::repeat_byte(tx),
            rollup_family: family,
            source_chain_id: 10,
            destination_chain_id: 1,
            amount: "1".to_string(),
            from_address: Address::repeat_byte(1),
            to_address: Address::repeat_byte(1),
            bridge_address: Address::repeat_byte(2),
            portal_or_outbox_address: Address::repeat_byte(3),
            status,
            current_step: status.step(family).unwrap(),
            initiated_at,
            state_root_published_at: None,
            proven_at: None,
            challenge_period_ends_at: None,
            finalized_at: None,
            prove_tx_hash: None,
            finalize_tx_hash: None,
            last_error: None,
            last_error_at: None,
        }
    }

    fn sample_sets() -> Vec<Vec<WithdrawalRecord>> {
        let mut errored = record(1, WithdrawalStatus::ReadyToProve, 100);
        errored.last_error = Some("timeout".to_string());
        errored.last_error_at = Some(500);

        vec![
            vec![],
            vec![record(1, WithdrawalStatus::ReadyToProve, 100)],
            vec![
                record(1, WithdrawalStatus::WaitingStateRoot, 100),
                record(2, WithdrawalStatus::Proven, 200),
            ],
            vec![errored, record(3, WithdrawalStatus::Initiated, 300)],
            vec![
                record(2, WithdrawalStatus::Proven, 250),
                record(3, WithdrawalStatus::Finalized, 300),
                record(1, WithdrawalStatus::Initiated, 100),
            ],
        ]
    }

    #[test]
    fn test_local_progress_wins() {
        let local = vec![record(1, WithdrawalStatus::ReadyToProve, 100)];
        let remote = vec![record(1, WithdrawalStatus::WaitingStateRoot, 100)];

        let merged = merge(&local, &remote);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].current_step, 3);
    }

    #[test]
    fn test_equal_step_prefers_recent_initiation() {
        let older = record(1, WithdrawalStatus::Proven, 100);
        let newer = record(1, WithdrawalStatus::Proven, 200);

        assert_eq!(merge(&[older.clone()], &[newer.clone()]), vec![newer.clone()]);
        assert_eq!(merge(&[newer.clone()], &[older]), vec![newer]);
    }

    #[test]
    fn test_disjoint_sets_union() {
        let local = vec![record(1, WithdrawalStatus::Initiated, 100)];
        let remote = vec![record(2, WithdrawalStatus::Proven, 200)];
        assert_eq!(merge(&local, &remote).len(), 2);
    }

    #[test]
    fn test_merge_idempotent() {
        for set in sample_sets() {
            let once = merge(&set, &[]);
            assert_eq!(merge(&once, &once), once);
            assert_eq!(merge(&set, &set), once);
        }
    }

    #[test]
    fn test_merge_commutative() {
        for a in sample_sets() {
            for b in sample_sets() {
                assert_eq!(merge(&a, &b), merge(&b, &a));
            }
        }
    }

    #[test]
    fn test_merge_associative() {
        for a in sample_sets() {
            for b in sample_sets() {
                for c in sample_sets() {
                    let left = merge(&merge(&a, &b), &c);
                    let right = merge(&a, &merge(&b, &c));
                    assert_eq!(left, right);
                }
            }
        }
    }

    #[test]
    fn test_merge_ignores_input_order() {
        for set in sample_sets() {
            let mut reversed = set.clone();
            reversed.reverse();
            assert_eq!(merge(&set, &[]), merge(&reversed, &[]));
        }
    }

    #[test]
    fn test_merge_never_loses_progress() {
        for a in sample_sets() {
            for b in sample_sets() {
                let merged = merge(&a, &b);
                for input in a.iter().chain(&b) {
                    let out = merged.iter().find(|r| r.key() == input.key()).unwrap();
                    assert!(out.current_step >= input.current_step);
                }
            }
        }
    }

    #[test]
    fn test_equal_step_and_time_prefers_later_activity() {
        let plain = record(1, WithdrawalStatus::ReadyToProve, 100);
        let mut errored = plain.clone();
        errored.last_error = Some("explorer 404".to_string());
        errored.last_error_at = Some(900);

        assert_eq!(merge(&[plain.clone()], &[errored.clone()]), vec![errored.clone()]);
        assert_eq!(merge(&[errored.clone()], &[plain]), vec![errored]);
    }

    #[test]
    fn test_remote_updates_only_missing_or_stale() {
        let local = vec![
            record(1, WithdrawalStatus::ReadyToProve, 100),
            record(2, WithdrawalStatus::Proven, 200),
            record(3, WithdrawalStatus::Initiated, 300),
        ];
        let remote = vec![
            record(1, WithdrawalStatus::WaitingStateRoot, 100),
            record(2, WithdrawalStatus::Proven, 200),
        ];

        let merged = merge(&local, &remote);
        let updates = remote_updates(&merged, &remote);
        let keys: Vec<_> = updates.iter().map(|r| r.transaction_hash).collect();
        assert_eq!(keys, vec![B256::repeat_byte(1), B256::repeat_byte(3)]);
    }
}
