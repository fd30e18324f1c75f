use crate::types::{RecordId, WithdrawalHash};
use alloy_primitives::{keccak256, Address, TxHash};
use alloy_sol_types::SolValue;
use binding::opstack::WithdrawalTransaction;

/// Derive the record identifier of a withdrawal.
///
/// `keccak256(txHash ‖ fromAddress ‖ initiatedAt)`, so two withdrawals only
/// share an id if they share the initiating transaction, the initiator and the
/// creation second.
pub fn derive_record_id(transaction_hash: TxHash, from: Address, initiated_at: u64) -> RecordId {
    let mut preimage = [0u8; 32 + 20 + 8];
    preimage[..32].copy_from_slice(transaction_hash.as_slice());
    preimage[32..52].copy_from_slice(from.as_slice());
    preimage[52..].copy_from_slice(&initiated_at.to_be_bytes());
    keccak256(preimage)
}

/// OP Stack withdrawal hash, as stored by the portal's proven/finalized maps.
pub fn compute_withdrawal_hash(tx: &WithdrawalTransaction) -> WithdrawalHash {
    // Solidity's Hashing.hashWithdrawal uses:
    // keccak256(abi.encode(_tx.nonce, _tx.sender, _tx.target, _tx.value, _tx.gasLimit, _tx.data))
    let encoded = (
        &tx.nonce,
        &tx.sender,
        &tx.target,
        &tx.value,
        &tx.gasLimit,
        &tx.data,
    )
        .abi_encode_sequence();

    keccak256(encoded)
}
