//! Proof bundles required to submit L1 withdrawal transactions.
//!
//! Proofs are produced by external services (the rollup SDK behind the
//! backend, or a block explorer). The rest of the system treats them as opaque
//! bundles; this module only defines their shape and rejects malformed ones.

use crate::types::RollupFamily;
use alloy_primitives::{Address, Bytes, B256, U256};
use binding::opstack::{OutputRootProof, WithdrawalTransaction};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Proof material for one L1 step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProofBlob {
    OpStack(OpStackProof),
    Arbitrum(ArbitrumProof),
}

/// The withdrawal transaction tuple as emitted by `MessagePassed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalTuple {
    pub nonce: U256,
    pub sender: Address,
    pub target: Address,
    pub value: U256,
    pub gas_limit: U256,
    pub data: Bytes,
}

impl From<&WithdrawalTuple> for WithdrawalTransaction {
    fn from(tuple: &WithdrawalTuple) -> Self {
        Self {
            nonce: tuple.nonce,
            sender: tuple.sender,
            target: tuple.target,
            value: tuple.value,
            gasLimit: tuple.gas_limit,
            data: tuple.data.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputRootProofData {
    pub version: B256,
    pub state_root: B256,
    pub message_passer_storage_root: B256,
    pub latest_blockhash: B256,
}

impl From<&OutputRootProofData> for OutputRootProof {
    fn from(proof: &OutputRootProofData) -> Self {
        Self {
            version: proof.version,
            stateRoot: proof.state_root,
            messagePasserStorageRoot: proof.message_passer_storage_root,
            latestBlockhash: proof.latest_blockhash,
        }
    }
}

/// OP Stack prove/finalize input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpStackProof {
    pub withdrawal: WithdrawalTuple,
    /// Dispute game index, or L2 output index on oracle-based portals.
    pub l2_output_index: U256,
    pub output_root_proof: OutputRootProofData,
    pub withdrawal_proof: Vec<Bytes>,
}

/// Arbitrum outbox `executeTransaction` input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArbitrumProof {
    pub proof: Vec<B256>,
    /// Position of the message in the outbox merkle tree.
    pub index: U256,
    pub l2_sender: Address,
    pub to: Address,
    pub l2_block: U256,
    pub l1_block: U256,
    pub l2_timestamp: U256,
    pub value: U256,
    pub data: Bytes,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProofError {
    #[error("expected {expected} proof, got {got}")]
    WrongFamily {
        expected: RollupFamily,
        got: RollupFamily,
    },
    #[error("proof has no merkle siblings")]
    EmptyProof,
    #[error("withdrawal sender is the zero address")]
    ZeroSender,
    #[error("destination is the zero address")]
    ZeroDestination,
    #[error("output root proof has an empty state root")]
    EmptyStateRoot,
}

impl ProofBlob {
    pub const fn family(&self) -> RollupFamily {
        match self {
            Self::OpStack(_) => RollupFamily::OpStack,
            Self::Arbitrum(_) => RollupFamily::Arbitrum,
        }
    }

    /// Check that the proof is well formed for `family`.
    ///
    /// Only structural checks; validity is decided on L1.
    pub fn validate(&self, family: RollupFamily) -> Result<(), ProofError> {
        if self.family() != family {
            return Err(ProofError::WrongFamily {
                expected: family,
                got: self.family(),
            });
        }

        match self {
            Self::OpStack(proof) => {
                if proof.withdrawal_proof.is_empty() {
                    return Err(ProofError::EmptyProof);
                }
                if proof.withdrawal.sender == Address::ZERO {
                    return Err(ProofError::ZeroSender);
                }
                if proof.withdrawal.target == Address::ZERO {
                    return Err(ProofError::ZeroDestination);
                }
                if proof.output_root_proof.state_root == B256::ZERO {
                    return Err(ProofError::EmptyStateRoot);
                }
            }
            Self::Arbitrum(proof) => {
                if proof.proof.is_empty() {
                    return Err(ProofError::EmptyProof);
                }
                if proof.l2_sender == Address::ZERO {
                    return Err(ProofError::ZeroSender);
                }
                if proof.to == Address::ZERO {
                    return Err(ProofError::ZeroDestination);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use alloy_primitives::{address, b256};

    pub(crate) fn op_proof() -> OpStackProof {
        OpStackProof {
            withdrawal: WithdrawalTuple {
                nonce: U256::from(1),
                sender: address!("5CFFA347b0aE99cc01E5c01714cA5658e54a23D1"),
                target: address!("5CFFA347b0aE99cc01E5c01714cA5658e54a23D1"),
                value: U256::from(1000000000000000u64),
                gas_limit: U256::from(100000),
                data: Bytes::new(),
            },
            l2_output_index: U256::from(42),
            output_root_proof: OutputRootProofData {
                version: B256::ZERO,
                state_root: b256!(
                    "1111111111111111111111111111111111111111111111111111111111111111"
                ),
                message_passer_storage_root: B256::ZERO,
                latest_blockhash: B256::ZERO,
            },
            withdrawal_proof: vec![Bytes::from(vec![1, 2, 3])],
        }
    }

    pub(crate) fn arb_proof() -> ArbitrumProof {
        ArbitrumProof {
            proof: vec![B256::repeat_byte(0xab)],
            index: U256::from(7),
            l2_sender: address!("5CFFA347b0aE99cc01E5c01714cA5658e54a23D1"),
            to: address!("5CFFA347b0aE99cc01E5c01714cA5658e54a23D1"),
            l2_block: U256::from(1000),
            l1_block: U256::from(20),
            l2_timestamp: U256::from(1_700_000_000u64),
            value: U256::from(5),
            data: Bytes::new(),
        }
    }

    #[test]
    fn test_valid_proofs() {
        assert_eq!(
            ProofBlob::OpStack(op_proof()).validate(RollupFamily::OpStack),
            Ok(())
        );
        assert_eq!(
            ProofBlob::Arbitrum(arb_proof()).validate(RollupFamily::Arbitrum),
            Ok(())
        );
    }

    #[test]
    fn test_wrong_family_rejected() {
        let err = ProofBlob::Arbitrum(arb_proof())
            .validate(RollupFamily::OpStack)
            .unwrap_err();
        assert_eq!(
            err,
            ProofError::WrongFamily {
                expected: RollupFamily::OpStack,
                got: RollupFamily::Arbitrum
            }
        );
    }

    #[test]
    fn test_empty_siblings_rejected() {
        let mut proof = op_proof();
        proof.withdrawal_proof.clear();
        assert_eq!(
            ProofBlob::OpStack(proof).validate(RollupFamily::OpStack),
            Err(ProofError::EmptyProof)
        );

        let mut proof = arb_proof();
        proof.proof.clear();
        assert_eq!(
            ProofBlob::Arbitrum(proof).validate(RollupFamily::Arbitrum),
            Err(ProofError::EmptyProof)
        );
    }

    #[test]
    fn test_untagged_deserialize_picks_shape() {
        let json = serde_json::to_value(arb_proof()).unwrap();
        let blob: ProofBlob = serde_json::from_value(json).unwrap();
        assert_eq!(blob.family(), RollupFamily::Arbitrum);

        let json = serde_json::to_value(op_proof()).unwrap();
        let blob: ProofBlob = serde_json::from_value(json).unwrap();
        assert_eq!(blob.family(), RollupFamily::OpStack);
    }

    #[test]
    fn test_tuple_into_binding() {
        let proof = op_proof();
        let tx = WithdrawalTransaction::from(&proof.withdrawal);
        assert_eq!(tx.gasLimit, U256::from(100000));
        assert_eq!(tx.sender, proof.withdrawal.sender);
    }
}
