//! Error taxonomy shared by every withdrawal operation.
//!
//! `NotReady` is deliberately absent: an unmet protocol precondition is a
//! normal [`crate::types::ProbeSignal`], not an error.

use crate::{
    proof::ProofError,
    types::{RecordId, RollupFamily, StepId, WithdrawalStatus},
};
use thiserror::Error;

/// Malformed input, caught before any network call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} must not be the zero address")]
    ZeroAddress(&'static str),
    #[error("transaction hash must not be empty")]
    EmptyTransactionHash,
    #[error("invalid amount {0:?}")]
    InvalidAmount(String),
    #[error("amount must be positive")]
    NonPositiveAmount,
    #[error("unsupported source chain {0}")]
    UnknownChain(u64),
    #[error("chain {chain_id} settles to L1 {expected}, not {got}")]
    DestinationMismatch {
        chain_id: u64,
        expected: u64,
        got: u64,
    },
}

/// Failure of a status check or step execution.
#[derive(Debug, Error)]
pub enum FlowError {
    /// A single information source failed; absorbed by the fallback chain.
    #[error("{origin} unavailable: {message}")]
    TransientSource {
        origin: &'static str,
        message: String,
    },
    /// Every source in a fallback chain failed.
    #[error("all sources failed: {}", .0.join("; "))]
    SourcesExhausted(Vec<String>),
    /// A source answered with something that is not a usable proof.
    #[error("malformed proof from {origin}: {source}")]
    MalformedProof {
        origin: &'static str,
        #[source]
        source: ProofError,
    },
    /// The step was already executed on L1. Must not be retried.
    #[error("{0} was already executed on L1")]
    AlreadyExecuted(StepId),
    /// The external signer declined.
    #[error("request rejected by signer")]
    UserRejected,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("step {step} is not valid while the withdrawal is {status}")]
    IllegalStep {
        step: StepId,
        status: WithdrawalStatus,
    },
    #[error("no flow registered for {0}")]
    UnsupportedFamily(RollupFamily),
    #[error("withdrawal {0} not found")]
    NotFound(RecordId),
    #[error("L1 transaction {0} reverted")]
    Reverted(alloy_primitives::TxHash),
    #[error("submission failed: {0}")]
    Submission(String),
    #[error("store error: {0}")]
    Store(String),
}

impl FlowError {
    pub fn transient(origin: &'static str, message: impl ToString) -> Self {
        Self::TransientSource {
            origin,
            message: message.to_string(),
        }
    }

    /// Whether a user should see this failure as a hard, non-retryable error.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::AlreadyExecuted(_))
    }
}
