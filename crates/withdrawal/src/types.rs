use alloy_primitives::{Address, TxHash, B256};
pub use config::RollupFamily;
use serde::{Deserialize, Serialize};
use std::fmt;

pub type WithdrawalHash = B256;

/// Unique record identifier, see [`crate::hash::derive_record_id`].
pub type RecordId = B256;

/// Lifecycle status of a withdrawal.
///
/// The variants form the union of both families' state sets; which ones are
/// reachable, and in which order, is decided by [`status_order`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalStatus {
    Initiated,
    WaitingStateRoot,
    ReadyToProve,
    Proven,
    WaitingChallenge,
    ReadyToFinalize,
    Finalized,
    ReadyToExecute,
    Executing,
    Completed,
    Failed,
}

const OP_STACK_ORDER: &[WithdrawalStatus] = &[
    WithdrawalStatus::Initiated,
    WithdrawalStatus::WaitingStateRoot,
    WithdrawalStatus::ReadyToProve,
    WithdrawalStatus::Proven,
    WithdrawalStatus::WaitingChallenge,
    WithdrawalStatus::ReadyToFinalize,
    WithdrawalStatus::Finalized,
];

const ARBITRUM_ORDER: &[WithdrawalStatus] = &[
    WithdrawalStatus::Initiated,
    WithdrawalStatus::WaitingChallenge,
    WithdrawalStatus::ReadyToExecute,
    WithdrawalStatus::Executing,
    WithdrawalStatus::Completed,
];

/// The fixed linear order of a family, excluding the side-terminal `Failed`.
pub const fn status_order(family: RollupFamily) -> &'static [WithdrawalStatus] {
    match family {
        RollupFamily::OpStack => OP_STACK_ORDER,
        RollupFamily::Arbitrum => ARBITRUM_ORDER,
    }
}

impl WithdrawalStatus {
    pub const ALL: [Self; 11] = [
        Self::Initiated,
        Self::WaitingStateRoot,
        Self::ReadyToProve,
        Self::Proven,
        Self::WaitingChallenge,
        Self::ReadyToFinalize,
        Self::Finalized,
        Self::ReadyToExecute,
        Self::Executing,
        Self::Completed,
        Self::Failed,
    ];

    /// 1-based step of this status within the family order.
    ///
    /// `Failed` sits one past the family's terminal step so that every status
    /// maps to exactly one step and steps never decrease.
    /// Returns `None` for statuses outside the family's state set.
    pub fn step(self, family: RollupFamily) -> Option<u32> {
        let order = status_order(family);
        if self == Self::Failed {
            return Some(order.len() as u32 + 1);
        }
        order
            .iter()
            .position(|s| *s == self)
            .map(|idx| idx as u32 + 1)
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finalized | Self::Completed | Self::Failed)
    }

    /// Statuses the background sweep re-probes.
    pub const fn is_waiting(self) -> bool {
        matches!(
            self,
            Self::Initiated
                | Self::WaitingStateRoot
                | Self::Proven
                | Self::WaitingChallenge
                | Self::Executing
        )
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initiated => "initiated",
            Self::WaitingStateRoot => "waiting_state_root",
            Self::ReadyToProve => "ready_to_prove",
            Self::Proven => "proven",
            Self::WaitingChallenge => "waiting_challenge",
            Self::ReadyToFinalize => "ready_to_finalize",
            Self::Finalized => "finalized",
            Self::ReadyToExecute => "ready_to_execute",
            Self::Executing => "executing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user-triggered L1 step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    /// OP Stack: prove the withdrawal against a published output root.
    Prove,
    /// OP Stack: finalize after the challenge period.
    Finalize,
    /// Arbitrum: execute the message through the outbox.
    Execute,
}

impl StepId {
    /// Whether this step may be executed while a record of `family` is in
    /// `status`. Checked before any network I/O.
    pub const fn is_legal(self, family: RollupFamily, status: WithdrawalStatus) -> bool {
        matches!(
            (family, self, status),
            (RollupFamily::OpStack, Self::Prove, WithdrawalStatus::ReadyToProve)
                | (
                    RollupFamily::OpStack,
                    Self::Finalize,
                    WithdrawalStatus::ReadyToFinalize
                )
                | (
                    RollupFamily::Arbitrum,
                    Self::Execute,
                    WithdrawalStatus::ReadyToExecute | WithdrawalStatus::Executing
                )
        )
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Prove => "prove",
            Self::Finalize => "finalize",
            Self::Execute => "execute",
        }
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StepId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "prove" => Ok(Self::Prove),
            "finalize" => Ok(Self::Finalize),
            "execute" => Ok(Self::Execute),
            other => Err(format!("unknown step: {other}")),
        }
    }
}

/// What a status source observed about a withdrawal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeSignal {
    NotReady,
    ReadyForNextStep,
    ChallengeElapsed,
    AlreadyExecuted,
    /// The source reported the withdrawal as failed (e.g. the initiating L2
    /// transaction reverted).
    Failed,
}

impl ProbeSignal {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotReady => "not_ready",
            Self::ReadyForNextStep => "ready_for_next_step",
            Self::ChallengeElapsed => "challenge_elapsed",
            Self::AlreadyExecuted => "already_executed",
            Self::Failed => "failed",
        }
    }
}

/// Confidence of a probe result, decreasing down the fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// Advisory result of probing a withdrawal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub signal: ProbeSignal,
    pub confidence: Confidence,
    /// Name of the source that answered.
    pub source: String,
    /// Human readable explanation, surfaced as status text.
    pub detail: String,
}

/// Natural key of a withdrawal: the initiating transaction on its source chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NaturalKey {
    pub source_chain_id: u64,
    pub transaction_hash: TxHash,
}

/// A tracked L2→L1 withdrawal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalRecord {
    pub id: RecordId,
    pub transaction_hash: TxHash,
    pub rollup_family: RollupFamily,
    pub source_chain_id: u64,
    pub destination_chain_id: u64,
    /// Decimal string in units of the L2 native asset.
    pub amount: String,
    pub from_address: Address,
    pub to_address: Address,
    pub bridge_address: Address,
    pub portal_or_outbox_address: Address,
    pub status: WithdrawalStatus,
    pub current_step: u32,
    pub initiated_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_root_published_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proven_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenge_period_ends_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finalized_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prove_tx_hash: Option<TxHash>,
    /// OP Stack finalize or Arbitrum outbox execution transaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finalize_tx_hash: Option<TxHash>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error_at: Option<u64>,
}

impl WithdrawalRecord {
    pub const fn key(&self) -> NaturalKey {
        NaturalKey {
            source_chain_id: self.source_chain_id,
            transaction_hash: self.transaction_hash,
        }
    }

    /// Latest lifecycle milestone, used as the lower bound for new ones.
    pub fn latest_milestone(&self) -> u64 {
        [
            self.state_root_published_at,
            self.proven_at,
            self.challenge_period_ends_at,
            self.finalized_at,
        ]
        .into_iter()
        .flatten()
        .fold(self.initiated_at, u64::max)
    }

    /// Most recent time anything was written to this record.
    pub fn last_activity(&self) -> u64 {
        self.latest_milestone()
            .max(self.last_error_at.unwrap_or_default())
    }

    /// Apply a patch, returning the updated record.
    pub fn apply(&self, patch: &WithdrawalPatch) -> Self {
        let mut next = self.clone();
        if let Some(change) = patch.status {
            next.status = change.status;
            next.current_step = change.current_step;
        }
        if patch.state_root_published_at.is_some() {
            next.state_root_published_at = patch.state_root_published_at;
        }
        if patch.proven_at.is_some() {
            next.proven_at = patch.proven_at;
        }
        if patch.challenge_period_ends_at.is_some() {
            next.challenge_period_ends_at = patch.challenge_period_ends_at;
        }
        if patch.finalized_at.is_some() {
            next.finalized_at = patch.finalized_at;
        }
        if patch.prove_tx_hash.is_some() {
            next.prove_tx_hash = patch.prove_tx_hash;
        }
        if patch.finalize_tx_hash.is_some() {
            next.finalize_tx_hash = patch.finalize_tx_hash;
        }
        match &patch.error {
            Some(ErrorPatch::Set { message, at }) => {
                next.last_error = Some(message.clone());
                next.last_error_at = Some(*at);
            }
            Some(ErrorPatch::Clear) => {
                next.last_error = None;
                next.last_error_at = None;
            }
            None => {}
        }
        next
    }
}

/// Status and step, always written together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub status: WithdrawalStatus,
    pub current_step: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorPatch {
    Set { message: String, at: u64 },
    Clear,
}

/// A set of field updates produced by the transition engine or a failed step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WithdrawalPatch {
    pub status: Option<StatusChange>,
    pub state_root_published_at: Option<u64>,
    pub proven_at: Option<u64>,
    pub challenge_period_ends_at: Option<u64>,
    pub finalized_at: Option<u64>,
    pub prove_tx_hash: Option<TxHash>,
    pub finalize_tx_hash: Option<TxHash>,
    pub error: Option<ErrorPatch>,
}

impl WithdrawalPatch {
    /// Patch that only records an informational error.
    pub fn error(message: impl Into<String>, at: u64) -> Self {
        Self {
            error: Some(ErrorPatch::Set {
                message: message.into(),
                at,
            }),
            ..Default::default()
        }
    }
}
