//! Withdrawal state machine.
//!
//! A pure function from (record, trigger) to an optional patch. Each family
//! has a fixed linear order (see [`crate::types::status_order`]); the engine
//! only ever moves a record forward along it, or into the side-terminal
//! `failed`. Anything it does not recognise is a no-op.

use crate::types::{
    ProbeSignal, RollupFamily, StatusChange, StepId, WithdrawalPatch, WithdrawalRecord,
    WithdrawalStatus, ErrorPatch,
};
use alloy_primitives::TxHash;

/// Input to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// A status source observed something about the withdrawal.
    Probe(ProbeSignal),
    /// An L1 transaction for `step` was broadcast but is not yet confirmed.
    Broadcast { step: StepId, tx_hash: TxHash },
    /// An L1 transaction for `step` was confirmed successfully.
    Submitted { step: StepId, tx_hash: TxHash },
}

/// Environment the engine needs besides the record itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionContext {
    /// Current unix time in seconds.
    pub now: u64,
    /// Challenge period of the record's rollup, in seconds.
    pub challenge_period_secs: u64,
}

/// Status the trigger moves a record to, if the trigger satisfies the
/// current status's exit condition.
fn target(
    family: RollupFamily,
    status: WithdrawalStatus,
    trigger: Trigger,
) -> Option<WithdrawalStatus> {
    use ProbeSignal as S;
    use RollupFamily::{Arbitrum, OpStack};
    use Trigger::{Broadcast, Probe, Submitted};
    use WithdrawalStatus::*;

    if status.is_terminal() {
        return None;
    }

    match (family, status, trigger) {
        (_, _, Probe(S::Failed)) => Some(Failed),

        (OpStack, Initiated, Probe(S::NotReady)) => Some(WaitingStateRoot),
        (OpStack, Initiated | WaitingStateRoot, Probe(S::ReadyForNextStep)) => Some(ReadyToProve),
        (OpStack, ReadyToProve, Probe(S::AlreadyExecuted))
        | (
            OpStack,
            ReadyToProve,
            Submitted {
                step: StepId::Prove,
                ..
            },
        ) => Some(Proven),
        (OpStack, Proven, Probe(S::NotReady)) => Some(WaitingChallenge),
        (OpStack, Proven | WaitingChallenge, Probe(S::ChallengeElapsed)) => Some(ReadyToFinalize),
        (OpStack, ReadyToFinalize, Probe(S::AlreadyExecuted))
        | (
            OpStack,
            ReadyToFinalize,
            Submitted {
                step: StepId::Finalize,
                ..
            },
        ) => Some(Finalized),

        (Arbitrum, Initiated, Probe(S::NotReady)) => Some(WaitingChallenge),
        (Arbitrum, Initiated | WaitingChallenge, Probe(S::ChallengeElapsed)) => {
            Some(ReadyToExecute)
        }
        (
            Arbitrum,
            ReadyToExecute,
            Broadcast {
                step: StepId::Execute,
                ..
            },
        ) => Some(Executing),
        (Arbitrum, ReadyToExecute | Executing, Probe(S::AlreadyExecuted))
        | (
            Arbitrum,
            ReadyToExecute | Executing,
            Submitted {
                step: StepId::Execute,
                ..
            },
        ) => Some(Completed),

        _ => None,
    }
}

/// Compute the patch for `trigger`, or `None` if the trigger is not an exit
/// condition of the record's current status.
///
/// An accepted transition always carries status and step together, the
/// milestone timestamp of the new status, and clears the informational error.
pub fn transition(
    record: &WithdrawalRecord,
    trigger: Trigger,
    ctx: TransitionContext,
) -> Option<WithdrawalPatch> {
    let family = record.rollup_family;
    let next = target(family, record.status, trigger)?;
    let next_step = next.step(family)?;

    if next_step <= record.current_step {
        return None;
    }

    // Milestones never precede earlier ones, whatever the local clock says.
    let at = ctx.now.max(record.latest_milestone());

    let mut patch = WithdrawalPatch {
        status: Some(StatusChange {
            status: next,
            current_step: next_step,
        }),
        error: record.last_error.as_ref().map(|_| ErrorPatch::Clear),
        ..Default::default()
    };

    match next {
        WithdrawalStatus::ReadyToProve => patch.state_root_published_at = Some(at),
        WithdrawalStatus::Proven => {
            patch.proven_at = Some(at);
            patch.challenge_period_ends_at = Some(at + ctx.challenge_period_secs);
        }
        WithdrawalStatus::WaitingChallenge
            if family == RollupFamily::Arbitrum && record.challenge_period_ends_at.is_none() =>
        {
            // The Arbitrum window starts when the message lands in an assertion,
            // approximated by initiation.
            patch.challenge_period_ends_at =
                Some(record.initiated_at + ctx.challenge_period_secs);
        }
        WithdrawalStatus::Finalized | WithdrawalStatus::Completed => {
            patch.finalized_at = Some(at);
        }
        _ => {}
    }

    match trigger {
        Trigger::Broadcast { step, tx_hash } | Trigger::Submitted { step, tx_hash } => {
            match step {
                StepId::Prove => patch.prove_tx_hash = Some(tx_hash),
                StepId::Finalize | StepId::Execute => patch.finalize_tx_hash = Some(tx_hash),
            }
        }
        Trigger::Probe(_) => {}
    }

    Some(patch)
}
