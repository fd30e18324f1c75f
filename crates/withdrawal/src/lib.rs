//! Withdrawal lifecycle domain.
//!
//! Records, statuses and their per-family order, the transition engine, the
//! local/remote reconciliation merge, proof bundle shapes and the error
//! taxonomy shared by every other crate.

pub mod error;
pub mod hash;
pub mod proof;
pub mod reconcile;
pub mod request;
pub mod transition;
pub mod types;

pub use error::{FlowError, ValidationError};
pub use proof::ProofBlob;
pub use request::NewWithdrawal;
pub use transition::{transition, Trigger, TransitionContext};
pub use types::{
    Confidence, NaturalKey, ProbeResult, ProbeSignal, RecordId, RollupFamily, StepId,
    WithdrawalPatch, WithdrawalRecord, WithdrawalStatus,
};
