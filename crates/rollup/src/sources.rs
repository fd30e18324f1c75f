//! Off-chain sources backed by the backend service and block explorers.

use crate::{
    arbitrum,
    chain::{Observation, ProofSource, StatusSource},
    opstack,
};
use async_trait::async_trait;
use backend::{BackendClient, BackendError, ExplorerClient, StatusRequest};
use std::collections::HashMap;
use withdrawal::{
    proof::{ArbitrumProof, OpStackProof},
    Confidence, FlowError, ProofBlob, RollupFamily, StepId, WithdrawalRecord, WithdrawalStatus,
};

const BACKEND: &str = "backend";
const EXPLORER: &str = "explorer";

fn request(record: &WithdrawalRecord) -> StatusRequest {
    StatusRequest {
        tx_hash: record.transaction_hash,
        l2_chain_id: record.source_chain_id,
        l1_chain_id: record.destination_chain_id,
    }
}

fn transient(origin: &'static str, e: BackendError) -> FlowError {
    FlowError::transient(origin, e)
}

/// Decode untyped proof data into the bundle shape of `family`.
pub fn decode_proof(
    family: RollupFamily,
    data: serde_json::Value,
) -> Result<ProofBlob, serde_json::Error> {
    Ok(match family {
        RollupFamily::OpStack => ProofBlob::OpStack(serde_json::from_value::<OpStackProof>(data)?),
        RollupFamily::Arbitrum => {
            ProofBlob::Arbitrum(serde_json::from_value::<ArbitrumProof>(data)?)
        }
    })
}

/// Status as reported by the backend's rollup SDK. Highest confidence.
pub struct BackendStatus {
    backend: BackendClient,
}

impl BackendStatus {
    pub const fn new(backend: BackendClient) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl StatusSource for BackendStatus {
    fn name(&self) -> &'static str {
        BACKEND
    }

    fn confidence(&self) -> Confidence {
        Confidence::High
    }

    async fn probe(&self, record: &WithdrawalRecord, _now: u64) -> Result<Observation, FlowError> {
        let request = request(record);

        match record.rollup_family {
            RollupFamily::OpStack
                if matches!(
                    record.status,
                    WithdrawalStatus::Proven | WithdrawalStatus::WaitingChallenge
                ) =>
            {
                let response = self
                    .backend
                    .finalization_status(&request)
                    .await
                    .map_err(|e| transient(BACKEND, e))?;
                Ok(opstack::finalization_observation(response.ready))
            }
            RollupFamily::OpStack => {
                let response = self
                    .backend
                    .status(RollupFamily::OpStack, &request)
                    .await
                    .map_err(|e| transient(BACKEND, e))?;
                Ok(opstack::status_observation(record.status, &response))
            }
            RollupFamily::Arbitrum => {
                let response = self
                    .backend
                    .status(RollupFamily::Arbitrum, &request)
                    .await
                    .map_err(|e| transient(BACKEND, e))?;
                Ok(arbitrum::status_observation(record.status, &response))
            }
        }
    }
}

/// Proofs generated by the backend.
///
/// The backend is health-checked with a short timeout first, so an
/// unreachable backend falls through to the explorer without waiting out the
/// full proof timeout.
pub struct BackendProof {
    backend: BackendClient,
}

impl BackendProof {
    pub const fn new(backend: BackendClient) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl ProofSource for BackendProof {
    fn name(&self) -> &'static str {
        BACKEND
    }

    async fn fetch(&self, record: &WithdrawalRecord, _step: StepId) -> Result<ProofBlob, FlowError> {
        self.backend
            .health()
            .await
            .map_err(|e| transient(BACKEND, e))?;

        let data = self
            .backend
            .proof(record.rollup_family, &request(record))
            .await
            .map_err(|e| transient(BACKEND, e))?;

        decode_proof(record.rollup_family, data).map_err(|e| FlowError::transient(BACKEND, e))
    }
}

/// Proofs from the public block explorer of the withdrawal's source chain.
pub struct ExplorerProof {
    explorers: HashMap<u64, ExplorerClient>,
}

impl ExplorerProof {
    pub const fn new(explorers: HashMap<u64, ExplorerClient>) -> Self {
        Self { explorers }
    }
}

#[async_trait]
impl ProofSource for ExplorerProof {
    fn name(&self) -> &'static str {
        EXPLORER
    }

    async fn fetch(&self, record: &WithdrawalRecord, _step: StepId) -> Result<ProofBlob, FlowError> {
        let explorer = self.explorers.get(&record.source_chain_id).ok_or_else(|| {
            FlowError::transient(
                EXPLORER,
                format!("no explorer configured for chain {}", record.source_chain_id),
            )
        })?;

        let data = explorer
            .proof(record.transaction_hash)
            .await
            .map_err(|e| transient(EXPLORER, e))?;

        decode_proof(record.rollup_family, data).map_err(|e| FlowError::transient(EXPLORER, e))
    }
}
