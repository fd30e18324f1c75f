//! Prioritized fallback chains of information sources.
//!
//! Sources are tried in order, each bounded by its own timeout; the first
//! success wins. A failing source is logged and skipped, and only an exhausted
//! chain is an error.

use async_trait::async_trait;
use std::{sync::Arc, time::Duration};
use tracing::{debug, error, warn};
use withdrawal::{
    Confidence, FlowError, ProbeResult, ProbeSignal, ProofBlob, StepId, WithdrawalRecord,
};

/// What a single status source observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub signal: ProbeSignal,
    pub detail: String,
}

impl Observation {
    pub fn new(signal: ProbeSignal, detail: impl Into<String>) -> Self {
        Self {
            signal,
            detail: detail.into(),
        }
    }
}

#[async_trait]
pub trait StatusSource: Send + Sync {
    fn name(&self) -> &'static str;

    fn confidence(&self) -> Confidence;

    /// Observe `record` at unix time `now`. Must not mutate anything.
    async fn probe(&self, record: &WithdrawalRecord, now: u64) -> Result<Observation, FlowError>;
}

#[async_trait]
pub trait ProofSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch(&self, record: &WithdrawalRecord, step: StepId)
        -> Result<ProofBlob, FlowError>;
}

/// Status sources in decreasing order of confidence.
#[derive(Clone)]
pub struct ProbeChain {
    sources: Vec<Arc<dyn StatusSource>>,
    timeout: Duration,
}

impl ProbeChain {
    pub fn new(sources: Vec<Arc<dyn StatusSource>>, timeout: Duration) -> Self {
        Self { sources, timeout }
    }

    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    pub async fn probe(&self, record: &WithdrawalRecord, now: u64) -> Result<ProbeResult, FlowError> {
        let mut attempts = Vec::with_capacity(self.sources.len());

        for source in &self.sources {
            let name = source.name();
            let outcome = match tokio::time::timeout(self.timeout, source.probe(record, now)).await
            {
                Ok(outcome) => outcome,
                Err(_) => Err(FlowError::transient(name, "timed out")),
            };

            match outcome {
                Ok(observation) => {
                    debug!(
                        withdrawal_id = %record.id,
                        source = name,
                        signal = observation.signal.as_str(),
                        "Probe answered"
                    );
                    return Ok(ProbeResult {
                        signal: observation.signal,
                        confidence: source.confidence(),
                        source: name.to_string(),
                        detail: observation.detail,
                    });
                }
                Err(e) => {
                    warn!(withdrawal_id = %record.id, source = name, error = %e, "Status source failed");
                    attempts.push(format!("{name}: {e}"));
                }
            }
        }

        error!(withdrawal_id = %record.id, "All status sources failed");
        Err(FlowError::SourcesExhausted(attempts))
    }
}

/// Proof sources in order of preference.
///
/// A proof is only accepted once it validates against the record's family;
/// a malformed answer counts as a failed source.
#[derive(Clone)]
pub struct ProofChain {
    sources: Vec<Arc<dyn ProofSource>>,
    timeout: Duration,
}

impl ProofChain {
    pub fn new(sources: Vec<Arc<dyn ProofSource>>, timeout: Duration) -> Self {
        Self { sources, timeout }
    }

    pub async fn fetch(
        &self,
        record: &WithdrawalRecord,
        step: StepId,
    ) -> Result<ProofBlob, FlowError> {
        let mut attempts = Vec::with_capacity(self.sources.len());

        for source in &self.sources {
            let name = source.name();
            let outcome = match tokio::time::timeout(self.timeout, source.fetch(record, step)).await
            {
                Ok(outcome) => outcome,
                Err(_) => Err(FlowError::transient(name, "timed out")),
            }
            .and_then(|proof| {
                proof
                    .validate(record.rollup_family)
                    .map(|()| proof)
                    .map_err(|source| FlowError::MalformedProof {
                        origin: name,
                        source,
                    })
            });

            match outcome {
                Ok(proof) => {
                    debug!(withdrawal_id = %record.id, source = name, %step, "Proof fetched");
                    return Ok(proof);
                }
                Err(e) => {
                    warn!(withdrawal_id = %record.id, source = name, error = %e, "Proof source failed");
                    attempts.push(format!("{name}: {e}"));
                }
            }
        }

        error!(withdrawal_id = %record.id, %step, "All proof sources failed");
        Err(FlowError::SourcesExhausted(attempts))
    }
}
