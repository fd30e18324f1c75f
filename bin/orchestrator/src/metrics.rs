//! Prometheus metrics for the orchestrator.
//!
//! All metrics are aggregated in the [`Metrics`] struct for easy tracking and management.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::{collections::HashMap, time::Duration};
use withdrawal::{ProbeSignal, StepId, WithdrawalRecord, WithdrawalStatus};

/// Aggregated metrics for the orchestrator.
///
/// Metrics are registered with the global metrics registry on creation.
#[derive(Debug, Clone)]
pub struct Metrics {
    _private: (),
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// Create a new metrics instance and register all metric descriptions.
    pub fn new() -> Self {
        Self::register_descriptions();
        Self { _private: () }
    }

    fn register_descriptions() {
        // Probe metrics
        describe_counter!(
            "orchestrator_probes_total",
            "Answered status probes by source and signal"
        );
        describe_counter!(
            "orchestrator_probes_exhausted_total",
            "Status checks where every source failed"
        );

        // Transition metrics
        describe_counter!(
            "orchestrator_transitions_total",
            "Accepted status transitions by target status"
        );

        // Step metrics
        describe_counter!(
            "orchestrator_step_success_total",
            "Total successful step executions by step name"
        );
        describe_counter!(
            "orchestrator_step_failure_total",
            "Total failed step executions by step name and reason"
        );

        // Sync metrics
        describe_counter!(
            "orchestrator_sync_failure_total",
            "Sync passes that failed to read the local store"
        );

        // Sweep metrics
        describe_histogram!(
            "orchestrator_sweep_duration_seconds",
            "Duration of each background sweep in seconds"
        );

        describe_gauge!(
            "orchestrator_withdrawals",
            "Number of tracked withdrawals by status"
        );
    }

    /// Record an answered probe.
    pub fn record_probe(&self, source: &str, signal: ProbeSignal) {
        counter!(
            "orchestrator_probes_total",
            "source" => source.to_string(),
            "signal" => signal.as_str()
        )
        .increment(1);
    }

    pub fn record_probe_exhausted(&self) {
        counter!("orchestrator_probes_exhausted_total").increment(1);
    }

    pub fn record_transition(&self, status: WithdrawalStatus) {
        counter!("orchestrator_transitions_total", "status" => status.as_str()).increment(1);
    }

    pub fn record_step_success(&self, step: StepId) {
        counter!("orchestrator_step_success_total", "step" => step.as_str()).increment(1);
    }

    pub fn record_step_failure(&self, step: StepId, reason: &'static str) {
        counter!(
            "orchestrator_step_failure_total",
            "step" => step.as_str(),
            "reason" => reason
        )
        .increment(1);
    }

    pub fn record_sync_failure(&self) {
        counter!("orchestrator_sync_failure_total").increment(1);
    }

    /// Record a completed sweep of the given kind (`sync` or `probe`).
    pub fn record_sweep(&self, kind: &'static str, duration: Duration) {
        histogram!("orchestrator_sweep_duration_seconds", "kind" => kind)
            .record(duration.as_secs_f64());
    }

    /// Set the count of tracked withdrawals by status.
    pub fn set_withdrawals(&self, status: WithdrawalStatus, count: usize) {
        gauge!("orchestrator_withdrawals", "status" => status.as_str()).set(count as f64);
    }

    /// Set every status gauge from `records`, zeroing statuses with no record.
    pub fn set_status_counts(&self, records: &[WithdrawalRecord]) {
        let mut counts: HashMap<WithdrawalStatus, usize> = HashMap::new();
        for record in records {
            *counts.entry(record.status).or_default() += 1;
        }
        for status in WithdrawalStatus::ALL {
            self.set_withdrawals(status, counts.get(&status).copied().unwrap_or(0));
        }
    }
}

/// Install the Prometheus metrics exporter and start the HTTP server.
///
/// Returns an error if the server fails to bind to the specified port.
pub fn install_prometheus_exporter(port: u16) -> eyre::Result<()> {
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::net::SocketAddr;

    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| eyre::eyre!("Failed to install Prometheus exporter: {}", e))?;

    Ok(())
}
