//! Wallet and provider events.

use crate::Orchestrator;
use alloy_primitives::Address;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

const EVENT_BUFFER: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletEvent {
    /// The connected account changed.
    AccountChanged(Address),
    /// The wallet switched to another chain.
    ChainChanged(u64),
    /// Re-check everything now.
    Refresh,
}

pub fn channel() -> (mpsc::Sender<WalletEvent>, mpsc::Receiver<WalletEvent>) {
    mpsc::channel(EVENT_BUFFER)
}

/// React to one event.
///
/// An account change switches the owner, re-syncs and re-probes. Chain
/// changes and refreshes only re-probe.
pub async fn handle(orchestrator: &Arc<Orchestrator>, event: WalletEvent) {
    match event {
        WalletEvent::AccountChanged(owner) => {
            orchestrator.set_owner(owner).await;
            if let Err(e) = orchestrator.sync().await {
                warn!(%owner, error = %e, "Sync after account change failed");
            }
        }
        WalletEvent::ChainChanged(chain_id) => {
            info!(chain_id, "Wallet chain changed");
        }
        WalletEvent::Refresh => {}
    }

    if let Err(e) = orchestrator.probe_sweep().await {
        warn!(?event, error = %e, "Probe sweep after wallet event failed");
    }
}
