//! Background loops: the periodic sync pass, the periodic probe sweep and the
//! wallet event listener.
//!
//! The loops have independent lifecycles and are stopped together through
//! [`SchedulerHandle::shutdown`]. In-flight status checks are not cancelled
//! individually; a loop only observes shutdown between sweeps.

use crate::{
    events::{self, WalletEvent},
    Orchestrator, SweepIntervals,
};
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::{mpsc, watch},
    task::JoinSet,
    time::{self, MissedTickBehavior},
};
use tracing::{debug, info, warn};

pub struct Scheduler {
    orchestrator: Arc<Orchestrator>,
    intervals: SweepIntervals,
}

/// Running scheduler tasks.
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    tasks: JoinSet<()>,
}

impl SchedulerHandle {
    /// Signal every loop to stop and wait for them.
    pub async fn shutdown(mut self) {
        // Receivers only go away once their loop has already exited.
        let _ = self.shutdown.send(true);
        while self.tasks.join_next().await.is_some() {}
        info!("Scheduler stopped");
    }
}

impl Scheduler {
    pub const fn new(orchestrator: Arc<Orchestrator>, intervals: SweepIntervals) -> Self {
        Self {
            orchestrator,
            intervals,
        }
    }

    /// Start the loops. Both timers fire immediately once.
    pub fn spawn(self, events: mpsc::Receiver<WalletEvent>) -> SchedulerHandle {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let mut tasks = JoinSet::new();

        tasks.spawn(sync_loop(
            Arc::clone(&self.orchestrator),
            self.intervals.sync,
            shutdown_rx.clone(),
        ));
        tasks.spawn(probe_loop(
            Arc::clone(&self.orchestrator),
            self.intervals.probe,
            shutdown_rx.clone(),
        ));
        tasks.spawn(event_loop(self.orchestrator, events, shutdown_rx));

        info!(
            sync_secs = self.intervals.sync.as_secs(),
            probe_secs = self.intervals.probe.as_secs(),
            "Scheduler started"
        );
        SchedulerHandle { shutdown, tasks }
    }
}

fn ticker(period: Duration) -> time::Interval {
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

async fn sync_loop(
    orchestrator: Arc<Orchestrator>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = ticker(period);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(e) = orchestrator.sync().await {
                    warn!(error = %e, "Sync pass failed");
                }
            }
            _ = shutdown.changed() => break,
        }
    }
    debug!("Sync loop exited");
}

async fn probe_loop(
    orchestrator: Arc<Orchestrator>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = ticker(period);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(e) = orchestrator.probe_sweep().await {
                    warn!(error = %e, "Probe sweep failed");
                }
            }
            _ = shutdown.changed() => break,
        }
    }
    debug!("Probe loop exited");
}

async fn event_loop(
    orchestrator: Arc<Orchestrator>,
    mut events: mpsc::Receiver<WalletEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => {
                    debug!(?event, "Wallet event");
                    events::handle(&orchestrator, event).await;
                }
                None => break,
            },
            _ = shutdown.changed() => break,
        }
    }
    debug!("Event loop exited");
}
