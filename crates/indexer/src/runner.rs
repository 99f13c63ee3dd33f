//! Background driver for the three reconciliation cycles.

use std::sync::Arc;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::{info, warn};

use portal_common::config::IntervalConfig;

use crate::reconciler::Reconciler;

/// Runs each cycle on its own interval until shutdown is signalled.
///
/// The cycles are independent tasks; a failing one only logs and waits
/// for its next tick, it never stops the others.
pub struct ReconcilerRunner {
    reconciler: Arc<Reconciler>,
    intervals: IntervalConfig,
    shutdown: Arc<Notify>,
}

impl ReconcilerRunner {
    pub fn new(reconciler: Arc<Reconciler>, intervals: IntervalConfig, shutdown: Arc<Notify>) -> Self {
        Self { reconciler, intervals, shutdown }
    }

    pub fn start(self) -> Vec<JoinHandle<()>> {
        info!(
            discovery = self.intervals.contract_discovery_secs,
            status = self.intervals.contract_status_secs,
            validators = self.intervals.validator_snapshot_secs,
            "reconciler started"
        );

        let discovery = {
            let reconciler = self.reconciler.clone();
            let shutdown = self.shutdown.clone();
            let interval = self.intervals.contract_discovery_secs;
            spawn_cycle("contract discovery", interval, shutdown, move || {
                let reconciler = reconciler.clone();
                async move { reconciler.discover_contracts().await.map(|_| ()) }
            })
        };

        let status = {
            let reconciler = self.reconciler.clone();
            let shutdown = self.shutdown.clone();
            let interval = self.intervals.contract_status_secs;
            spawn_cycle("contract status", interval, shutdown, move || {
                let reconciler = reconciler.clone();
                async move { reconciler.refresh_contracts().await.map(|_| ()) }
            })
        };

        let validators = {
            let reconciler = self.reconciler;
            let shutdown = self.shutdown;
            let interval = self.intervals.validator_snapshot_secs;
            spawn_cycle("validator snapshot", interval, shutdown, move || {
                let reconciler = reconciler.clone();
                async move { reconciler.refresh_validators().await.map(|_| ()) }
            })
        };

        vec![discovery, status, validators]
    }
}

fn spawn_cycle<F, Fut>(
    name: &'static str,
    interval_secs: u64,
    shutdown: Arc<Notify>,
    mut run: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: std::future::Future<Output = Result<(), crate::reconciler::ReconcileError>> + Send,
{
    tokio::spawn(async move {
        // first run immediately so the API has data before the first tick
        if let Err(e) = run().await {
            warn!("{} cycle failed: {}", name, e);
        }
        loop {
            tokio::select! {
                _ = shutdown.notified() => {
                    info!("{} cycle shutting down", name);
                    break;
                }
                _ = sleep(Duration::from_secs(interval_secs)) => {
                    if let Err(e) = run().await {
                        warn!("{} cycle failed: {}", name, e);
                    }
                }
            }
        }
    })
}
