//! Registry-wide health fan-out
//!
//! Probes every registry entry concurrently and folds the results into either
//! a console snapshot or a structured report.

use chrono::Utc;
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;

use shared::{NodeStatus, Report};

use crate::core::report::build_report;
use crate::core::{NodeRegistry, Observation, StatusSnapshot};
use crate::traits::{HealthProber, ProcessManager};

pub struct StatusReporter<P, H>
where
    P: ProcessManager + 'static,
    H: HealthProber + 'static,
{
    registry: Arc<NodeRegistry>,
    processes: Arc<P>,
    prober: Arc<H>,
    probe_timeout: Duration,
}

impl<P, H> StatusReporter<P, H>
where
    P: ProcessManager + 'static,
    H: HealthProber + 'static,
{
    pub fn new(registry: Arc<NodeRegistry>, processes: Arc<P>, prober: Arc<H>, probe_timeout: Duration) -> Self {
        Self {
            registry,
            processes,
            prober,
            probe_timeout,
        }
    }

    /// Probe every node once and classify it as healthy, unhealthy or not running
    pub async fn check_all(&self) -> StatusSnapshot {
        let checked_at = Utc::now();
        let observations = self.observe().await;
        StatusSnapshot::from_observations(checked_at, observations)
    }

    /// Probe every node once and build the structured report
    pub async fn generate_report(&self) -> Report {
        let timestamp = Utc::now();
        let observations = self.observe().await;
        build_report(timestamp, observations)
    }

    /// Run `check_all` every `interval` until a shutdown message arrives
    ///
    /// Shutdown is only observed between cycles, so probes already in flight
    /// finish within their own timeout.
    pub async fn monitor<F>(&self, interval: Duration, shutdown: &mut mpsc::Receiver<()>, mut on_snapshot: F)
    where
        F: FnMut(&StatusSnapshot),
    {
        loop {
            let snapshot = self.check_all().await;
            on_snapshot(&snapshot);

            tokio::select! {
                _ = sleep(interval) => {},
                _ = shutdown.recv() => break,
            }
        }
    }

    /// One concurrent pass over the registry
    ///
    /// The live set is read once up front so every row in the pass sees the
    /// same view of which nodes are tracked.
    async fn observe(&self) -> Vec<Observation> {
        self.processes.reap_exited().await;
        let tracked = self.processes.tracked_nodes().await;

        let probes = self.registry.sorted_by_port().into_iter().map(|descriptor| {
            let tracked = tracked.contains(&descriptor.id);
            async move {
                let health = self.prober.probe(descriptor, self.probe_timeout).await;
                if tracked {
                    let status = if health.healthy {
                        NodeStatus::Healthy
                    } else {
                        NodeStatus::Unhealthy
                    };
                    self.processes.record_status(&descriptor.id, status).await;
                }
                Observation {
                    descriptor: descriptor.clone(),
                    tracked,
                    health,
                }
            }
        });

        join_all(probes).await
    }
}
