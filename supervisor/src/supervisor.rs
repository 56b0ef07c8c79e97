//! Supervisor facade
//!
//! One explicit object per supervisor process owning the registry, the
//! process manager and the prober. The CLI talks to this type only.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use shared::{logging, node_info, node_warn, NodeId, Report};

use crate::config::SupervisorConfig;
use crate::core::{NodeRegistry, StatusSnapshot};
use crate::error::SupervisorResult;
use crate::startup::{GroupStartOrchestrator, GroupStartReport};
use crate::status::StatusReporter;
use crate::traits::{HealthProber, ProcessManager, StopOutcome};

/// How an interruptible start phase ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartPhase {
    /// Every requested group went through startup and readiness
    Completed(Vec<GroupStartReport>),
    /// Shutdown arrived first; holds the outcome of stopping what was launched
    Interrupted(Vec<(NodeId, StopOutcome)>),
}

pub struct Supervisor<P, H>
where
    P: ProcessManager + 'static,
    H: HealthProber + 'static,
{
    registry: Arc<NodeRegistry>,
    processes: Arc<P>,
    startup: GroupStartOrchestrator<P, H>,
    status: StatusReporter<P, H>,

    /// Shutdown signal
    shutdown_tx: mpsc::Sender<()>,
    shutdown_rx: mpsc::Receiver<()>,
}

impl<P, H> Supervisor<P, H>
where
    P: ProcessManager + 'static,
    H: HealthProber + 'static,
{
    pub fn new(registry: NodeRegistry, processes: P, prober: H, config: &SupervisorConfig) -> Self {
        let registry = Arc::new(registry);
        let processes = Arc::new(processes);
        let prober = Arc::new(prober);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let startup = GroupStartOrchestrator::new(
            registry.clone(),
            processes.clone(),
            prober.clone(),
            config.startup,
        );
        let status = StatusReporter::new(
            registry.clone(),
            processes.clone(),
            prober,
            config.status_probe_timeout,
        );

        Self {
            registry,
            processes,
            startup,
            status,
            shutdown_tx,
            shutdown_rx,
        }
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    pub async fn start_group(&self, group: &str, wait: bool) -> SupervisorResult<GroupStartReport> {
        self.startup.start_group(group, wait).await
    }

    /// Start the given groups, or every known group in priority order
    pub async fn start_all(&self, groups: Option<&[String]>) -> Vec<GroupStartReport> {
        self.startup.start_all(groups).await
    }

    /// Start one group (or every group when `group` is `None`) unless shutdown comes first
    ///
    /// On shutdown the start phase is dropped where it stands and every node
    /// launched so far is stopped.
    pub async fn start_until_shutdown(&mut self, group: Option<&str>) -> SupervisorResult<StartPhase> {
        let startup = &self.startup;
        let phase = async move {
            match group {
                Some(group) => startup.start_group(group, true).await.map(|report| vec![report]),
                None => Ok(startup.start_all(None).await),
            }
        };

        tokio::select! {
            reports = phase => Ok(StartPhase::Completed(reports?)),
            _ = self.shutdown_rx.recv() => {
                logging::log_shutdown("interrupt received during startup, stopping nodes");
                Ok(StartPhase::Interrupted(self.stop_all().await?))
            }
        }
    }

    pub async fn stop_node(&self, node_id: &NodeId) -> SupervisorResult<StopOutcome> {
        self.processes.stop(node_id).await
    }

    /// Stop every tracked node and log how each one ended
    pub async fn stop_all(&self) -> SupervisorResult<Vec<(NodeId, StopOutcome)>> {
        let outcomes = self.processes.stop_all().await?;

        for (node_id, outcome) in &outcomes {
            match outcome {
                StopOutcome::Forced => {
                    node_warn!(node_id, "💀 Killed after grace period");
                }
                _ => {
                    node_info!(node_id, "🛑 Stopped ({:?})", outcome);
                }
            }
        }
        Ok(outcomes)
    }

    pub async fn check_all(&self) -> StatusSnapshot {
        self.status.check_all().await
    }

    pub async fn generate_report(&self) -> Report {
        self.status.generate_report().await
    }

    /// Periodic status checks until a shutdown request arrives
    pub async fn monitor<F>(&mut self, interval: Duration, on_snapshot: F)
    where
        F: FnMut(&StatusSnapshot),
    {
        self.status.monitor(interval, &mut self.shutdown_rx, on_snapshot).await;
        logging::log_shutdown("monitor interrupted");
    }

    /// Keep the started nodes alive until shutdown, then stop them all
    pub async fn run_until_shutdown(&mut self) -> SupervisorResult<Vec<(NodeId, StopOutcome)>> {
        let _ = self.shutdown_rx.recv().await;
        logging::log_shutdown("interrupt received, stopping nodes");
        self.stop_all().await
    }

    /// Get shutdown sender for external shutdown requests
    pub fn get_shutdown_sender(&self) -> mpsc::Sender<()> {
        self.shutdown_tx.clone()
    }
}
