//! Dependency-ordered group startup
//!
//! Spawns a group's auto-start nodes in listed order, each preceded by any
//! declared dependency that is not already live, then fans out one readiness
//! loop per node and joins on all of them.
//!
//! Dependencies are resolved one level deep: a dependency's own dependencies
//! are not started on its behalf.

use futures_util::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::{sleep, Instant};

use shared::{logging, node_info, node_warn, NodeDescriptor, NodeId, NodeStatus};

use crate::config::StartupTimings;
use crate::core::NodeRegistry;
use crate::error::{SupervisorError, SupervisorResult};
use crate::traits::{HealthProber, ProcessManager};

/// Why a node was launched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchReason {
    /// Declared dependency of a node in the group being started
    Dependency,
    /// Auto-start member of the group itself
    Primary,
}

/// One spawn attempt, in issue order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRecord {
    pub node_id: NodeId,
    pub reason: LaunchReason,
    /// `Starting` on success, otherwise the launch failure status
    pub status: NodeStatus,
}

/// Outcome of starting one group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupStartReport {
    pub group: String,
    pub launches: Vec<LaunchRecord>,
    /// Readiness result per auto-start node; empty when not waiting
    pub readiness: HashMap<NodeId, NodeStatus>,
    pub healthy_count: usize,
    pub total_count: usize,
}

impl GroupStartReport {
    pub fn all_healthy(&self) -> bool {
        self.healthy_count == self.total_count
    }
}

pub struct GroupStartOrchestrator<P, H>
where
    P: ProcessManager + 'static,
    H: HealthProber + 'static,
{
    registry: Arc<NodeRegistry>,
    processes: Arc<P>,
    prober: Arc<H>,
    timings: StartupTimings,
}

impl<P, H> GroupStartOrchestrator<P, H>
where
    P: ProcessManager + 'static,
    H: HealthProber + 'static,
{
    pub fn new(registry: Arc<NodeRegistry>, processes: Arc<P>, prober: Arc<H>, timings: StartupTimings) -> Self {
        Self {
            registry,
            processes,
            prober,
            timings,
        }
    }

    /// Start one group, optionally waiting for every auto-start node to become healthy
    pub async fn start_group(&self, group: &str, wait: bool) -> SupervisorResult<GroupStartReport> {
        let descriptors = self
            .registry
            .group(group)
            .ok_or_else(|| SupervisorError::unknown_group(group))?;

        logging::log_progress("Starting node group", &group.to_uppercase());

        let auto_start: Vec<&NodeDescriptor> = descriptors.iter().filter(|d| d.auto_start).collect();
        let mut launches = Vec::new();

        for descriptor in &auto_start {
            for dependency in &descriptor.dependencies {
                let Some(dependency_descriptor) = self.registry.get(&dependency.id) else {
                    node_warn!(descriptor.id, "⚠️ Unknown dependency {}, skipping", dependency.id);
                    continue;
                };
                if self.processes.is_tracked(&dependency.id).await {
                    continue;
                }

                launches.push(self.launch(dependency_descriptor, LaunchReason::Dependency).await);
                sleep(self.timings.dependency_delay).await;
            }

            // Already started earlier as someone's dependency
            if self.processes.is_tracked(&descriptor.id).await {
                continue;
            }

            launches.push(self.launch(descriptor, LaunchReason::Primary).await);
            sleep(self.timings.primary_delay).await;
        }

        let readiness = if wait {
            logging::log_progress("Waiting for nodes", &format!("{} in {}", auto_start.len(), group));
            self.await_readiness(&auto_start).await
        } else {
            HashMap::new()
        };

        let healthy_count = readiness
            .values()
            .filter(|status| **status == NodeStatus::Healthy)
            .count();
        let report = GroupStartReport {
            group: group.to_string(),
            launches,
            total_count: readiness.len(),
            healthy_count,
            readiness,
        };

        if wait {
            logging::log_success(&format!(
                "Node group {} started: {}/{} healthy",
                group.to_uppercase(),
                report.healthy_count,
                report.total_count
            ));
        }

        Ok(report)
    }

    /// Start several groups, always waiting for readiness before moving on
    ///
    /// With no explicit list the registry's priority order is used. Unknown
    /// groups in an explicit list are logged and skipped.
    pub async fn start_all(&self, groups: Option<&[String]>) -> Vec<GroupStartReport> {
        let groups: Vec<String> = match groups {
            Some(groups) => groups.to_vec(),
            None => self
                .registry
                .startup_order()
                .into_iter()
                .map(String::from)
                .collect(),
        };

        logging::log_startup(&format!("node supervisor: {} group(s)", groups.len()));

        let mut reports = Vec::with_capacity(groups.len());
        for group in &groups {
            match self.start_group(group, true).await {
                Ok(report) => reports.push(report),
                Err(e) => logging::log_error(&format!("Starting group {group}"), &e),
            }
        }
        reports
    }

    async fn launch(&self, descriptor: &NodeDescriptor, reason: LaunchReason) -> LaunchRecord {
        let status = match self.processes.start(descriptor).await {
            Ok(_) => NodeStatus::Starting,
            Err(e) => {
                node_warn!(descriptor.id, "⚠️ Launch failed: {}", e);
                match e {
                    SupervisorError::NodeNotFound { .. } => NodeStatus::NotFound,
                    SupervisorError::MissingEntrypoint { .. } => NodeStatus::MissingEntrypoint,
                    _ => NodeStatus::SpawnFailed,
                }
            }
        };

        LaunchRecord {
            node_id: descriptor.id.clone(),
            reason,
            status,
        }
    }

    /// Concurrent readiness fan-out, results keyed by node id
    async fn await_readiness(&self, descriptors: &[&NodeDescriptor]) -> HashMap<NodeId, NodeStatus> {
        let loops = descriptors.iter().map(|descriptor| async move {
            let status = self.wait_for_node(descriptor).await;
            (descriptor.id.clone(), status)
        });

        join_all(loops).await.into_iter().collect()
    }

    /// Poll one node until healthy or the wait window closes
    async fn wait_for_node(&self, descriptor: &NodeDescriptor) -> NodeStatus {
        let started = Instant::now();

        while started.elapsed() < self.timings.max_wait {
            let result = self.prober.probe(descriptor, self.timings.probe_timeout).await;
            if result.healthy {
                node_info!(descriptor.id, "✅ Node {} is ready", descriptor.name);
                self.processes.record_status(&descriptor.id, NodeStatus::Healthy).await;
                return NodeStatus::Healthy;
            }
            sleep(self.timings.poll_interval).await;
        }

        node_warn!(descriptor.id, "❌ Node {} startup timed out", descriptor.name);
        if !self.processes.status_of(&descriptor.id).await.is_launch_failure() {
            self.processes.record_status(&descriptor.id, NodeStatus::Timeout).await;
        }
        NodeStatus::Timeout
    }
}
