//! Trait definitions with mockall annotations for testing
//!
//! The two I/O seams of the supervisor: process lifecycle and health probing.
//! The group start orchestrator and the status reporter are generic over
//! these traits so they can be exercised against mocks.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use shared::{HealthResult, NodeDescriptor, NodeId, NodeStatus};

use crate::error::SupervisorResult;

/// Information about a spawned node process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    pub node_id: NodeId,
    pub pid: u32,
    pub working_dir: PathBuf,
    pub log_file: PathBuf,
    pub started_at: DateTime<Utc>,
}

/// How a tracked process ended when asked to stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Exited within the grace period after the termination signal
    Graceful,
    /// Outlived the grace period and was killed
    Forced,
    /// Had already exited before the stop request
    AlreadyExited,
    /// No live handle for this id
    NotTracked,
}

/// Process lifecycle abstraction
///
/// Owns the live-process map and the per-node status map. Implementations
/// must guard both so concurrent readers see a consistent snapshot.
#[mockall::automock]
#[async_trait::async_trait]
pub trait ProcessManager: Send + Sync {
    /// Spawn a node process and start tracking it
    ///
    /// # Returns
    /// ProcessInfo for the new (or already running) process, or
    /// NodeNotFound / MissingEntrypoint / SpawnFailed
    async fn start(&self, descriptor: &NodeDescriptor) -> SupervisorResult<ProcessInfo>;

    /// Terminate a node: graceful signal, grace period, then forced kill
    ///
    /// The node is removed from the live set whatever the outcome.
    async fn stop(&self, node_id: &NodeId) -> SupervisorResult<StopOutcome>;

    /// Stop every tracked node; each stop is isolated with its own timeout
    async fn stop_all(&self) -> SupervisorResult<Vec<(NodeId, StopOutcome)>>;

    /// Whether the node currently has a live handle
    async fn is_tracked(&self, node_id: &NodeId) -> bool;

    /// Snapshot of the live set
    async fn tracked_nodes(&self) -> HashSet<NodeId>;

    /// Record a lifecycle status for a node
    async fn record_status(&self, node_id: &NodeId, status: NodeStatus);

    /// Current lifecycle status (`NotStarted` when never seen)
    async fn status_of(&self, node_id: &NodeId) -> NodeStatus;

    /// Drop handles whose process has exited
    ///
    /// # Returns
    /// Ids of nodes that were found dead and removed
    async fn reap_exited(&self) -> Vec<NodeId>;
}

/// Health probing abstraction
///
/// A probe never fails: every transport error, timeout or non-success status
/// resolves to an unhealthy result with a diagnostic detail.
#[mockall::automock]
#[async_trait::async_trait]
pub trait HealthProber: Send + Sync {
    /// Probe the node's health endpoint once, bounded by `timeout`
    async fn probe(&self, descriptor: &NodeDescriptor, timeout: Duration) -> HealthResult;
}
