//! Real process management service implementation
//!
//! Spawns node processes from their working directories, tracks them in a
//! live map, and terminates them with a graceful signal followed by a forced
//! kill once the grace period runs out.

use async_trait::async_trait;
use chrono::Utc;
use futures_util::future::join_all;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

use shared::{node_debug, node_error, node_info, node_warn, NodeDescriptor, NodeId, NodeStatus};

use crate::config::SupervisorConfig;
use crate::error::{SupervisorError, SupervisorResult};
use crate::traits::{ProcessInfo, ProcessManager, StopOutcome};

/// Real process manager implementation
pub struct RealProcessManager {
    /// Live node processes
    live: Mutex<HashMap<NodeId, ProcessHandle>>,

    /// Last known lifecycle status per node
    statuses: Mutex<HashMap<NodeId, NodeStatus>>,

    nodes_dir: PathBuf,
    logs_dir: PathBuf,
    entrypoint: String,
    interpreter: Option<String>,
    grace_period: Duration,
}

/// Handle for a managed process
struct ProcessHandle {
    child: Child,
    info: ProcessInfo,
}

impl RealProcessManager {
    pub fn new(config: &SupervisorConfig) -> Self {
        Self {
            live: Mutex::new(HashMap::new()),
            statuses: Mutex::new(HashMap::new()),
            nodes_dir: config.nodes_dir.clone(),
            logs_dir: config.logs_dir.clone(),
            entrypoint: config.entrypoint.clone(),
            interpreter: config.interpreter.clone(),
            grace_period: config.grace_period,
        }
    }

    /// Candidate directory names in priority order
    fn directory_candidates(descriptor: &NodeDescriptor) -> [String; 4] {
        let id = &descriptor.id;
        let name = &descriptor.name;
        [
            format!("Node_{id}_{name}"),
            format!("Node_{id}"),
            format!("node_{id}_{}", name.to_lowercase()),
            format!("node_{id}"),
        ]
    }

    /// First existing working directory for the node
    pub fn resolve_node_dir(&self, descriptor: &NodeDescriptor) -> Option<PathBuf> {
        Self::directory_candidates(descriptor)
            .iter()
            .map(|candidate| self.nodes_dir.join(candidate))
            .find(|path| path.is_dir())
    }

    /// Per-node log file path
    pub fn log_path(&self, descriptor: &NodeDescriptor) -> PathBuf {
        self.logs_dir
            .join(format!("node_{}_{}.log", descriptor.id, descriptor.name))
    }

    fn spawn_process(
        &self,
        descriptor: &NodeDescriptor,
        node_dir: &Path,
        entrypoint: &Path,
    ) -> SupervisorResult<ProcessHandle> {
        let id = &descriptor.id;

        std::fs::create_dir_all(&self.logs_dir)
            .map_err(|e| SupervisorError::spawn(id, format!("cannot create log directory: {e}")))?;
        let log_file = self.log_path(descriptor);
        let stdout = File::create(&log_file)
            .map_err(|e| SupervisorError::spawn(id, format!("cannot create log file: {e}")))?;
        let stderr = stdout
            .try_clone()
            .map_err(|e| SupervisorError::spawn(id, format!("cannot share log file: {e}")))?;

        let mut cmd = match &self.interpreter {
            Some(interpreter) => {
                let mut cmd = Command::new(interpreter);
                cmd.arg(entrypoint);
                cmd
            }
            None => Command::new(entrypoint),
        };

        cmd.current_dir(node_dir)
            .env("NODE_ID", id.as_str())
            .env("NODE_NAME", &descriptor.name)
            .env("PORT", descriptor.port.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .kill_on_drop(true);

        let child = cmd
            .spawn()
            .map_err(|e| SupervisorError::spawn(id, e.to_string()))?;

        let info = ProcessInfo {
            node_id: id.clone(),
            pid: child.id().unwrap_or(0),
            working_dir: node_dir.to_path_buf(),
            log_file,
            started_at: Utc::now(),
        };

        Ok(ProcessHandle { child, info })
    }

    /// Send the graceful termination request
    #[cfg(unix)]
    fn request_termination(node_id: &NodeId, child: &mut Child) {
        use nix::sys::signal::{self, Signal};
        use nix::unistd::Pid;

        let Some(pid) = child.id() else {
            return;
        };

        match signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            Ok(()) => {
                node_debug!(node_id, "📤 Sent SIGTERM to PID {}", pid);
            }
            Err(nix::errno::Errno::ESRCH) => {
                node_debug!(node_id, "PID {} already gone", pid);
            }
            Err(e) => {
                node_warn!(node_id, "⚠️ Failed to send SIGTERM to PID {}: {}", pid, e);
            }
        }
    }

    #[cfg(not(unix))]
    fn request_termination(node_id: &NodeId, child: &mut Child) {
        if let Err(e) = child.start_kill() {
            node_warn!(node_id, "⚠️ Failed to terminate process: {}", e);
        }
    }

    /// Terminate one process, escalating to a kill after the grace period
    async fn terminate(node_id: &NodeId, mut handle: ProcessHandle, grace_period: Duration) -> StopOutcome {
        if let Ok(Some(status)) = handle.child.try_wait() {
            node_debug!(node_id, "Process already exited with {}", status);
            return StopOutcome::AlreadyExited;
        }

        Self::request_termination(node_id, &mut handle.child);

        match tokio::time::timeout(grace_period, handle.child.wait()).await {
            Ok(_) => {
                node_info!(node_id, "⏹️  Node stopped");
                StopOutcome::Graceful
            }
            Err(_) => {
                node_warn!(
                    node_id,
                    "🔨 Node did not exit within {:?}, killing PID {}",
                    grace_period,
                    handle.info.pid
                );
                if let Err(e) = handle.child.kill().await {
                    node_error!(node_id, "❌ Failed to kill PID {}: {}", handle.info.pid, e);
                }
                StopOutcome::Forced
            }
        }
    }
}

#[async_trait]
impl ProcessManager for RealProcessManager {
    async fn start(&self, descriptor: &NodeDescriptor) -> SupervisorResult<ProcessInfo> {
        let id = &descriptor.id;

        // Held until the new handle is inserted so concurrent starts of one node spawn once
        let mut live = self.live.lock().await;
        if let Some(handle) = live.get(id) {
            node_debug!(id, "Already running (PID {}), not spawning again", handle.info.pid);
            return Ok(handle.info.clone());
        }

        let Some(node_dir) = self.resolve_node_dir(descriptor) else {
            node_error!(id, "❌ Node {} ({}) does not exist", descriptor.name, descriptor.label());
            self.record_status(id, NodeStatus::NotFound).await;
            return Err(SupervisorError::NodeNotFound {
                node_id: id.clone(),
                name: descriptor.name.clone(),
                nodes_dir: self.nodes_dir.display().to_string(),
            });
        };

        let entrypoint = node_dir.join(&self.entrypoint);
        if !entrypoint.is_file() {
            node_error!(id, "❌ Node {} is missing {}", descriptor.name, self.entrypoint);
            self.record_status(id, NodeStatus::MissingEntrypoint).await;
            return Err(SupervisorError::MissingEntrypoint {
                node_id: id.clone(),
                path: entrypoint.display().to_string(),
            });
        }

        let handle = match self.spawn_process(descriptor, &node_dir, &entrypoint) {
            Ok(handle) => handle,
            Err(e) => {
                node_error!(id, "❌ Failed to start node {}: {}", descriptor.name, e);
                self.record_status(id, NodeStatus::SpawnFailed).await;
                return Err(e);
            }
        };

        let info = handle.info.clone();
        live.insert(id.clone(), handle);
        self.record_status(id, NodeStatus::Starting).await;
        drop(live);

        node_info!(
            id,
            "🚀 Started node {} (port {}, PID {})",
            descriptor.name,
            descriptor.port,
            info.pid
        );
        Ok(info)
    }

    async fn stop(&self, node_id: &NodeId) -> SupervisorResult<StopOutcome> {
        // Release the map before waiting so other nodes are not blocked
        let handle = self.live.lock().await.remove(node_id);
        let Some(handle) = handle else {
            return Ok(StopOutcome::NotTracked);
        };

        self.record_status(node_id, NodeStatus::Stopping).await;
        let outcome = Self::terminate(node_id, handle, self.grace_period).await;
        self.record_status(node_id, NodeStatus::Stopped).await;

        Ok(outcome)
    }

    async fn stop_all(&self) -> SupervisorResult<Vec<(NodeId, StopOutcome)>> {
        let handles: Vec<(NodeId, ProcessHandle)> = self.live.lock().await.drain().collect();

        {
            let mut statuses = self.statuses.lock().await;
            for (node_id, _) in &handles {
                statuses.insert(node_id.clone(), NodeStatus::Stopping);
            }
        }

        let grace_period = self.grace_period;
        let stops = handles.into_iter().map(|(node_id, handle)| async move {
            let outcome = Self::terminate(&node_id, handle, grace_period).await;
            (node_id, outcome)
        });
        let outcomes = join_all(stops).await;

        {
            let mut statuses = self.statuses.lock().await;
            for (node_id, _) in &outcomes {
                statuses.insert(node_id.clone(), NodeStatus::Stopped);
            }
        }

        Ok(outcomes)
    }

    async fn is_tracked(&self, node_id: &NodeId) -> bool {
        self.live.lock().await.contains_key(node_id)
    }

    async fn tracked_nodes(&self) -> HashSet<NodeId> {
        self.live.lock().await.keys().cloned().collect()
    }

    async fn record_status(&self, node_id: &NodeId, status: NodeStatus) {
        self.statuses.lock().await.insert(node_id.clone(), status);
    }

    async fn status_of(&self, node_id: &NodeId) -> NodeStatus {
        self.statuses
            .lock()
            .await
            .get(node_id)
            .copied()
            .unwrap_or(NodeStatus::NotStarted)
    }

    async fn reap_exited(&self) -> Vec<NodeId> {
        let mut live = self.live.lock().await;
        let mut statuses = self.statuses.lock().await;
        let mut exited = Vec::new();

        for (node_id, handle) in live.iter_mut() {
            match handle.child.try_wait() {
                Ok(Some(status)) => {
                    node_warn!(node_id, "⚠️ Process exited unexpectedly with {}", status);
                    exited.push(node_id.clone());
                }
                Ok(None) => {
                    if statuses.get(node_id) == Some(&NodeStatus::Starting) {
                        statuses.insert(node_id.clone(), NodeStatus::Running);
                    }
                }
                Err(e) => {
                    node_warn!(node_id, "⚠️ Cannot query process state: {}", e);
                }
            }
        }

        for node_id in &exited {
            live.remove(node_id);
            statuses.insert(node_id.clone(), NodeStatus::Stopped);
        }

        exited
    }
}
