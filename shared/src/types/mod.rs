//! Core shared types and identifiers

pub mod report;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{SharedError, SharedResult};

pub use report::{NodeReport, Report, ReportStatus, ReportSummary};

/// Default HTTP path polled for node health
pub const DEFAULT_HEALTH_CHECK_PATH: &str = "/health";

/// Unique identifier for a supervised node (e.g. "00", "65")
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Parsed form of a configuration key such as `Node_00_StateMachine`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeKey {
    pub id: NodeId,
    pub name: String,
}

impl FromStr for NodeKey {
    type Err = SharedError;

    /// The last `_` segment is the display name; everything between the
    /// `Node` prefix and the name is the id.
    fn from_str(key: &str) -> SharedResult<Self> {
        let parts: Vec<&str> = key.split('_').collect();
        if parts.len() < 3 || parts.iter().any(|p| p.is_empty()) {
            return Err(SharedError::InvalidNodeKey { input: key.to_string() });
        }

        let id = parts[1..parts.len() - 1].join("_");
        let name = parts[parts.len() - 1].to_string();

        Ok(Self { id: NodeId(id), name })
    }
}

/// Structured reference from one node to another it depends on
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyRef {
    pub id: NodeId,
}

impl DependencyRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: NodeId::new(id) }
    }
}

impl FromStr for DependencyRef {
    type Err = SharedError;

    /// Accepts `Node_<id>_<name>`, `Node_<id>` or a bare id. Only the first
    /// segment after the prefix is the id.
    fn from_str(reference: &str) -> SharedResult<Self> {
        let trimmed = reference.trim();
        let stripped = trimmed
            .strip_prefix("Node_")
            .or_else(|| trimmed.strip_prefix("node_"))
            .unwrap_or(trimmed);

        match stripped.split('_').next() {
            Some(id) if !id.is_empty() && !id.contains(char::is_whitespace) => Ok(Self::new(id)),
            _ => Err(SharedError::InvalidNodeRef { input: reference.to_string() }),
        }
    }
}

/// Immutable description of a node, loaded once from configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDescriptor {
    pub id: NodeId,
    pub name: String,
    pub port: u16,
    pub group: String,
    pub auto_start: bool,
    pub health_check_path: String,
    pub dependencies: Vec<DependencyRef>,
    pub critical: bool,
    pub description: String,
}

impl NodeDescriptor {
    /// Descriptor with defaults: not critical, auto-start off, `/health`, no dependencies
    pub fn new(id: impl Into<String>, name: impl Into<String>, port: u16, group: impl Into<String>) -> Self {
        Self {
            id: NodeId::new(id),
            name: name.into(),
            port,
            group: group.into(),
            auto_start: false,
            health_check_path: DEFAULT_HEALTH_CHECK_PATH.to_string(),
            dependencies: Vec::new(),
            critical: false,
            description: String::new(),
        }
    }

    /// Mark as critical; critical nodes auto-start
    pub fn critical(mut self) -> Self {
        self.critical = true;
        self.auto_start = true;
        self
    }

    pub fn with_auto_start(mut self, auto_start: bool) -> Self {
        self.auto_start = auto_start;
        self
    }

    pub fn with_dependency(mut self, id: impl Into<String>) -> Self {
        self.dependencies.push(DependencyRef::new(id));
        self
    }

    pub fn with_health_check_path(mut self, path: impl Into<String>) -> Self {
        self.health_check_path = path.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Label used in console output, e.g. `Node_00_StateMachine`
    pub fn label(&self) -> String {
        format!("Node_{}_{}", self.id, self.name)
    }
}

/// Lifecycle state of a node as tracked by the supervisor
///
/// `NotStarted -> Starting -> Running -> (Healthy | Unhealthy | Timeout) -> Stopping -> Stopped`,
/// with `NotFound`, `MissingEntrypoint` and `SpawnFailed` reached directly from `NotStarted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    NotStarted,
    Starting,
    Running,
    Healthy,
    Unhealthy,
    Timeout,
    Stopping,
    Stopped,
    NotFound,
    MissingEntrypoint,
    SpawnFailed,
}

impl NodeStatus {
    /// Launch failures that no later readiness result may overwrite
    pub fn is_launch_failure(&self) -> bool {
        matches!(self, NodeStatus::NotFound | NodeStatus::MissingEntrypoint | NodeStatus::SpawnFailed)
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NodeStatus::NotStarted => "not_started",
            NodeStatus::Starting => "starting",
            NodeStatus::Running => "running",
            NodeStatus::Healthy => "healthy",
            NodeStatus::Unhealthy => "unhealthy",
            NodeStatus::Timeout => "timeout",
            NodeStatus::Stopping => "stopping",
            NodeStatus::Stopped => "stopped",
            NodeStatus::NotFound => "not_found",
            NodeStatus::MissingEntrypoint => "missing_entrypoint",
            NodeStatus::SpawnFailed => "spawn_failed",
        };
        write!(f, "{label}")
    }
}

/// Outcome of a single health probe; never persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResult {
    pub node_id: NodeId,
    pub healthy: bool,
    pub detail: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl HealthResult {
    pub fn healthy(node_id: NodeId) -> Self {
        Self {
            node_id,
            healthy: true,
            detail: None,
            checked_at: Utc::now(),
        }
    }

    pub fn unhealthy(node_id: NodeId, detail: impl Into<String>) -> Self {
        Self {
            node_id,
            healthy: false,
            detail: Some(detail.into()),
            checked_at: Utc::now(),
        }
    }
}
