//! Node registry
//!
//! Static, validated set of node descriptors grouped by logical group name,
//! plus a flattened id index built once at load time. Nothing mutates the
//! registry after construction.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use shared::{DependencyRef, NodeDescriptor, NodeId, NodeKey, SharedError, DEFAULT_HEALTH_CHECK_PATH};
use tracing::warn;

use crate::config::GROUP_PRIORITY;
use crate::error::{SupervisorError, SupervisorResult};

const DEFAULT_GROUP: &str = "core";

/// Top-level configuration document; unknown keys are ignored
#[derive(Debug, Deserialize)]
struct ConfigDocument {
    #[serde(default)]
    nodes: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct NodeEntry {
    id: Option<String>,
    name: Option<String>,
    port: Option<i64>,
    group: Option<String>,
    #[serde(default)]
    critical: bool,
    #[serde(alias = "autoStart")]
    auto_start: Option<bool>,
    #[serde(alias = "healthCheckPath")]
    health_check_path: Option<String>,
    #[serde(default)]
    dependencies: Vec<DependencyEntry>,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DependencyEntry {
    Reference(String),
    Structured { id: String },
}

impl DependencyEntry {
    fn resolve(&self) -> Result<DependencyRef, SharedError> {
        match self {
            DependencyEntry::Reference(reference) => reference.parse(),
            DependencyEntry::Structured { id } if !id.trim().is_empty() => Ok(DependencyRef::new(id.trim())),
            DependencyEntry::Structured { id } => Err(SharedError::InvalidNodeRef { input: id.clone() }),
        }
    }
}

fn invalid(error: SharedError) -> SupervisorError {
    SupervisorError::config(error.to_string())
}

/// Configuration problem that does not prevent the registry from loading
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryWarning {
    DuplicatePort { port: u16, nodes: Vec<NodeId> },
    UnknownDependency { node: NodeId, dependency: NodeId },
    SelfDependency { node: NodeId },
}

impl fmt::Display for RegistryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryWarning::DuplicatePort { port, nodes } => {
                let ids: Vec<&str> = nodes.iter().map(NodeId::as_str).collect();
                write!(f, "port {port} is assigned to multiple nodes: {}", ids.join(", "))
            }
            RegistryWarning::UnknownDependency { node, dependency } => {
                write!(f, "node {node} depends on unknown node {dependency}")
            }
            RegistryWarning::SelfDependency { node } => write!(f, "node {node} depends on itself"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NodeRegistry {
    groups: HashMap<String, Vec<NodeDescriptor>>,
    index: HashMap<NodeId, NodeDescriptor>,
}

impl NodeRegistry {
    /// Build a registry from grouped descriptors, rejecting duplicate ids
    pub fn from_groups(groups: HashMap<String, Vec<NodeDescriptor>>) -> SupervisorResult<Self> {
        let mut index = HashMap::new();
        for descriptor in groups.values().flatten() {
            if index.insert(descriptor.id.clone(), descriptor.clone()).is_some() {
                return Err(SupervisorError::config(format!(
                    "duplicate node id {}",
                    descriptor.id
                )));
            }
        }

        Ok(Self { groups, index })
    }

    /// Parse a configuration document
    ///
    /// Every failure is a `ConfigError`. Entries whose key does not resolve to
    /// an id and name (and that carry no explicit `id`/`name`) are skipped.
    pub fn from_json_str(source: &str) -> SupervisorResult<Self> {
        let document: ConfigDocument = serde_json::from_str(source)
            .map_err(|e| SupervisorError::config(format!("invalid configuration document: {e}")))?;
        let mut groups: HashMap<String, Vec<NodeDescriptor>> = HashMap::new();

        for (key, value) in document.nodes {
            let entry: NodeEntry = serde_json::from_value(value)
                .map_err(|e| SupervisorError::config(format!("node {key}: {e}")))?;
            let Some(descriptor) = Self::descriptor_from_entry(&key, entry)? else {
                continue;
            };
            groups.entry(descriptor.group.clone()).or_default().push(descriptor);
        }

        Self::from_groups(groups)
    }

    /// Read and parse a configuration file
    pub fn load(path: &Path) -> SupervisorResult<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            SupervisorError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&source)
    }

    /// Load the configuration file, falling back to the built-in registry on any failure
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            warn!("⚠️  Config file {} not found, using defaults", path.display());
            return Self::builtin_default();
        }

        match Self::load(path) {
            Ok(registry) => {
                for warning in registry.validate() {
                    warn!("⚠️  Configuration warning: {}", warning);
                }
                registry
            }
            Err(e) => {
                warn!("❌ Error loading config {}: {}, using defaults", path.display(), e);
                Self::builtin_default()
            }
        }
    }

    /// Minimal registry covering the mandatory core and monitoring groups
    pub fn builtin_default() -> Self {
        let core: [(&str, &str, u16); 7] = [
            ("00", "StateMachine", 8000),
            ("01", "OneAPI", 8001),
            ("02", "Tasker", 8002),
            ("03", "SecretVault", 8003),
            ("04", "Router", 8004),
            ("05", "Auth", 8005),
            ("06", "Filesystem", 8006),
        ];
        let monitoring: [(&str, &str, u16); 2] = [("65", "LoggerCentral", 8064), ("67", "HealthMonitor", 8066)];

        let build = |group: &str, nodes: &[(&str, &str, u16)]| -> Vec<NodeDescriptor> {
            nodes
                .iter()
                .map(|(id, name, port)| NodeDescriptor::new(*id, *name, *port, group).critical())
                .collect()
        };

        let mut groups = HashMap::new();
        groups.insert("core".to_string(), build("core", &core));
        groups.insert("monitoring".to_string(), build("monitoring", &monitoring));

        let index = groups
            .values()
            .flatten()
            .map(|d| (d.id.clone(), d.clone()))
            .collect();

        Self { groups, index }
    }

    /// `Ok(None)` when the entry cannot be named
    fn descriptor_from_entry(key: &str, entry: NodeEntry) -> SupervisorResult<Option<NodeDescriptor>> {
        let (id, name) = match (entry.id, entry.name) {
            (Some(id), Some(name)) => (NodeId::new(id), name),
            (explicit_id, explicit_name) => match key.parse::<NodeKey>() {
                Ok(parsed) => (
                    explicit_id.map(NodeId::new).unwrap_or(parsed.id),
                    explicit_name.unwrap_or(parsed.name),
                ),
                Err(e) => {
                    warn!("⚠️  Skipping configuration entry: {}", e);
                    return Ok(None);
                }
            },
        };

        let port = match entry.port {
            Some(port) => u16::try_from(port)
                .ok()
                .filter(|p| *p > 0)
                .ok_or_else(|| {
                    invalid(SharedError::InvalidConfig {
                        field: format!("{key}.port"),
                        value: port.to_string(),
                    })
                })?,
            None => {
                return Err(SupervisorError::config(format!(
                    "node {key} is missing required field 'port'"
                )))
            }
        };

        let dependencies = entry
            .dependencies
            .iter()
            .map(DependencyEntry::resolve)
            .collect::<Result<Vec<_>, _>>()
            .map_err(invalid)?;

        let health_check_path = match entry.health_check_path {
            Some(path) if path.starts_with('/') => path,
            Some(path) => format!("/{path}"),
            None => DEFAULT_HEALTH_CHECK_PATH.to_string(),
        };

        Ok(Some(NodeDescriptor {
            id,
            name,
            port,
            group: entry.group.unwrap_or_else(|| DEFAULT_GROUP.to_string()),
            auto_start: entry.auto_start.unwrap_or(entry.critical),
            health_check_path,
            dependencies,
            critical: entry.critical,
            description: entry.description,
        }))
    }

    /// Flattened id index, built once at construction
    pub fn flatten(&self) -> &HashMap<NodeId, NodeDescriptor> {
        &self.index
    }

    pub fn get(&self, id: &NodeId) -> Option<&NodeDescriptor> {
        self.index.get(id)
    }

    pub fn group(&self, name: &str) -> Option<&[NodeDescriptor]> {
        self.groups.get(name).map(Vec::as_slice)
    }

    pub fn has_group(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    pub fn group_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.groups.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Priority-ordered groups present in this registry
    pub fn startup_order(&self) -> Vec<&'static str> {
        GROUP_PRIORITY
            .iter()
            .copied()
            .filter(|group| self.has_group(group))
            .collect()
    }

    /// Snapshot of every descriptor ordered by port
    pub fn sorted_by_port(&self) -> Vec<&NodeDescriptor> {
        let mut all: Vec<&NodeDescriptor> = self.index.values().collect();
        all.sort_by(|a, b| a.port.cmp(&b.port).then_with(|| a.id.cmp(&b.id)));
        all
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Configuration warnings: duplicate ports, unknown and self dependencies
    pub fn validate(&self) -> Vec<RegistryWarning> {
        let mut warnings = Vec::new();

        let mut by_port: HashMap<u16, Vec<NodeId>> = HashMap::new();
        for descriptor in self.index.values() {
            by_port.entry(descriptor.port).or_default().push(descriptor.id.clone());
        }
        let mut duplicates: Vec<(u16, Vec<NodeId>)> =
            by_port.into_iter().filter(|(_, ids)| ids.len() > 1).collect();
        duplicates.sort_by_key(|(port, _)| *port);
        for (port, mut nodes) in duplicates {
            nodes.sort();
            warnings.push(RegistryWarning::DuplicatePort { port, nodes });
        }

        for descriptor in self.sorted_by_port() {
            for dependency in &descriptor.dependencies {
                if dependency.id == descriptor.id {
                    warnings.push(RegistryWarning::SelfDependency {
                        node: descriptor.id.clone(),
                    });
                } else if !self.index.contains_key(&dependency.id) {
                    warnings.push(RegistryWarning::UnknownDependency {
                        node: descriptor.id.clone(),
                        dependency: dependency.id.clone(),
                    });
                }
            }
        }

        warnings
    }
}
