//! Supervisor configuration
//!
//! Paths, probe host, process launch settings and every timing constant the
//! supervisor uses. Defaults mirror the production layout; tests shrink the
//! timings through the fluent `with_*` API.

use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_ENTRYPOINT: &str = "main.py";
pub const DEFAULT_INTERPRETER: &str = "python3";
pub const DEFAULT_CONFIG_FILE: &str = "config/unified_config.json";

pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);
pub const DEFAULT_STATUS_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Group start order used when no explicit group list is given
pub const GROUP_PRIORITY: [&str; 9] = [
    "core",
    "monitoring",
    "tools",
    "physical",
    "intelligence",
    "advanced",
    "orchestration",
    "multimodal",
    "academic",
];

/// Delays and windows used while starting a group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartupTimings {
    /// Pause after spawning a dependency
    pub dependency_delay: Duration,
    /// Pause after spawning a group's own node
    pub primary_delay: Duration,
    /// Pause between readiness probes
    pub poll_interval: Duration,
    /// Readiness window per node
    pub max_wait: Duration,
    /// Timeout of each readiness probe
    pub probe_timeout: Duration,
}

impl Default for StartupTimings {
    fn default() -> Self {
        Self {
            dependency_delay: Duration::from_secs(1),
            primary_delay: Duration::from_secs(2),
            poll_interval: Duration::from_secs(1),
            max_wait: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub project_root: PathBuf,
    pub nodes_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub config_file: PathBuf,
    pub host: String,
    pub entrypoint: String,
    pub interpreter: Option<String>,
    pub grace_period: Duration,
    pub status_probe_timeout: Duration,
    pub startup: StartupTimings,
}

impl SupervisorConfig {
    /// Standard layout under a project root: `nodes/`, `logs/`, `config/unified_config.json`
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        let root = project_root.as_ref().to_path_buf();
        Self {
            nodes_dir: root.join("nodes"),
            logs_dir: root.join("logs"),
            config_file: root.join(DEFAULT_CONFIG_FILE),
            project_root: root,
            host: DEFAULT_HOST.to_string(),
            entrypoint: DEFAULT_ENTRYPOINT.to_string(),
            interpreter: Some(DEFAULT_INTERPRETER.to_string()),
            grace_period: DEFAULT_GRACE_PERIOD,
            status_probe_timeout: DEFAULT_STATUS_PROBE_TIMEOUT,
            startup: StartupTimings::default(),
        }
    }

    pub fn with_nodes_dir(mut self, nodes_dir: impl Into<PathBuf>) -> Self {
        self.nodes_dir = nodes_dir.into();
        self
    }

    pub fn with_logs_dir(mut self, logs_dir: impl Into<PathBuf>) -> Self {
        self.logs_dir = logs_dir.into();
        self
    }

    pub fn with_config_file(mut self, config_file: impl Into<PathBuf>) -> Self {
        self.config_file = config_file.into();
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_entrypoint(mut self, entrypoint: impl Into<String>) -> Self {
        self.entrypoint = entrypoint.into();
        self
    }

    /// `None` executes the entry point directly
    pub fn with_interpreter(mut self, interpreter: Option<String>) -> Self {
        self.interpreter = interpreter;
        self
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    pub fn with_status_probe_timeout(mut self, timeout: Duration) -> Self {
        self.status_probe_timeout = timeout;
        self
    }

    pub fn with_startup_timings(mut self, startup: StartupTimings) -> Self {
        self.startup = startup;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let config = SupervisorConfig::new("/opt/galaxy");

        assert_eq!(config.nodes_dir, PathBuf::from("/opt/galaxy/nodes"));
        assert_eq!(config.logs_dir, PathBuf::from("/opt/galaxy/logs"));
        assert_eq!(
            config.config_file,
            PathBuf::from("/opt/galaxy/config/unified_config.json")
        );
        assert_eq!(config.entrypoint, "main.py");
        assert_eq!(config.interpreter.as_deref(), Some("python3"));
        assert_eq!(config.grace_period, Duration::from_secs(5));
        assert_eq!(config.status_probe_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_default_startup_timings() {
        let timings = StartupTimings::default();
        assert_eq!(timings.dependency_delay, Duration::from_secs(1));
        assert_eq!(timings.primary_delay, Duration::from_secs(2));
        assert_eq!(timings.poll_interval, Duration::from_secs(1));
        assert_eq!(timings.max_wait, Duration::from_secs(30));
    }

    #[test]
    fn test_fluent_overrides() {
        let config = SupervisorConfig::new(".")
            .with_host("localhost")
            .with_interpreter(None)
            .with_entrypoint("run.sh")
            .with_grace_period(Duration::from_millis(250));

        assert_eq!(config.host, "localhost");
        assert!(config.interpreter.is_none());
        assert_eq!(config.entrypoint, "run.sh");
        assert_eq!(config.grace_period, Duration::from_millis(250));
    }

    #[test]
    fn test_group_priority_starts_with_core() {
        assert_eq!(GROUP_PRIORITY[0], "core");
        assert_eq!(GROUP_PRIORITY[1], "monitoring");
        assert_eq!(GROUP_PRIORITY.len(), 9);
    }
}
