//! Temporary project layouts for driving real node processes

use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

use supervisor::SupervisorConfig;

use super::fixtures::TestFixtures;

/// A throwaway project root with `nodes/` and `logs/` underneath
pub struct TestWorkspace {
    root: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("nodes")).unwrap();
        Self { root }
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    /// Create `nodes/<dir_name>/main.sh` with the given script body
    pub fn add_node(&self, dir_name: &str, script: &str) -> PathBuf {
        let dir = self.path().join("nodes").join(dir_name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(TestFixtures::ENTRYPOINT), script).unwrap();
        dir
    }

    /// Config that runs `sh main.sh` with shortened timings
    pub fn config(&self) -> SupervisorConfig {
        SupervisorConfig::new(self.path())
            .with_entrypoint(TestFixtures::ENTRYPOINT)
            .with_interpreter(Some(TestFixtures::INTERPRETER.to_string()))
            .with_grace_period(TestFixtures::GRACE_PERIOD)
            .with_status_probe_timeout(Duration::from_millis(200))
            .with_startup_timings(TestFixtures::fast_timings())
    }

    /// Poll a log file until it contains `needle` or the deadline passes
    pub async fn wait_for_log(&self, log_file: &Path, needle: &str, deadline: Duration) -> bool {
        let started = tokio::time::Instant::now();
        while started.elapsed() < deadline {
            if let Ok(contents) = std::fs::read_to_string(log_file) {
                if contents.contains(needle) {
                    return true;
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        false
    }
}

/// Port with nothing listening on it
pub fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}
