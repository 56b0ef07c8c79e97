//! Node lifecycle supervisor
//!
//! Loads a registry of node descriptors, starts groups of nodes in dependency
//! order, waits for them to answer their health endpoints and reports on the
//! whole fleet. Process and network I/O sit behind the traits in [`traits`] so
//! the orchestration logic can be tested against mocks.

pub mod config;
pub mod core;
pub mod error;
pub mod services;
pub mod startup;
pub mod status;
pub mod supervisor;
pub mod traits;

// Re-export commonly used types
pub use config::{StartupTimings, SupervisorConfig, GROUP_PRIORITY};
pub use core::{CheckCounts, CheckRow, CheckState, NodeRegistry, RegistryWarning, StatusSnapshot};
pub use error::{SupervisorError, SupervisorResult};
pub use startup::{GroupStartOrchestrator, GroupStartReport, LaunchReason, LaunchRecord};
pub use status::StatusReporter;
pub use supervisor::{StartPhase, Supervisor};
pub use traits::{HealthProber, ProcessInfo, ProcessManager, StopOutcome};
