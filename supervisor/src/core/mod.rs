//! Core business logic modules
//!
//! Pure logic with no process or network I/O: the node registry and the
//! status/report tallying.

pub mod registry;
pub mod report;

pub use registry::{NodeRegistry, RegistryWarning};
pub use report::{CheckCounts, CheckRow, CheckState, Observation, StatusSnapshot};
