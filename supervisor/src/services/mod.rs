//! Service implementations
//!
//! Real implementations of the service traits. These handle the actual
//! process and network I/O.

pub mod health_prober;
pub mod process_manager;

pub use health_prober::HttpHealthProber;
pub use process_manager::RealProcessManager;
