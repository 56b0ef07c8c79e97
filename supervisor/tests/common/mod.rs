//! Common test utilities and infrastructure
//!
//! Shared fixtures and helpers for the supervisor integration suites.

pub mod fixtures;
pub mod helpers;

pub use fixtures::TestFixtures;
pub use helpers::{closed_port, TestWorkspace};
