//! Shared types for the node supervisor
//!
//! Contains the node data model, the report format and the logging layer
//! used by every supervisor component.

pub mod errors;
pub mod logging;
pub mod types;

pub use errors::*;
pub use types::*;
