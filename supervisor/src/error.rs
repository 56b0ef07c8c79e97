//! Supervisor-specific error types

use shared::NodeId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Unknown node group: {group}")]
    UnknownGroup { group: String },

    #[error("Node {node_id} ({name}) not found under {nodes_dir}")]
    NodeNotFound {
        node_id: NodeId,
        name: String,
        nodes_dir: String,
    },

    #[error("Node {node_id} is missing its entry point: {path}")]
    MissingEntrypoint { node_id: NodeId, path: String },

    #[error("Failed to spawn node {node_id}: {reason}")]
    SpawnFailed { node_id: NodeId, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SupervisorError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError { message: message.into() }
    }

    pub fn unknown_group(group: impl Into<String>) -> Self {
        Self::UnknownGroup { group: group.into() }
    }

    pub fn spawn(node_id: &NodeId, reason: impl Into<String>) -> Self {
        Self::SpawnFailed {
            node_id: node_id.clone(),
            reason: reason.into(),
        }
    }
}

pub type SupervisorResult<T> = Result<T, SupervisorError>;
