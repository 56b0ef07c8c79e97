//! Shared error types for the node supervisor

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SharedError {
    #[error("Invalid node key: {input} (expected Node_<id>_<name>)")]
    InvalidNodeKey { input: String },

    #[error("Invalid node reference: {input}")]
    InvalidNodeRef { input: String },

    #[error("Invalid configuration: {field} = {value}")]
    InvalidConfig { field: String, value: String },
}

pub type SharedResult<T> = Result<T, SharedError>;
