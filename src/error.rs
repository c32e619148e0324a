//! Error types for the schema registry

use thiserror::Error;

use crate::node::NodeId;

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Schema registry errors
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Unknown declaration node: {0}")]
    UnknownNode(NodeId),

    #[error("Unresolved reference on {node}: {attribute}=\"{name}\"")]
    UnresolvedReference {
        node: NodeId,
        attribute: String,
        name: String,
    },

    #[error("Unknown namespace prefix '{prefix}' on {node}")]
    UnknownPrefix { node: NodeId, prefix: String },

    #[error("Invalid fragment: {0}")]
    InvalidFragment(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),
}
