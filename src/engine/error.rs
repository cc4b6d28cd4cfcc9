use thiserror::Error;

use crate::engine::types::PortId;

pub type NodeResult<T> = Result<T, NodeError>;

/// Errors raised while instantiating or executing a node.
#[derive(Debug, Error)]
pub enum NodeError {
    /// The node's configuration blob is not acceptable.
    #[error("invalid config for node type '{node_type}': {message}")]
    InvalidConfig { node_type: String, message: String },

    /// A serialized node was handed to the wrong node definition.
    #[error("expected node type '{expected}', found '{found}'")]
    TypeMismatch { expected: String, found: String },

    #[error("unknown node type: {0}")]
    UnknownNodeType(String),

    /// The payload map implied an input that it does not contain.
    #[error("missing input '{port}' in payload")]
    MissingInput { port: PortId },

    /// Execution was cancelled by the host before it completed.
    #[error("node execution cancelled")]
    Cancelled,
}
