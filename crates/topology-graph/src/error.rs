//! Error types for graph operations.

use thiserror::Error;

use crate::node::NodeId;

/// Result type alias for graph operations.
pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors returned by [`crate::GraphState`] primitives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// The node does not exist (never created, or already deleted).
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// A node with this identifier already exists.
    #[error("Node already exists: {0}")]
    DuplicateNode(NodeId),

    /// The edge does not exist.
    #[error("Edge not found: {0}")]
    EdgeNotFound(String),
}
