//! Change notifications emitted by the graph.

use crate::node::{Edge, Node};

/// A single observable change of the graph.
///
/// Events are emitted while the graph lock is held, so subscribers see them
/// in mutation order.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphEvent {
    NodeAdded(Node),
    NodeUpdated(Node),
    NodeDeleted(Node),
    EdgeAdded(Edge),
    EdgeDeleted(Edge),
}

impl GraphEvent {
    /// Short name of the event kind, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            GraphEvent::NodeAdded(_) => "NodeAdded",
            GraphEvent::NodeUpdated(_) => "NodeUpdated",
            GraphEvent::NodeDeleted(_) => "NodeDeleted",
            GraphEvent::EdgeAdded(_) => "EdgeAdded",
            GraphEvent::EdgeDeleted(_) => "EdgeDeleted",
        }
    }
}
