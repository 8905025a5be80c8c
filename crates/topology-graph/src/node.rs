//! Node and edge records.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::metadata::Metadata;

/// Identifier of a node in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Generates a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of an edge in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(String);

impl EdgeId {
    /// Generates a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A node and its attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub metadata: Metadata,
    /// Incremented once per observable metadata change.
    pub revision: u64,
    /// Creation order, used to make "first match" lookups deterministic.
    #[serde(skip)]
    pub(crate) seq: u64,
}

impl Node {
    /// Shortcut for a string attribute.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.metadata.get_str(key)
    }
}

/// A directed edge between two nodes.
///
/// Undirected relations (layer2) are stored with an arbitrary orientation and
/// must be looked up in both directions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub parent: NodeId,
    pub child: NodeId,
    pub metadata: Metadata,
}

impl Edge {
    /// Returns true if this edge joins `a` and `b` in either direction.
    pub fn connects(&self, a: &NodeId, b: &NodeId) -> bool {
        (self.parent == *a && self.child == *b) || (self.parent == *b && self.child == *a)
    }

    /// Returns true if `id` is one of the endpoints.
    pub fn touches(&self, id: &NodeId) -> bool {
        self.parent == *id || self.child == *id
    }
}
