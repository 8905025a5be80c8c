//! The lockable graph and its mutation primitives.

use parking_lot::{Mutex, MutexGuard};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::broadcast;
use tracing::trace;

use crate::error::{GraphError, Result};
use crate::event::GraphEvent;
use crate::metadata::Metadata;
use crate::node::{Edge, EdgeId, Node, NodeId};

/// Capacity of the change notification channel.
const EVENT_CHANNEL_CAPACITY: usize = 4096;

/// Scoped exclusive access to the graph. Dropping it releases the lock.
pub type GraphGuard<'a> = MutexGuard<'a, GraphState>;

/// Shared topology graph.
///
/// The graph is shared by every discovery source of a host. It is meant to
/// live behind an `Arc` and is only mutated through [`Graph::lock`].
pub struct Graph {
    state: Mutex<GraphState>,
    events: broadcast::Sender<GraphEvent>,
}

impl Graph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state: Mutex::new(GraphState {
                nodes: HashMap::new(),
                edges: HashMap::new(),
                next_seq: 0,
                events: events.clone(),
            }),
            events,
        }
    }

    /// Takes the graph-wide exclusive lock.
    pub fn lock(&self) -> GraphGuard<'_> {
        self.state.lock()
    }

    /// Subscribes to graph change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<GraphEvent> {
        self.events.subscribe()
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

/// Graph content, reachable only while the graph lock is held.
pub struct GraphState {
    nodes: HashMap<NodeId, Node>,
    edges: HashMap<EdgeId, Edge>,
    next_seq: u64,
    events: broadcast::Sender<GraphEvent>,
}

impl GraphState {
    fn notify(&self, event: GraphEvent) {
        trace!(kind = event.kind(), "graph event");
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }

    /// Creates a node with the given identifier and metadata.
    pub fn new_node(&mut self, id: NodeId, metadata: Metadata) -> Result<NodeId> {
        if self.nodes.contains_key(&id) {
            return Err(GraphError::DuplicateNode(id));
        }

        let node = Node {
            id: id.clone(),
            metadata,
            revision: 1,
            seq: self.next_seq,
        };
        self.next_seq += 1;

        self.nodes.insert(id.clone(), node.clone());
        self.notify(GraphEvent::NodeAdded(node));
        Ok(id)
    }

    /// Returns a node by identifier.
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Returns true if the node exists.
    pub fn has_node(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Iterates over all nodes in unspecified order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the earliest created node whose metadata matches `filter`.
    pub fn lookup_first_node(&self, filter: &Metadata) -> Option<NodeId> {
        self.nodes
            .values()
            .filter(|n| n.metadata.matches(filter))
            .min_by_key(|n| n.seq)
            .map(|n| n.id.clone())
    }

    /// Returns every node matching `filter`, in creation order.
    pub fn lookup_nodes(&self, filter: &Metadata) -> Vec<NodeId> {
        let mut found: Vec<&Node> = self
            .nodes
            .values()
            .filter(|n| n.metadata.matches(filter))
            .collect();
        found.sort_by_key(|n| n.seq);
        found.into_iter().map(|n| n.id.clone()).collect()
    }

    /// Deletes a node together with every edge touching it.
    pub fn del_node(&mut self, id: &NodeId) -> Result<()> {
        if !self.nodes.contains_key(id) {
            return Err(GraphError::NodeNotFound(id.clone()));
        }

        let incident: Vec<EdgeId> = self
            .edges
            .values()
            .filter(|e| e.touches(id))
            .map(|e| e.id.clone())
            .collect();
        for edge_id in incident {
            if let Some(edge) = self.edges.remove(&edge_id) {
                self.notify(GraphEvent::EdgeDeleted(edge));
            }
        }

        if let Some(node) = self.nodes.remove(id) {
            self.notify(GraphEvent::NodeDeleted(node));
        }
        Ok(())
    }

    /// Sets a single metadata key, as one observable update.
    pub fn add_metadata(
        &mut self,
        id: &NodeId,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<()> {
        let mut tr = self.start_metadata_transaction(id);
        tr.add_metadata(key, value);
        tr.commit()
    }

    /// Starts a batch of metadata changes on one node.
    pub fn start_metadata_transaction(&mut self, id: &NodeId) -> MetadataTransaction<'_> {
        MetadataTransaction {
            state: self,
            id: id.clone(),
            changes: Metadata::new(),
        }
    }

    /// Creates an edge from `parent` to `child`.
    pub fn add_edge(&mut self, parent: &NodeId, child: &NodeId, metadata: Metadata) -> Result<EdgeId> {
        for id in [parent, child] {
            if !self.nodes.contains_key(id) {
                return Err(GraphError::NodeNotFound(id.clone()));
            }
        }

        let edge = Edge {
            id: EdgeId::generate(),
            parent: parent.clone(),
            child: child.clone(),
            metadata,
        };
        let id = edge.id.clone();

        self.edges.insert(id.clone(), edge.clone());
        self.notify(GraphEvent::EdgeAdded(edge));
        Ok(id)
    }

    /// Deletes a single edge.
    pub fn del_edge(&mut self, id: &EdgeId) -> Result<()> {
        match self.edges.remove(id) {
            Some(edge) => {
                self.notify(GraphEvent::EdgeDeleted(edge));
                Ok(())
            }
            None => Err(GraphError::EdgeNotFound(id.to_string())),
        }
    }

    /// Iterates over all edges in unspecified order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Returns every edge touching `id`.
    pub fn node_edges(&self, id: &NodeId) -> Vec<&Edge> {
        self.edges.values().filter(|e| e.touches(id)).collect()
    }
}

/// Metadata changes on one node, applied together on [`commit`].
///
/// The transaction borrows the locked graph, so no other write can interleave
/// with it.
///
/// [`commit`]: MetadataTransaction::commit
pub struct MetadataTransaction<'a> {
    state: &'a mut GraphState,
    id: NodeId,
    changes: Metadata,
}

impl MetadataTransaction<'_> {
    /// Stages a key. Later calls for the same key win.
    pub fn add_metadata(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.changes.insert(key, value);
    }

    /// Number of staged keys.
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Applies every staged key as a single update.
    ///
    /// Emits exactly one [`GraphEvent::NodeUpdated`] when something changed,
    /// and nothing otherwise.
    pub fn commit(self) -> Result<()> {
        let node = self
            .state
            .nodes
            .get_mut(&self.id)
            .ok_or_else(|| GraphError::NodeNotFound(self.id.clone()))?;

        if node.metadata.merge(&self.changes) {
            node.revision += 1;
            let updated = node.clone();
            self.state.notify(GraphEvent::NodeUpdated(updated));
        }
        Ok(())
    }
}
