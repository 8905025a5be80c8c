//! Typed link helpers shared by the discovery probes.
//!
//! Two relation kinds are used:
//!
//! - **ownership**: directed containment (host → bridge, bridge → port)
//! - **layer2**: undirected adjacency (bridge ↔ port, port ↔ interface,
//!   patch peer ↔ patch peer)
//!
//! A link may carry discriminator metadata such as `{Type: patch}`. Link
//! existence checks compare the full edge metadata, so a tagged and an
//! untagged link between the same pair never mask each other.

use crate::error::Result;
use crate::graph::GraphState;
use crate::metadata::Metadata;
use crate::node::{EdgeId, NodeId};

/// Edge metadata key holding the relation kind.
pub const RELATION_TYPE: &str = "RelationType";

/// Relation kind of containment edges.
pub const OWNERSHIP: &str = "ownership";

/// Relation kind of adjacency edges.
pub const LAYER2: &str = "layer2";

fn link_metadata(relation: &str, metadata: Option<&Metadata>) -> Metadata {
    let mut m = metadata.cloned().unwrap_or_default();
    m.insert(RELATION_TYPE, relation);
    m
}

/// Creates the host node that owns every bridge discovered on it.
pub fn new_root_node(g: &mut GraphState, host: &str) -> Result<NodeId> {
    g.new_node(
        NodeId::generate(),
        Metadata::new().with("Name", host).with("Type", "host"),
    )
}

/// Returns true if an ownership link `parent → child` with exactly this
/// discriminator exists.
pub fn have_ownership_link(
    g: &GraphState,
    parent: &NodeId,
    child: &NodeId,
    metadata: Option<&Metadata>,
) -> bool {
    let expected = link_metadata(OWNERSHIP, metadata);
    g.edges()
        .any(|e| e.parent == *parent && e.child == *child && e.metadata == expected)
}

/// Creates an ownership link `parent → child`.
pub fn add_ownership_link(
    g: &mut GraphState,
    parent: &NodeId,
    child: &NodeId,
    metadata: Option<&Metadata>,
) -> Result<EdgeId> {
    g.add_edge(parent, child, link_metadata(OWNERSHIP, metadata))
}

/// Returns true if a layer2 link between `a` and `b`, in either direction,
/// with exactly this discriminator exists.
pub fn have_layer2_link(
    g: &GraphState,
    a: &NodeId,
    b: &NodeId,
    metadata: Option<&Metadata>,
) -> bool {
    let expected = link_metadata(LAYER2, metadata);
    g.edges()
        .any(|e| e.connects(a, b) && e.metadata == expected)
}

/// Creates a layer2 link between `a` and `b`.
pub fn add_layer2_link(
    g: &mut GraphState,
    a: &NodeId,
    b: &NodeId,
    metadata: Option<&Metadata>,
) -> Result<EdgeId> {
    g.add_edge(a, b, link_metadata(LAYER2, metadata))
}

/// Counts links of one relation kind between `a` and `b`, in either direction.
pub fn count_links(g: &GraphState, relation: &str, a: &NodeId, b: &NodeId) -> usize {
    g.edges()
        .filter(|e| e.connects(a, b) && e.metadata.get_str(RELATION_TYPE) == Some(relation))
        .count()
}
