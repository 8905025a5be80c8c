//! Shared topology graph for network discovery probes.
//!
//! This crate provides the graph that every discovery source writes into:
//!
//! - [`Graph`]: Lockable graph of nodes and edges carrying [`Metadata`]
//! - [`MetadataTransaction`]: Batch of metadata changes committed as one update
//! - [`topology`]: Ownership and layer2 link helpers used by the probes
//! - [`GraphEvent`]: Change notifications for consumers of the graph
//!
//! # Locking
//!
//! All reads and writes go through [`Graph::lock`], which returns a scoped
//! guard over [`GraphState`]. A probe that keeps its own state must take its
//! own lock first and the graph lock second.
//!
//! # Example
//!
//! ```
//! use topology_graph::{topology, Graph, Metadata, NodeId};
//!
//! let graph = Graph::new();
//! let mut g = graph.lock();
//!
//! let root = topology::new_root_node(&mut g, "host1").unwrap();
//! let br = g
//!     .new_node(NodeId::generate(), Metadata::new().with("Name", "br0"))
//!     .unwrap();
//!
//! topology::add_ownership_link(&mut g, &root, &br, None).unwrap();
//! assert!(topology::have_ownership_link(&g, &root, &br, None));
//! ```

mod error;
mod event;
mod graph;
mod metadata;
mod node;
pub mod topology;

pub use error::{GraphError, Result};
pub use event::GraphEvent;
pub use graph::{Graph, GraphGuard, GraphState, MetadataTransaction};
pub use metadata::Metadata;
pub use node::{Edge, EdgeId, Node, NodeId};
