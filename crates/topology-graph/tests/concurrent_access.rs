//! Concurrent mutation of a shared graph

use std::sync::Arc;
use std::thread;

use topology_graph::topology::{self, LAYER2};
use topology_graph::{Graph, Metadata, NodeId};

#[test]
fn test_check_then_link_under_one_lock_is_race_free() {
    let graph = Arc::new(Graph::new());
    let (a, b) = {
        let mut g = graph.lock();
        let a = g.new_node(NodeId::from("a"), Metadata::new()).unwrap();
        let b = g.new_node(NodeId::from("b"), Metadata::new()).unwrap();
        (a, b)
    };

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let graph = graph.clone();
            let (a, b) = (a.clone(), b.clone());
            thread::spawn(move || {
                for _ in 0..100 {
                    let mut g = graph.lock();
                    if !topology::have_layer2_link(&g, &a, &b, None) {
                        topology::add_layer2_link(&mut g, &a, &b, None).unwrap();
                    }
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    let g = graph.lock();
    assert_eq!(topology::count_links(&g, LAYER2, &a, &b), 1);
}

#[test]
fn test_parallel_node_creation() {
    let graph = Arc::new(Graph::new());

    let workers: Vec<_> = (0..4)
        .map(|w| {
            let graph = graph.clone();
            thread::spawn(move || {
                for i in 0..50 {
                    let metadata = Metadata::new().with("Name", format!("n{}-{}", w, i));
                    graph.lock().new_node(NodeId::generate(), metadata).unwrap();
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    let g = graph.lock();
    assert_eq!(g.node_count(), 200);
    assert!(g
        .lookup_first_node(&Metadata::new().with("Name", "n3-49"))
        .is_some());
}
