//! Reconciliation tests for the OVSDB probe
//!
//! Rows are delivered through the monitor exactly as the transport would
//! deliver them, and the resulting graph is inspected under its lock.

use pretty_assertions::assert_eq;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use ovsdb_probe::{
    FieldValue, OvsMonitor, OvsdbProbe, ProbeConfig, ProbeStats, Row, RowUpdate, TableUpdates,
    DEFAULT_OVSDB_ADDRESS,
};
use topology_graph::topology::{self, LAYER2, OWNERSHIP};
use topology_graph::{Graph, GraphEvent, GraphState, Metadata, NodeId};

struct Fixture {
    graph: Arc<Graph>,
    root: NodeId,
    probe: Arc<OvsdbProbe>,
}

impl Fixture {
    fn new() -> Self {
        let graph = Arc::new(Graph::new());
        let root = {
            let mut g = graph.lock();
            topology::new_root_node(&mut g, "host1").unwrap()
        };
        let monitor = Arc::new(OvsMonitor::new(DEFAULT_OVSDB_ADDRESS.parse().unwrap()));
        let probe = OvsdbProbe::new(graph.clone(), root.clone(), monitor);
        Self { graph, root, probe }
    }

    fn deliver(&self, table: &str, update: RowUpdate) {
        self.probe
            .monitor()
            .dispatch(TableUpdates::new().with(table, update));
    }

    fn add(&self, table: &str, uuid: &str, row: Row) {
        self.deliver(table, RowUpdate::insert(uuid, row));
    }

    fn update(&self, table: &str, uuid: &str, row: Row) {
        self.deliver(table, RowUpdate::modify(uuid, row.clone(), row));
    }

    fn delete(&self, table: &str, uuid: &str, row: Row) {
        self.deliver(table, RowUpdate::delete(uuid, row));
    }

    fn node_by_uuid(&self, uuid: &str) -> Option<NodeId> {
        self.graph
            .lock()
            .lookup_first_node(&Metadata::new().with("UUID", uuid))
    }

    fn expect_node(&self, uuid: &str) -> NodeId {
        self.node_by_uuid(uuid)
            .unwrap_or_else(|| panic!("no node for {}", uuid))
    }
}

fn node_locked(g: &GraphState, uuid: &str) -> NodeId {
    g.lookup_first_node(&Metadata::new().with("UUID", uuid))
        .unwrap_or_else(|| panic!("no node for {}", uuid))
}

fn interface_row(name: &str, ofport: i64) -> Row {
    Row::new()
        .with("name", FieldValue::String(name.to_string()))
        .with("ofport", FieldValue::Integer(ofport))
        .with("status", FieldValue::string_map([("driver_name", "openvswitch")]))
}

fn port_row(name: &str, interfaces: &[&str]) -> Row {
    Row::new()
        .with("name", FieldValue::String(name.to_string()))
        .with("interfaces", FieldValue::uuid_set(interfaces.iter().copied()))
}

fn bridge_row(name: &str, ports: &[&str]) -> Row {
    Row::new()
        .with("name", FieldValue::String(name.to_string()))
        .with("ports", FieldValue::uuid_set(ports.iter().copied()))
}

fn assert_chain_linked(g: &GraphState, root: &NodeId, bridge: &NodeId, port: &NodeId, intf: &NodeId) {
    assert_eq!(topology::count_links(g, OWNERSHIP, root, bridge), 1);
    assert!(topology::have_ownership_link(g, root, bridge, None));
    assert_eq!(topology::count_links(g, OWNERSHIP, bridge, port), 1);
    assert!(topology::have_ownership_link(g, bridge, port, None));
    assert_eq!(topology::count_links(g, LAYER2, bridge, port), 1);
    assert_eq!(topology::count_links(g, LAYER2, port, intf), 1);
    assert_eq!(g.edge_count(), 4);
}

#[test]
fn test_any_arrival_order_converges() {
    let orders: [[usize; 3]; 6] = [
        [0, 1, 2],
        [0, 2, 1],
        [1, 0, 2],
        [1, 2, 0],
        [2, 0, 1],
        [2, 1, 0],
    ];

    for order in orders {
        let fx = Fixture::new();
        let steps: [(&str, &str, Row); 3] = [
            ("Interface", "i1", interface_row("eth0", 1)),
            ("Port", "p1", port_row("eth0", &["i1"])),
            ("Bridge", "b1", bridge_row("br0", &["p1"])),
        ];

        for &i in &order {
            let (table, uuid, row) = &steps[i];
            fx.add(table, uuid, row.clone());
        }

        let (bridge, port, intf) = (fx.expect_node("b1"), fx.expect_node("p1"), fx.expect_node("i1"));
        {
            let g = fx.graph.lock();
            assert_chain_linked(&g, &fx.root, &bridge, &port, &intf);
            assert_eq!(g.node_count(), 4, "order {:?}", order);
        }

        assert_eq!(
            fx.probe.stats(),
            ProbeStats {
                interfaces: 1,
                ports: 1,
                pending_interface_links: 0,
                pending_port_links: 0,
            },
            "order {:?}",
            order
        );
    }
}

#[test]
fn test_redelivery_creates_nothing_new() {
    let fx = Fixture::new();
    fx.add("Interface", "i1", interface_row("eth0", 1));
    fx.add("Port", "p1", port_row("eth0", &["i1"]));
    fx.add("Bridge", "b1", bridge_row("br0", &["p1"]));

    for _ in 0..3 {
        fx.update("Bridge", "b1", bridge_row("br0", &["p1"]));
        fx.update("Port", "p1", port_row("eth0", &["i1"]));
        fx.update("Interface", "i1", interface_row("eth0", 1));
    }

    let g = fx.graph.lock();
    assert_eq!(g.node_count(), 4);
    assert_chain_linked(
        &g,
        &fx.root,
        &node_locked(&g, "b1"),
        &node_locked(&g, "p1"),
        &node_locked(&g, "i1"),
    );
}

#[test]
fn test_bridge_before_port_is_queued_then_resolved() {
    let fx = Fixture::new();
    fx.add("Bridge", "b1", bridge_row("br0", &["p1"]));

    let bridge = fx.expect_node("b1");
    {
        let g = fx.graph.lock();
        let node = g.node(&bridge).unwrap();
        assert_eq!(node.get_str("Name"), Some("br0"));
        assert_eq!(node.get_str("Type"), Some("ovsbridge"));
        assert!(topology::have_ownership_link(&g, &fx.root, &bridge, None));
    }
    assert_eq!(fx.probe.stats().pending_port_links, 1);

    fx.add("Port", "p1", port_row("p1", &[]));
    let port = fx.expect_node("p1");
    {
        let g = fx.graph.lock();
        assert_eq!(g.node(&port).unwrap().get_str("Type"), Some("ovsport"));
        assert!(topology::have_ownership_link(&g, &bridge, &port, None));
        assert!(topology::have_layer2_link(&g, &bridge, &port, None));
    }
    assert_eq!(fx.probe.stats().pending_port_links, 0);
}

#[test]
fn test_queued_link_fires_once() {
    let fx = Fixture::new();
    fx.add("Port", "p1", port_row("eth0", &["i1"]));
    assert_eq!(fx.probe.stats().pending_interface_links, 1);

    fx.add("Interface", "i1", interface_row("eth0", 1));
    assert_eq!(fx.probe.stats().pending_interface_links, 0);

    // Removing the link by hand must not be undone by a later interface
    // update: the queue entry is gone.
    let (port, intf) = (fx.expect_node("p1"), fx.expect_node("i1"));
    {
        let mut g = fx.graph.lock();
        let edge = g
            .edges()
            .find(|e| e.connects(&port, &intf))
            .map(|e| e.id.clone())
            .unwrap();
        g.del_edge(&edge).unwrap();
    }

    fx.update("Interface", "i1", interface_row("eth0", 1));
    let g = fx.graph.lock();
    assert_eq!(topology::count_links(&g, LAYER2, &port, &intf), 0);
}

#[test]
fn test_interface_without_ofport_is_skipped() {
    let fx = Fixture::new();
    fx.add("Port", "p1", port_row("eth0", &["i1"]));

    let pending = Row::new()
        .with("name", FieldValue::String("eth0".to_string()))
        .with("ofport", FieldValue::Set(vec![]))
        .with("status", FieldValue::string_map([("driver_name", "openvswitch")]));
    fx.add("Interface", "i1", pending.clone());

    assert!(fx.node_by_uuid("i1").is_none());
    assert_eq!(fx.probe.stats().interfaces, 0);
    assert_eq!(fx.probe.stats().pending_interface_links, 1);

    fx.deliver(
        "Interface",
        RowUpdate::modify("i1", pending, interface_row("eth0", 4)),
    );

    let (port, intf) = (fx.expect_node("p1"), fx.expect_node("i1"));
    let g = fx.graph.lock();
    assert_eq!(g.node(&intf).unwrap().metadata.get_i64("OfPort"), Some(4));
    assert!(topology::have_layer2_link(&g, &port, &intf, None));
    drop(g);
    assert_eq!(fx.probe.stats().pending_interface_links, 0);
}

#[test]
fn test_interface_without_driver_is_skipped() {
    let fx = Fixture::new();
    let row = Row::new()
        .with("name", FieldValue::String("eth0".to_string()))
        .with("ofport", FieldValue::Integer(1));
    fx.add("Interface", "i1", row);

    assert!(fx.node_by_uuid("i1").is_none());
    assert_eq!(fx.probe.stats().interfaces, 0);
}

#[test]
fn test_existing_node_is_adopted_and_kept_on_delete() {
    let fx = Fixture::new();
    let existing = {
        let mut g = fx.graph.lock();
        g.new_node(
            NodeId::generate(),
            Metadata::new()
                .with("Name", "eth0")
                .with("Driver", "veth")
                .with("IfIndex", 7i64)
                .with("MAC", "aa:bb:cc:dd:ee:ff"),
        )
        .unwrap()
    };

    let row = Row::new()
        .with("name", FieldValue::String("eth0".to_string()))
        .with("ofport", FieldValue::Integer(2))
        .with("ifindex", FieldValue::Integer(7))
        .with("mac_in_use", FieldValue::String("aa:bb:cc:dd:ee:ff".to_string()))
        .with("status", FieldValue::string_map([("driver_name", "veth")]));
    fx.add("Interface", "i1", row.clone());

    assert_eq!(fx.node_by_uuid("i1"), Some(existing.clone()));
    assert_eq!(fx.graph.lock().node_count(), 2);

    fx.delete("Interface", "i1", row);
    assert_eq!(fx.probe.stats().interfaces, 0);

    let g = fx.graph.lock();
    let node = g.node(&existing).expect("foreign node must survive");
    assert_eq!(node.get_str("Driver"), Some("veth"));
}

#[test]
fn test_adoption_requires_matching_ifindex() {
    let fx = Fixture::new();
    let other = {
        let mut g = fx.graph.lock();
        g.new_node(
            NodeId::generate(),
            Metadata::new()
                .with("Name", "eth0")
                .with("Driver", "veth")
                .with("IfIndex", 3i64),
        )
        .unwrap()
    };

    let row = Row::new()
        .with("name", FieldValue::String("eth0".to_string()))
        .with("ofport", FieldValue::Integer(2))
        .with("ifindex", FieldValue::Integer(7))
        .with("status", FieldValue::string_map([("driver_name", "veth")]));
    fx.add("Interface", "i1", row);

    let intf = fx.expect_node("i1");
    assert_ne!(intf, other);
    assert_eq!(fx.graph.lock().node_count(), 3);
}

#[test]
fn test_owned_interface_removed_on_delete() {
    let fx = Fixture::new();
    fx.add("Interface", "i1", interface_row("eth0", 1));
    fx.add("Port", "p1", port_row("eth0", &["i1"]));
    let intf = fx.expect_node("i1");

    fx.delete("Interface", "i1", interface_row("eth0", 1));

    let g = fx.graph.lock();
    assert!(!g.has_node(&intf));
    assert_eq!(g.node_edges(&intf).len(), 0);
    drop(g);
    assert_eq!(fx.probe.stats().interfaces, 0);
}

#[test]
fn test_delete_of_unknown_rows_is_noop() {
    let fx = Fixture::new();
    fx.delete("Interface", "i404", interface_row("ghost", 1));
    fx.delete("Port", "p404", port_row("ghost", &[]));
    fx.delete("Bridge", "b404", bridge_row("ghost", &[]));

    assert_eq!(fx.graph.lock().node_count(), 1);
}

#[test]
fn test_bridge_delete_purges_pending_links() {
    let fx = Fixture::new();
    fx.add("Bridge", "b1", bridge_row("br0", &["p1", "p2"]));
    assert_eq!(fx.probe.stats().pending_port_links, 2);

    fx.delete("Bridge", "b1", bridge_row("br0", &["p1", "p2"]));
    assert!(fx.node_by_uuid("b1").is_none());
    assert_eq!(fx.probe.stats().pending_port_links, 0);

    // A port arriving later is no longer linked to anything.
    fx.add("Port", "p1", port_row("p1", &[]));
    let port = fx.expect_node("p1");
    assert_eq!(fx.graph.lock().node_edges(&port).len(), 0);
}

#[test]
fn test_port_delete_purges_pending_links() {
    let fx = Fixture::new();
    fx.add("Port", "p1", port_row("bond0", &["i1", "i2"]));
    assert_eq!(fx.probe.stats().pending_interface_links, 2);

    fx.delete("Port", "p1", port_row("bond0", &["i1", "i2"]));
    assert!(fx.node_by_uuid("p1").is_none());
    assert_eq!(fx.probe.stats().pending_interface_links, 0);
    assert_eq!(fx.probe.stats().ports, 0);
}

#[test]
fn test_delete_of_unprojected_port_drops_waiting_bridge() {
    let fx = Fixture::new();
    fx.add("Bridge", "b1", bridge_row("br0", &["p1"]));
    assert_eq!(fx.probe.stats().pending_port_links, 1);

    // No name yet: the port is never projected or cached.
    let nameless = Row::new().with("interfaces", FieldValue::uuid_set(["i1"]));
    fx.add("Port", "p1", nameless.clone());
    assert!(fx.node_by_uuid("p1").is_none());
    assert_eq!(fx.probe.stats().ports, 0);

    fx.delete("Port", "p1", nameless);
    assert_eq!(fx.probe.stats().pending_port_links, 0);

    // A new port reusing the UUID is not linked to the old bridge.
    fx.add("Port", "p1", port_row("eth0", &[]));
    let (bridge, port) = (fx.expect_node("b1"), fx.expect_node("p1"));
    let g = fx.graph.lock();
    assert_eq!(topology::count_links(&g, OWNERSHIP, &bridge, &port), 0);
    assert_eq!(topology::count_links(&g, LAYER2, &bridge, &port), 0);
}

#[test]
fn test_concurrent_callbacks_converge() {
    const ROUNDS: usize = 20;
    const UPDATES: usize = 25;

    for round in 0..ROUNDS {
        let fx = Fixture::new();
        let steps: Vec<(&'static str, &'static str, Row)> = vec![
            ("Interface", "i1", interface_row("eth0", 1)),
            ("Port", "p1", port_row("eth0", &["i1"])),
            ("Bridge", "b1", bridge_row("br0", &["p1"])),
        ];
        let barrier = Arc::new(Barrier::new(steps.len()));

        let workers: Vec<_> = steps
            .into_iter()
            .map(|(table, uuid, row)| {
                let probe = fx.probe.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    probe
                        .monitor()
                        .dispatch(TableUpdates::new().with(table, RowUpdate::insert(uuid, row.clone())));
                    for _ in 0..UPDATES {
                        let update = RowUpdate::modify(uuid, row.clone(), row.clone());
                        probe.monitor().dispatch(TableUpdates::new().with(table, update));
                        thread::yield_now();
                    }
                })
            })
            .collect();

        for worker in workers {
            worker.join().unwrap();
        }

        {
            let g = fx.graph.lock();
            assert_eq!(g.node_count(), 4, "round {}", round);
            assert_chain_linked(
                &g,
                &fx.root,
                &node_locked(&g, "b1"),
                &node_locked(&g, "p1"),
                &node_locked(&g, "i1"),
            );
        }

        let stats = fx.probe.stats();
        assert_eq!(stats.pending_interface_links, 0, "round {}", round);
        assert_eq!(stats.pending_port_links, 0, "round {}", round);
    }
}

#[test]
fn test_patch_peers_are_linked() {
    let fx = Fixture::new();
    let patch = |name: &str, peer: &str| {
        Row::new()
            .with("name", FieldValue::String(name.to_string()))
            .with("type", FieldValue::String("patch".to_string()))
            .with("ofport", FieldValue::Integer(10))
            .with("options", FieldValue::string_map([("peer", peer)]))
    };

    fx.add("Interface", "i-a", patch("patch-a", "patch-b"));
    fx.add("Interface", "i-b", patch("patch-b", "patch-a"));
    fx.update("Interface", "i-a", patch("patch-a", "patch-b"));

    let (a, b) = (fx.expect_node("i-a"), fx.expect_node("i-b"));
    let g = fx.graph.lock();
    let tag = Metadata::new().with("Type", "patch");
    assert!(topology::have_layer2_link(&g, &a, &b, Some(&tag)));
    assert_eq!(topology::count_links(&g, LAYER2, &a, &b), 1);
    assert_eq!(g.node(&a).unwrap().get_str("Driver"), Some("openvswitch"));
}

#[test]
fn test_patch_peer_found_through_interface_cache() {
    let fx = Fixture::new();
    // The peer is known to the probe but its node does not carry Type=patch.
    fx.add("Interface", "i-b", interface_row("patch-b", 11));

    let row = Row::new()
        .with("name", FieldValue::String("patch-a".to_string()))
        .with("type", FieldValue::String("patch".to_string()))
        .with("ofport", FieldValue::Integer(10))
        .with("options", FieldValue::string_map([("peer", "patch-b")]));
    fx.add("Interface", "i-a", row);

    let (a, b) = (fx.expect_node("i-a"), fx.expect_node("i-b"));
    let g = fx.graph.lock();
    let tag = Metadata::new().with("Type", "patch");
    assert!(topology::have_layer2_link(&g, &a, &b, Some(&tag)));
}

#[test]
fn test_tunnel_attributes() {
    let fx = Fixture::new();
    let row = Row::new()
        .with("name", FieldValue::String("vxlan0".to_string()))
        .with("type", FieldValue::String("vxlan".to_string()))
        .with("ofport", FieldValue::Integer(5))
        .with(
            "options",
            FieldValue::string_map([("local_ip", "10.0.0.1"), ("remote_ip", "10.0.0.2")]),
        )
        .with(
            "status",
            FieldValue::string_map([
                ("tunnel_egress_iface", "eth1"),
                ("tunnel_egress_iface_carrier", "up"),
            ]),
        );
    fx.add("Interface", "i1", row);

    let intf = fx.expect_node("i1");
    let g = fx.graph.lock();
    let node = g.node(&intf).unwrap();
    assert_eq!(node.get_str("Type"), Some("vxlan"));
    assert_eq!(node.get_str("Driver"), Some("openvswitch"));
    assert_eq!(node.get_str("LocalIP"), Some("10.0.0.1"));
    assert_eq!(node.get_str("RemoteIP"), Some("10.0.0.2"));
    assert_eq!(node.get_str("TunEgressIface"), Some("eth1"));
    assert_eq!(node.get_str("TunEgressIfaceCarrier"), Some("up"));
}

#[test]
fn test_interface_metadata() {
    let fx = Fixture::new();
    let row = interface_row("tap0", 3)
        .with("ifindex", FieldValue::Integer(12))
        .with("mac_in_use", FieldValue::String("fe:16:3e:00:00:01".to_string()))
        .with(
            "external_ids",
            FieldValue::string_map([("attached-mac", "fa:16:3e:00:00:01"), ("iface-id", "vm-1")]),
        )
        .with("statistics", FieldValue::string_map([("rx_packets", "0")]));
    fx.add("Interface", "i1", row);

    let intf = fx.expect_node("i1");
    let g = fx.graph.lock();
    let node = g.node(&intf).unwrap();
    assert_eq!(node.get_str("Name"), Some("tap0"));
    assert_eq!(node.metadata.get_i64("OfPort"), Some(3));
    assert_eq!(node.metadata.get_i64("IfIndex"), Some(12));
    assert_eq!(node.get_str("MAC"), Some("fe:16:3e:00:00:01"));
    assert_eq!(node.get_str("ExtID/attached-mac"), Some("fa:16:3e:00:00:01"));
    assert_eq!(node.get_str("ExtID/iface-id"), Some("vm-1"));
}

#[test]
fn test_interface_metadata_single_update_event() {
    let fx = Fixture::new();
    let mut events = fx.graph.subscribe();

    let row = interface_row("tap0", 3)
        .with("ifindex", FieldValue::Integer(12))
        .with("mac_in_use", FieldValue::String("fe:16:3e:00:00:01".to_string()))
        .with("external_ids", FieldValue::string_map([("iface-id", "vm-1")]));
    fx.add("Interface", "i1", row);

    let mut kinds = Vec::new();
    while let Ok(event) = events.try_recv() {
        kinds.push(event.kind());
    }
    assert_eq!(kinds, vec!["NodeAdded", "NodeUpdated"]);

    // Redelivering identical values changes nothing.
    fx.update("Interface", "i1", interface_row("tap0", 3));
    assert!(events.try_recv().is_err());
}

#[test]
fn test_port_metadata() {
    let fx = Fixture::new();
    let bond = port_row("bond0", &[])
        .with("bond_mode", FieldValue::String("balance-slb".to_string()))
        .with("lacp", FieldValue::String("active".to_string()))
        .with("tag", FieldValue::Integer(100));
    fx.add("Port", "p1", bond);

    let trunk = port_row("trunk0", &[]).with(
        "tag",
        FieldValue::Set(vec![FieldValue::Integer(10), FieldValue::Integer(20)]),
    );
    fx.add("Port", "p2", trunk);

    let untagged = port_row("eth3", &[]).with("tag", FieldValue::Set(vec![]));
    fx.add("Port", "p3", untagged);

    let (p1, p2, p3) = (fx.expect_node("p1"), fx.expect_node("p2"), fx.expect_node("p3"));
    let g = fx.graph.lock();

    let node = g.node(&p1).unwrap();
    assert_eq!(node.get_str("BondMode"), Some("balance-slb"));
    assert_eq!(node.get_str("LACP"), Some("active"));
    assert_eq!(node.metadata.get_i64("Vlans"), Some(100));

    assert_eq!(
        g.node(&p2).unwrap().metadata.get("Vlans"),
        Some(&serde_json::json!([10, 20]))
    );
    assert!(!g.node(&p3).unwrap().metadata.contains_key("Vlans"));
}

#[test]
fn test_port_delete_removes_links() {
    let fx = Fixture::new();
    fx.add("Interface", "i1", interface_row("eth0", 1));
    fx.add("Port", "p1", port_row("eth0", &["i1"]));
    fx.add("Bridge", "b1", bridge_row("br0", &["p1"]));

    fx.delete("Port", "p1", port_row("eth0", &["i1"]));

    let g = fx.graph.lock();
    assert_eq!(g.node_count(), 3);
    // Only root → bridge remains.
    assert_eq!(g.edge_count(), 1);
}

#[test]
fn test_graph_events_follow_mutations() {
    let fx = Fixture::new();
    let mut events = fx.graph.subscribe();

    fx.add("Bridge", "b1", bridge_row("br0", &[]));
    fx.delete("Bridge", "b1", bridge_row("br0", &[]));

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    assert!(matches!(seen.first(), Some(GraphEvent::NodeAdded(n)) if n.get_str("Name") == Some("br0")));
    assert!(matches!(seen.last(), Some(GraphEvent::NodeDeleted(_))));
}

#[test]
fn test_from_config_applies_column_exclusion() {
    let graph = Arc::new(Graph::new());
    let root = topology::new_root_node(&mut graph.lock(), "host1").unwrap();

    let config = ProbeConfig::default();
    let probe = OvsdbProbe::from_config(graph.clone(), root.clone(), &config).unwrap();

    assert_eq!(probe.root(), &root);
    assert_eq!(probe.monitor().excluded_columns(), vec!["statistics".to_string()]);
    assert_eq!(
        probe.monitor().address().to_string(),
        "unix:///var/run/openvswitch/db.sock"
    );
}

#[test]
fn test_from_config_rejects_bad_address() {
    let graph = Arc::new(Graph::new());
    let root = topology::new_root_node(&mut graph.lock(), "host1").unwrap();

    let mut config = ProbeConfig::default();
    config.ovs.ovsdb = "tcp://".to_string();
    assert!(OvsdbProbe::from_config(graph, root, &config).is_err());
}

#[tokio::test]
async fn test_started_probe_consumes_channel() {
    let fx = Fixture::new();
    fx.probe.start().unwrap();
    assert!(fx.probe.monitor().is_running());
    assert!(fx.probe.start().is_err());

    let sender = fx.probe.monitor().sender();
    sender
        .send(
            TableUpdates::new()
                .with("Port", RowUpdate::insert("p1", port_row("eth0", &["i1"])))
                .with("Interface", RowUpdate::insert("i1", interface_row("eth0", 1))),
        )
        .await
        .unwrap();

    let mut linked = false;
    for _ in 0..200 {
        if fx.probe.stats().interfaces == 1 && fx.probe.stats().ports == 1 {
            linked = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(linked, "updates were not delivered");

    let (port, intf) = (fx.expect_node("p1"), fx.expect_node("i1"));
    assert!(topology::have_layer2_link(&fx.graph.lock(), &port, &intf, None));

    fx.probe.stop();
    assert!(!fx.probe.monitor().is_running());
}
