//! OvsdbProbe - reconciliation of OVSDB rows into the topology graph
//!
//! Bridge, Port and Interface notifications arrive in any order and may be
//! redelivered. Cross-table references to rows not processed yet are parked
//! in two pending queues keyed by the missing row UUID:
//!
//! - interface UUID → port waiting for it
//! - port UUID → bridge waiting for it
//!
//! An entry is consumed exactly once, when the referenced row is processed.
//! Every link is checked for existence before it is created, so add and update
//! share one code path and replays are harmless.
//!
//! Locking: the probe lock is always taken before the graph lock. Rows that
//! are not ready (no numeric `ofport`, unknown driver, missing name) are
//! rejected before either lock is taken.

use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tracing::{debug, info, instrument, warn};

use topology_graph::{topology, Graph, GraphError, GraphState, Metadata, NodeId};

use crate::config::ProbeConfig;
use crate::error::Result;
use crate::monitor::{MonitorHandler, OvsMonitor};
use crate::row::{FieldValue, Row, RowUpdate};
use crate::tables::{columns, metadata as md, OVS_DRIVER};
use crate::types::{InterfaceType, ProbeStats};

/// Caches and pending queues, guarded by the probe lock.
#[derive(Debug, Default)]
struct ProbeState {
    /// Interfaces processed at least once
    uuid_to_intf: HashMap<String, NodeId>,
    /// Ports processed at least once
    uuid_to_port: HashMap<String, NodeId>,
    /// Not-yet-seen interface UUID → port waiting for it
    intf_port_queue: HashMap<String, NodeId>,
    /// Not-yet-seen port UUID → bridge waiting for it
    port_bridge_queue: HashMap<String, NodeId>,
}

/// Interface row fields, extracted and validated before locking.
#[derive(Debug)]
struct InterfaceRow<'a> {
    name: &'a str,
    driver: &'a str,
    itype: InterfaceType,
    ofport: i64,
    ifindex: i64,
    mac: &'a str,
    external_ids: Vec<(&'a str, &'a str)>,
    /// Tunnel attributes, already keyed by node metadata name
    tunnel: Vec<(&'static str, &'a str)>,
    patch_peer: Option<&'a str>,
}

impl<'a> InterfaceRow<'a> {
    /// Returns `None` when the row is not ready to be projected yet.
    fn parse(row: &'a Row) -> Option<Self> {
        let ofport = match row.get(columns::OFPORT) {
            Some(v @ (FieldValue::Integer(_) | FieldValue::Real(_))) => v.as_integer()?,
            _ => return None,
        };

        let itype = InterfaceType::from(row.get_str(columns::TYPE).unwrap_or_default());

        let status = row.get(columns::STATUS);
        let driver = match status
            .and_then(|s| s.map_get_str(columns::DRIVER_NAME))
            .filter(|d| !d.is_empty())
        {
            Some(driver) => driver,
            // Needed later to decide whether a delete is ours to apply.
            None if itype.is_switch_internal() => OVS_DRIVER,
            None => return None,
        };

        let name = row.get_str(columns::NAME)?;

        let options = row.get(columns::OPTIONS);
        let mut tunnel = Vec::new();
        if itype.is_tunnel() {
            let sources = [
                (options, columns::LOCAL_IP, md::LOCAL_IP),
                (options, columns::REMOTE_IP, md::REMOTE_IP),
                (status, columns::TUNNEL_EGRESS_IFACE, md::TUN_EGRESS_IFACE),
                (
                    status,
                    columns::TUNNEL_EGRESS_IFACE_CARRIER,
                    md::TUN_EGRESS_IFACE_CARRIER,
                ),
            ];
            for (map, key, meta_key) in sources {
                if let Some(value) = map.and_then(|m| m.map_get_str(key)) {
                    tunnel.push((meta_key, value));
                }
            }
        }

        let patch_peer = match itype {
            InterfaceType::Patch => options.and_then(|o| o.map_get_str(columns::PEER)),
            _ => None,
        };

        Some(Self {
            name,
            driver,
            itype,
            ofport,
            ifindex: row
                .get(columns::IFINDEX)
                .and_then(FieldValue::first_integer)
                .unwrap_or(0),
            mac: row.get_str(columns::MAC_IN_USE).unwrap_or_default(),
            external_ids: row
                .get(columns::EXTERNAL_IDS)
                .map(FieldValue::string_entries)
                .unwrap_or_default(),
            tunnel,
            patch_peer,
        })
    }

    /// Attributes identifying the same interface when discovered by another
    /// source before its UUID was known.
    fn identity_filter(&self) -> Metadata {
        let mut filter = Metadata::new()
            .with(md::NAME, self.name)
            .with(md::DRIVER, self.driver);
        if self.ifindex > 0 {
            filter.insert(md::IF_INDEX, self.ifindex);
        }
        if !self.mac.is_empty() {
            filter.insert(md::MAC, self.mac);
        }
        filter
    }
}

/// Port row fields, extracted before locking.
#[derive(Debug)]
struct PortRow<'a> {
    name: &'a str,
    bond_mode: Option<&'a str>,
    lacp: Option<&'a str>,
    vlans: Option<Value>,
    interfaces: Vec<&'a str>,
}

impl<'a> PortRow<'a> {
    fn parse(row: &'a Row) -> Option<Self> {
        let vlans = match row.get(columns::TAG) {
            Some(set @ FieldValue::Set(tags)) if !tags.is_empty() => Some(set.to_metadata_value()),
            Some(tag @ (FieldValue::Integer(_) | FieldValue::Real(_))) => {
                tag.as_integer().map(Value::from)
            }
            _ => None,
        };

        Some(Self {
            name: row.get_str(columns::NAME)?,
            bond_mode: row.get_str(columns::BOND_MODE),
            lacp: row.get_str(columns::LACP),
            vlans,
            interfaces: row
                .get(columns::INTERFACES)
                .map(FieldValue::uuid_refs)
                .unwrap_or_default(),
        })
    }
}

fn patch_metadata() -> Metadata {
    Metadata::new().with(md::TYPE, InterfaceType::Patch.as_str())
}

fn uuid_filter(uuid: &str) -> Metadata {
    Metadata::new().with(md::UUID, uuid)
}

/// Logs a failed graph primitive. The engine carries on with the next step.
fn check<T>(result: std::result::Result<T, GraphError>, what: &str) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(error = %e, "graph operation failed: {}", what);
            None
        }
    }
}

fn ensure_layer2_link(g: &mut GraphState, a: &NodeId, b: &NodeId, meta: Option<&Metadata>) {
    if !topology::have_layer2_link(g, a, b, meta) {
        check(topology::add_layer2_link(g, a, b, meta), "add layer2 link");
    }
}

fn ensure_bridge_port_links(g: &mut GraphState, bridge: &NodeId, port: &NodeId) {
    if !topology::have_ownership_link(g, bridge, port, None) {
        check(
            topology::add_ownership_link(g, bridge, port, None),
            "add bridge/port ownership link",
        );
    }
    ensure_layer2_link(g, bridge, port, None);
}

/// Projects one Open vSwitch instance onto the topology graph.
pub struct OvsdbProbe {
    graph: Arc<Graph>,
    root: NodeId,
    monitor: Arc<OvsMonitor>,
    state: Mutex<ProbeState>,
}

impl OvsdbProbe {
    /// Creates a probe and registers it with the monitor.
    ///
    /// `root` is the host node owning every bridge of this switch.
    pub fn new(graph: Arc<Graph>, root: NodeId, monitor: Arc<OvsMonitor>) -> Arc<Self> {
        let probe = Arc::new(Self {
            graph,
            root,
            monitor,
            state: Mutex::new(ProbeState::default()),
        });

        let handler: Weak<dyn MonitorHandler> = Arc::downgrade(&probe) as Weak<dyn MonitorHandler>;
        probe.monitor.add_monitor_handler(handler);
        probe
    }

    /// Creates a probe monitoring the server named in the configuration.
    pub fn from_config(graph: Arc<Graph>, root: NodeId, config: &ProbeConfig) -> Result<Arc<Self>> {
        let monitor = OvsMonitor::new(config.ovsdb_address()?);
        for column in &config.ovs.exclude_columns {
            monitor.exclude_column(column.as_str());
        }
        Ok(Self::new(graph, root, Arc::new(monitor)))
    }

    /// Starts the monitor's delivery.
    pub fn start(&self) -> Result<()> {
        self.monitor.start_monitoring()
    }

    /// Stops the monitor's delivery.
    pub fn stop(&self) {
        self.monitor.stop_monitoring()
    }

    pub fn monitor(&self) -> &Arc<OvsMonitor> {
        &self.monitor
    }

    pub fn root(&self) -> &NodeId {
        &self.root
    }

    /// Snapshot of the caches and pending queues.
    pub fn stats(&self) -> ProbeStats {
        let state = self.state.lock();
        ProbeStats {
            interfaces: state.uuid_to_intf.len(),
            ports: state.uuid_to_port.len(),
            pending_interface_links: state.intf_port_queue.len(),
            pending_port_links: state.port_bridge_queue.len(),
        }
    }

    #[instrument(level = "debug", skip(self, row))]
    fn bridge_add(&self, uuid: &str, row: &RowUpdate) {
        let Some(new) = row.new.as_ref() else {
            return;
        };
        let Some(name) = new.get_str(columns::NAME) else {
            debug!("bridge row has no name yet, skipping");
            return;
        };
        let ports = new
            .get(columns::PORTS)
            .map(FieldValue::uuid_refs)
            .unwrap_or_default();

        let mut guard = self.state.lock();
        let state = &mut *guard;
        let mut g = self.graph.lock();

        let bridge = match g.lookup_first_node(&uuid_filter(uuid)) {
            Some(bridge) => bridge,
            None => {
                let metadata = Metadata::new()
                    .with(md::NAME, name)
                    .with(md::UUID, uuid)
                    .with(md::TYPE, md::TYPE_BRIDGE);
                let Some(bridge) = check(g.new_node(NodeId::generate(), metadata), "create bridge")
                else {
                    return;
                };
                check(
                    topology::add_ownership_link(&mut g, &self.root, &bridge, None),
                    "add root/bridge ownership link",
                );
                info!(bridge = name, "bridge added");
                bridge
            }
        };

        for port_uuid in ports {
            match state.uuid_to_port.get(port_uuid) {
                Some(port) => ensure_bridge_port_links(&mut g, &bridge, port),
                None => {
                    // Resolved when the port row is processed.
                    debug!(port = port_uuid, "port not seen yet, queuing bridge link");
                    state
                        .port_bridge_queue
                        .insert(port_uuid.to_string(), bridge.clone());
                }
            }
        }
    }

    #[instrument(level = "debug", skip(self, _row))]
    fn bridge_del(&self, uuid: &str, _row: &RowUpdate) {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let mut g = self.graph.lock();

        let Some(bridge) = g.lookup_first_node(&uuid_filter(uuid)) else {
            return;
        };
        state.port_bridge_queue.retain(|_, waiting| *waiting != bridge);

        if check(g.del_node(&bridge), "delete bridge").is_some() {
            info!(uuid, "bridge deleted");
        }
    }

    #[instrument(level = "debug", skip(self, row))]
    fn interface_add(&self, uuid: &str, row: &RowUpdate) {
        let Some(new) = row.new.as_ref() else {
            return;
        };
        let Some(intf_row) = InterfaceRow::parse(new) else {
            debug!("interface row not ready, skipping");
            return;
        };

        let mut guard = self.state.lock();
        let state = &mut *guard;
        let mut g = self.graph.lock();

        let mut intf = g.lookup_first_node(&uuid_filter(uuid));
        if intf.is_none() {
            // Discovered earlier by another probe (e.g. netlink)?
            if let Some(existing) = g.lookup_first_node(&intf_row.identity_filter()) {
                check(g.add_metadata(&existing, md::UUID, uuid), "attach UUID");
                info!(interface = intf_row.name, "adopted existing interface node");
                intf = Some(existing);
            }
        }

        let intf = match intf {
            Some(intf) => intf,
            None => {
                let metadata = Metadata::new()
                    .with(md::NAME, intf_row.name)
                    .with(md::UUID, uuid)
                    .with(md::DRIVER, intf_row.driver);
                let Some(intf) = check(g.new_node(NodeId::generate(), metadata), "create interface")
                else {
                    return;
                };
                info!(interface = intf_row.name, "interface added");
                intf
            }
        };

        let mut tr = g.start_metadata_transaction(&intf);
        if intf_row.ofport > 0 {
            tr.add_metadata(md::OF_PORT, intf_row.ofport);
        }
        if intf_row.ifindex > 0 {
            tr.add_metadata(md::IF_INDEX, intf_row.ifindex);
        }
        if !intf_row.mac.is_empty() {
            tr.add_metadata(md::MAC, intf_row.mac);
        }
        if !intf_row.itype.as_str().is_empty() {
            tr.add_metadata(md::TYPE, intf_row.itype.as_str());
        }
        for (key, value) in &intf_row.external_ids {
            tr.add_metadata(format!("{}{}", md::EXT_ID_PREFIX, key), *value);
        }
        for (key, value) in &intf_row.tunnel {
            tr.add_metadata(*key, *value);
        }
        check(tr.commit(), "commit interface metadata");

        state.uuid_to_intf.insert(uuid.to_string(), intf.clone());

        if let Some(peer_name) = intf_row.patch_peer {
            let patch = patch_metadata();
            let peer_filter = Metadata::new()
                .with(md::NAME, peer_name)
                .with(md::TYPE, InterfaceType::Patch.as_str());

            match g.lookup_first_node(&peer_filter) {
                Some(peer) if peer != intf => ensure_layer2_link(&mut g, &intf, &peer, Some(&patch)),
                Some(_) => {}
                None => {
                    let peers: Vec<NodeId> = state
                        .uuid_to_intf
                        .values()
                        .filter(|n| **n != intf)
                        .filter(|n| g.node(n).and_then(|p| p.get_str(md::NAME)) == Some(peer_name))
                        .cloned()
                        .collect();
                    for peer in peers {
                        ensure_layer2_link(&mut g, &intf, &peer, Some(&patch));
                    }
                }
            }
        }

        if let Some(port) = state.intf_port_queue.remove(uuid) {
            debug!("resolving queued port link");
            ensure_layer2_link(&mut g, &port, &intf, None);
        }
    }

    #[instrument(level = "debug", skip(self, _row))]
    fn interface_del(&self, uuid: &str, _row: &RowUpdate) {
        let mut state = self.state.lock();

        // A port still waiting for this interface can never be satisfied now.
        state.intf_port_queue.remove(uuid);

        let Some(intf) = state.uuid_to_intf.remove(uuid) else {
            return;
        };

        let mut g = self.graph.lock();
        let owned = g
            .node(&intf)
            .and_then(|n| n.get_str(md::DRIVER))
            .is_some_and(|driver| driver == OVS_DRIVER);

        if owned {
            if check(g.del_node(&intf), "delete interface").is_some() {
                info!(uuid, "interface deleted");
            }
        } else {
            debug!(uuid, "interface owned by another source, keeping node");
        }
    }

    #[instrument(level = "debug", skip(self, row))]
    fn port_add(&self, uuid: &str, row: &RowUpdate) {
        let Some(new) = row.new.as_ref() else {
            return;
        };
        let Some(port_row) = PortRow::parse(new) else {
            debug!("port row has no name yet, skipping");
            return;
        };

        let mut guard = self.state.lock();
        let state = &mut *guard;
        let mut g = self.graph.lock();

        let port = match state.uuid_to_port.get(uuid) {
            Some(port) => port.clone(),
            None => {
                let metadata = Metadata::new()
                    .with(md::UUID, uuid)
                    .with(md::NAME, port_row.name)
                    .with(md::TYPE, md::TYPE_PORT);
                let Some(port) = check(g.new_node(NodeId::generate(), metadata), "create port")
                else {
                    return;
                };
                state.uuid_to_port.insert(uuid.to_string(), port.clone());
                info!(port = port_row.name, "port added");
                port
            }
        };

        if let Some(mode) = port_row.bond_mode {
            check(g.add_metadata(&port, md::BOND_MODE, mode), "set bond mode");
        }
        if let Some(lacp) = port_row.lacp {
            check(g.add_metadata(&port, md::LACP, lacp), "set lacp");
        }
        if let Some(vlans) = port_row.vlans {
            check(g.add_metadata(&port, md::VLANS, vlans), "set vlans");
        }

        for intf_uuid in port_row.interfaces {
            match state.uuid_to_intf.get(intf_uuid) {
                Some(intf) => ensure_layer2_link(&mut g, &port, intf, None),
                None => {
                    // Resolved when the interface row is processed.
                    debug!(interface = intf_uuid, "interface not seen yet, queuing port link");
                    state
                        .intf_port_queue
                        .insert(intf_uuid.to_string(), port.clone());
                }
            }
        }

        if let Some(bridge) = state.port_bridge_queue.remove(uuid) {
            debug!("resolving queued bridge link");
            ensure_bridge_port_links(&mut g, &bridge, &port);
        }
    }

    #[instrument(level = "debug", skip(self, _row))]
    fn port_del(&self, uuid: &str, _row: &RowUpdate) {
        let mut state = self.state.lock();

        // A bridge still waiting for this port can never be satisfied now.
        state.port_bridge_queue.remove(uuid);

        let Some(port) = state.uuid_to_port.remove(uuid) else {
            return;
        };
        state.intf_port_queue.retain(|_, waiting| *waiting != port);

        let mut g = self.graph.lock();
        if check(g.del_node(&port), "delete port").is_some() {
            info!(uuid, "port deleted");
        }
    }
}

impl MonitorHandler for OvsdbProbe {
    fn on_bridge_add(&self, uuid: &str, row: &RowUpdate) {
        self.bridge_add(uuid, row)
    }

    fn on_bridge_update(&self, uuid: &str, row: &RowUpdate) {
        self.bridge_add(uuid, row)
    }

    fn on_bridge_del(&self, uuid: &str, row: &RowUpdate) {
        self.bridge_del(uuid, row)
    }

    fn on_interface_add(&self, uuid: &str, row: &RowUpdate) {
        self.interface_add(uuid, row)
    }

    fn on_interface_update(&self, uuid: &str, row: &RowUpdate) {
        self.interface_add(uuid, row)
    }

    fn on_interface_del(&self, uuid: &str, row: &RowUpdate) {
        self.interface_del(uuid, row)
    }

    fn on_port_add(&self, uuid: &str, row: &RowUpdate) {
        self.port_add(uuid, row)
    }

    fn on_port_update(&self, uuid: &str, row: &RowUpdate) {
        self.port_add(uuid, row)
    }

    fn on_port_del(&self, uuid: &str, row: &RowUpdate) {
        self.port_del(uuid, row)
    }
}
