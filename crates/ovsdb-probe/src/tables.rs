//! OVSDB table, column and graph metadata names used by the probe

/// Bridge table name
pub const BRIDGE_TABLE: &str = "Bridge";

/// Port table name
pub const PORT_TABLE: &str = "Port";

/// Interface table name
pub const INTERFACE_TABLE: &str = "Interface";

/// Column excluded from monitoring by default (counters churn constantly)
pub const STATISTICS_COLUMN: &str = "statistics";

/// Driver recorded on interfaces owned by this probe
pub const OVS_DRIVER: &str = "openvswitch";

/// Column names
pub mod columns {
    pub const NAME: &str = "name";
    pub const PORTS: &str = "ports";
    pub const INTERFACES: &str = "interfaces";
    pub const OFPORT: &str = "ofport";
    pub const MAC_IN_USE: &str = "mac_in_use";
    pub const IFINDEX: &str = "ifindex";
    pub const TYPE: &str = "type";
    pub const STATUS: &str = "status";
    pub const OPTIONS: &str = "options";
    pub const EXTERNAL_IDS: &str = "external_ids";
    pub const BOND_MODE: &str = "bond_mode";
    pub const LACP: &str = "lacp";
    pub const TAG: &str = "tag";

    /// Keys of the `status` map
    pub const DRIVER_NAME: &str = "driver_name";
    pub const TUNNEL_EGRESS_IFACE: &str = "tunnel_egress_iface";
    pub const TUNNEL_EGRESS_IFACE_CARRIER: &str = "tunnel_egress_iface_carrier";

    /// Keys of the `options` map
    pub const LOCAL_IP: &str = "local_ip";
    pub const REMOTE_IP: &str = "remote_ip";
    pub const PEER: &str = "peer";
}

/// Node metadata keys written into the topology graph
pub mod metadata {
    pub const UUID: &str = "UUID";
    pub const NAME: &str = "Name";
    pub const TYPE: &str = "Type";
    pub const DRIVER: &str = "Driver";
    pub const MAC: &str = "MAC";
    pub const IF_INDEX: &str = "IfIndex";
    pub const OF_PORT: &str = "OfPort";
    pub const EXT_ID_PREFIX: &str = "ExtID/";
    pub const LOCAL_IP: &str = "LocalIP";
    pub const REMOTE_IP: &str = "RemoteIP";
    pub const TUN_EGRESS_IFACE: &str = "TunEgressIface";
    pub const TUN_EGRESS_IFACE_CARRIER: &str = "TunEgressIfaceCarrier";
    pub const BOND_MODE: &str = "BondMode";
    pub const LACP: &str = "LACP";
    pub const VLANS: &str = "Vlans";

    /// `Type` of bridge nodes
    pub const TYPE_BRIDGE: &str = "ovsbridge";

    /// `Type` of port nodes
    pub const TYPE_PORT: &str = "ovsport";
}
