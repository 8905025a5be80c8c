//! Type definitions for the OVSDB probe

use std::fmt;
use std::str::FromStr;

/// Interface type as reported by the `type` column of the Interface table
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InterfaceType {
    /// GRE tunnel
    Gre,
    /// VXLAN tunnel
    Vxlan,
    /// Geneve tunnel
    Geneve,
    /// Patch port joining two bridges
    Patch,
    /// Anything else ("", "system", "internal", "dpdk", ...)
    Other(String),
}

impl From<&str> for InterfaceType {
    fn from(s: &str) -> Self {
        match s {
            "gre" => InterfaceType::Gre,
            "vxlan" => InterfaceType::Vxlan,
            "geneve" => InterfaceType::Geneve,
            "patch" => InterfaceType::Patch,
            other => InterfaceType::Other(other.to_string()),
        }
    }
}

impl FromStr for InterfaceType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(InterfaceType::from(s))
    }
}

impl InterfaceType {
    /// Convert to the string used in OVSDB and in node metadata
    pub fn as_str(&self) -> &str {
        match self {
            InterfaceType::Gre => "gre",
            InterfaceType::Vxlan => "vxlan",
            InterfaceType::Geneve => "geneve",
            InterfaceType::Patch => "patch",
            InterfaceType::Other(s) => s,
        }
    }

    /// Tunnel types carry local/remote endpoint and egress attributes
    pub fn is_tunnel(&self) -> bool {
        matches!(
            self,
            InterfaceType::Gre | InterfaceType::Vxlan | InterfaceType::Geneve
        )
    }

    /// Virtual types only ever exist inside the switch, so they are owned by
    /// this probe even when OVSDB reports no driver.
    pub fn is_switch_internal(&self) -> bool {
        self.is_tunnel() || *self == InterfaceType::Patch
    }
}

impl fmt::Display for InterfaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row event kind delivered by the monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateKind {
    /// Row appeared (`new` only)
    Add,
    /// Row changed (`old` and `new`)
    Update,
    /// Row disappeared (`old` only)
    Delete,
}

impl UpdateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateKind::Add => "add",
            UpdateKind::Update => "update",
            UpdateKind::Delete => "delete",
        }
    }
}

/// Snapshot of the engine's caches and pending queues
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProbeStats {
    /// Interfaces processed at least once
    pub interfaces: usize,
    /// Ports processed at least once
    pub ports: usize,
    /// Ports waiting for an interface not seen yet
    pub pending_interface_links: usize,
    /// Bridges waiting for a port not seen yet
    pub pending_port_links: usize,
}
