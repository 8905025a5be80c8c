//! OVSDB server address resolution.

use std::fmt;
use std::str::FromStr;

use crate::error::{ProbeError, Result};

/// Default OVSDB server socket
pub const DEFAULT_OVSDB_ADDRESS: &str = "unix:///var/run/openvswitch/db.sock";

/// Address used by the legacy `:port` form when the host part is empty
const DEFAULT_TCP_HOST: &str = "127.0.0.1";

/// Transport protocol of the OVSDB connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Unix,
    Tcp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Unix => "unix",
            Protocol::Tcp => "tcp",
        }
    }
}

/// Resolved OVSDB server address
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OvsdbAddress {
    pub protocol: Protocol,
    /// Socket path for `unix`, `host:port` for `tcp`
    pub target: String,
}

impl OvsdbAddress {
    /// Parses `unix://<path>`, `tcp://<host:port>` or the legacy `addr:port`.
    pub fn parse(address: &str) -> Result<Self> {
        let address = address.trim();

        if let Some(path) = address.strip_prefix("unix://") {
            if path.is_empty() {
                return Err(ProbeError::invalid_address(address, "empty socket path"));
            }
            return Ok(Self {
                protocol: Protocol::Unix,
                target: path.to_string(),
            });
        }

        if let Some(target) = address.strip_prefix("tcp://") {
            let (host, port) = split_host_port(address, target)?;
            return Ok(Self::tcp(host, port));
        }

        let (host, port) = split_host_port(address, address)?;
        let host = if host.is_empty() { DEFAULT_TCP_HOST } else { host };
        Ok(Self::tcp(host, port))
    }

    fn tcp(host: &str, port: u16) -> Self {
        Self {
            protocol: Protocol::Tcp,
            target: format!("{}:{}", host, port),
        }
    }
}

fn split_host_port<'a>(address: &str, target: &'a str) -> Result<(&'a str, u16)> {
    let (host, port) = target
        .rsplit_once(':')
        .ok_or_else(|| ProbeError::invalid_address(address, "expected addr:port"))?;

    let port = port
        .parse::<u16>()
        .map_err(|e| ProbeError::invalid_address(address, format!("invalid port: {}", e)))?;
    if port == 0 {
        return Err(ProbeError::invalid_address(address, "port must be > 0"));
    }

    Ok((host, port))
}

impl FromStr for OvsdbAddress {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for OvsdbAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.protocol.as_str(), self.target)
    }
}
