//! Configuration file support for the OVSDB probe
//!
//! Loads and validates probe configuration from TOML files.
//! Default location: /etc/topology/ovsdb-probe.toml

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::warn;

use crate::address::{OvsdbAddress, DEFAULT_OVSDB_ADDRESS};
use crate::error::{ProbeError, Result};
use crate::tables::STATISTICS_COLUMN;

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "/etc/topology/ovsdb-probe.toml";

/// Open vSwitch connection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OvsConfig {
    /// OVSDB server: `unix://<path>`, `tcp://<host:port>` or `addr:port`
    #[serde(default = "default_ovsdb")]
    pub ovsdb: String,

    /// Columns dropped from every monitored row
    #[serde(default = "default_exclude_columns")]
    pub exclude_columns: Vec<String>,
}

/// Probe identity configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Name of the host node owning the discovered bridges
    #[serde(default = "default_host")]
    pub host: String,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by RUST_LOG
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Complete probe configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbeConfig {
    #[serde(default)]
    pub ovs: OvsConfig,

    #[serde(default)]
    pub probe: HostConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_ovsdb() -> String {
    DEFAULT_OVSDB_ADDRESS.to_string()
}

fn default_exclude_columns() -> Vec<String> {
    vec![STATISTICS_COLUMN.to_string()]
}

fn default_host() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string())
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for OvsConfig {
    fn default() -> Self {
        Self {
            ovsdb: default_ovsdb(),
            exclude_columns: default_exclude_columns(),
        }
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl ProbeConfig {
    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| ProbeError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load configuration from file, falling back to defaults if file not found
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(content) => Self::from_toml(&content).map_err(|e| match e {
                ProbeError::Config(msg) => {
                    ProbeError::Config(format!("{}: {}", path.display(), msg))
                }
                other => other,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "config file not found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(ProbeError::Io(e)),
        }
    }

    /// Load from default location or defaults
    pub fn load() -> Result<Self> {
        Self::load_or_default(DEFAULT_CONFIG_PATH)
    }

    /// Resolved OVSDB address
    pub fn ovsdb_address(&self) -> Result<OvsdbAddress> {
        OvsdbAddress::parse(&self.ovs.ovsdb)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.ovsdb_address()?;

        if self.probe.host.trim().is_empty() {
            return Err(ProbeError::Config("probe.host must not be empty".to_string()));
        }

        if self.ovs.exclude_columns.iter().any(|c| c.trim().is_empty()) {
            return Err(ProbeError::Config(
                "ovs.exclude_columns must not contain empty names".to_string(),
            ));
        }

        Ok(())
    }
}
