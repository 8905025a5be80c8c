//! ovsdb-probe - Open vSwitch topology discovery
//!
//! Projects the Bridge, Port and Interface tables of an Open vSwitch database
//! onto the shared topology graph. Row notifications are delivered by an
//! [`OvsMonitor`] and reconciled by an [`OvsdbProbe`], which tolerates any
//! arrival order between tables and redelivery of the same row.
//!
//! # Architecture
//!
//! ```text
//! OVSDB transport ──TableUpdates──▶ OvsMonitor ──row callbacks──▶ OvsdbProbe
//!                                                                   │
//!                                                                   ▼
//!                                                            topology_graph::Graph
//! ```

pub mod address;
pub mod config;
pub mod error;
pub mod monitor;
pub mod probe;
pub mod row;
pub mod tables;
pub mod types;

pub use address::{OvsdbAddress, Protocol, DEFAULT_OVSDB_ADDRESS};
pub use config::{ProbeConfig, DEFAULT_CONFIG_PATH};
pub use error::{ProbeError, Result};
pub use monitor::{MonitorHandler, OvsMonitor};
pub use probe::OvsdbProbe;
pub use row::{FieldValue, Row, RowUpdate, TableUpdates};
pub use types::{InterfaceType, ProbeStats, UpdateKind};
