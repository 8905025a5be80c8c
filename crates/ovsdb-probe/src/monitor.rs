//! Notification source boundary.
//!
//! The OVSDB transport (connection, `monitor` request, reconnection) lives
//! outside this crate. It feeds decoded [`TableUpdates`] into the channel
//! returned by [`OvsMonitor::sender`]. While monitoring is started, a delivery
//! task drains that channel and calls every registered [`MonitorHandler`] with
//! one callback per row and per event kind.

use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::address::OvsdbAddress;
use crate::error::{ProbeError, Result};
use crate::row::{RowUpdate, TableUpdates};
use crate::tables::{BRIDGE_TABLE, INTERFACE_TABLE, PORT_TABLE};
use crate::types::UpdateKind;

/// Capacity of the transport → monitor channel.
const UPDATE_CHANNEL_CAPACITY: usize = 1024;

/// Per-table row callbacks.
///
/// Callbacks may be invoked from the delivery task and from any other thread
/// calling [`OvsMonitor::dispatch`], possibly concurrently.
pub trait MonitorHandler: Send + Sync {
    fn on_bridge_add(&self, uuid: &str, row: &RowUpdate);
    fn on_bridge_update(&self, uuid: &str, row: &RowUpdate);
    fn on_bridge_del(&self, uuid: &str, row: &RowUpdate);

    fn on_interface_add(&self, uuid: &str, row: &RowUpdate);
    fn on_interface_update(&self, uuid: &str, row: &RowUpdate);
    fn on_interface_del(&self, uuid: &str, row: &RowUpdate);

    fn on_port_add(&self, uuid: &str, row: &RowUpdate);
    fn on_port_update(&self, uuid: &str, row: &RowUpdate);
    fn on_port_del(&self, uuid: &str, row: &RowUpdate);
}

struct MonitorInner {
    address: OvsdbAddress,
    excluded_columns: RwLock<HashSet<String>>,
    /// Weak so that a handler owning the monitor does not form a cycle.
    handlers: RwLock<Vec<Weak<dyn MonitorHandler>>>,
    tx: mpsc::Sender<TableUpdates>,
    rx: tokio::sync::Mutex<mpsc::Receiver<TableUpdates>>,
}

impl MonitorInner {
    fn live_handlers(&self) -> Vec<Arc<dyn MonitorHandler>> {
        self.handlers.read().iter().filter_map(Weak::upgrade).collect()
    }

    fn dispatch(&self, mut updates: TableUpdates) {
        {
            let excluded = self.excluded_columns.read();
            if !excluded.is_empty() {
                for (_, rows) in updates.iter_mut() {
                    for update in rows.iter_mut() {
                        for row in [update.old.as_mut(), update.new.as_mut()].into_iter().flatten() {
                            for column in excluded.iter() {
                                row.remove(column);
                            }
                        }
                    }
                }
            }
        }

        let handlers = self.live_handlers();
        if handlers.is_empty() {
            debug!(rows = updates.len(), "no handler registered, dropping updates");
            return;
        }

        for (table, rows) in updates.iter() {
            for update in rows {
                let Some(kind) = update.kind() else {
                    continue;
                };
                trace!(table, uuid = %update.uuid, kind = kind.as_str(), "row update");

                for handler in &handlers {
                    dispatch_row(handler.as_ref(), table, kind, update);
                }
            }
        }
    }
}

fn dispatch_row(handler: &dyn MonitorHandler, table: &str, kind: UpdateKind, row: &RowUpdate) {
    let uuid = row.uuid.as_str();
    match (table, kind) {
        (BRIDGE_TABLE, UpdateKind::Add) => handler.on_bridge_add(uuid, row),
        (BRIDGE_TABLE, UpdateKind::Update) => handler.on_bridge_update(uuid, row),
        (BRIDGE_TABLE, UpdateKind::Delete) => handler.on_bridge_del(uuid, row),
        (INTERFACE_TABLE, UpdateKind::Add) => handler.on_interface_add(uuid, row),
        (INTERFACE_TABLE, UpdateKind::Update) => handler.on_interface_update(uuid, row),
        (INTERFACE_TABLE, UpdateKind::Delete) => handler.on_interface_del(uuid, row),
        (PORT_TABLE, UpdateKind::Add) => handler.on_port_add(uuid, row),
        (PORT_TABLE, UpdateKind::Update) => handler.on_port_update(uuid, row),
        (PORT_TABLE, UpdateKind::Delete) => handler.on_port_del(uuid, row),
        _ => {}
    }
}

/// Monitor of one OVSDB server.
pub struct OvsMonitor {
    inner: Arc<MonitorInner>,
    /// Cancellation token of the running delivery task.
    running: Mutex<Option<CancellationToken>>,
}

impl OvsMonitor {
    pub fn new(address: OvsdbAddress) -> Self {
        let (tx, rx) = mpsc::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(MonitorInner {
                address,
                excluded_columns: RwLock::new(HashSet::new()),
                handlers: RwLock::new(Vec::new()),
                tx,
                rx: tokio::sync::Mutex::new(rx),
            }),
            running: Mutex::new(None),
        }
    }

    /// Address of the monitored server.
    pub fn address(&self) -> &OvsdbAddress {
        &self.inner.address
    }

    /// Drops a column from every delivered row.
    pub fn exclude_column(&self, column: impl Into<String>) {
        self.inner.excluded_columns.write().insert(column.into());
    }

    pub fn excluded_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = self.inner.excluded_columns.read().iter().cloned().collect();
        columns.sort();
        columns
    }

    /// Registers a handler. The monitor does not keep it alive.
    pub fn add_monitor_handler(&self, handler: Weak<dyn MonitorHandler>) {
        let mut handlers = self.inner.handlers.write();
        handlers.retain(|h| h.strong_count() > 0);
        handlers.push(handler);
    }

    /// Channel through which the transport delivers decoded updates.
    pub fn sender(&self) -> mpsc::Sender<TableUpdates> {
        self.inner.tx.clone()
    }

    /// Delivers updates synchronously on the calling thread.
    pub fn dispatch(&self, updates: TableUpdates) {
        self.inner.dispatch(updates);
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    /// Spawns the delivery task on the current tokio runtime.
    pub fn start_monitoring(&self) -> Result<()> {
        let mut running = self.running.lock();
        if running.is_some() {
            return Err(ProbeError::Monitor(format!(
                "already monitoring {}",
                self.inner.address
            )));
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| ProbeError::Monitor(format!("no tokio runtime: {}", e)))?;

        let token = CancellationToken::new();
        let cancelled = token.clone();
        let inner = self.inner.clone();

        runtime.spawn(async move {
            // Held for the task's lifetime; a restarted task waits here until
            // the previous one has observed its cancellation.
            let mut rx = inner.rx.lock().await;
            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    updates = rx.recv() => match updates {
                        Some(updates) => inner.dispatch(updates),
                        // Not reached while `inner` holds its own sender.
                        None => break,
                    },
                }
            }
            debug!(address = %inner.address, "delivery task stopped");
        });

        info!(address = %self.inner.address, "started OVSDB monitoring");
        *running = Some(token);
        Ok(())
    }

    /// Cancels the delivery task. Stopping a stopped monitor is a no-op.
    pub fn stop_monitoring(&self) {
        if let Some(token) = self.running.lock().take() {
            token.cancel();
            info!(address = %self.inner.address, "stopped OVSDB monitoring");
        }
    }
}

impl Drop for OvsMonitor {
    fn drop(&mut self) {
        self.stop_monitoring();
    }
}
