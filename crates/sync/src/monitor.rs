// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Network status signal.
//!
//! The platform collaborator (Capacitor's network plugin, in the app)
//! pushes online/offline edges into a [`NetworkMonitor`]; the sync engine
//! holds [`NetworkHandle`]s to read the current status and await
//! transitions. The engine never probes connectivity itself.

use tokio::sync::watch;

/// Connectivity as last reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkStatus {
    Online,
    Offline,
    /// No report received yet (app start).
    Unknown,
}

impl NetworkStatus {
    /// Returns true only for a positively reported online state.
    pub fn is_online(&self) -> bool {
        matches!(self, NetworkStatus::Online)
    }
}

/// Producer side of the network status signal.
pub struct NetworkMonitor {
    tx: watch::Sender<NetworkStatus>,
}

impl NetworkMonitor {
    /// Create a monitor with no status reported yet.
    pub fn new() -> Self {
        NetworkMonitor {
            tx: watch::channel(NetworkStatus::Unknown).0,
        }
    }

    /// Create a monitor with a known initial status (for tests).
    pub fn with_status(status: NetworkStatus) -> Self {
        NetworkMonitor {
            tx: watch::channel(status).0,
        }
    }

    /// Report a status. Consumers observe only actual changes.
    pub fn set(&self, status: NetworkStatus) {
        self.tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
    }

    /// Report the online state.
    pub fn set_online(&self) {
        self.set(NetworkStatus::Online);
    }

    /// Report the offline state.
    pub fn set_offline(&self) {
        self.set(NetworkStatus::Offline);
    }

    /// The last reported status.
    pub fn status(&self) -> NetworkStatus {
        *self.tx.borrow()
    }

    /// Create a consumer handle.
    pub fn handle(&self) -> NetworkHandle {
        NetworkHandle {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for NetworkMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// Consumer side of the network status signal.
#[derive(Clone)]
pub struct NetworkHandle {
    rx: watch::Receiver<NetworkStatus>,
}

impl NetworkHandle {
    /// The last reported status.
    pub fn status(&self) -> NetworkStatus {
        *self.rx.borrow()
    }

    /// Returns true only for a positively reported online state.
    pub fn is_online(&self) -> bool {
        self.status().is_online()
    }

    /// Wait for the next status change.
    ///
    /// Returns `None` once the monitor has been dropped.
    pub async fn changed(&mut self) -> Option<NetworkStatus> {
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow())
    }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
