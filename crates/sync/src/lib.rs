// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! mell-sync: Offline-first sync engine for the Mellis companion app.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   enqueue    ┌──────────────┐   HTTP    ┌─────────┐
//! │  SyncService │─────────────►│ QueueWorker  │──────────►│ Gateway │
//! │  (app-facing)│              │ (push drain) │◄──────────│ (trait) │
//! └──────┬───────┘              └──────┬───────┘           └────┬────┘
//!        │                             │ KindLocks              │
//!        │                      ┌──────┴───────┐                │
//!        │                      │  PullCoord.  │◄───────────────┘
//!        │                      │ (pull merge) │
//!        ▼                      └──────┬───────┘
//! ┌──────────────┐                     │
//! │NetworkMonitor│              ┌──────▼───────┐
//! │ (watch pair) │              │    Store     │  (readings, appointments,
//! └──────────────┘              │   (SQLite)   │   mutation queue, sync meta)
//!                               └──────────────┘
//! ```
//!
//! # Guarantees
//!
//! - Mutations drain in FIFO creation order per entity kind
//! - Bounded retry with exponential backoff (base 1 s, doubling, 60 s cap)
//! - 4xx rejections fail after exactly one attempt; 401 pauses the drain
//! - Push and pull for the same entity kind are mutually exclusive
//! - Cancellation happens only at mutation/record boundaries

pub mod error;
pub mod lock;
pub mod monitor;
pub mod pull;
pub mod service;
pub mod worker;

pub use error::{SyncError, SyncResult};
pub use lock::KindLocks;
pub use monitor::{NetworkHandle, NetworkMonitor, NetworkStatus};
pub use pull::{PullCoordinator, PullReport, SyncMode};
pub use service::SyncService;
pub use worker::{DrainReport, QueueWorker, SyncConfig};

use std::sync::{Arc, Mutex, MutexGuard};

use mell_core::Store;

/// The local store shared across the worker, the coordinator, and the
/// app-facing service. All access goes through [`lock_store`].
pub type SharedStore = Arc<Mutex<Store>>;

/// Wrap a store for shared use.
pub fn shared_store(store: Store) -> SharedStore {
    Arc::new(Mutex::new(store))
}

/// Lock the shared store, recovering from a poisoned lock.
///
/// Store operations never panic while holding the guard, but a panicking
/// test elsewhere must not wedge the engine.
pub(crate) fn lock_store(store: &SharedStore) -> MutexGuard<'_, Store> {
    store.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod test_helpers;

#[cfg(test)]
mod integration_tests;
