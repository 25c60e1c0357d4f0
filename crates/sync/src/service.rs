// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! App-facing sync service.
//!
//! Wires the queue worker, the pull coordinator, and the network signal
//! into one cooperative event loop, and exposes the local-first write
//! operations the UI layer calls. Every write lands in the store first
//! and is queued for push; nothing here waits for the network.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{watch, Notify};

use mell_core::{
    Appointment, EntityKind, Mutation, MutationOp, MutationPayload, Reading, Store,
};
use mell_gateway::{Gateway, GatewayError};

use crate::error::{SyncError, SyncResult};
use crate::lock::KindLocks;
use crate::lock_store;
use crate::monitor::{NetworkHandle, NetworkMonitor};
use crate::pull::{PullCoordinator, SyncMode};
use crate::worker::{DrainReport, QueueWorker, SyncConfig};
use crate::{shared_store, SharedStore};

/// Orchestrates push and pull sync around the local store.
pub struct SyncService<G: Gateway> {
    store: SharedStore,
    worker: QueueWorker<G>,
    pull: PullCoordinator<G>,
    network: NetworkHandle,
    wakeup: Arc<Notify>,
}

impl<G: Gateway> SyncService<G> {
    /// Build the service from its collaborators.
    pub fn new(store: Store, gateway: G, monitor: &NetworkMonitor, config: SyncConfig) -> Self {
        let store = shared_store(store);
        let gateway = Arc::new(gateway);
        let locks = Arc::new(KindLocks::new());
        let network = monitor.handle();

        let worker = QueueWorker::new(
            Arc::clone(&store),
            Arc::clone(&gateway),
            network.clone(),
            Arc::clone(&locks),
            config,
        );
        let wakeup = worker.wakeup_handle();
        let pull = PullCoordinator::new(Arc::clone(&store), gateway, locks);

        SyncService {
            store,
            worker,
            pull,
            network,
            wakeup,
        }
    }

    /// Shared handle to the local store (for read paths in the UI layer).
    pub fn store(&self) -> SharedStore {
        Arc::clone(&self.store)
    }

    // ---- local-first writes ----

    /// Record a new reading: persist locally and queue a create.
    pub fn record_reading(&self, reading: Reading) -> SyncResult<Reading> {
        lock_store(&self.store).put_reading(&reading)?;
        self.worker.enqueue(Mutation::new(
            MutationOp::Create,
            MutationPayload::Reading(reading.clone()),
        ))?;
        Ok(reading)
    }

    /// Apply a local edit: the reading re-enters the queue as an update.
    pub fn edit_reading(&self, mut reading: Reading) -> SyncResult<Reading> {
        reading.synced = false;
        reading.updated_at = Utc::now();

        lock_store(&self.store).put_reading(&reading)?;
        self.worker.enqueue(Mutation::new(
            MutationOp::Update,
            MutationPayload::Reading(reading.clone()),
        ))?;
        Ok(reading)
    }

    /// Delete a reading locally and queue the remote delete.
    pub fn delete_reading(&self, local_id: &str) -> SyncResult<()> {
        let snapshot = {
            let store = lock_store(&self.store);
            let snapshot = store.get_reading(local_id)?;
            store.delete_reading(local_id)?;
            snapshot
        };

        self.worker.enqueue(Mutation::new(
            MutationOp::Delete,
            MutationPayload::Reading(snapshot),
        ))?;
        Ok(())
    }

    /// Book an appointment: eligibility-checked, persisted, queued.
    ///
    /// Refused while any appointment is in an open state — the clinic
    /// queue admits one request per user at a time.
    pub fn book_appointment(&self, appointment: Appointment) -> SyncResult<Appointment> {
        if lock_store(&self.store).has_open_appointment()? {
            return Err(SyncError::AppointmentAlreadyOpen);
        }

        lock_store(&self.store).put_appointment(&appointment)?;
        self.worker.enqueue(Mutation::new(
            MutationOp::Create,
            MutationPayload::Appointment(appointment.clone()),
        ))?;
        Ok(appointment)
    }

    /// Withdraw an appointment locally and queue the remote cancel.
    pub fn cancel_appointment(&self, local_id: &str) -> SyncResult<()> {
        let snapshot = {
            let store = lock_store(&self.store);
            let snapshot = store.get_appointment(local_id)?;
            store.delete_appointment(local_id)?;
            snapshot
        };

        self.worker.enqueue(Mutation::new(
            MutationOp::Delete,
            MutationPayload::Appointment(snapshot),
        ))?;
        Ok(())
    }

    /// Permanently failed mutations, for the failed-sync surface.
    pub fn failed_mutations(&self) -> SyncResult<Vec<Mutation>> {
        Ok(lock_store(&self.store).failed_mutations()?)
    }

    /// Re-arm a failed mutation and signal a drain.
    pub fn retry_mutation(&self, id: i64) -> SyncResult<()> {
        lock_store(&self.store).retry_mutation(id)?;
        if self.network.is_online() {
            self.wakeup.notify_one();
        }
        Ok(())
    }

    // ---- sync triggers ----

    /// User-initiated sync: drain the queue, then pull both kinds.
    pub async fn sync_now(&self) -> SyncResult<DrainReport> {
        if !self.network.is_online() {
            return Err(SyncError::Gateway(GatewayError::Transient(
                "device is offline".to_string(),
            )));
        }
        self.sync_cycle(SyncMode::Incremental).await
    }

    /// Full reconciliation: drain, then pull the entire remote state.
    pub async fn full_refresh(&self) -> SyncResult<DrainReport> {
        if !self.network.is_online() {
            return Err(SyncError::Gateway(GatewayError::Transient(
                "device is offline".to_string(),
            )));
        }
        self.sync_cycle(SyncMode::Full).await
    }

    async fn sync_cycle(&self, mode: SyncMode) -> SyncResult<DrainReport> {
        let report = self.worker.process_queue().await?;
        for kind in EntityKind::ALL {
            self.pull.run_sync(kind, mode).await?;
        }
        Ok(report)
    }

    /// Cooperative event loop: drains on enqueue signals, runs a full
    /// cycle on reconnect, and exits when `shutdown` flips to true.
    ///
    /// Cancellation is cooperative and only ever happens between
    /// mutations/records, never mid-write.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!("sync service started");
        let mut network = self.network.clone();

        loop {
            tokio::select! {
                _ = self.wakeup.notified() => {
                    if let Err(e) = self.worker.process_queue().await {
                        tracing::error!(error = %e, "queue drain failed");
                    }
                }
                status = network.changed() => match status {
                    Some(s) if s.is_online() => {
                        tracing::info!("back online, starting sync cycle");
                        if let Err(e) = self.sync_cycle(SyncMode::Incremental).await {
                            tracing::error!(error = %e, "sync cycle failed");
                        }
                    }
                    Some(_) => {}
                    None => break, // monitor gone, nothing left to react to
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("sync service stopped");
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
