// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Sync queue worker: drains pending mutations against the gateway.
//!
//! Drain semantics:
//! - One drain at a time (re-entrancy guard; a second trigger is a no-op)
//! - FIFO creation order per entity kind, under that kind's lock
//! - Transient failures retry the *same* mutation with exponential
//!   backoff (base 1 s, doubling, capped at 60 s) up to the retry budget,
//!   then freeze it in the failed state
//! - 4xx rejections fail after exactly one attempt
//! - 401 pauses the drain; the mutation stays pending and goes out again
//!   once a fresh token is installed
//! - An offline transition cancels the drain at the next mutation boundary

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};

use mell_core::{
    Appointment, EntityKind, Mutation, MutationOp, MutationPayload, MutationStatus, Reading,
};
use mell_gateway::{Gateway, GatewayError, GatewayResult};

use crate::error::{SyncError, SyncResult};
use crate::lock::KindLocks;
use crate::lock_store;
use crate::monitor::NetworkHandle;
use crate::SharedStore;

/// Configuration for the sync queue worker.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Attempts per mutation before it is frozen as failed.
    pub max_retries: u32,
    /// Backoff base delay (milliseconds).
    pub initial_delay_ms: u64,
    /// Backoff delay cap (seconds).
    pub max_delay_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            max_retries: 5,
            initial_delay_ms: 1000,
            max_delay_secs: 60,
        }
    }
}

impl SyncConfig {
    /// Backoff delay after the given (1-based) failed attempt.
    ///
    /// Doubles per attempt and never exceeds the cap, so the sequence of
    /// delays is non-decreasing.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let ms = self
            .initial_delay_ms
            .saturating_mul(1u64 << exp)
            .min(self.max_delay_secs.saturating_mul(1000));
        Duration::from_millis(ms)
    }
}

/// Summary of one `process_queue` run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Mutations confirmed and removed from the queue.
    pub completed: usize,
    /// Mutations frozen in the failed state during this run.
    pub failed: Vec<i64>,
    /// True if another drain was already running and this one did nothing.
    pub skipped: bool,
}

/// Why a mutation's push loop ended without a terminal outcome.
enum PushOutcome {
    /// Confirmed by the backend; mutation removed.
    Completed,
    /// Auth failure: mutation restored to pending, drain must stop.
    AuthPaused,
    /// Offline transition: mutation restored to pending, drain must stop.
    Cancelled,
}

/// What the gateway acknowledged for a successful push.
enum Ack {
    Reading(Reading),
    Appointment(Appointment),
    Deleted,
}

/// Drains the mutation queue against the remote gateway.
///
/// All collaborators are injected at construction; the worker owns no
/// global state.
pub struct QueueWorker<G: Gateway> {
    store: SharedStore,
    gateway: Arc<G>,
    network: NetworkHandle,
    locks: Arc<KindLocks>,
    config: SyncConfig,
    /// Re-entrancy guard: held for the whole drain.
    drain_guard: Mutex<()>,
    /// Signalled by `enqueue` when a drain should run soon.
    wakeup: Arc<Notify>,
}

impl<G: Gateway> QueueWorker<G> {
    /// Create a worker over the shared store and gateway.
    pub fn new(
        store: SharedStore,
        gateway: Arc<G>,
        network: NetworkHandle,
        locks: Arc<KindLocks>,
        config: SyncConfig,
    ) -> Self {
        QueueWorker {
            store,
            gateway,
            network,
            locks,
            config,
            drain_guard: Mutex::new(()),
            wakeup: Arc::new(Notify::new()),
        }
    }

    /// The notifier signalled whenever a drain should run soon.
    pub fn wakeup_handle(&self) -> Arc<Notify> {
        Arc::clone(&self.wakeup)
    }

    /// Persist a pending mutation and, if online, signal a drain.
    ///
    /// Never blocks the caller beyond the local write.
    pub fn enqueue(&self, mutation: Mutation) -> SyncResult<i64> {
        let id = lock_store(&self.store).enqueue_mutation(&mutation)?;
        tracing::debug!(id, kind = %mutation.kind(), op = %mutation.op, "mutation enqueued");

        if self.network.is_online() {
            self.wakeup.notify_one();
        }
        Ok(id)
    }

    /// Drain all pending mutations, one entity kind at a time.
    ///
    /// Serialized: if a drain is already running this returns immediately
    /// with `skipped = true`.
    pub async fn process_queue(&self) -> SyncResult<DrainReport> {
        let _guard = match self.drain_guard.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                tracing::debug!("drain already running, skipping");
                return Ok(DrainReport {
                    skipped: true,
                    ..DrainReport::default()
                });
            }
        };

        let mut report = DrainReport::default();
        for kind in EntityKind::ALL {
            let _kind_lock = self.locks.acquire(kind).await;
            self.drain_kind(kind, &mut report).await?;
        }

        if report.completed > 0 || !report.failed.is_empty() {
            tracing::info!(
                completed = report.completed,
                failed = report.failed.len(),
                "queue drain finished"
            );
        }
        Ok(report)
    }

    /// Drain one entity kind's pending mutations in FIFO order.
    async fn drain_kind(&self, kind: EntityKind, report: &mut DrainReport) -> SyncResult<()> {
        let pending = lock_store(&self.store).pending_mutations(Some(kind))?;

        for mutation in pending {
            match self.push_mutation(&mutation).await {
                Ok(PushOutcome::Completed) => report.completed += 1,
                Ok(PushOutcome::AuthPaused) => {
                    tracing::info!(kind = %kind, "authentication required, drain paused");
                    return Ok(());
                }
                Ok(PushOutcome::Cancelled) => {
                    tracing::info!(kind = %kind, "went offline, drain cancelled");
                    return Ok(());
                }
                Err(SyncError::QueueExhausted { id, attempts }) => {
                    tracing::warn!(id, attempts, "mutation failed permanently: retry budget spent");
                    lock_store(&self.store).mark_mutation(id, MutationStatus::Failed)?;
                    report.failed.push(id);
                }
                Err(SyncError::Gateway(e)) if !e.is_retryable() => {
                    tracing::warn!(id = mutation.id, error = %e, "mutation rejected, marking failed");
                    lock_store(&self.store).mark_mutation(mutation.id, MutationStatus::Failed)?;
                    report.failed.push(mutation.id);
                }
                Err(e) => {
                    // Store failures and the like: restore the mutation so
                    // nothing is lost, then propagate.
                    let _ = lock_store(&self.store).mark_mutation(mutation.id, MutationStatus::Pending);
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Push one mutation, retrying transient failures with backoff.
    ///
    /// Terminal failures (rejection, spent budget) are returned as errors
    /// for the drain loop to record.
    async fn push_mutation(&self, mutation: &Mutation) -> SyncResult<PushOutcome> {
        lock_store(&self.store).mark_mutation(mutation.id, MutationStatus::Processing)?;

        loop {
            if !self.network.is_online() {
                lock_store(&self.store).mark_mutation(mutation.id, MutationStatus::Pending)?;
                return Ok(PushOutcome::Cancelled);
            }

            match self.call_gateway(mutation).await {
                Ok(ack) => {
                    self.apply_ack(mutation, ack)?;
                    return Ok(PushOutcome::Completed);
                }
                Err(e) if e.is_auth() => {
                    lock_store(&self.store).mark_mutation(mutation.id, MutationStatus::Pending)?;
                    return Ok(PushOutcome::AuthPaused);
                }
                Err(e) if e.is_retryable() => {
                    let attempts = lock_store(&self.store).bump_retry(mutation.id)?;
                    if attempts >= self.config.max_retries {
                        return Err(SyncError::QueueExhausted {
                            id: mutation.id,
                            attempts,
                        });
                    }

                    let delay = self.config.backoff_delay(attempts);
                    tracing::debug!(
                        id = mutation.id,
                        attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Map a mutation onto the corresponding gateway call.
    async fn call_gateway(&self, mutation: &Mutation) -> GatewayResult<Ack> {
        match (&mutation.op, &mutation.payload) {
            (MutationOp::Create, MutationPayload::Reading(r)) => {
                Ok(Ack::Reading(self.gateway.create_reading(r).await?))
            }
            (MutationOp::Update, MutationPayload::Reading(r)) => {
                Ok(Ack::Reading(self.gateway.update_reading(r).await?))
            }
            (MutationOp::Delete, MutationPayload::Reading(r)) => {
                // A reading that never synced has nothing to delete remotely.
                if let Some(remote_id) = r.remote_id {
                    self.gateway.delete_reading(remote_id).await?;
                }
                Ok(Ack::Deleted)
            }
            (MutationOp::Create, MutationPayload::Appointment(a)) => {
                Ok(Ack::Appointment(self.gateway.create_appointment(a).await?))
            }
            (MutationOp::Delete, MutationPayload::Appointment(a)) => {
                if let Some(remote_id) = a.remote_id {
                    self.gateway.cancel_appointment(remote_id).await?;
                }
                Ok(Ack::Deleted)
            }
            (MutationOp::Update, MutationPayload::Appointment(_)) => {
                // Appointment state is server-driven; there is no client
                // update operation to map this onto.
                Err(GatewayError::Rejected {
                    status: 400,
                    message: "appointment updates are server-driven".to_string(),
                })
            }
        }
    }

    /// Record a confirmed push: write back the server identifier and
    /// remove the mutation from the queue.
    fn apply_ack(&self, mutation: &Mutation, ack: Ack) -> SyncResult<()> {
        let store = lock_store(&self.store);

        match ack {
            Ack::Reading(acknowledged) => {
                if let Some(remote_id) = acknowledged.remote_id {
                    match store.confirm_reading_synced(&acknowledged.local_id, remote_id) {
                        Ok(()) => {}
                        Err(mell_core::Error::ReadingNotFound(_)) => {
                            // Deleted locally while the push was in flight;
                            // the queued delete will reconcile it.
                            tracing::warn!(
                                local_id = %acknowledged.local_id,
                                "confirmed reading no longer present locally"
                            );
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
            }
            Ack::Appointment(acknowledged) => {
                if let Some(remote_id) = acknowledged.remote_id {
                    match store.confirm_appointment_synced(&acknowledged.local_id, remote_id) {
                        Ok(()) => {
                            // Mirror the server's view of the request state.
                            let mut stored = store.get_appointment(&acknowledged.local_id)?;
                            stored.status = acknowledged.status;
                            store.put_appointment(&stored)?;
                        }
                        Err(mell_core::Error::AppointmentNotFound(_)) => {
                            tracing::warn!(
                                local_id = %acknowledged.local_id,
                                "confirmed appointment no longer present locally"
                            );
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
            }
            Ack::Deleted => {}
        }

        store.remove_mutation(mutation.id)?;
        tracing::debug!(id = mutation.id, "mutation confirmed and removed");
        Ok(())
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
