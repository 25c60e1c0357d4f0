// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Pull-sync coordinator: reconciles the local store with remote state.
//!
//! The backend offers no server-side filtering or pagination, so every
//! run fetches the full collection; incremental mode filters the payload
//! client-side by the stored last-successful-sync timestamp before
//! diffing. Overlapping records (matched by remote id) go through the
//! conflict resolver; remote-only records are inserted; local-only
//! records are left untouched — they are still queued for push.
//!
//! On transport failure the run aborts without advancing the
//! last-successful-sync timestamp. The timestamp never partially
//! advances.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use mell_core::{Appointment, EntityKind, Reading, Resolve, Strategy};
use mell_gateway::Gateway;

use crate::error::SyncResult;
use crate::lock::KindLocks;
use crate::lock_store;
use crate::SharedStore;

/// How much of the remote payload a run considers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Diff the entire remote collection.
    Full,
    /// Pre-filter by the last successful sync timestamp.
    Incremental,
}

/// Summary of one pull run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullReport {
    /// Remote records fetched (before incremental filtering).
    pub fetched: usize,
    /// Remote-only records inserted locally.
    pub inserted: usize,
    /// Overlapping records written through the resolver.
    pub updated: usize,
    /// Overlapping records that had at least one field conflict.
    pub conflicts: usize,
}

/// Periodically (or on reconnect) merges remote state into the store.
pub struct PullCoordinator<G: Gateway> {
    store: SharedStore,
    gateway: Arc<G>,
    locks: Arc<KindLocks>,
    reading_strategy: Strategy,
}

impl<G: Gateway> PullCoordinator<G> {
    /// Create a coordinator over the shared store and gateway.
    ///
    /// Readings resolve with `Merge` by default; appointments always
    /// resolve backend-wins regardless of configuration.
    pub fn new(store: SharedStore, gateway: Arc<G>, locks: Arc<KindLocks>) -> Self {
        PullCoordinator {
            store,
            gateway,
            locks,
            reading_strategy: Strategy::Merge,
        }
    }

    /// Override the resolution strategy used for readings.
    pub fn with_reading_strategy(mut self, strategy: Strategy) -> Self {
        self.reading_strategy = strategy;
        self
    }

    /// Reconcile one entity kind with the remote source of truth.
    ///
    /// Mutually exclusive with a queue drain for the same kind.
    pub async fn run_sync(&self, kind: EntityKind, mode: SyncMode) -> SyncResult<PullReport> {
        let _kind_lock = self.locks.acquire(kind).await;

        let report = match kind {
            EntityKind::Reading => self.sync_readings(mode).await?,
            EntityKind::Appointment => self.sync_appointments(mode).await?,
        };

        tracing::info!(
            kind = %kind,
            fetched = report.fetched,
            inserted = report.inserted,
            updated = report.updated,
            conflicts = report.conflicts,
            "pull sync finished"
        );
        Ok(report)
    }

    async fn sync_readings(&self, mode: SyncMode) -> SyncResult<PullReport> {
        // Transport failures propagate from here with the timestamp
        // untouched.
        let remote = self.gateway.fetch_readings().await?;
        let mut report = PullReport {
            fetched: remote.len(),
            ..PullReport::default()
        };

        let since = lock_store(&self.store).last_sync_at(EntityKind::Reading)?;
        let remote = filter_since(remote, mode, since, |r: &Reading| r.updated_at);

        let mut max_seen: Option<DateTime<Utc>> = None;
        for remote_reading in remote {
            let Some(remote_id) = remote_reading.remote_id else {
                tracing::warn!("remote reading without id, skipping");
                continue;
            };
            track_max(&mut max_seen, remote_reading.updated_at);

            let store = lock_store(&self.store);
            match store.get_reading_by_remote_id(remote_id)? {
                None => {
                    store.put_reading(&remote_reading)?;
                    report.inserted += 1;
                }
                Some(local) => {
                    let resolution =
                        Reading::resolve(&local, &remote_reading, self.reading_strategy);
                    if !resolution.conflicts.is_empty() {
                        tracing::debug!(
                            remote_id,
                            fields = ?resolution.conflicts,
                            "conflict resolved"
                        );
                        report.conflicts += 1;
                    }

                    // The resolved record keeps the local row's identity.
                    let mut resolved = resolution.resolved;
                    resolved.local_id = local.local_id.clone();
                    store.put_reading(&resolved)?;
                    report.updated += 1;
                }
            }
        }

        if let Some(max) = max_seen {
            lock_store(&self.store).set_last_sync_at(EntityKind::Reading, max)?;
        }
        Ok(report)
    }

    async fn sync_appointments(&self, mode: SyncMode) -> SyncResult<PullReport> {
        let remote = self.gateway.fetch_appointments().await?;
        let mut report = PullReport {
            fetched: remote.len(),
            ..PullReport::default()
        };

        let since = lock_store(&self.store).last_sync_at(EntityKind::Appointment)?;
        let remote = filter_since(remote, mode, since, |a: &Appointment| a.updated_at);

        let mut max_seen: Option<DateTime<Utc>> = None;
        for remote_appointment in remote {
            let Some(remote_id) = remote_appointment.remote_id else {
                tracing::warn!("remote appointment without id, skipping");
                continue;
            };
            track_max(&mut max_seen, remote_appointment.updated_at);

            let store = lock_store(&self.store);
            match store.get_appointment_by_remote_id(remote_id)? {
                None => {
                    store.put_appointment(&remote_appointment)?;
                    report.inserted += 1;
                }
                Some(local) => {
                    // Strategy is irrelevant here: appointments always
                    // resolve backend-wins.
                    let resolution =
                        Appointment::resolve(&local, &remote_appointment, Strategy::BackendWins);
                    if !resolution.conflicts.is_empty() {
                        tracing::debug!(
                            remote_id,
                            fields = ?resolution.conflicts,
                            "conflict resolved"
                        );
                        report.conflicts += 1;
                    }

                    let mut resolved = resolution.resolved;
                    resolved.local_id = local.local_id.clone();
                    store.put_appointment(&resolved)?;
                    report.updated += 1;
                }
            }
        }

        if let Some(max) = max_seen {
            lock_store(&self.store).set_last_sync_at(EntityKind::Appointment, max)?;
        }
        Ok(report)
    }
}

/// Client-side incremental filter over the full remote payload.
fn filter_since<T>(
    records: Vec<T>,
    mode: SyncMode,
    since: Option<DateTime<Utc>>,
    updated_at: impl Fn(&T) -> DateTime<Utc>,
) -> Vec<T> {
    match (mode, since) {
        (SyncMode::Incremental, Some(since)) => records
            .into_iter()
            .filter(|r| updated_at(r) > since)
            .collect(),
        _ => records,
    }
}

/// Track the high-water mark of remote update timestamps.
fn track_max(max_seen: &mut Option<DateTime<Utc>>, candidate: DateTime<Utc>) {
    if max_seen.map_or(true, |m| candidate > m) {
        *max_seen = Some(candidate);
    }
}

#[cfg(test)]
#[path = "pull_tests.rs"]
mod tests;
