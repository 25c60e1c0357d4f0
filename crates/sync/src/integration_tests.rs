// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end tests for the sync engine.
//!
//! These drive the whole stack — service, worker, pull coordinator, and
//! a real on-disk store — against a scripted gateway.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::sync::Arc;

use mell_core::{
    Appointment, AppointmentStatus, EntityKind, GlucoseUnit, MutationOp, MutationStatus, Store,
};
use mell_gateway::GatewayError;
use tempfile::tempdir;

use crate::monitor::{NetworkMonitor, NetworkStatus};
use crate::service::SyncService;
use crate::test_helpers::{local_reading, remote_reading, ts, MockGateway};
use crate::lock_store;
use crate::worker::SyncConfig;

/// A reading entered while offline is queued, pushed on reconnect, gains
/// its remote identifier, and leaves the queue.
#[tokio::test]
async fn offline_creation_then_sync() {
    let dir = tempdir().unwrap();
    let store = Store::open(&dir.path().join("mellis.db")).unwrap();

    let gateway = Arc::new(MockGateway::new());
    let monitor = NetworkMonitor::with_status(NetworkStatus::Offline);
    let service = SyncService::new(
        store,
        Arc::clone(&gateway),
        &monitor,
        SyncConfig::default(),
    );

    // Offline entry: 130 mg/dL at T
    let reading = service
        .record_reading(local_reading(130.0, 1_700_000_000))
        .unwrap();
    assert_eq!(reading.unit, GlucoseUnit::MgDl);

    {
        let shared = service.store();
        let store = lock_store(&shared);
        let pending = store.pending_mutations(None).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].op, MutationOp::Create);
        assert_eq!(pending[0].kind(), EntityKind::Reading);
        assert_eq!(pending[0].status, MutationStatus::Pending);
    }
    assert!(gateway.calls().is_empty());

    // Reconnect and sync
    monitor.set_online();
    let report = service.sync_now().await.unwrap();

    assert_eq!(report.completed, 1);
    assert_eq!(gateway.calls()[0], "create_reading:130");

    let shared = service.store();
    let store = lock_store(&shared);
    let synced = store.get_reading(&reading.local_id).unwrap();
    assert_eq!(synced.remote_id, Some(1));
    assert!(synced.synced);
    assert!(store.pending_mutations(None).unwrap().is_empty());
}

/// Incremental pull against a stale collection inserts only records
/// newer than the stored last-successful-sync timestamp.
#[tokio::test]
async fn incremental_pull_with_stale_data() {
    let gateway = Arc::new(MockGateway::new());
    let monitor = NetworkMonitor::with_status(NetworkStatus::Online);
    let service = SyncService::new(
        Store::open_in_memory().unwrap(),
        Arc::clone(&gateway),
        &monitor,
        SyncConfig::default(),
    );

    let t0 = 1_700_000_000;
    {
        let shared = service.store();
        lock_store(&shared)
            .set_last_sync_at(EntityKind::Reading, ts(t0))
            .unwrap();
    }

    gateway.set_remote_readings(vec![
        remote_reading(1, 100.0, t0 - 1),
        remote_reading(2, 110.0, t0 + 1),
        remote_reading(3, 120.0, t0 + 2),
    ]);

    service.sync_now().await.unwrap();

    let shared = service.store();
    let store = lock_store(&shared);
    let readings = store.list_readings().unwrap();
    assert_eq!(readings.len(), 2);
    assert!(store.get_reading_by_remote_id(1).unwrap().is_none());
    assert!(store.get_reading_by_remote_id(2).unwrap().is_some());
    assert!(store.get_reading_by_remote_id(3).unwrap().is_some());
    assert_eq!(
        store.last_sync_at(EntityKind::Reading).unwrap(),
        Some(ts(t0 + 2))
    );
}

/// A local edit survives a concurrent remote correction: the pull merge
/// takes the remote measurement but keeps the local note, and the edit
/// still pushes afterwards.
#[tokio::test]
async fn edit_offline_then_merge_on_reconnect() {
    let gateway = Arc::new(MockGateway::new());
    let monitor = NetworkMonitor::with_status(NetworkStatus::Offline);
    let service = SyncService::new(
        Store::open_in_memory().unwrap(),
        Arc::clone(&gateway),
        &monitor,
        SyncConfig::default(),
    );

    // A synced reading exists locally (from an earlier pull)
    let mut synced = remote_reading(7, 120.0, 1_700_000_000);
    {
        let shared = service.store();
        lock_store(&shared).put_reading(&synced).unwrap();
    }

    // The user annotates it offline
    synced.note = Some("skipped breakfast".into());
    let edited = service.edit_reading(synced).unwrap();

    // Meanwhile the clinic corrected the value server-side
    let mut corrected = remote_reading(7, 124.0, 1_700_000_000);
    corrected.updated_at = ts(1_700_001_000);
    gateway.set_remote_readings(vec![corrected]);

    monitor.set_online();
    service.sync_now().await.unwrap();

    let shared = service.store();
    let store = lock_store(&shared);
    let merged = store.get_reading(&edited.local_id).unwrap();
    assert_eq!(merged.value, 124.0);
    assert_eq!(merged.note.as_deref(), Some("skipped breakfast"));
}

/// Appointment state is mirrored from the server on pull, whatever the
/// client last believed.
#[tokio::test]
async fn appointment_status_mirrors_the_server() {
    let gateway = Arc::new(MockGateway::new());
    let monitor = NetworkMonitor::with_status(NetworkStatus::Online);
    let service = SyncService::new(
        Store::open_in_memory().unwrap(),
        Arc::clone(&gateway),
        &monitor,
        SyncConfig::default(),
    );

    let booked = service
        .book_appointment(Appointment::new(ts(1_700_000_000)).with_reason("checkup"))
        .unwrap();

    // Push assigns remote id 1 and the server later accepts the request
    service.sync_now().await.unwrap();

    let mut accepted = Appointment::new(ts(1_700_000_000)).with_reason("checkup");
    accepted.remote_id = Some(1);
    accepted.status = AppointmentStatus::Accepted;
    accepted.synced = true;
    accepted.updated_at = ts(1_700_002_000);
    gateway.set_remote_appointments(vec![accepted]);

    service.sync_now().await.unwrap();

    let shared = service.store();
    let store = lock_store(&shared);
    let mirrored = store.get_appointment(&booked.local_id).unwrap();
    assert_eq!(mirrored.status, AppointmentStatus::Accepted);
    assert_eq!(mirrored.remote_id, Some(1));
}

/// A flaky backend delays but does not lose a mutation; once it recovers
/// the push completes within the retry budget.
#[tokio::test(start_paused = true)]
async fn transient_outage_recovers_within_budget() {
    let gateway = Arc::new(MockGateway::new());
    let monitor = NetworkMonitor::with_status(NetworkStatus::Online);
    let service = SyncService::new(
        Store::open_in_memory().unwrap(),
        Arc::clone(&gateway),
        &monitor,
        SyncConfig::default(),
    );

    gateway.fail_next_push(GatewayError::Transient("502".into()));
    gateway.fail_next_push(GatewayError::Transient("502".into()));

    let reading = service
        .record_reading(local_reading(111.0, 1_700_000_000))
        .unwrap();
    let report = service.sync_now().await.unwrap();

    assert_eq!(report.completed, 1);
    assert_eq!(gateway.calls().len(), 3); // two failures, then success

    let shared = service.store();
    assert!(lock_store(&shared)
        .get_reading(&reading.local_id)
        .unwrap()
        .synced);
}

/// Full refresh reconciles everything regardless of the stored timestamp.
#[tokio::test]
async fn full_refresh_ignores_the_timestamp() {
    let gateway = Arc::new(MockGateway::new());
    let monitor = NetworkMonitor::with_status(NetworkStatus::Online);
    let service = SyncService::new(
        Store::open_in_memory().unwrap(),
        Arc::clone(&gateway),
        &monitor,
        SyncConfig::default(),
    );

    {
        let shared = service.store();
        lock_store(&shared)
            .set_last_sync_at(EntityKind::Reading, ts(1_800_000_000))
            .unwrap();
    }
    gateway.set_remote_readings(vec![remote_reading(1, 100.0, 1_700_000_000)]);

    service.full_refresh().await.unwrap();

    let shared = service.store();
    assert!(lock_store(&shared)
        .get_reading_by_remote_id(1)
        .unwrap()
        .is_some());
}
