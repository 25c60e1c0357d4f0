// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use mell_core::EntityKind;

#[test]
fn same_kind_is_exclusive() {
    let locks = KindLocks::new();

    let held = locks.try_acquire(EntityKind::Reading);
    assert!(held.is_some());
    assert!(locks.try_acquire(EntityKind::Reading).is_none());

    drop(held);
    assert!(locks.try_acquire(EntityKind::Reading).is_some());
}

#[test]
fn different_kinds_do_not_contend() {
    let locks = KindLocks::new();

    let _reading = locks.try_acquire(EntityKind::Reading);
    assert!(locks.try_acquire(EntityKind::Appointment).is_some());
}

#[tokio::test]
async fn acquire_waits_for_the_holder() {
    let locks = std::sync::Arc::new(KindLocks::new());

    let guard = locks.acquire(EntityKind::Reading).await;

    let contender = {
        let locks = std::sync::Arc::clone(&locks);
        tokio::spawn(async move {
            let _guard = locks.acquire(EntityKind::Reading).await;
        })
    };

    // The contender cannot finish while the guard is held
    tokio::task::yield_now().await;
    assert!(!contender.is_finished());

    drop(guard);
    contender.await.unwrap();
}
