// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use std::time::Duration;

#[test]
fn starts_unknown_and_not_online() {
    let monitor = NetworkMonitor::new();
    assert_eq!(monitor.status(), NetworkStatus::Unknown);
    assert!(!monitor.handle().is_online());
}

#[test]
fn transitions_are_visible_to_handles() {
    let monitor = NetworkMonitor::new();
    let handle = monitor.handle();

    monitor.set_online();
    assert!(handle.is_online());

    monitor.set_offline();
    assert_eq!(handle.status(), NetworkStatus::Offline);
}

#[tokio::test]
async fn changed_returns_the_new_status() {
    let monitor = NetworkMonitor::with_status(NetworkStatus::Offline);
    let mut handle = monitor.handle();

    monitor.set_online();
    assert_eq!(handle.changed().await, Some(NetworkStatus::Online));
}

#[tokio::test(start_paused = true)]
async fn repeated_reports_of_the_same_status_do_not_wake_consumers() {
    let monitor = NetworkMonitor::with_status(NetworkStatus::Online);
    let mut handle = monitor.handle();

    monitor.set_online(); // no change

    let woke = tokio::time::timeout(Duration::from_secs(1), handle.changed()).await;
    assert!(woke.is_err());
}

#[tokio::test]
async fn changed_resolves_none_when_monitor_is_dropped() {
    let monitor = NetworkMonitor::with_status(NetworkStatus::Online);
    let mut handle = monitor.handle();
    drop(monitor);

    assert_eq!(handle.changed().await, None);
    // Last observed status survives the producer
    assert!(handle.is_online());
}

#[test]
fn handles_are_independent_clones() {
    let monitor = NetworkMonitor::new();
    let a = monitor.handle();
    let b = a.clone();

    monitor.set_online();
    assert!(a.is_online());
    assert!(b.is_online());
}
