// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Entity-kind-scoped locks.
//!
//! A pull run must not overwrite entities while a push drain for the same
//! kind is mid-flight (it would resolve conflicts against local data that
//! is about to change). Push and pull for one kind therefore share a
//! lock; different kinds proceed independently.

use tokio::sync::{Mutex, MutexGuard};

use mell_core::EntityKind;

/// One async lock per entity kind.
pub struct KindLocks {
    reading: Mutex<()>,
    appointment: Mutex<()>,
}

impl KindLocks {
    /// Create unlocked locks for all entity kinds.
    pub fn new() -> Self {
        KindLocks {
            reading: Mutex::new(()),
            appointment: Mutex::new(()),
        }
    }

    fn get(&self, kind: EntityKind) -> &Mutex<()> {
        match kind {
            EntityKind::Reading => &self.reading,
            EntityKind::Appointment => &self.appointment,
        }
    }

    /// Acquire the lock for a kind, waiting if a sync run holds it.
    pub async fn acquire(&self, kind: EntityKind) -> MutexGuard<'_, ()> {
        self.get(kind).lock().await
    }

    /// Acquire the lock for a kind without waiting.
    pub fn try_acquire(&self, kind: EntityKind) -> Option<MutexGuard<'_, ()>> {
        self.get(kind).try_lock().ok()
    }
}

impl Default for KindLocks {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
