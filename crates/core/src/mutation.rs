// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Queued mutations for offline-first writes.
//!
//! Every local write that must reach the backend is represented as a
//! [`Mutation`]: an operation kind plus a snapshot of the entity at
//! enqueue time. Mutations are persisted in the local store, drained in
//! FIFO order by the sync queue worker, and either removed on confirmed
//! success or frozen in the `failed` state for manual inspection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::appointment::Appointment;
use crate::error::{Error, Result};
use crate::reading::Reading;

/// What kind of write a mutation represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationOp {
    Create,
    Update,
    Delete,
}

impl MutationOp {
    /// Returns the string representation used in storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationOp::Create => "create",
            MutationOp::Update => "update",
            MutationOp::Delete => "delete",
        }
    }
}

impl fmt::Display for MutationOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MutationOp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "create" => Ok(MutationOp::Create),
            "update" => Ok(MutationOp::Update),
            "delete" => Ok(MutationOp::Delete),
            _ => Err(Error::InvalidOp(s.to_string())),
        }
    }
}

/// The entity family a mutation (or a sync run) targets.
///
/// Readings and appointments sync independently; ordering guarantees and
/// locks are scoped per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Reading,
    Appointment,
}

impl EntityKind {
    /// All entity kinds, in drain order.
    pub const ALL: [EntityKind; 2] = [EntityKind::Reading, EntityKind::Appointment];

    /// Returns the string representation used in storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Reading => "reading",
            EntityKind::Appointment => "appointment",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "reading" => Ok(EntityKind::Reading),
            "appointment" => Ok(EntityKind::Appointment),
            _ => Err(Error::InvalidEntityKind(s.to_string())),
        }
    }
}

/// Queue lifecycle state of a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationStatus {
    /// Waiting to be sent.
    Pending,
    /// Currently being sent by a drain.
    Processing,
    /// Retry budget spent or payload rejected; kept for inspection.
    Failed,
    /// Acknowledged by the backend; about to be removed.
    Completed,
}

impl MutationStatus {
    /// Returns the string representation used in storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationStatus::Pending => "pending",
            MutationStatus::Processing => "processing",
            MutationStatus::Failed => "failed",
            MutationStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for MutationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MutationStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(MutationStatus::Pending),
            "processing" => Ok(MutationStatus::Processing),
            "failed" => Ok(MutationStatus::Failed),
            "completed" => Ok(MutationStatus::Completed),
            _ => Err(Error::InvalidMutationStatus(s.to_string())),
        }
    }
}

/// Entity snapshot carried by a mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entity", rename_all = "snake_case")]
pub enum MutationPayload {
    Reading(Reading),
    Appointment(Appointment),
}

impl MutationPayload {
    /// Returns the entity kind this payload belongs to.
    pub fn kind(&self) -> EntityKind {
        match self {
            MutationPayload::Reading(_) => EntityKind::Reading,
            MutationPayload::Appointment(_) => EntityKind::Appointment,
        }
    }

    /// Returns the local identifier of the target entity.
    pub fn local_id(&self) -> &str {
        match self {
            MutationPayload::Reading(r) => &r.local_id,
            MutationPayload::Appointment(a) => &a.local_id,
        }
    }

    /// Returns the remote identifier of the target entity, if assigned.
    pub fn remote_id(&self) -> Option<i64> {
        match self {
            MutationPayload::Reading(r) => r.remote_id,
            MutationPayload::Appointment(a) => a.remote_id,
        }
    }
}

/// One pending write in the offline queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mutation {
    /// Store-assigned identifier; monotonically increasing, drives FIFO order.
    pub id: i64,
    /// What kind of write this is.
    pub op: MutationOp,
    /// Snapshot of the entity at enqueue time.
    pub payload: MutationPayload,
    /// When the mutation was enqueued.
    pub created_at: DateTime<Utc>,
    /// How many times a send has been attempted and failed transiently.
    pub retry_count: u32,
    /// Queue lifecycle state.
    pub status: MutationStatus,
}

impl Mutation {
    /// Creates a new pending mutation with the current timestamp.
    pub fn new(op: MutationOp, payload: MutationPayload) -> Self {
        Mutation {
            id: 0, // Will be set by the store
            op,
            payload,
            created_at: Utc::now(),
            retry_count: 0,
            status: MutationStatus::Pending,
        }
    }

    /// Sets a specific creation timestamp (builder pattern).
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Returns the entity kind this mutation targets.
    pub fn kind(&self) -> EntityKind {
        self.payload.kind()
    }
}

#[cfg(test)]
#[path = "mutation_tests.rs"]
mod tests;
