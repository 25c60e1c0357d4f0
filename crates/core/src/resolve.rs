// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Conflict resolution between local and remote entity versions.
//!
//! Resolution rules:
//! - BackendWins: remote fully replaces local (forced for appointments —
//!   the server is the scheduling authority)
//! - LocalWins: local fully replaces remote
//! - LastWriteWins: newer `updated_at` wins, tie goes to remote
//! - Merge: field-level, readings only — remote measurement data wins,
//!   a non-empty local note is preserved
//!
//! Resolution is pure and deterministic: no I/O, no clock reads, and the
//! same inputs always produce the same output. Detected field conflicts
//! are reported alongside the resolved record for audit; they never block
//! resolution.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::appointment::Appointment;
use crate::error::{Error, Result};
use crate::reading::{GlucoseUnit, Reading};

/// Tolerance (in mg/dL) below which two glucose values are considered
/// the same measurement, regardless of the unit they are stored in.
const VALUE_EPSILON_MGDL: f64 = 0.5;

/// How a local/remote pair is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Remote fully replaces local.
    BackendWins,
    /// Local fully replaces remote.
    LocalWins,
    /// Newer `updated_at` wins; tie goes to remote.
    LastWriteWins,
    /// Field-level merge (readings only; degrades to BackendWins otherwise).
    Merge,
}

impl Strategy {
    /// Returns the string representation used in storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::BackendWins => "backend_wins",
            Strategy::LocalWins => "local_wins",
            Strategy::LastWriteWins => "last_write_wins",
            Strategy::Merge => "merge",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "backend_wins" => Ok(Strategy::BackendWins),
            "local_wins" => Ok(Strategy::LocalWins),
            "last_write_wins" => Ok(Strategy::LastWriteWins),
            "merge" => Ok(Strategy::Merge),
            _ => Err(Error::InvalidStrategy(s.to_string())),
        }
    }
}

/// Outcome of resolving a local/remote pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution<T> {
    /// The winning (or merged) record.
    pub resolved: T,
    /// Names of the fields that differed between the two versions.
    ///
    /// Informational only — recorded for audit and debugging, never an
    /// error.
    pub conflicts: Vec<&'static str>,
}

/// Trait for entity types that can be reconciled against a remote copy.
pub trait Resolve: Sized + Clone {
    /// Returns the names of fields that differ between the two versions.
    fn conflict_fields(local: &Self, remote: &Self) -> Vec<&'static str>;

    /// Resolves a local/remote pair under the given strategy.
    ///
    /// Neither input is mutated; the resolution is a fresh value.
    fn resolve(local: &Self, remote: &Self, strategy: Strategy) -> Resolution<Self>;
}

impl Resolve for Reading {
    fn conflict_fields(local: &Self, remote: &Self) -> Vec<&'static str> {
        let mut fields = Vec::new();

        // Compare values in a common unit so a unit change alone does not
        // also count as a value conflict.
        let local_mgdl = local.value_in(GlucoseUnit::MgDl);
        let remote_mgdl = remote.value_in(GlucoseUnit::MgDl);
        if (local_mgdl - remote_mgdl).abs() > VALUE_EPSILON_MGDL {
            fields.push("value");
        }
        if local.unit != remote.unit {
            fields.push("unit");
        }
        if local.measured_at != remote.measured_at {
            fields.push("measured_at");
        }
        if local.note != remote.note {
            fields.push("note");
        }
        if local.tag != remote.tag {
            fields.push("tag");
        }

        fields
    }

    fn resolve(local: &Self, remote: &Self, strategy: Strategy) -> Resolution<Self> {
        let conflicts = Self::conflict_fields(local, remote);

        let resolved = match strategy {
            Strategy::BackendWins => remote.clone(),
            Strategy::LocalWins => local.clone(),
            Strategy::LastWriteWins => {
                if local.updated_at > remote.updated_at {
                    local.clone()
                } else {
                    remote.clone()
                }
            }
            Strategy::Merge => {
                // Remote measurement data wins; the user's local note
                // survives if it is non-empty.
                let mut merged = remote.clone();
                if let Some(note) = &local.note {
                    if !note.is_empty() {
                        merged.note = Some(note.clone());
                    }
                }
                merged
            }
        };

        Resolution { resolved, conflicts }
    }
}

impl Resolve for Appointment {
    fn conflict_fields(local: &Self, remote: &Self) -> Vec<&'static str> {
        let mut fields = Vec::new();

        if local.status != remote.status {
            fields.push("status");
        }
        if local.requested_at != remote.requested_at {
            fields.push("requested_at");
        }
        if local.reason != remote.reason {
            fields.push("reason");
        }

        fields
    }

    fn resolve(local: &Self, remote: &Self, _strategy: Strategy) -> Resolution<Self> {
        // The appointment state machine lives server-side; the client
        // never overrides server scheduling state, whatever strategy the
        // caller asked for.
        Resolution {
            resolved: remote.clone(),
            conflicts: Self::conflict_fields(local, remote),
        }
    }
}

#[cfg(test)]
#[path = "resolve_tests.rs"]
mod tests;
