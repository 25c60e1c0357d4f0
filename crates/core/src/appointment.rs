// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Appointment request types.
//!
//! The appointment state machine lives server-side; the client mirrors
//! whatever status the backend returns and never derives transitions on
//! its own. The only client-side rule is the request-eligibility check:
//! at most one appointment may be in an open (non-terminal) state at a
//! time, enforced by [`crate::store::Store::has_open_appointment`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Server-driven status of an appointment request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    /// No request on file.
    None,
    /// Submitted and waiting in the clinic queue.
    Pending,
    /// Accepted by the clinic, not yet scheduled.
    Accepted,
    /// Denied by the clinic.
    Denied,
    /// Scheduled with a concrete date.
    Created,
    /// Visit happened (or was otherwise closed out).
    Resolved,
}

impl AppointmentStatus {
    /// Returns the string representation used in storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::None => "none",
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Accepted => "accepted",
            AppointmentStatus::Denied => "denied",
            AppointmentStatus::Created => "created",
            AppointmentStatus::Resolved => "resolved",
        }
    }

    /// Returns true if this status counts as an open request.
    ///
    /// A user with an open request cannot submit another one.
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Pending | AppointmentStatus::Accepted | AppointmentStatus::Created
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "none" => Ok(AppointmentStatus::None),
            "pending" => Ok(AppointmentStatus::Pending),
            "accepted" => Ok(AppointmentStatus::Accepted),
            "denied" => Ok(AppointmentStatus::Denied),
            "created" => Ok(AppointmentStatus::Created),
            "resolved" => Ok(AppointmentStatus::Resolved),
            _ => Err(Error::InvalidStatus(s.to_string())),
        }
    }
}

/// A request for a clinic appointment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    /// Client-generated identifier, stable across the request's lifetime.
    pub local_id: String,
    /// Backend-assigned identifier, present once the request has synced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<i64>,
    /// Current status as last reported by the backend.
    ///
    /// Provisional (`Pending`) until the first acknowledgement.
    pub status: AppointmentStatus,
    /// Requested date/time window.
    pub requested_at: DateTime<Utc>,
    /// Free-text reason for the visit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// True once the backend has acknowledged this version.
    pub synced: bool,
    /// When the request was last modified (local edit or remote overwrite).
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Creates a new local-only appointment request.
    pub fn new(requested_at: DateTime<Utc>) -> Self {
        Appointment {
            local_id: Uuid::new_v4().to_string(),
            remote_id: None,
            status: AppointmentStatus::Pending,
            requested_at,
            reason: None,
            synced: false,
            updated_at: requested_at,
        }
    }

    /// Sets the visit reason (builder pattern).
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Returns true if this request exists only locally.
    pub fn is_local_only(&self) -> bool {
        self.remote_id.is_none()
    }
}

#[cfg(test)]
#[path = "appointment_tests.rs"]
mod tests;
