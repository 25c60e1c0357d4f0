// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Wire types for the backend gateway REST API.
//!
//! The backend speaks snake_case JSON. Records carry the server-assigned
//! integer id; payloads are the subset of fields the client is allowed to
//! write. Conversions into core entities mint a fresh local id — matching
//! a record to an existing local row (by remote id) is the pull
//! coordinator's job, not this crate's.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use mell_core::{Appointment, Reading};

use crate::error::{GatewayError, GatewayResult};

/// Response of `POST /token`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

/// A reading as the backend returns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadingRecord {
    pub id: i64,
    pub value: f64,
    pub unit: String,
    pub measured_at: DateTime<Utc>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl ReadingRecord {
    /// Converts the record into a synced core entity.
    pub fn into_reading(self) -> GatewayResult<Reading> {
        Ok(Reading {
            local_id: Uuid::new_v4().to_string(),
            remote_id: Some(self.id),
            value: self.value,
            unit: self
                .unit
                .parse()
                .map_err(|_| GatewayError::Serialization(format!("unknown unit '{}'", self.unit)))?,
            measured_at: self.measured_at,
            note: self.note,
            tag: match self.tag {
                None => None,
                Some(t) => Some(t.parse().map_err(|_| {
                    GatewayError::Serialization(format!("unknown meal tag '{t}'"))
                })?),
            },
            synced: true,
            updated_at: self.updated_at,
        })
    }
}

/// Body of `POST /glucose/create` and `PUT /glucose/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadingPayload {
    pub value: f64,
    pub unit: String,
    pub measured_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl ReadingPayload {
    /// Builds the writable payload from a core entity.
    pub fn from_reading(reading: &Reading) -> Self {
        ReadingPayload {
            value: reading.value,
            unit: reading.unit.as_str().to_string(),
            measured_at: reading.measured_at,
            note: reading.note.clone(),
            tag: reading.tag.map(|t| t.as_str().to_string()),
        }
    }
}

/// An appointment as the backend returns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentRecord {
    pub id: i64,
    pub status: String,
    pub requested_at: DateTime<Utc>,
    #[serde(default)]
    pub reason: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl AppointmentRecord {
    /// Converts the record into a synced core entity.
    pub fn into_appointment(self) -> GatewayResult<Appointment> {
        Ok(Appointment {
            local_id: Uuid::new_v4().to_string(),
            remote_id: Some(self.id),
            status: self.status.parse().map_err(|_| {
                GatewayError::Serialization(format!("unknown appointment status '{}'", self.status))
            })?,
            requested_at: self.requested_at,
            reason: self.reason,
            synced: true,
            updated_at: self.updated_at,
        })
    }
}

/// Body of `POST /appointments/create`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentPayload {
    pub requested_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl AppointmentPayload {
    /// Builds the writable payload from a core entity.
    pub fn from_appointment(appointment: &Appointment) -> Self {
        AppointmentPayload {
            requested_at: appointment.requested_at,
            reason: appointment.reason.clone(),
        }
    }
}

/// Response of `GET /appointments/state`.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueStateResponse {
    pub status: String,
}

#[cfg(test)]
#[path = "wire_tests.rs"]
mod tests;
