// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Gateway trait: one method per (entity kind × operation).
//!
//! The trait abstracts over the actual HTTP layer, allowing the sync
//! worker and pull coordinator to be tested against scripted mock
//! gateways without sockets.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use mell_core::{Appointment, AppointmentStatus, Reading};

use crate::error::GatewayResult;

/// Remote operations exposed by the backend gateway.
///
/// Implementations attach the current bearer token to every call and
/// classify failures into [`crate::GatewayError`]; they never retry.
pub trait Gateway: Send + Sync {
    /// Exchange credentials for a bearer token and install it.
    ///
    /// Returns the raw token. Tokens expire after 30 minutes and there is
    /// no refresh endpoint — callers re-login when `AuthExpired` surfaces.
    fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<String>> + Send + '_>>;

    /// Create a reading; returns the acknowledged copy with its remote id.
    fn create_reading(
        &self,
        reading: &Reading,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<Reading>> + Send + '_>>;

    /// Update a previously synced reading.
    fn update_reading(
        &self,
        reading: &Reading,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<Reading>> + Send + '_>>;

    /// Delete a previously synced reading.
    fn delete_reading(
        &self,
        remote_id: i64,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<()>> + Send + '_>>;

    /// Fetch the user's entire reading collection.
    ///
    /// The backend supports neither pagination nor server-side filtering;
    /// incremental sync filters the full payload client-side.
    fn fetch_readings(
        &self,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<Vec<Reading>>> + Send + '_>>;

    /// Fetch the user's most recent reading, if any.
    fn fetch_latest_reading(
        &self,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<Option<Reading>>> + Send + '_>>;

    /// Submit an appointment request; returns the acknowledged copy.
    fn create_appointment(
        &self,
        appointment: &Appointment,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<Appointment>> + Send + '_>>;

    /// Withdraw a previously synced appointment request.
    fn cancel_appointment(
        &self,
        remote_id: i64,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<()>> + Send + '_>>;

    /// Fetch the user's entire appointment collection.
    fn fetch_appointments(
        &self,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<Vec<Appointment>>> + Send + '_>>;

    /// Fetch the user's current position in the appointment queue.
    fn fetch_queue_state(
        &self,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<AppointmentStatus>> + Send + '_>>;
}

// The worker and the pull coordinator share one gateway; forwarding
// through Arc lets callers hand the same instance to both.
impl<G: Gateway + ?Sized> Gateway for Arc<G> {
    fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<String>> + Send + '_>> {
        (**self).login(username, password)
    }

    fn create_reading(
        &self,
        reading: &Reading,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<Reading>> + Send + '_>> {
        (**self).create_reading(reading)
    }

    fn update_reading(
        &self,
        reading: &Reading,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<Reading>> + Send + '_>> {
        (**self).update_reading(reading)
    }

    fn delete_reading(
        &self,
        remote_id: i64,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<()>> + Send + '_>> {
        (**self).delete_reading(remote_id)
    }

    fn fetch_readings(
        &self,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<Vec<Reading>>> + Send + '_>> {
        (**self).fetch_readings()
    }

    fn fetch_latest_reading(
        &self,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<Option<Reading>>> + Send + '_>> {
        (**self).fetch_latest_reading()
    }

    fn create_appointment(
        &self,
        appointment: &Appointment,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<Appointment>> + Send + '_>> {
        (**self).create_appointment(appointment)
    }

    fn cancel_appointment(
        &self,
        remote_id: i64,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<()>> + Send + '_>> {
        (**self).cancel_appointment(remote_id)
    }

    fn fetch_appointments(
        &self,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<Vec<Appointment>>> + Send + '_>> {
        (**self).fetch_appointments()
    }

    fn fetch_queue_state(
        &self,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<AppointmentStatus>> + Send + '_>> {
        (**self).fetch_queue_state()
    }
}
