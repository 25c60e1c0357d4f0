// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for sync engine tests.
//!
//! [`MockGateway`] is a scripted [`Gateway`] without sockets: push calls
//! are logged (for ordering assertions), failures can be queued ahead of
//! time, and the "remote collection" served by the fetch calls is plain
//! in-memory state.

#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

use mell_core::{Appointment, AppointmentStatus, GlucoseUnit, Reading};
use mell_gateway::{Gateway, GatewayError, GatewayResult};

/// Deterministic timestamp helper.
pub fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

/// A reading as the user would enter it.
pub fn local_reading(value: f64, secs: i64) -> Reading {
    Reading::new(value, GlucoseUnit::MgDl, ts(secs))
}

/// A reading as the backend would return it.
pub fn remote_reading(remote_id: i64, value: f64, secs: i64) -> Reading {
    let mut reading = local_reading(value, secs);
    reading.remote_id = Some(remote_id);
    reading.synced = true;
    reading
}

type CallHook = Box<dyn Fn(&str) + Send + Sync>;

/// Scripted gateway for testing without a server.
#[derive(Default)]
pub struct MockGateway {
    /// Every push call, in issue order.
    calls: Mutex<Vec<String>>,
    /// Failures consumed by upcoming push calls, FIFO.
    push_failures: Mutex<VecDeque<GatewayError>>,
    /// Failures consumed by upcoming fetch calls, FIFO.
    fetch_failures: Mutex<VecDeque<GatewayError>>,
    /// The remote reading collection served by fetches.
    remote_readings: Mutex<Vec<Reading>>,
    /// The remote appointment collection served by fetches.
    remote_appointments: Mutex<Vec<Appointment>>,
    /// Remote ids handed out by acknowledgements.
    next_remote_id: AtomicI64,
    /// Artificial latency added to every push call.
    call_delay: Mutex<Option<Duration>>,
    /// Invoked (with the call name) whenever any call is issued.
    on_call: Mutex<Option<CallHook>>,
}

impl MockGateway {
    pub fn new() -> Self {
        MockGateway::default()
    }

    /// All push calls issued so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Queue a failure for the next push call.
    pub fn fail_next_push(&self, err: GatewayError) {
        self.push_failures.lock().unwrap().push_back(err);
    }

    /// Queue a failure for the next fetch call.
    pub fn fail_next_fetch(&self, err: GatewayError) {
        self.fetch_failures.lock().unwrap().push_back(err);
    }

    /// Replace the remote reading collection.
    pub fn set_remote_readings(&self, readings: Vec<Reading>) {
        *self.remote_readings.lock().unwrap() = readings;
    }

    /// Replace the remote appointment collection.
    pub fn set_remote_appointments(&self, appointments: Vec<Appointment>) {
        *self.remote_appointments.lock().unwrap() = appointments;
    }

    /// Add artificial latency to every push call.
    pub fn set_call_delay(&self, delay: Duration) {
        *self.call_delay.lock().unwrap() = Some(delay);
    }

    /// Install a hook invoked with each call name as it is issued.
    pub fn set_on_call(&self, hook: impl Fn(&str) + Send + Sync + 'static) {
        *self.on_call.lock().unwrap() = Some(Box::new(hook));
    }

    fn record(&self, call: String) {
        if let Some(hook) = self.on_call.lock().unwrap().as_ref() {
            hook(&call);
        }
        self.calls.lock().unwrap().push(call);
    }

    fn next_id(&self) -> i64 {
        self.next_remote_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn take_push_failure(&self) -> Option<GatewayError> {
        self.push_failures.lock().unwrap().pop_front()
    }

    fn take_fetch_failure(&self) -> Option<GatewayError> {
        self.fetch_failures.lock().unwrap().pop_front()
    }

    async fn delay(&self) {
        let delay = *self.call_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

impl Gateway for MockGateway {
    fn login(
        &self,
        _username: &str,
        _password: &str,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<String>> + Send + '_>> {
        Box::pin(async move {
            Ok("tok-test".to_string())
        })
    }

    fn create_reading(
        &self,
        reading: &Reading,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<Reading>> + Send + '_>> {
        let reading = reading.clone();
        Box::pin(async move {
            self.record(format!("create_reading:{}", reading.value));
            self.delay().await;
            if let Some(err) = self.take_push_failure() {
                return Err(err);
            }

            let mut acknowledged = reading;
            acknowledged.remote_id = Some(self.next_id());
            acknowledged.synced = true;
            Ok(acknowledged)
        })
    }

    fn update_reading(
        &self,
        reading: &Reading,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<Reading>> + Send + '_>> {
        let reading = reading.clone();
        Box::pin(async move {
            self.record(format!("update_reading:{}", reading.value));
            self.delay().await;
            if let Some(err) = self.take_push_failure() {
                return Err(err);
            }

            let mut acknowledged = reading;
            acknowledged.synced = true;
            Ok(acknowledged)
        })
    }

    fn delete_reading(
        &self,
        remote_id: i64,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<()>> + Send + '_>> {
        Box::pin(async move {
            self.record(format!("delete_reading:{remote_id}"));
            self.delay().await;
            match self.take_push_failure() {
                Some(err) => Err(err),
                None => Ok(()),
            }
        })
    }

    fn fetch_readings(
        &self,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<Vec<Reading>>> + Send + '_>> {
        Box::pin(async move {
            match self.take_fetch_failure() {
                Some(err) => Err(err),
                None => Ok(self.remote_readings.lock().unwrap().clone()),
            }
        })
    }

    fn fetch_latest_reading(
        &self,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<Option<Reading>>> + Send + '_>> {
        Box::pin(async move {
            match self.take_fetch_failure() {
                Some(err) => Err(err),
                None => Ok(self.remote_readings.lock().unwrap().last().cloned()),
            }
        })
    }

    fn create_appointment(
        &self,
        appointment: &Appointment,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<Appointment>> + Send + '_>> {
        let appointment = appointment.clone();
        Box::pin(async move {
            self.record("create_appointment".to_string());
            self.delay().await;
            if let Some(err) = self.take_push_failure() {
                return Err(err);
            }

            let mut acknowledged = appointment;
            acknowledged.remote_id = Some(self.next_id());
            acknowledged.synced = true;
            Ok(acknowledged)
        })
    }

    fn cancel_appointment(
        &self,
        remote_id: i64,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<()>> + Send + '_>> {
        Box::pin(async move {
            self.record(format!("cancel_appointment:{remote_id}"));
            self.delay().await;
            match self.take_push_failure() {
                Some(err) => Err(err),
                None => Ok(()),
            }
        })
    }

    fn fetch_appointments(
        &self,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<Vec<Appointment>>> + Send + '_>> {
        Box::pin(async move {
            match self.take_fetch_failure() {
                Some(err) => Err(err),
                None => Ok(self.remote_appointments.lock().unwrap().clone()),
            }
        })
    }

    fn fetch_queue_state(
        &self,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<AppointmentStatus>> + Send + '_>> {
        Box::pin(async move {
            let open = self
                .remote_appointments
                .lock()
                .unwrap()
                .iter()
                .any(|a| a.status.is_open());
            Ok(if open {
                AppointmentStatus::Pending
            } else {
                AppointmentStatus::None
            })
        })
    }
}
