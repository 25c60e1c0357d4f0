// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! reqwest-backed implementation of the [`Gateway`] trait.
//!
//! Endpoints (all under the configured base URL, JSON unless noted):
//!
//! - `POST /token` — form-encoded credentials, returns a bearer token
//! - `GET /glucose/mine` — the user's full reading collection
//! - `GET /glucose/mine/latest` — most recent reading (404 when empty)
//! - `POST /glucose/create`, `PUT /glucose/{id}`, `DELETE /glucose/{id}`
//! - `GET /appointments/mine`, `POST /appointments/create`,
//!   `DELETE /appointments/{id}`, `GET /appointments/state`
//!
//! Every request runs under a bounded timeout (connect and total); a
//! timeout is indistinguishable from any other transient network failure
//! as far as callers are concerned.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use mell_core::{Appointment, AppointmentStatus, Reading};

use crate::api::Gateway;
use crate::error::{GatewayError, GatewayResult};
use crate::wire::{
    AppointmentPayload, AppointmentRecord, QueueStateResponse, ReadingPayload, ReadingRecord,
    TokenResponse,
};

/// Configuration for the HTTP gateway client.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL of the backend gateway.
    pub base_url: String,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Total per-request timeout.
    pub request_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            base_url: "http://localhost:8004".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Classify a reqwest transport failure as transient.
fn classify_transport(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Transient(format!("timeout: {e}"))
    } else if e.is_connect() {
        GatewayError::Transient(format!("connect: {e}"))
    } else {
        GatewayError::Transient(e.to_string())
    }
}

/// Parse a JSON response body, classifying schema mismatches.
async fn parse_json<T: DeserializeOwned>(response: reqwest::Response) -> GatewayResult<T> {
    response
        .json()
        .await
        .map_err(|e| GatewayError::Serialization(e.to_string()))
}

/// HTTP client for the backend gateway.
///
/// Cheap to clone; clones share the bearer token.
#[derive(Clone)]
pub struct HttpGateway {
    config: GatewayConfig,
    client: reqwest::Client,
    token: Arc<Mutex<Option<String>>>,
}

impl HttpGateway {
    /// Create a new gateway client with the given configuration.
    pub fn new(config: GatewayConfig) -> GatewayResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| GatewayError::Transient(format!("http client: {e}")))?;

        Ok(HttpGateway {
            config,
            client,
            token: Arc::new(Mutex::new(None)),
        })
    }

    /// Install a bearer token (from login or an external auth layer).
    pub fn set_token(&self, token: impl Into<String>) {
        *self.token.lock().unwrap_or_else(|e| e.into_inner()) = Some(token.into());
    }

    /// Drop the stored bearer token.
    pub fn clear_token(&self) {
        *self.token.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Returns true if a bearer token is installed.
    pub fn has_token(&self) -> bool {
        self.token
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    fn token_value(&self) -> Option<String> {
        self.token.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Attach the bearer token and send, classifying transport failures.
    ///
    /// Does not inspect the response status.
    async fn authed_send(&self, builder: reqwest::RequestBuilder) -> GatewayResult<reqwest::Response> {
        let token = self.token_value().ok_or(GatewayError::NotAuthenticated)?;
        builder
            .bearer_auth(token)
            .send()
            .await
            .map_err(classify_transport)
    }

    /// Map a non-success status into the error taxonomy.
    async fn check_status(&self, response: reqwest::Response) -> GatewayResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!("bearer token rejected by gateway, clearing stored token");
            self.clear_token();
            return Err(GatewayError::AuthExpired);
        }

        let message = response.text().await.unwrap_or_default();
        if status.is_server_error() {
            Err(GatewayError::Transient(format!(
                "server error {}: {message}",
                status.as_u16()
            )))
        } else {
            Err(GatewayError::Rejected {
                status: status.as_u16(),
                message,
            })
        }
    }

    /// Attach token, send, and check status in one go.
    async fn authed(&self, builder: reqwest::RequestBuilder) -> GatewayResult<reqwest::Response> {
        let response = self.authed_send(builder).await?;
        self.check_status(response).await
    }
}

/// Remote ids are required for update/delete; a record that never synced
/// has nothing to address server-side.
fn require_remote_id(reading: &Reading) -> GatewayResult<i64> {
    reading.remote_id.ok_or_else(|| GatewayError::Rejected {
        status: 400,
        message: format!("reading {} has never synced", reading.local_id),
    })
}

impl Gateway for HttpGateway {
    fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<String>> + Send + '_>> {
        let username = username.to_string();
        let password = password.to_string();
        Box::pin(async move {
            let response = self
                .client
                .post(self.url("/token"))
                .form(&[("username", username.as_str()), ("password", password.as_str())])
                .send()
                .await
                .map_err(classify_transport)?;
            let response = self.check_status(response).await?;

            let body: TokenResponse = parse_json(response).await?;
            self.set_token(body.access_token.clone());
            tracing::debug!("bearer token installed");
            Ok(body.access_token)
        })
    }

    fn create_reading(
        &self,
        reading: &Reading,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<Reading>> + Send + '_>> {
        let payload = ReadingPayload::from_reading(reading);
        let local_id = reading.local_id.clone();
        Box::pin(async move {
            let response = self
                .authed(self.client.post(self.url("/glucose/create")).json(&payload))
                .await?;

            let record: ReadingRecord = parse_json(response).await?;
            let mut acknowledged = record.into_reading()?;
            acknowledged.local_id = local_id;
            Ok(acknowledged)
        })
    }

    fn update_reading(
        &self,
        reading: &Reading,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<Reading>> + Send + '_>> {
        let payload = ReadingPayload::from_reading(reading);
        let local_id = reading.local_id.clone();
        let remote_id = require_remote_id(reading);
        Box::pin(async move {
            let remote_id = remote_id?;
            let response = self
                .authed(
                    self.client
                        .put(self.url(&format!("/glucose/{remote_id}")))
                        .json(&payload),
                )
                .await?;

            let record: ReadingRecord = parse_json(response).await?;
            let mut acknowledged = record.into_reading()?;
            acknowledged.local_id = local_id;
            Ok(acknowledged)
        })
    }

    fn delete_reading(
        &self,
        remote_id: i64,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<()>> + Send + '_>> {
        Box::pin(async move {
            self.authed(self.client.delete(self.url(&format!("/glucose/{remote_id}"))))
                .await?;
            Ok(())
        })
    }

    fn fetch_readings(
        &self,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<Vec<Reading>>> + Send + '_>> {
        Box::pin(async move {
            let response = self
                .authed(self.client.get(self.url("/glucose/mine")))
                .await?;

            let records: Vec<ReadingRecord> = parse_json(response).await?;
            records.into_iter().map(|r| r.into_reading()).collect()
        })
    }

    fn fetch_latest_reading(
        &self,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<Option<Reading>>> + Send + '_>> {
        Box::pin(async move {
            let response = self
                .authed_send(self.client.get(self.url("/glucose/mine/latest")))
                .await?;

            // An empty collection is reported as 404, not as an error.
            if response.status() == StatusCode::NOT_FOUND {
                return Ok(None);
            }
            let response = self.check_status(response).await?;

            let record: ReadingRecord = parse_json(response).await?;
            Ok(Some(record.into_reading()?))
        })
    }

    fn create_appointment(
        &self,
        appointment: &Appointment,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<Appointment>> + Send + '_>> {
        let payload = AppointmentPayload::from_appointment(appointment);
        let local_id = appointment.local_id.clone();
        Box::pin(async move {
            let response = self
                .authed(
                    self.client
                        .post(self.url("/appointments/create"))
                        .json(&payload),
                )
                .await?;

            let record: AppointmentRecord = parse_json(response).await?;
            let mut acknowledged = record.into_appointment()?;
            acknowledged.local_id = local_id;
            Ok(acknowledged)
        })
    }

    fn cancel_appointment(
        &self,
        remote_id: i64,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<()>> + Send + '_>> {
        Box::pin(async move {
            self.authed(
                self.client
                    .delete(self.url(&format!("/appointments/{remote_id}"))),
            )
            .await?;
            Ok(())
        })
    }

    fn fetch_appointments(
        &self,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<Vec<Appointment>>> + Send + '_>> {
        Box::pin(async move {
            let response = self
                .authed(self.client.get(self.url("/appointments/mine")))
                .await?;

            let records: Vec<AppointmentRecord> = parse_json(response).await?;
            records.into_iter().map(|r| r.into_appointment()).collect()
        })
    }

    fn fetch_queue_state(
        &self,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<AppointmentStatus>> + Send + '_>> {
        Box::pin(async move {
            let response = self
                .authed(self.client.get(self.url("/appointments/state")))
                .await?;

            let body: QueueStateResponse = parse_json(response).await?;
            body.status.parse().map_err(|_| {
                GatewayError::Serialization(format!("unknown queue state '{}'", body.status))
            })
        })
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
