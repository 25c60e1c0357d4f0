// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! mell-gateway: HTTP client for the backend gateway REST API.
//!
//! Translates local entity operations into authenticated HTTP calls and
//! normalizes transport failures into a small error taxonomy that drives
//! the sync worker's retry decisions. This crate does not retry anything
//! itself and does not refresh tokens (the backend has no refresh
//! endpoint); a 401 invalidates the stored token and is surfaced for the
//! auth layer to handle.

pub mod api;
pub mod error;
pub mod http;
pub mod wire;

pub use api::Gateway;
pub use error::{GatewayError, GatewayResult};
pub use http::{GatewayConfig, HttpGateway};
