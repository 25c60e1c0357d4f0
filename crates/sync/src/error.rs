// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for sync engine operations.

use thiserror::Error;

use mell_gateway::GatewayError;

/// All possible errors surfaced by the sync engine.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Local store failure.
    #[error("store error: {0}")]
    Store(#[from] mell_core::Error),

    /// Classified gateway failure (see [`GatewayError`]).
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// A mutation spent its retry budget and was frozen in the failed
    /// state. The record is retained for inspection and manual retry.
    #[error("mutation {id} failed permanently after {attempts} attempts")]
    QueueExhausted { id: i64, attempts: u32 },

    /// The request-eligibility check refused a new appointment request.
    #[error("an appointment request is already open")]
    AppointmentAlreadyOpen,

    /// The mutation has no corresponding backend operation.
    #[error("unsupported mutation: {0}")]
    UnsupportedMutation(String),
}

/// A specialized Result type for sync engine operations.
pub type SyncResult<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
