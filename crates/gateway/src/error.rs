// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for gateway operations.
//!
//! Every transport-level failure is classified at this boundary; the
//! classification — not the underlying cause — drives the sync queue
//! worker's retry/abort decisions.

use thiserror::Error;

/// Classified errors for gateway operations.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No connectivity, timeout, or a 5xx response. Retryable.
    #[error("transient network error: {0}")]
    Transient(String),

    /// A 4xx validation failure (other than 401). Not retryable: the
    /// payload needs user correction, resending it is guaranteed to fail.
    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The backend returned 401. The stored token has been invalidated;
    /// re-authentication is the caller's responsibility.
    #[error("authentication expired")]
    AuthExpired,

    /// No bearer token is installed yet.
    #[error("not authenticated")]
    NotAuthenticated,

    /// The response body did not match the expected schema.
    #[error("malformed response: {0}")]
    Serialization(String),
}

impl GatewayError {
    /// Returns true if the operation may succeed when repeated as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::Transient(_))
    }

    /// Returns true if the failure is an authentication problem.
    ///
    /// Auth failures pause the drain rather than consuming retry budget:
    /// the mutation stays pending and is retried once a fresh token is
    /// installed.
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            GatewayError::AuthExpired | GatewayError::NotAuthenticated
        )
    }
}

/// A specialized Result type for gateway operations.
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
