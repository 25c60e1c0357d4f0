// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for mell-core operations.

use thiserror::Error;

/// All possible errors that can occur in mell-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("reading not found: {0}")]
    ReadingNotFound(String),

    #[error("appointment not found: {0}")]
    AppointmentNotFound(String),

    #[error("mutation not found: {0}")]
    MutationNotFound(i64),

    #[error("invalid glucose unit: '{0}'\n  hint: valid units are: mg/dL, mmol/L")]
    InvalidUnit(String),

    #[error(
        "invalid appointment status: '{0}'\n  hint: valid statuses are: none, pending, accepted, denied, created, resolved"
    )]
    InvalidStatus(String),

    #[error("invalid meal tag: '{0}'\n  hint: valid tags are: fasting, before_meal, after_meal, bedtime, exercise, other")]
    InvalidMealTag(String),

    #[error("invalid mutation op: '{0}'\n  hint: valid ops are: create, update, delete")]
    InvalidOp(String),

    #[error("invalid entity kind: '{0}'\n  hint: valid kinds are: reading, appointment")]
    InvalidEntityKind(String),

    #[error("invalid mutation status: '{0}'\n  hint: valid statuses are: pending, processing, failed, completed")]
    InvalidMutationStatus(String),

    #[error("invalid resolution strategy: '{0}'\n  hint: valid strategies are: backend_wins, local_wins, last_write_wins, merge")]
    InvalidStrategy(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("corrupted data: {0}")]
    CorruptedData(String),
}

/// A specialized Result type for mell-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
