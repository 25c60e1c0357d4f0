// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! mell-core: Shared library for the Mellis sync engine
//!
//! This crate provides the core data structures, the SQLite-backed local
//! store (entities plus the mutation queue), and the pure conflict
//! resolver used by the push and pull sync paths.

pub mod appointment;
pub mod error;
pub mod mutation;
pub mod reading;
pub mod resolve;
pub mod store;

pub use appointment::{Appointment, AppointmentStatus};
pub use error::{Error, Result};
pub use mutation::{EntityKind, Mutation, MutationOp, MutationPayload, MutationStatus};
pub use reading::{GlucoseUnit, MealTag, Reading};
pub use resolve::{Resolution, Resolve, Strategy};
pub use store::Store;
