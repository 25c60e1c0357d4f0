// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::reading::GlucoseUnit;
use chrono::TimeZone;
use yare::parameterized;

fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

fn reading_payload() -> MutationPayload {
    MutationPayload::Reading(Reading::new(130.0, GlucoseUnit::MgDl, ts(1_700_000_000)))
}

fn appointment_payload() -> MutationPayload {
    MutationPayload::Appointment(Appointment::new(ts(1_700_000_000)))
}

#[test]
fn payload_kind() {
    assert_eq!(reading_payload().kind(), EntityKind::Reading);
    assert_eq!(appointment_payload().kind(), EntityKind::Appointment);
}

#[test]
fn payload_local_id_matches_entity() {
    let reading = Reading::new(100.0, GlucoseUnit::MgDl, ts(1_700_000_000));
    let local_id = reading.local_id.clone();
    let payload = MutationPayload::Reading(reading);
    assert_eq!(payload.local_id(), local_id);
    assert_eq!(payload.remote_id(), None);
}

#[test]
fn new_mutation_starts_pending_with_zero_retries() {
    let mutation = Mutation::new(MutationOp::Create, reading_payload());

    assert_eq!(mutation.id, 0);
    assert_eq!(mutation.status, MutationStatus::Pending);
    assert_eq!(mutation.retry_count, 0);
    assert_eq!(mutation.kind(), EntityKind::Reading);
}

#[parameterized(
    create = { MutationOp::Create, "create" },
    update = { MutationOp::Update, "update" },
    delete = { MutationOp::Delete, "delete" },
)]
fn op_as_str_roundtrip(op: MutationOp, s: &str) {
    assert_eq!(op.as_str(), s);
    assert_eq!(s.parse::<MutationOp>().unwrap(), op);
}

#[parameterized(
    pending = { MutationStatus::Pending, "pending" },
    processing = { MutationStatus::Processing, "processing" },
    failed = { MutationStatus::Failed, "failed" },
    completed = { MutationStatus::Completed, "completed" },
)]
fn status_as_str_roundtrip(status: MutationStatus, s: &str) {
    assert_eq!(status.as_str(), s);
    assert_eq!(s.parse::<MutationStatus>().unwrap(), status);
}

#[test]
fn entity_kind_roundtrip() {
    for kind in EntityKind::ALL {
        assert_eq!(kind.as_str().parse::<EntityKind>().unwrap(), kind);
    }
}

#[test]
fn payload_json_is_entity_tagged() {
    let json = serde_json::to_string(&reading_payload()).unwrap();
    assert!(json.contains("\"entity\":\"reading\""));

    let json = serde_json::to_string(&appointment_payload()).unwrap();
    assert!(json.contains("\"entity\":\"appointment\""));
}

#[parameterized(
    create_reading = { Mutation::new(MutationOp::Create, MutationPayload::Reading(Reading::new(130.0, GlucoseUnit::MgDl, Utc.timestamp_opt(1_700_000_000, 0).unwrap()))) },
    delete_reading = { Mutation::new(MutationOp::Delete, MutationPayload::Reading(Reading::new(95.0, GlucoseUnit::MgDl, Utc.timestamp_opt(1_700_000_100, 0).unwrap()))) },
    create_appointment = { Mutation::new(MutationOp::Create, MutationPayload::Appointment(Appointment::new(Utc.timestamp_opt(1_700_000_200, 0).unwrap()))) },
)]
fn mutation_serde_roundtrip(mutation: Mutation) {
    let json = serde_json::to_string(&mutation).unwrap();
    let parsed: Mutation = serde_json::from_str(&json).unwrap();
    assert_eq!(mutation, parsed);
}
