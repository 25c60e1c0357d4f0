// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! SQLite-backed local store for readings, appointments, and the
//! mutation queue.
//!
//! The [`Store`] struct is the single owner of all persisted state. Other
//! components never touch the tables directly: the sync queue worker goes
//! through the mutation-queue operations, the pull-sync coordinator
//! through the entity overwrite operations. Each operation is atomic per
//! record (SQLite provides per-statement atomicity).

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::str::FromStr;

use crate::appointment::Appointment;
use crate::error::{Error, Result};
use crate::mutation::{EntityKind, Mutation, MutationPayload, MutationStatus};
use crate::reading::{GlucoseUnit, Reading};

/// SQL schema for the local store.
pub const SCHEMA: &str = r#"
-- Glucose readings, keyed by the client-generated local id
CREATE TABLE IF NOT EXISTS readings (
    local_id TEXT PRIMARY KEY,
    remote_id INTEGER,
    value REAL NOT NULL,
    unit TEXT NOT NULL,
    measured_at TEXT NOT NULL,
    note TEXT,
    tag TEXT,
    synced INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL
);

-- Appointment requests; status mirrors the server state machine
CREATE TABLE IF NOT EXISTS appointments (
    local_id TEXT PRIMARY KEY,
    remote_id INTEGER,
    status TEXT NOT NULL,
    requested_at TEXT NOT NULL,
    reason TEXT,
    synced INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL
);

-- Offline mutation queue; id order is FIFO order
CREATE TABLE IF NOT EXISTS mutations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    op TEXT NOT NULL,
    entity TEXT NOT NULL,
    payload TEXT NOT NULL,
    created_at TEXT NOT NULL,
    retry_count INTEGER NOT NULL DEFAULT 0,
    status TEXT NOT NULL DEFAULT 'pending'
);

-- Small key/value table for sync bookkeeping and preferences
CREATE TABLE IF NOT EXISTS sync_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_readings_remote ON readings(remote_id);
CREATE INDEX IF NOT EXISTS idx_readings_measured ON readings(measured_at);
CREATE INDEX IF NOT EXISTS idx_appointments_remote ON appointments(remote_id);
CREATE INDEX IF NOT EXISTS idx_appointments_status ON appointments(status);
CREATE INDEX IF NOT EXISTS idx_mutations_status ON mutations(status);
CREATE INDEX IF NOT EXISTS idx_mutations_entity ON mutations(entity);
"#;

/// Parse a string value from the database, returning a rusqlite error on parse failure.
fn parse_db<T: FromStr>(value: &str, column: &str) -> std::result::Result<T, rusqlite::Error> {
    value.parse().map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            Box::new(Error::CorruptedData(format!(
                "invalid value '{value}' in column '{column}'"
            ))),
        )
    })
}

/// Parse an RFC3339 timestamp from the database.
fn parse_timestamp(
    value: &str,
    column: &str,
) -> std::result::Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                Box::new(Error::CorruptedData(format!(
                    "invalid timestamp '{value}' in column '{column}'"
                ))),
            )
        })
}

/// Parse an optional string column into an optional parsed value.
fn parse_db_opt<T: FromStr>(
    value: Option<String>,
    column: &str,
) -> std::result::Result<Option<T>, rusqlite::Error> {
    match value {
        None => Ok(None),
        Some(s) => parse_db(&s, column).map(Some),
    }
}

/// Map one `readings` row (selected in schema column order).
fn row_to_reading(row: &rusqlite::Row<'_>) -> std::result::Result<Reading, rusqlite::Error> {
    let unit_str: String = row.get(3)?;
    let measured_str: String = row.get(4)?;
    let tag_str: Option<String> = row.get(6)?;
    let updated_str: String = row.get(8)?;

    Ok(Reading {
        local_id: row.get(0)?,
        remote_id: row.get(1)?,
        value: row.get(2)?,
        unit: parse_db(&unit_str, "unit")?,
        measured_at: parse_timestamp(&measured_str, "measured_at")?,
        note: row.get(5)?,
        tag: parse_db_opt(tag_str, "tag")?,
        synced: row.get(7)?,
        updated_at: parse_timestamp(&updated_str, "updated_at")?,
    })
}

/// Map one `appointments` row (selected in schema column order).
fn row_to_appointment(
    row: &rusqlite::Row<'_>,
) -> std::result::Result<Appointment, rusqlite::Error> {
    let status_str: String = row.get(2)?;
    let requested_str: String = row.get(3)?;
    let updated_str: String = row.get(6)?;

    Ok(Appointment {
        local_id: row.get(0)?,
        remote_id: row.get(1)?,
        status: parse_db(&status_str, "status")?,
        requested_at: parse_timestamp(&requested_str, "requested_at")?,
        reason: row.get(4)?,
        synced: row.get(5)?,
        updated_at: parse_timestamp(&updated_str, "updated_at")?,
    })
}

/// Map one `mutations` row (selected in schema column order).
fn row_to_mutation(row: &rusqlite::Row<'_>) -> std::result::Result<Mutation, rusqlite::Error> {
    let op_str: String = row.get(1)?;
    let payload_str: String = row.get(3)?;
    let created_str: String = row.get(4)?;
    let status_str: String = row.get(6)?;

    let payload: MutationPayload = serde_json::from_str(&payload_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            Box::new(Error::CorruptedData(format!("invalid mutation payload: {e}"))),
        )
    })?;

    Ok(Mutation {
        id: row.get(0)?,
        op: parse_db(&op_str, "op")?,
        payload,
        created_at: parse_timestamp(&created_str, "created_at")?,
        retry_count: row.get(5)?,
        status: parse_db(&status_str, "status")?,
    })
}

/// Run schema creation and all migrations on a database connection.
///
/// The schema is the canonical shape; migrations are idempotent and
/// upgrade older stores that may be missing columns.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    migrate_add_meal_tag(conn)?;
    Ok(())
}

/// Migration: Add the meal tag column to readings in existing stores.
fn migrate_add_meal_tag(conn: &Connection) -> Result<()> {
    let has_tag: bool = conn
        .query_row(
            "SELECT COUNT(*) > 0 FROM pragma_table_info('readings') WHERE name = 'tag'",
            [],
            |row| row.get(0),
        )
        .unwrap_or(false);

    if !has_tag {
        conn.execute("ALTER TABLE readings ADD COLUMN tag TEXT", [])?;
    }
    Ok(())
}

/// SQLite connection with sync-engine storage operations.
pub struct Store {
    /// The underlying SQLite connection.
    pub conn: Connection,
}

impl Store {
    /// Open a store at the given path, creating and migrating if needed.
    pub fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        // Enable foreign keys and WAL mode for concurrency
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )?;

        let store = Store { conn };
        run_migrations(&store.conn)?;
        Ok(store)
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let store = Store { conn };
        run_migrations(&store.conn)?;
        Ok(store)
    }

    // ---- readings ----

    /// Insert or replace a reading, keyed by local id.
    pub fn put_reading(&self, reading: &Reading) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO readings
             (local_id, remote_id, value, unit, measured_at, note, tag, synced, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                reading.local_id,
                reading.remote_id,
                reading.value,
                reading.unit.as_str(),
                reading.measured_at.to_rfc3339(),
                reading.note,
                reading.tag.map(|t| t.as_str()),
                reading.synced,
                reading.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Get a reading by local id.
    pub fn get_reading(&self, local_id: &str) -> Result<Reading> {
        let reading = self
            .conn
            .query_row(
                "SELECT local_id, remote_id, value, unit, measured_at, note, tag, synced, updated_at
                 FROM readings WHERE local_id = ?1",
                params![local_id],
                row_to_reading,
            )
            .optional()?;

        reading.ok_or_else(|| Error::ReadingNotFound(local_id.to_string()))
    }

    /// Get a reading by its backend-assigned id, if one is stored.
    pub fn get_reading_by_remote_id(&self, remote_id: i64) -> Result<Option<Reading>> {
        let reading = self
            .conn
            .query_row(
                "SELECT local_id, remote_id, value, unit, measured_at, note, tag, synced, updated_at
                 FROM readings WHERE remote_id = ?1",
                params![remote_id],
                row_to_reading,
            )
            .optional()?;
        Ok(reading)
    }

    /// List all readings, newest measurement first.
    pub fn list_readings(&self) -> Result<Vec<Reading>> {
        let mut stmt = self.conn.prepare(
            "SELECT local_id, remote_id, value, unit, measured_at, note, tag, synced, updated_at
             FROM readings ORDER BY measured_at DESC",
        )?;

        let readings = stmt
            .query_map([], row_to_reading)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(readings)
    }

    /// Delete a reading by local id.
    pub fn delete_reading(&self, local_id: &str) -> Result<()> {
        let affected = self
            .conn
            .execute("DELETE FROM readings WHERE local_id = ?1", params![local_id])?;

        if affected == 0 {
            return Err(Error::ReadingNotFound(local_id.to_string()));
        }
        Ok(())
    }

    /// Record the backend's acknowledgement of a reading.
    ///
    /// Writes the server-assigned remote id and flips the synced flag.
    pub fn confirm_reading_synced(&self, local_id: &str, remote_id: i64) -> Result<()> {
        let affected = self.conn.execute(
            "UPDATE readings SET remote_id = ?1, synced = 1 WHERE local_id = ?2",
            params![remote_id, local_id],
        )?;

        if affected == 0 {
            return Err(Error::ReadingNotFound(local_id.to_string()));
        }
        Ok(())
    }

    // ---- appointments ----

    /// Insert or replace an appointment, keyed by local id.
    pub fn put_appointment(&self, appointment: &Appointment) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO appointments
             (local_id, remote_id, status, requested_at, reason, synced, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                appointment.local_id,
                appointment.remote_id,
                appointment.status.as_str(),
                appointment.requested_at.to_rfc3339(),
                appointment.reason,
                appointment.synced,
                appointment.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Get an appointment by local id.
    pub fn get_appointment(&self, local_id: &str) -> Result<Appointment> {
        let appointment = self
            .conn
            .query_row(
                "SELECT local_id, remote_id, status, requested_at, reason, synced, updated_at
                 FROM appointments WHERE local_id = ?1",
                params![local_id],
                row_to_appointment,
            )
            .optional()?;

        appointment.ok_or_else(|| Error::AppointmentNotFound(local_id.to_string()))
    }

    /// Get an appointment by its backend-assigned id, if one is stored.
    pub fn get_appointment_by_remote_id(&self, remote_id: i64) -> Result<Option<Appointment>> {
        let appointment = self
            .conn
            .query_row(
                "SELECT local_id, remote_id, status, requested_at, reason, synced, updated_at
                 FROM appointments WHERE remote_id = ?1",
                params![remote_id],
                row_to_appointment,
            )
            .optional()?;
        Ok(appointment)
    }

    /// List all appointments, newest request first.
    pub fn list_appointments(&self) -> Result<Vec<Appointment>> {
        let mut stmt = self.conn.prepare(
            "SELECT local_id, remote_id, status, requested_at, reason, synced, updated_at
             FROM appointments ORDER BY requested_at DESC",
        )?;

        let appointments = stmt
            .query_map([], row_to_appointment)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(appointments)
    }

    /// Delete an appointment by local id.
    pub fn delete_appointment(&self, local_id: &str) -> Result<()> {
        let affected = self.conn.execute(
            "DELETE FROM appointments WHERE local_id = ?1",
            params![local_id],
        )?;

        if affected == 0 {
            return Err(Error::AppointmentNotFound(local_id.to_string()));
        }
        Ok(())
    }

    /// Record the backend's acknowledgement of an appointment request.
    pub fn confirm_appointment_synced(&self, local_id: &str, remote_id: i64) -> Result<()> {
        let affected = self.conn.execute(
            "UPDATE appointments SET remote_id = ?1, synced = 1 WHERE local_id = ?2",
            params![remote_id, local_id],
        )?;

        if affected == 0 {
            return Err(Error::AppointmentNotFound(local_id.to_string()));
        }
        Ok(())
    }

    /// Check whether any appointment is in an open (non-terminal) state.
    ///
    /// The request-eligibility rule: a user with an open request may not
    /// submit another one.
    pub fn has_open_appointment(&self) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM appointments WHERE status IN ('pending', 'accepted', 'created')",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // ---- mutation queue ----

    /// Append a mutation to the queue, returning its assigned id.
    pub fn enqueue_mutation(&self, mutation: &Mutation) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO mutations (op, entity, payload, created_at, retry_count, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                mutation.op.as_str(),
                mutation.kind().as_str(),
                serde_json::to_string(&mutation.payload)?,
                mutation.created_at.to_rfc3339(),
                mutation.retry_count,
                mutation.status.as_str(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Get a mutation by id.
    pub fn get_mutation(&self, id: i64) -> Result<Mutation> {
        let mutation = self
            .conn
            .query_row(
                "SELECT id, op, entity, payload, created_at, retry_count, status
                 FROM mutations WHERE id = ?1",
                params![id],
                row_to_mutation,
            )
            .optional()?;

        mutation.ok_or(Error::MutationNotFound(id))
    }

    /// List pending mutations in FIFO (creation) order.
    ///
    /// Pass an entity kind to restrict the drain to that kind.
    pub fn pending_mutations(&self, kind: Option<EntityKind>) -> Result<Vec<Mutation>> {
        let mut sql = String::from(
            "SELECT id, op, entity, payload, created_at, retry_count, status
             FROM mutations WHERE status = 'pending'",
        );

        let mut params_vec: Vec<String> = Vec::new();
        if let Some(k) = kind {
            sql.push_str(" AND entity = ?1");
            params_vec.push(k.as_str().to_string());
        }
        sql.push_str(" ORDER BY id");

        let mut stmt = self.conn.prepare(&sql)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec
            .iter()
            .map(|s| s as &dyn rusqlite::ToSql)
            .collect();

        let mutations = stmt
            .query_map(params_refs.as_slice(), row_to_mutation)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(mutations)
    }

    /// List permanently failed mutations, oldest first.
    ///
    /// Failed mutations are retained for inspection and manual retry,
    /// never dropped by the engine.
    pub fn failed_mutations(&self) -> Result<Vec<Mutation>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, op, entity, payload, created_at, retry_count, status
             FROM mutations WHERE status = 'failed' ORDER BY id",
        )?;

        let mutations = stmt
            .query_map([], row_to_mutation)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(mutations)
    }

    /// Set a mutation's queue status.
    pub fn mark_mutation(&self, id: i64, status: MutationStatus) -> Result<()> {
        let affected = self.conn.execute(
            "UPDATE mutations SET status = ?1 WHERE id = ?2",
            params![status.as_str(), id],
        )?;

        if affected == 0 {
            return Err(Error::MutationNotFound(id));
        }
        Ok(())
    }

    /// Increment a mutation's retry count, returning the new count.
    pub fn bump_retry(&self, id: i64) -> Result<u32> {
        let affected = self.conn.execute(
            "UPDATE mutations SET retry_count = retry_count + 1 WHERE id = ?1",
            params![id],
        )?;

        if affected == 0 {
            return Err(Error::MutationNotFound(id));
        }

        let count: u32 = self.conn.query_row(
            "SELECT retry_count FROM mutations WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Remove a mutation from the queue (after confirmed success).
    pub fn remove_mutation(&self, id: i64) -> Result<()> {
        let affected = self
            .conn
            .execute("DELETE FROM mutations WHERE id = ?1", params![id])?;

        if affected == 0 {
            return Err(Error::MutationNotFound(id));
        }
        Ok(())
    }

    /// Re-arm a failed mutation: status back to pending, retry count reset.
    pub fn retry_mutation(&self, id: i64) -> Result<()> {
        let affected = self.conn.execute(
            "UPDATE mutations SET status = 'pending', retry_count = 0 WHERE id = ?1",
            params![id],
        )?;

        if affected == 0 {
            return Err(Error::MutationNotFound(id));
        }
        Ok(())
    }

    // ---- sync metadata / preferences ----

    /// Last successful pull-sync timestamp for an entity kind.
    pub fn last_sync_at(&self, kind: EntityKind) -> Result<Option<DateTime<Utc>>> {
        let key = format!("last_sync:{kind}");
        match self.get_meta(&key)? {
            None => Ok(None),
            Some(s) => DateTime::parse_from_rfc3339(&s)
                .map(|dt| Some(dt.with_timezone(&Utc)))
                .map_err(|_| Error::CorruptedData(format!("invalid timestamp '{s}' in '{key}'"))),
        }
    }

    /// Record a successful pull-sync timestamp for an entity kind.
    pub fn set_last_sync_at(&self, kind: EntityKind, at: DateTime<Utc>) -> Result<()> {
        self.set_meta(&format!("last_sync:{kind}"), &at.to_rfc3339())
    }

    /// The user's preferred glucose unit (defaults to mg/dL).
    pub fn glucose_unit(&self) -> Result<GlucoseUnit> {
        match self.get_meta("glucose_unit")? {
            None => Ok(GlucoseUnit::MgDl),
            Some(s) => s.parse(),
        }
    }

    /// Set the preferred glucose unit.
    pub fn set_glucose_unit(&self, unit: GlucoseUnit) -> Result<()> {
        self.set_meta("glucose_unit", unit.as_str())
    }

    fn get_meta(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM sync_meta WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO sync_meta (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
