//! StateStore — redb-backed state persistence for festgrid.
//!
//! Provides typed CRUD operations over events, registrations, and
//! sub-event schedules. All values are JSON-serialized into redb's
//! `&[u8]` value columns. The store supports both on-disk and in-memory
//! backends (the latter for testing).
//!
//! Multi-record writes (a whole scheduling run, a bulk event update, an
//! event deletion with its dependents) each happen in one write
//! transaction, so readers never observe half of them.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable, WriteTransaction};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::tables::*;
use crate::types::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Thread-safe state store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent state store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory state store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(EVENTS).map_err(map_err!(Table))?;
        txn.open_table(REGISTRATIONS).map_err(map_err!(Table))?;
        txn.open_table(SCHEDULES).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    // ── Events ─────────────────────────────────────────────────────

    /// Insert or update an event.
    pub fn put_event(&self, event: &Event) -> StateResult<()> {
        let key = event.table_key();
        self.write(|txn| insert_json(txn, EVENTS, &key, event))?;
        debug!(%key, "event stored");
        Ok(())
    }

    /// Insert or update several events in one transaction.
    pub fn put_events(&self, events: &[Event]) -> StateResult<()> {
        self.write(|txn| {
            for event in events {
                insert_json(txn, EVENTS, &event.table_key(), event)?;
            }
            Ok(())
        })?;
        debug!(count = events.len(), "events stored");
        Ok(())
    }

    pub fn get_event(&self, event_id: &str) -> StateResult<Option<Event>> {
        self.get_json(EVENTS, event_id)
    }

    pub fn list_events(&self) -> StateResult<Vec<Event>> {
        self.list_json(EVENTS, |_| true)
    }

    /// Delete an event together with its registrations and schedules.
    ///
    /// Returns true if the event existed.
    pub fn delete_event(&self, event_id: &str) -> StateResult<bool> {
        let mut schedules_removed = 0;
        let mut registrations_removed = 0;
        let existed = self.write(|txn| {
            let existed = {
                let mut table = txn.open_table(EVENTS).map_err(map_err!(Table))?;
                table.remove(event_id).map_err(map_err!(Write))?.is_some()
            };
            schedules_removed = remove_event_rows(txn, SCHEDULES, event_id)?;
            registrations_removed = remove_event_rows(txn, REGISTRATIONS, event_id)?;
            Ok(existed)
        })?;
        debug!(
            %event_id,
            existed,
            schedules_removed,
            registrations_removed,
            "event deleted"
        );
        Ok(existed)
    }

    // ── Registrations ──────────────────────────────────────────────

    /// Insert or update a registration on its own.
    pub fn put_registration(&self, registration: &Registration) -> StateResult<()> {
        let key = registration.table_key();
        self.write(|txn| insert_json(txn, REGISTRATIONS, &key, registration))
    }

    /// Store a registration and the event it changed in one transaction.
    pub fn record_registration(
        &self,
        event: &Event,
        registration: &Registration,
    ) -> StateResult<()> {
        self.write(|txn| {
            insert_json(txn, EVENTS, &event.table_key(), event)?;
            insert_json(txn, REGISTRATIONS, &registration.table_key(), registration)
        })?;
        debug!(
            event_id = %event.id,
            student_id = %registration.student_id,
            "registration recorded"
        );
        Ok(())
    }

    pub fn get_registration(
        &self,
        event_id: &str,
        registration_id: &str,
    ) -> StateResult<Option<Registration>> {
        self.get_json(REGISTRATIONS, &Registration::key_for(event_id, registration_id))
    }

    pub fn list_registrations_for_event(&self, event_id: &str) -> StateResult<Vec<Registration>> {
        self.list_json(REGISTRATIONS, |key| key_in_event(key, event_id))
    }

    /// All registrations of one student, across events.
    pub fn list_registrations_for_student(
        &self,
        student_id: &str,
    ) -> StateResult<Vec<Registration>> {
        let all: Vec<Registration> = self.list_json(REGISTRATIONS, |_| true)?;
        Ok(all
            .into_iter()
            .filter(|r| r.student_id == student_id)
            .collect())
    }

    // ── Schedules ──────────────────────────────────────────────────

    /// Insert or update one sub-event schedule.
    pub fn put_schedule(&self, schedule: &SubEventSchedule) -> StateResult<()> {
        let key = schedule.table_key();
        self.write(|txn| insert_json(txn, SCHEDULES, &key, schedule))?;
        debug!(%key, "schedule stored");
        Ok(())
    }

    /// Write every schedule of a run in a single transaction.
    pub fn put_schedules(&self, schedules: &[SubEventSchedule]) -> StateResult<()> {
        self.write(|txn| {
            for schedule in schedules {
                insert_json(txn, SCHEDULES, &schedule.table_key(), schedule)?;
            }
            Ok(())
        })?;
        debug!(count = schedules.len(), "schedules stored");
        Ok(())
    }

    pub fn get_schedule(&self, schedule_id: &str) -> StateResult<Option<SubEventSchedule>> {
        self.get_json(SCHEDULES, schedule_id)
    }

    pub fn list_schedules_for_event(&self, event_id: &str) -> StateResult<Vec<SubEventSchedule>> {
        self.list_json(SCHEDULES, |key| key_in_event(key, event_id))
    }

    // ── Internal helpers ───────────────────────────────────────────

    /// Run `f` inside a write transaction and commit if it succeeds.
    ///
    /// An error from `f` drops the transaction, which aborts it.
    fn write<T>(
        &self,
        f: impl FnOnce(&WriteTransaction) -> StateResult<T>,
    ) -> StateResult<T> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let out = f(&txn)?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(out)
    }

    fn get_json<T: DeserializeOwned>(&self, def: JsonTable, key: &str) -> StateResult<Option<T>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(def).map_err(map_err!(Table))?;
        match table.get(key).map_err(map_err!(Read))? {
            Some(guard) => {
                let value: T =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// List values whose key satisfies `wanted`.
    fn list_json<T: DeserializeOwned>(
        &self,
        def: JsonTable,
        wanted: impl Fn(&str) -> bool,
    ) -> StateResult<Vec<T>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(def).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (key, value) = entry.map_err(map_err!(Read))?;
            if wanted(key.value()) {
                let item: T =
                    serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
                results.push(item);
            }
        }
        Ok(results)
    }
}

fn insert_json<T: Serialize>(
    txn: &WriteTransaction,
    def: JsonTable,
    key: &str,
    value: &T,
) -> StateResult<()> {
    let bytes = serde_json::to_vec(value).map_err(map_err!(Serialize))?;
    let mut table = txn.open_table(def).map_err(map_err!(Table))?;
    table
        .insert(key, bytes.as_slice())
        .map_err(map_err!(Write))?;
    Ok(())
}

/// Remove every composite key under `event_id`. Returns the number removed.
fn remove_event_rows(txn: &WriteTransaction, def: JsonTable, event_id: &str) -> StateResult<u32> {
    let mut table = txn.open_table(def).map_err(map_err!(Table))?;
    let mut keys = Vec::new();
    for entry in table.iter().map_err(map_err!(Read))? {
        let (key, _) = entry.map_err(map_err!(Read))?;
        if key_in_event(key.value(), event_id) {
            keys.push(key.value().to_string());
        }
    }
    for key in &keys {
        table.remove(key.as_str()).map_err(map_err!(Write))?;
    }
    Ok(keys.len() as u32)
}
